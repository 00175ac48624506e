pub mod chain;
pub mod handlers;
pub mod queries;
pub mod units;
pub mod verify;
