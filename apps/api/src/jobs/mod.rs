pub mod handlers;
pub mod queries;
pub mod rules;
pub mod validation;
pub mod view;
