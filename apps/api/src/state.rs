use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::payments::chain::ChainProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Blockchain access for payment verification. JSON-RPC in production.
    pub chain: Arc<dyn ChainProvider>,
}
