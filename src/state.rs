//! Shared application state handed to every handler.

use crate::config::ResolvedModel;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Resolved once at startup; declarations are compiled into the binary.
    pub model: Arc<ResolvedModel>,
}
