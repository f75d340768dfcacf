use std::sync::Arc;

use tracing::error;

use roost_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler can reach. Built once in `main` and handed to the
/// router; there is no other shared state.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
        })
    }
}

/// Runs store work off the async runtime. The closure may mix store calls
/// (anyhow errors) with client-error checks.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}
