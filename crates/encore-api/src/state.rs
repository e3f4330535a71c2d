use std::sync::Arc;

use tracing::error;

use encore_db::Database;
use encore_gateway::dispatcher::Dispatcher;

use crate::auth::AdminAccounts;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub accounts: AdminAccounts,
}

impl AppStateInner {
    /// Run a blocking DB call off the async runtime.
    pub async fn run_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow::anyhow!("database task failed"))
            })?
            .map_err(ApiError::from)
    }
}

#[cfg(test)]
pub(crate) const TEST_PASSWORD: &str = "backstage-pass";

/// State over an in-memory database with `artist` and `editor` accounts.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let mut accounts = AdminAccounts::new();
    accounts.add("artist", "Artist", TEST_PASSWORD).unwrap();
    accounts.add("editor", "Editor", TEST_PASSWORD).unwrap();

    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        dispatcher: Dispatcher::new(),
        jwt_secret: "test-secret".into(),
        accounts,
    })
}
