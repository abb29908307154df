use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::error;

use chatter_db::{Context, Provider};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub provider: Provider,
}

impl AppStateInner {
    pub fn new(provider: Provider) -> AppState {
        Arc::new(Self { provider })
    }
}

/// Runs datastore work off the async runtime.
///
/// The operation's [`Context`] is cancelled if the calling future is dropped
/// before the work finishes, so an abandoned request stops issuing statements
/// at the next check.
pub async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Provider, &Context) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    let state = state.clone();

    let result = tokio::task::spawn_blocking(move || {
        let ctx = Context::with_token(token);
        f(&state.provider, &ctx)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?;

    guard.disarm();
    result
}
