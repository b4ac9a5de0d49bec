//! Run a helper request from async code without blocking the runtime.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::client::ManagedClient;
use crate::helper::RetryHelper;

/// Runs `f` against `helper` in `spawn_blocking`. Waits between attempts
/// block a pool thread, not the runtime.
pub async fn spawn_request<C, T, F>(helper: Arc<RetryHelper<C>>, f: F) -> Result<T>
where
    C: ManagedClient + 'static,
    T: Send + 'static,
    F: FnOnce(&RetryHelper<C>) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&helper))
        .await
        .context("retry task join")
}
