//! Free-function facade over [`DriverRegistry::global`].
use polyquery_common::{BackendSelector, DriverConfig, TabularResult};
use polyquery_error::Result;
use tokio_util::sync::CancellationToken;

use crate::registry::DriverRegistry;

/// Build the process-wide client for `selector`. Safe to call repeatedly and
/// from many tasks; only the first successful call constructs anything.
pub async fn initialize_driver(
    selector: impl Into<BackendSelector>,
    config: DriverConfig,
) -> Result<()> {
    DriverRegistry::global().initialize(selector, config).await
}

/// Run `query` on the process-wide client for `selector`.
pub async fn execute_query(
    query: &str,
    selector: impl Into<BackendSelector>,
) -> Result<TabularResult> {
    DriverRegistry::global().execute(query, selector).await
}

pub async fn execute_query_cancellable(
    query: &str,
    selector: impl Into<BackendSelector>,
    cancel: &CancellationToken,
) -> Result<TabularResult> {
    DriverRegistry::global()
        .execute_cancellable(query, selector, cancel)
        .await
}
