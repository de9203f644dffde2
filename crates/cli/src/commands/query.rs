//! `polyquery query`: run one statement against a configured backend.
use crate::output::{self, OutputFormat, QueryOutput};
use anyhow::Result;
use polyquery_common::config::AppConfig;
use polyquery_common::{Backend, BackendSelector, TabularResult};
use polyquery_connectors::{CancellationToken, DriverRegistry};
use tracing::debug;

pub async fn query(
    sql: &str,
    backend: &str,
    skip_header: bool,
    format: OutputFormat,
    config: &AppConfig,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = run_query(
        DriverRegistry::global(),
        sql,
        backend,
        skip_header,
        config,
        &cancel,
    )
    .await;
    ctrl_c.abort();
    let result = outcome?;

    if format.is_machine_readable() {
        output::print_success(format, QueryOutput::new(backend, result))?;
    } else {
        output::print_table(&result);
    }
    Ok(())
}

/// Initialize `backend` from the config if needed and run `sql` on it.
///
/// `skip_header` drops the header row Athena returns as its first row; it has
/// no effect on other backends.
pub async fn run_query(
    registry: &DriverRegistry,
    sql: &str,
    backend: &str,
    skip_header: bool,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> Result<TabularResult> {
    registry.set_unknown_backend_policy(config.unknown_backend);
    let selector = BackendSelector::from(backend);

    // Unknown selectors go straight to the registry, which applies the policy
    let resolved = selector.resolve().ok();
    if let Some(backend) = resolved {
        registry
            .initialize(backend, config.driver_config(backend)?)
            .await?;
    }

    let result = registry.execute_cancellable(sql, selector, cancel).await?;
    debug!(rows = result.row_count(), "Query returned");

    if skip_header && resolved == Some(Backend::Athena) {
        return Ok(result.without_header_row());
    }
    Ok(result)
}
