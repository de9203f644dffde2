//! Backend executors.
//!
//! Every backend implements [`QueryExecutor`]: run one query and hand back a
//! [`TabularResult`]. The registry owns one shared executor per backend.
//!
//! # Supported Backends
//!
//! | Backend  | Implementation | Model |
//! |----------|----------------|-------|
//! | `athena` | `AthenaExecutor` | Submit, poll until terminal, page through results |
//! | `trino`  | `SqlExecutor<StatementClient>` | HTTP statement protocol, follows `nextUri` |
//! | `presto` | `SqlExecutor<StatementClient>` | Same protocol with `X-Presto-*` headers |
//! | `mysql`  | `SqlExecutor<MySqlClient>` | Pooled `mysql_async` connection, streamed rows |
//!
//! # Adding a New Backend
//!
//! 1. Implement [`sql::SqlClient`] for a cursor-style driver, or `QueryExecutor`
//!    directly for anything else.
//! 2. Add a `DriverConfig` variant and a branch in [`build_executor`].

use async_trait::async_trait;
use polyquery_common::{Backend, DriverConfig, TabularResult};
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod athena;
pub mod sql;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// The backend this executor talks to.
    fn backend(&self) -> Backend;

    /// Run `query` to completion and return every row.
    async fn execute(&self, query: &str) -> Result<TabularResult>;

    /// Like [`execute`](Self::execute), but returns `QueryCancelled` once
    /// `cancel` fires. Executors that hold server-side work must override this
    /// to release it.
    async fn execute_cancellable(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<TabularResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled_error(self.backend())),
            result = self.execute(query) => result,
        }
    }
}

pub(crate) fn cancelled_error(backend: Backend) -> PolyQueryError {
    PolyQueryError::new(
        ErrorCode::QueryCancelled,
        format!("{} query cancelled", backend.display_name()),
    )
    .with_context(ErrorContext::Backend {
        backend: backend.name().to_string(),
        operation: "execute".to_string(),
    })
}

/// Construct the executor for a config.
///
/// Athena configs are expected to be complete; the registry checks that before
/// calling this.
pub async fn build_executor(config: &DriverConfig) -> Result<Arc<dyn QueryExecutor>> {
    let executor: Arc<dyn QueryExecutor> = match config {
        DriverConfig::Athena(athena) => Arc::new(athena::AthenaExecutor::connect(athena).await),
        DriverConfig::Mysql(dsn) => {
            Arc::new(sql::SqlExecutor::new(sql::mysql::MySqlClient::connect(dsn)?))
        }
        DriverConfig::Presto(dsn) => Arc::new(sql::SqlExecutor::new(
            sql::statement::StatementClient::presto(dsn)?,
        )),
        DriverConfig::Trino(dsn) => Arc::new(sql::SqlExecutor::new(
            sql::statement::StatementClient::trino(dsn)?,
        )),
    };
    Ok(executor)
}

/// Check a config the way initialization would, without building a client or
/// touching the network.
pub fn check_config(config: &DriverConfig) -> Result<()> {
    match config {
        DriverConfig::Athena(athena) => athena.check_settings(),
        DriverConfig::Mysql(dsn) => sql::mysql::parse_dsn(dsn.dsn.expose_secret()).map(|_| ()),
        DriverConfig::Presto(dsn) | DriverConfig::Trino(dsn) => {
            sql::statement::StatementTarget::parse(dsn.dsn.expose_secret()).map(|_| ())
        }
    }
}
