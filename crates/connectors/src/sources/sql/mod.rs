//! SQL-cursor backends.
//!
//! Trino, Presto and MySQL all hand back a cursor of rows after a single call,
//! so they share one executor: a [`SqlClient`] streams the result set into a
//! [`RowSink`] and [`TabularCollector`] turns it into a `TabularResult`.
use async_trait::async_trait;
use polyquery_common::scrubber::query_for_log;
use polyquery_common::{Backend, TabularResult};
use polyquery_error::Result;
use tracing::{error, info};

use crate::sources::QueryExecutor;

pub mod common;
pub mod mysql;
pub mod statement;

pub use common::{RowSink, SqlColumn, TabularCollector};

/// A driver that runs one query and streams its result set.
#[async_trait]
pub trait SqlClient: Send + Sync {
    fn backend(&self) -> Backend;

    /// Run `query`, reporting columns and then every row to `sink`.
    async fn run(&self, query: &str, sink: &mut dyn RowSink) -> Result<()>;
}

/// [`QueryExecutor`] over any [`SqlClient`].
pub struct SqlExecutor<C> {
    client: C,
}

impl<C: SqlClient> SqlExecutor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: SqlClient> QueryExecutor for SqlExecutor<C> {
    fn backend(&self) -> Backend {
        self.client.backend()
    }

    async fn execute(&self, query: &str) -> Result<TabularResult> {
        let backend = self.client.backend();
        info!(backend = %backend, query = %query_for_log(query), "Running query");

        let mut collector = TabularCollector::new();
        if let Err(e) = self.client.run(query, &mut collector).await {
            error!(backend = %backend, error = %e, "Query failed");
            return Err(e);
        }

        let result = collector.finish();
        info!(
            backend = %backend,
            rows = result.row_count(),
            columns = result.column_names.len(),
            "Query completed"
        );
        Ok(result)
    }
}
