//! # polyquery-connectors
//!
//! One query API over Athena, Trino, Presto and MySQL.
//!
//! Initialize a backend once with its [`DriverConfig`], then run queries by
//! naming the backend. Every backend returns the same [`TabularResult`]: column
//! names in order, a name-to-type map, and rows of strings with `"NIL"` for
//! missing values.
//!
//! ```no_run
//! use polyquery_connectors::{execute_query, initialize_driver, Backend, DriverConfig, DsnConfig};
//!
//! # async fn run() -> polyquery_error::Result<()> {
//! initialize_driver(
//!     Backend::Trino,
//!     DriverConfig::Trino(DsnConfig::new("http://analyst@trino:8080?catalog=hive&schema=rewards")),
//! )
//! .await?;
//! let result = execute_query("SELECT id, name FROM farmers", "trino").await?;
//! println!("{} rows", result.row_count());
//! # Ok(())
//! # }
//! ```
pub mod dispatch;
pub mod registry;
pub mod sources;

pub use dispatch::{execute_query, execute_query_cancellable, initialize_driver};
pub use registry::DriverRegistry;
pub use sources::QueryExecutor;

pub use polyquery_common::{
    AthenaConfig, Backend, BackendSelector, DriverConfig, DsnConfig, TabularResult,
    UnknownBackendPolicy,
};
pub use tokio_util::sync::CancellationToken;
