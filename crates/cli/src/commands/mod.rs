//! CLI command implementations.
mod query;
mod validate;


pub use query::{query, run_query};
pub use validate::{validate, validate_config, CheckStatus, ValidateResult};
