//! Structured exit codes for machine-readable error handling.
//!
//! These codes let scripts tell a bad config from an unreachable backend or a
//! failed query.

use polyquery_error::{ErrorCategory, PolyQueryError};

/// Success (standard convention)
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, unknown backend)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, missing section, bad DSN)
pub const CONFIG_ERROR: i32 = 3;

/// Connection error (client not built, backend unreachable)
pub const CONNECTION_ERROR: i32 = 4;

/// Query error (rejected, failed, timed out or cancelled)
pub const QUERY_ERROR: i32 = 5;

/// Validation found problems in an otherwise loadable config
pub const VALIDATION_ERROR: i32 = 6;

pub fn for_error(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<PolyQueryError>() {
        if err.code == polyquery_error::ErrorCode::UnknownBackend {
            return USAGE_ERROR;
        }
        return match err.code.category() {
            ErrorCategory::Connection => CONNECTION_ERROR,
            ErrorCategory::Config => CONFIG_ERROR,
            ErrorCategory::Query => QUERY_ERROR,
            ErrorCategory::Internal => GENERAL_ERROR,
            _ => GENERAL_ERROR, // Handle future variants
        };
    }

    // Config loading goes through anyhow with context
    let s = e.to_string().to_lowercase();
    if s.contains("configuration") || s.contains("yaml") {
        return CONFIG_ERROR;
    }
    GENERAL_ERROR
}
