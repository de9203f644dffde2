//! # Error Contexts
//!
//! Structured metadata attached to errors so callers can react without parsing
//! the message text.

use serde::{Deserialize, Serialize};

/// Structured context for a [`crate::PolyQueryError`].
///
/// Each variant provides the fields relevant to one family of codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for PQ-1001, PQ-3001 and the per-backend query failures
    Backend { backend: String, operation: String },

    /// Context for PQ-1003 (UnknownBackend)
    UnknownBackend {
        selector: String,
        available_backends: Vec<String>,
    },

    /// Context for Athena execution failures (PQ-2002, 2003, 2006, 2007)
    Execution {
        execution_id: String,
        state: Option<String>,
        reason: Option<String>,
    },

    /// Context for PQ-1002 and PQ-3002
    Connection {
        backend: String,
        host: Option<String>,
        port: Option<u16>,
    },

    /// Context for PQ-2005 (ScanFailed)
    Scan {
        row_index: usize,
        expected_columns: usize,
        actual_columns: usize,
    },

    /// Context for configuration errors (PQ-3003..3006)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_context_serde_roundtrip() {
        let ctx = ErrorContext::Execution {
            execution_id: "4f2b-11".to_string(),
            state: Some("FAILED".to_string()),
            reason: Some("SYNTAX_ERROR: line 1:8".to_string()),
        };

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"type\":\"execution\""));

        let de: ErrorContext = serde_json::from_str(&json).unwrap();
        match de {
            ErrorContext::Execution {
                execution_id,
                state,
                ..
            } => {
                assert_eq!(execution_id, "4f2b-11");
                assert_eq!(state.as_deref(), Some("FAILED"));
            }
            _ => panic!("Wrong variant"),
        }
    }
}
