use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following the PQ-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Client/connection errors
/// - **2000-2999**: Query lifecycle errors
/// - **3000-3999**: Configuration errors
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Client Errors (1000-1999) ===
    /// PQ-1001: Backend client was never initialized
    UninitializedClient = 1001,
    /// PQ-1002: Backend client could not be constructed or reached
    ConnectionFailed = 1002,
    /// PQ-1003: Backend selector does not name a supported backend
    UnknownBackend = 1003,

    // === Query Errors (2000-2999) ===
    /// PQ-2001: Query submission was rejected
    SubmissionFailed = 2001,
    /// PQ-2002: Execution status could not be read
    StatusCheckFailed = 2002,
    /// PQ-2003: Query reached a terminal failure state
    QueryFailed = 2003,
    /// PQ-2004: A result page could not be fetched
    FetchFailed = 2004,
    /// PQ-2005: A result row could not be read
    ScanFailed = 2005,
    /// PQ-2006: Query cancelled by the caller
    QueryCancelled = 2006,
    /// PQ-2007: Query did not finish before its deadline
    QueryTimedOut = 2007,

    // === Configuration Errors (3000-3999) ===
    /// PQ-3001: Config shape does not belong to the selected backend
    InvalidConfigForBackend = 3001,
    /// PQ-3002: Connection string could not be parsed
    InvalidConnectionString = 3002,
    /// PQ-3003: Configuration sources could not be loaded
    ConfigLoadFailed = 3003,
    /// PQ-3004: Invalid YAML syntax
    InvalidYaml = 3004,
    /// PQ-3005: Schema validation failed
    SchemaViolation = 3005,
    /// PQ-3006: Missing required field in config
    MissingRequiredField = 3006,

    // === Internal Errors (5000-5999) ===
    /// PQ-5001: Serialization/deserialization failed
    SerializationFailed = 5001,
    /// PQ-5002: Local I/O failure
    Io = 5002,

    /// PQ-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "PQ-2003")
    pub fn as_str(&self) -> String {
        format!("PQ-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Connection,
            2000..=2999 => ErrorCategory::Query,
            3000..=3999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("PQ-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::UninitializedClient),
            1002 => Ok(Self::ConnectionFailed),
            1003 => Ok(Self::UnknownBackend),
            2001 => Ok(Self::SubmissionFailed),
            2002 => Ok(Self::StatusCheckFailed),
            2003 => Ok(Self::QueryFailed),
            2004 => Ok(Self::FetchFailed),
            2005 => Ok(Self::ScanFailed),
            2006 => Ok(Self::QueryCancelled),
            2007 => Ok(Self::QueryTimedOut),
            3001 => Ok(Self::InvalidConfigForBackend),
            3002 => Ok(Self::InvalidConnectionString),
            3003 => Ok(Self::ConfigLoadFailed),
            3004 => Ok(Self::InvalidYaml),
            3005 => Ok(Self::SchemaViolation),
            3006 => Ok(Self::MissingRequiredField),
            5001 => Ok(Self::SerializationFailed),
            5002 => Ok(Self::Io),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used by the CLI to pick an exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Connection,
    Query,
    Config,
    Internal,
}
