use polyquery_error::{find_closest_match, ErrorCode, ErrorContext, PolyQueryError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// String placed in a cell whose value is absent.
pub const NULL_MARKER: &str = "NIL";

/// Database every Athena query runs against unless configured otherwise.
pub const DEFAULT_ATHENA_DATABASE: &str = "rewards_gateway";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

// Custom Serde logic for SecretString
fn serialize_secret<S>(_secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("[REDACTED]")
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(SecretString::from(s))
}

fn serialize_optional_secret<S>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(SecretString::from))
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_athena_database() -> String {
    DEFAULT_ATHENA_DATABASE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// The four supported backends.
///
/// Discriminants are the stable integer selectors callers may persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Athena = 0,
    Mysql = 1,
    Presto = 2,
    Trino = 3,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::Athena,
        Backend::Mysql,
        Backend::Presto,
        Backend::Trino,
    ];

    /// Lower-case selector name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Athena => "athena",
            Backend::Mysql => "mysql",
            Backend::Presto => "presto",
            Backend::Trino => "trino",
        }
    }

    /// Name used in log lines and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Athena => "Athena",
            Backend::Mysql => "Mysql",
            Backend::Presto => "Presto",
            Backend::Trino => "Trino",
        }
    }

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|b| b.name().to_string()).collect()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = PolyQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| unknown_backend_error(s))
    }
}

impl TryFrom<u8> for Backend {
    type Error = PolyQueryError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.ordinal() == n)
            .ok_or_else(|| unknown_backend_error(&n.to_string()))
    }
}

pub fn unknown_backend_error(selector: &str) -> PolyQueryError {
    let available = Backend::names();
    let mut err = PolyQueryError::new(
        ErrorCode::UnknownBackend,
        format!("No such backend '{}'", selector),
    )
    .with_context(ErrorContext::UnknownBackend {
        selector: selector.to_string(),
        available_backends: available.clone(),
    });

    if let Some(closest) = find_closest_match(selector, &available) {
        err = err.with_hint(format!("Did you mean '{}'?", closest));
    } else {
        err = err.with_hint(format!("Supported backends: {}", available.join(", ")));
    }
    err
}

/// A backend selector as supplied by a caller, before it is known to be valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelector {
    Known(Backend),
    Unknown(String),
}

impl BackendSelector {
    pub fn resolve(&self) -> Result<Backend, PolyQueryError> {
        match self {
            BackendSelector::Known(backend) => Ok(*backend),
            BackendSelector::Unknown(raw) => Err(unknown_backend_error(raw)),
        }
    }
}

impl fmt::Display for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSelector::Known(backend) => write!(f, "{}", backend),
            BackendSelector::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<Backend> for BackendSelector {
    fn from(backend: Backend) -> Self {
        BackendSelector::Known(backend)
    }
}

impl From<&str> for BackendSelector {
    fn from(raw: &str) -> Self {
        match raw.parse::<Backend>() {
            Ok(backend) => BackendSelector::Known(backend),
            Err(_) => BackendSelector::Unknown(raw.to_string()),
        }
    }
}

impl From<String> for BackendSelector {
    fn from(raw: String) -> Self {
        BackendSelector::from(raw.as_str())
    }
}

impl From<u8> for BackendSelector {
    fn from(n: u8) -> Self {
        match Backend::try_from(n) {
            Ok(backend) => BackendSelector::Known(backend),
            Err(_) => BackendSelector::Unknown(n.to_string()),
        }
    }
}

/// What the dispatch facade does with a selector that names no backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownBackendPolicy {
    /// Return an `UnknownBackend` error.
    #[default]
    Reject,
    /// Return an empty result and no error.
    Empty,
}

/// Credentials and target for the Athena backend.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct AthenaConfig {
    #[serde(default)]
    pub access_key: String,

    #[serde(
        default = "empty_secret",
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub secret_key: SecretString,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_secret",
        deserialize_with = "deserialize_optional_secret"
    )]
    pub session_token: Option<SecretString>,

    #[serde(default)]
    pub region: String,

    #[serde(default = "default_athena_database")]
    #[validate(length(min = 1))]
    pub database: String,

    #[serde(default)]
    pub workgroup: Option<String>,

    /// S3 location for query results, e.g. `s3://bucket/prefix/`
    #[serde(default)]
    pub output_location: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    /// Unset means wait for a terminal state indefinitely.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub poll_timeout_ms: Option<u64>,
}

impl AthenaConfig {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            session_token: None,
            region: region.into(),
            database: default_athena_database(),
            workgroup: None,
            output_location: None,
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: None,
        }
    }

    /// Whether enough is set to build a client. An incomplete config is accepted
    /// at initialization but leaves the client unbuilt.
    pub fn is_complete(&self) -> bool {
        use secrecy::ExposeSecret;
        !self.access_key.is_empty()
            && !self.secret_key.expose_secret().is_empty()
            && !self.region.is_empty()
    }

    /// Run the field checks the config loader applies, for configs built in code.
    pub fn check_settings(&self) -> Result<(), PolyQueryError> {
        self.validate().map_err(|e| {
            let field = e.field_errors().keys().next().map(|f| f.to_string());
            PolyQueryError::new(
                ErrorCode::SchemaViolation,
                format!("Invalid Athena settings: {}", e),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: field.map(|f| format!("athena.{}", f)),
            })
        })
    }
}

/// Connection string for one of the SQL-cursor backends.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DsnConfig {
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub dsn: SecretString,
}

impl DsnConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: SecretString::from(dsn.into()),
        }
    }
}

/// Backend-specific initialization config.
#[derive(Debug, Clone)]
pub enum DriverConfig {
    Athena(AthenaConfig),
    Mysql(DsnConfig),
    Presto(DsnConfig),
    Trino(DsnConfig),
}

impl DriverConfig {
    /// The backend this config shape belongs to.
    pub fn backend(&self) -> Backend {
        match self {
            DriverConfig::Athena(_) => Backend::Athena,
            DriverConfig::Mysql(_) => Backend::Mysql,
            DriverConfig::Presto(_) => Backend::Presto,
            DriverConfig::Trino(_) => Backend::Trino,
        }
    }
}

/// The common output of every backend.
///
/// `column_names` keeps source order; `column_types` is keyed by name. Each cell
/// is the value's string form or [`NULL_MARKER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularResult {
    pub column_types: HashMap<String, String>,
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularResult {
    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty() && self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Athena returns the column names again as its first row; this drops it.
    pub fn without_header_row(mut self) -> Self {
        if !self.rows.is_empty() {
            self.rows.remove(0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_ordinals_are_stable() {
        assert_eq!(Backend::Athena.ordinal(), 0);
        assert_eq!(Backend::Mysql.ordinal(), 1);
        assert_eq!(Backend::Presto.ordinal(), 2);
        assert_eq!(Backend::Trino.ordinal(), 3);
        assert_eq!(Backend::try_from(3).unwrap(), Backend::Trino);
        assert!(Backend::try_from(4).is_err());
    }

    #[test]
    fn test_backend_parse_is_case_insensitive() {
        assert_eq!("ATHENA".parse::<Backend>().unwrap(), Backend::Athena);
        assert_eq!(" mysql ".parse::<Backend>().unwrap(), Backend::Mysql);
    }

    #[test]
    fn test_unknown_backend_hint() {
        let err = "prest".parse::<Backend>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownBackend);
        assert_eq!(err.hint.as_deref(), Some("Did you mean 'presto'?"));

        let err = "bigquery".parse::<Backend>().unwrap_err();
        assert_eq!(
            err.hint.as_deref(),
            Some("Supported backends: athena, mysql, presto, trino")
        );
    }

    #[test]
    fn test_selector_conversions() {
        assert_eq!(
            BackendSelector::from("trino"),
            BackendSelector::Known(Backend::Trino)
        );
        assert_eq!(
            BackendSelector::from(7u8),
            BackendSelector::Unknown("7".to_string())
        );
        assert!(BackendSelector::from("oracle").resolve().is_err());
    }

    #[test]
    fn test_athena_completeness() {
        assert!(AthenaConfig::new("AKIA", "secret", "ap-south-1").is_complete());
        assert!(!AthenaConfig::new("AKIA", "", "ap-south-1").is_complete());
        assert!(!AthenaConfig::new("", "secret", "ap-south-1").is_complete());
        assert!(!AthenaConfig::new("AKIA", "secret", "").is_complete());
    }

    #[test]
    fn test_athena_settings_check() {
        let mut cfg = AthenaConfig::new("AKIA", "secret", "ap-south-1");
        assert!(cfg.check_settings().is_ok());

        cfg.poll_interval_ms = 0;
        let err = cfg.check_settings().unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaViolation);
        assert!(matches!(
            err.context,
            Some(ErrorContext::Config { field: Some(ref f), .. }) if f == "athena.poll_interval_ms"
        ));
    }

    #[test]
    fn test_secrets_are_redacted_on_serialize() {
        let cfg = DsnConfig::new("mysql://root:hunter2@db:3306/app");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("[REDACTED]"));
        assert!(!yaml.contains("hunter2"));
    }

    #[test]
    fn test_driver_config_backend() {
        let cfg = DriverConfig::Presto(DsnConfig::new("http://user@presto:8080"));
        assert_eq!(cfg.backend(), Backend::Presto);
    }

    #[test]
    fn test_without_header_row() {
        let result = TabularResult {
            column_types: HashMap::from([("id".to_string(), "integer".to_string())]),
            column_names: vec!["id".to_string()],
            rows: vec![vec!["id".to_string()], vec!["1".to_string()]],
        };
        let data = result.without_header_row();
        assert_eq!(data.rows, vec![vec!["1".to_string()]]);

        assert!(TabularResult::default().without_header_row().is_empty());
    }
}
