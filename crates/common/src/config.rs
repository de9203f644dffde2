pub use crate::models::{AthenaConfig, DriverConfig, DsnConfig, UnknownBackendPolicy};
use crate::models::Backend;
use anyhow::{Context, Result};
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError};
use serde::Deserialize;
use validator::Validate;

// Default constants
pub const DEFAULT_CONFIG_PATH: &str = "config/polyquery.yaml";
pub const DEFAULT_ENV_PREFIX: &str = "POLYQUERY";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration: one optional section per backend plus dispatch
/// and logging settings.
#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub athena: Option<AthenaConfig>,
    #[serde(default)]
    pub trino: Option<DsnConfig>,
    #[serde(default)]
    pub presto: Option<DsnConfig>,
    #[serde(default)]
    pub mysql: Option<DsnConfig>,
    #[serde(default)]
    pub unknown_backend: UnknownBackendPolicy,
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    /// Load from an optional YAML file, layered under `POLYQUERY_*` environment
    /// variables (`POLYQUERY_ATHENA__REGION` maps to `athena.region`).
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        let builder = builder.add_source(
            config::Environment::with_prefix(DEFAULT_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }

    /// Names of the backends that have a config section.
    pub fn configured_backends(&self) -> Vec<Backend> {
        Backend::ALL
            .iter()
            .copied()
            .filter(|b| self.driver_config(*b).is_ok())
            .collect()
    }

    /// The initialization config for `backend`, taken from its section.
    pub fn driver_config(&self, backend: Backend) -> polyquery_error::Result<DriverConfig> {
        let config = match backend {
            Backend::Athena => self.athena.clone().map(DriverConfig::Athena),
            Backend::Trino => self.trino.clone().map(DriverConfig::Trino),
            Backend::Presto => self.presto.clone().map(DriverConfig::Presto),
            Backend::Mysql => self.mysql.clone().map(DriverConfig::Mysql),
        };

        config.ok_or_else(|| {
            PolyQueryError::new(
                ErrorCode::MissingRequiredField,
                format!("No '{}' section in configuration", backend.name()),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: Some(backend.name().to_string()),
            })
            .with_hint(format!(
                "Add a '{}' section or set {}_{}__DSN",
                backend.name(),
                DEFAULT_ENV_PREFIX,
                backend.name().to_uppercase()
            ))
        })
    }
}
