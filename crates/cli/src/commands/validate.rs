//! `polyquery validate`: check the configuration without running anything.
//!
//! The file and environment are loaded and schema-checked by the caller; this
//! command then inspects every backend section:
//! - Missing sections are reported, not errors.
//! - An Athena section without credentials or region is `incomplete`: it is
//!   accepted at initialization but no client will be built.
//! - DSNs are parsed the same way initialization parses them.

use crate::{
    exit_codes,
    output::{self, OutputFormat},
};
use anyhow::Result;
use owo_colors::OwoColorize;
use polyquery_common::config::AppConfig;
use polyquery_common::{Backend, DriverConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Incomplete,
    Invalid,
    NotConfigured,
}

#[derive(Debug, Serialize)]
pub struct BackendCheck {
    pub backend: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    pub config_file: String,
    pub backends: Vec<BackendCheck>,
}

impl ValidateResult {
    pub fn status_of(&self, backend: Backend) -> Option<CheckStatus> {
        self.backends
            .iter()
            .find(|c| c.backend == backend.name())
            .map(|c| c.status)
    }
}

pub fn validate_config(config_file: &str, config: &AppConfig) -> ValidateResult {
    let backends: Vec<BackendCheck> = Backend::ALL
        .iter()
        .map(|backend| check_backend(*backend, config))
        .collect();

    ValidateResult {
        valid: backends.iter().all(|c| c.status != CheckStatus::Invalid),
        config_file: config_file.to_string(),
        backends,
    }
}

fn check_backend(backend: Backend, config: &AppConfig) -> BackendCheck {
    let check = |status, message: Option<String>| BackendCheck {
        backend: backend.name().to_string(),
        status,
        message,
    };

    let Ok(driver_config) = config.driver_config(backend) else {
        return check(CheckStatus::NotConfigured, None);
    };
    if let DriverConfig::Athena(athena) = &driver_config {
        if !athena.is_complete() {
            return check(
                CheckStatus::Incomplete,
                Some("access_key, secret_key and region are required to build a client".into()),
            );
        }
    }

    match polyquery_connectors::sources::check_config(&driver_config) {
        Ok(()) => check(CheckStatus::Ok, None),
        Err(e) => check(CheckStatus::Invalid, Some(e.to_string())),
    }
}

pub async fn validate(config_file: &str, config: &AppConfig, format: OutputFormat) -> Result<()> {
    let result = validate_config(config_file, config);

    if format.is_machine_readable() {
        output::print_success(format, &result)?;
        if !result.valid {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }
        return Ok(());
    }

    println!(
        "{} {} {}",
        "[Config:".dimmed(),
        config_file.yellow(),
        "] Validating...".bold().cyan()
    );
    for check in &result.backends {
        let status = match check.status {
            CheckStatus::Ok => "ok".green().to_string(),
            CheckStatus::Incomplete => "incomplete".yellow().to_string(),
            CheckStatus::Invalid => "invalid".red().bold().to_string(),
            CheckStatus::NotConfigured => "not configured".dimmed().to_string(),
        };
        match &check.message {
            Some(message) => println!("  {:<7} {} ({})", check.backend, status, message),
            None => println!("  {:<7} {}", check.backend, status),
        }
    }

    if !result.valid {
        eprintln!("{}", "Configuration has invalid backend sections.".red());
        std::process::exit(exit_codes::VALIDATION_ERROR);
    }
    println!("{}", "Configuration is valid.".green());
    Ok(())
}
