use anyhow::{Context, Result};
use polyquery_common::config::{AppConfig, DEFAULT_CONFIG_PATH};
use std::env;

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "POLYQUERY_CONFIG";

/// Config file to read. Priority: argument > `POLYQUERY_CONFIG` > default path.
pub fn resolve_path(arg: Option<&str>) -> String {
    arg.map(|s| s.to_string())
        .or_else(|| env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load(arg: Option<&str>) -> Result<(String, AppConfig)> {
    let path = resolve_path(arg);
    let config = AppConfig::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path))?;
    Ok((path, config))
}
