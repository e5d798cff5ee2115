//! Server settings, read from `CATALOG_*` environment variables.

use crate::catalog::session::DEFAULT_SESSION_TTL;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub blob_dir: PathBuf,
    /// Base name of the exported CSV file.
    pub dataset: String,
    pub json_limit: usize,
    /// User id granted the superadmin role at startup.
    pub bootstrap_superadmin: Option<String>,
    /// How long an unused import session is kept.
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("catalog.sqlite"),
            blob_dir: PathBuf::from("blobs"),
            dataset: "objects".to_string(),
            json_limit: 10 * 1024 * 1024,
            bootstrap_superadmin: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        AppConfig::from_vars(&catalog_vars(std::env::vars_os()))
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let text = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = AppConfig::default();

        Ok(AppConfig {
            host: text("CATALOG_HOST").unwrap_or(defaults.host),
            port: number(vars, "CATALOG_PORT")?.unwrap_or(defaults.port),
            database_path: text("CATALOG_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            blob_dir: text("CATALOG_BLOB_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_dir),
            dataset: text("CATALOG_DATASET").unwrap_or(defaults.dataset),
            json_limit: number(vars, "CATALOG_JSON_LIMIT")?.unwrap_or(defaults.json_limit),
            bootstrap_superadmin: text("CATALOG_BOOTSTRAP_SUPERADMIN"),
            session_ttl: number(vars, "CATALOG_SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        })
    }
}

/// `CATALOG_*` variables. Anything that is not valid Unicode is skipped.
fn catalog_vars(vars: impl Iterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
        .filter(|(name, _)| name.starts_with("CATALOG_"))
        .collect()
}

fn number<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber {
                name,
                value: value.to_string(),
            }),
    }
}
