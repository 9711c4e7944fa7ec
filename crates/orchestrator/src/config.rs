// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading: an optional TOML file, overridden field-by-field
//! by `FLEET_*` environment variables, the same two-layer shape the daemon
//! crate uses for its own startup config.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// mTLS material for the gRPC channel, when the deployment requires it.
#[derive(Debug, Clone, Deserialize)]
pub struct SecureCredentials {
    pub ca_path: String,
    pub cert_path: String,
    pub key_path: String,
}

/// Resolved configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Duration,
    pub crunch_id: String,
    pub host: String,
    pub port: u16,
    pub retry_attempts: u32,
    pub retry_backoff_base: f64,
    pub min_retry_interval: Duration,
    pub max_consecutive_failures: u32,
    pub max_consecutive_timeouts: u32,
    pub max_consecutive_timeouts_for_skip: u32,
    pub secure_credentials: Option<SecureCredentials>,
    pub report_failure: bool,
    pub auth_private_key_path: Option<String>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            crunch_id: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            retry_attempts: 5,
            retry_backoff_base: 2.0,
            min_retry_interval: Duration::from_secs(2),
            max_consecutive_failures: 3,
            max_consecutive_timeouts: 3,
            max_consecutive_timeouts_for_skip: 3,
            secure_credentials: None,
            report_failure: true,
            auth_private_key_path: None,
            log_filter: "info".to_string(),
        }
    }
}

/// The TOML file's shape — every field optional so a partial file only
/// overrides what it names, the rest falling through to [`Config::default`].
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    timeout_secs: Option<u64>,
    crunch_id: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    retry_attempts: Option<u32>,
    retry_backoff_base: Option<f64>,
    min_retry_interval_secs: Option<u64>,
    max_consecutive_failures: Option<u32>,
    max_consecutive_timeouts: Option<u32>,
    max_consecutive_timeouts_for_skip: Option<u32>,
    secure_credentials: Option<SecureCredentials>,
    report_failure: Option<bool>,
    auth_private_key_path: Option<String>,
    log_filter: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("{0} must be a valid {1}: {2}")]
    InvalidEnvVar(&'static str, &'static str, String),
}

impl Config {
    /// Load from an optional TOML file, then apply `FLEET_*` env var
    /// overrides on top. A missing `path` simply means "start from defaults".
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match path {
            Some(path) => read_raw(path)?,
            None => RawConfig::default(),
        };
        let mut config = apply_raw(Config::default(), raw);
        apply_env(&mut config)?;
        Ok(config)
    }
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
}

fn apply_raw(mut config: Config, raw: RawConfig) -> Config {
    if let Some(v) = raw.timeout_secs {
        config.timeout = Duration::from_secs(v);
    }
    if let Some(v) = raw.crunch_id {
        config.crunch_id = v;
    }
    if let Some(v) = raw.host {
        config.host = v;
    }
    if let Some(v) = raw.port {
        config.port = v;
    }
    if let Some(v) = raw.retry_attempts {
        config.retry_attempts = v;
    }
    if let Some(v) = raw.retry_backoff_base {
        config.retry_backoff_base = v;
    }
    if let Some(v) = raw.min_retry_interval_secs {
        config.min_retry_interval = Duration::from_secs(v);
    }
    if let Some(v) = raw.max_consecutive_failures {
        config.max_consecutive_failures = v;
    }
    if let Some(v) = raw.max_consecutive_timeouts {
        config.max_consecutive_timeouts = v;
    }
    if let Some(v) = raw.max_consecutive_timeouts_for_skip {
        config.max_consecutive_timeouts_for_skip = v;
    }
    if raw.secure_credentials.is_some() {
        config.secure_credentials = raw.secure_credentials;
    }
    if let Some(v) = raw.report_failure {
        config.report_failure = v;
    }
    if raw.auth_private_key_path.is_some() {
        config.auth_private_key_path = raw.auth_private_key_path;
    }
    if let Some(v) = raw.log_filter {
        config.log_filter = v;
    }
    config
}

/// `FLEET_*` env var overrides, applied last so they win over the file.
fn apply_env(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var("FLEET_TIMEOUT_SECS") {
        config.timeout = Duration::from_secs(parse_env("FLEET_TIMEOUT_SECS", "u64", &v)?);
    }
    if let Ok(v) = std::env::var("FLEET_CRUNCH_ID") {
        config.crunch_id = v;
    }
    if let Ok(v) = std::env::var("FLEET_HOST") {
        config.host = v;
    }
    if let Ok(v) = std::env::var("FLEET_PORT") {
        config.port = parse_env("FLEET_PORT", "u16", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_RETRY_ATTEMPTS") {
        config.retry_attempts = parse_env("FLEET_RETRY_ATTEMPTS", "u32", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_RETRY_BACKOFF_BASE") {
        config.retry_backoff_base = parse_env("FLEET_RETRY_BACKOFF_BASE", "f64", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_MIN_RETRY_INTERVAL_SECS") {
        config.min_retry_interval = Duration::from_secs(parse_env("FLEET_MIN_RETRY_INTERVAL_SECS", "u64", &v)?);
    }
    if let Ok(v) = std::env::var("FLEET_MAX_CONSECUTIVE_FAILURES") {
        config.max_consecutive_failures = parse_env("FLEET_MAX_CONSECUTIVE_FAILURES", "u32", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_MAX_CONSECUTIVE_TIMEOUTS") {
        config.max_consecutive_timeouts = parse_env("FLEET_MAX_CONSECUTIVE_TIMEOUTS", "u32", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_MAX_CONSECUTIVE_TIMEOUTS_FOR_SKIP") {
        config.max_consecutive_timeouts_for_skip =
            parse_env("FLEET_MAX_CONSECUTIVE_TIMEOUTS_FOR_SKIP", "u32", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_REPORT_FAILURE") {
        config.report_failure = parse_env("FLEET_REPORT_FAILURE", "bool", &v)?;
    }
    if let Ok(v) = std::env::var("FLEET_AUTH_PRIVATE_KEY_PATH") {
        config.auth_private_key_path = Some(v);
    }
    if let Ok(v) = std::env::var("FLEET_LOG") {
        config.log_filter = v;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, kind: &'static str, v: &str) -> Result<T, ConfigError> {
    v.parse().map_err(|_| ConfigError::InvalidEnvVar(name, kind, v.to_string()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
