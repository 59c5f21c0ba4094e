//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ClientError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables prefixed with DASHBOARD_ (e.g. DASHBOARD_API__BASE_URL)
/// 2. Environment variables prefixed with APP_ (e.g. APP__REALTIME__ROOM)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder.add_source(
        Environment::with_prefix("DASHBOARD")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("realtime.subscriptions")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))
}

/// Load configuration from a handful of explicit environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::default();

    if let Ok(url) = std::env::var("DASHBOARD_API_URL") {
        config.api.base_url = url;
    }
    if let Ok(timeout) = std::env::var("DASHBOARD_API_TIMEOUT") {
        config.api.timeout_seconds = timeout.parse().map_err(|e| {
            ClientError::Configuration(format!("DASHBOARD_API_TIMEOUT: {}", e))
        })?;
    }
    config.api.token = std::env::var("DASHBOARD_TOKEN").ok();
    if let Ok(url) = std::env::var("DASHBOARD_WS_URL") {
        config.realtime.websocket_url = url;
    }
    if let Ok(codes) = std::env::var("DASHBOARD_SUBSCRIPTIONS") {
        config.realtime.subscriptions = split_codes(&codes);
    }

    Ok(config)
}

/// Split a comma-separated ticker list, dropping blanks
pub fn split_codes(codes: &str) -> Vec<String> {
    codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
