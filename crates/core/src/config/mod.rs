//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (QRSW_*)
//! 2. TOML config file (if QRSW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (QRSW_*)
/// 2. TOML config file (if QRSW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every named cache.
    ///
    /// Set via QRSW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application is served from; relative manifest paths
    /// resolve against it.
    ///
    /// Set via QRSW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every cache this application owns.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag; bumping it makes every existing cache stale.
    ///
    /// Set via QRSW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Files stored in the static cache at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Subset of the manifest re-fetched on periodic refresh.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Hosts whose responses go to the CDN cache.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,

    /// Path suffixes treated as static files.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Path segments that mark API requests.
    #[serde(default = "default_api_segments")]
    pub api_segments: Vec<String>,

    /// Entry cap for the dynamic cache.
    ///
    /// Set via QRSW_DYNAMIC_CACHE_LIMIT environment variable.
    #[serde(default = "default_dynamic_cache_limit")]
    pub dynamic_cache_limit: usize,

    /// User-Agent string for network requests.
    ///
    /// Set via QRSW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via QRSW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to accept per response.
    ///
    /// Set via QRSW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Title of push notifications.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Body of push notifications that arrive without a payload.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./qr-offline-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_prefix() -> String {
    "qr-generator-".into()
}

fn default_version() -> String {
    "v2.0.0".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./style.css",
        "./script.js",
        "./manifest.json",
        "https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_critical_assets() -> Vec<String> {
    ["./", "./index.html", "https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cdn_hosts() -> Vec<String> {
    vec!["cdn.jsdelivr.net".into(), "cdnjs.cloudflare.com".into()]
}

fn default_static_extensions() -> Vec<String> {
    vec![".css".into(), ".js".into(), ".html".into()]
}

fn default_api_segments() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_dynamic_cache_limit() -> usize {
    50
}

fn default_user_agent() -> String {
    "qr-offline/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_notification_title() -> String {
    "QR Code Generator".into()
}

fn default_notification_body() -> String {
    "QR Code Generator update available!".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            static_assets: default_static_assets(),
            critical_assets: default_critical_assets(),
            cdn_hosts: default_cdn_hosts(),
            static_extensions: default_static_extensions(),
            api_segments: default_api_segments(),
            dynamic_cache_limit: default_dynamic_cache_limit(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `QRSW_`
    /// 2. TOML file from `QRSW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("QRSW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("QRSW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
