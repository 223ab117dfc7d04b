//! Per-instance worker configuration and cache naming.

use std::fmt;

use qrsw_core::{AppConfig, Error};
use serde::{Deserialize, Serialize};
use url::Url;

use super::classify::ClassifierTable;
use crate::fetch::resolve;

/// The three caches every worker version owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheRole {
    Static,
    Dynamic,
    Cdn,
}

impl CacheRole {
    pub const ALL: [CacheRole; 3] = [CacheRole::Static, CacheRole::Dynamic, CacheRole::Cdn];

    pub fn suffix(self) -> &'static str {
        match self {
            CacheRole::Static => "static",
            CacheRole::Dynamic => "dynamic",
            CacheRole::Cdn => "cdn",
        }
    }
}

impl fmt::Display for CacheRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Everything one worker version needs to know, resolved and validated.
///
/// Two instances with different versions can share one `CacheDb`; their
/// cache names never collide.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Application root; notification clicks open it.
    pub root: Url,
    pub cache_prefix: String,
    pub version: String,
    /// Install manifest, in order.
    pub static_assets: Vec<Url>,
    /// Re-fetched on periodic refresh.
    pub critical_assets: Vec<Url>,
    pub dynamic_cache_limit: usize,
    pub classifier: ClassifierTable,
    pub notification_title: String,
    pub notification_body: String,
}

impl WorkerConfig {
    /// Resolve an `AppConfig` against its origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let resolve_all = |paths: &[String]| -> Result<Vec<Url>, Error> {
            paths
                .iter()
                .map(|path| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
                .collect()
        };

        let root = resolve(&origin, "./").map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let static_assets = resolve_all(&config.static_assets)?;
        let critical_assets = resolve_all(&config.critical_assets)?;

        let classifier = ClassifierTable {
            manifest: static_assets.clone(),
            static_extensions: config.static_extensions.clone(),
            cdn_hosts: config.cdn_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            api_segments: config.api_segments.clone(),
        };

        Ok(Self {
            root,
            cache_prefix: config.cache_prefix.clone(),
            version: config.version.clone(),
            static_assets,
            critical_assets,
            dynamic_cache_limit: config.dynamic_cache_limit,
            classifier,
            notification_title: config.notification_title.clone(),
            notification_body: config.notification_body.clone(),
        })
    }

    /// `<prefix><version>-<role>`, e.g. `qr-generator-v2.0.0-static`.
    pub fn cache_name(&self, role: CacheRole) -> String {
        format!("{}{}-{}", self.cache_prefix, self.version, role.suffix())
    }

    /// Names of this version's three role caches.
    pub fn current_caches(&self) -> Vec<String> {
        CacheRole::ALL.iter().map(|role| self.cache_name(*role)).collect()
    }

    /// True if the cache belongs to this application, any version.
    pub fn owns(&self, cache_name: &str) -> bool {
        cache_name.starts_with(&self.cache_prefix)
    }

    /// Entry cap for a cache, if it has one. Only the dynamic cache is bounded.
    pub fn limit_for(&self, cache_name: &str) -> Option<usize> {
        (cache_name == self.cache_name(CacheRole::Dynamic)).then_some(self.dynamic_cache_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkerConfig {
        WorkerConfig::from_app(&AppConfig { origin: "https://qr.example.com/".into(), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_cache_names() {
        let config = config();
        assert_eq!(config.cache_name(CacheRole::Static), "qr-generator-v2.0.0-static");
        assert_eq!(config.cache_name(CacheRole::Dynamic), "qr-generator-v2.0.0-dynamic");
        assert_eq!(config.cache_name(CacheRole::Cdn), "qr-generator-v2.0.0-cdn");
        assert_eq!(config.current_caches().len(), 3);
    }

    #[test]
    fn test_owns_any_version() {
        let config = config();
        assert!(config.owns("qr-generator-v1.0.0-static"));
        assert!(config.owns("qr-generator-v2.0.0-dynamic"));
        assert!(!config.owns("another-app-v1-static"));
    }

    #[test]
    fn test_only_dynamic_is_bounded() {
        let config = config();
        assert_eq!(config.limit_for("qr-generator-v2.0.0-dynamic"), Some(50));
        assert_eq!(config.limit_for("qr-generator-v2.0.0-static"), None);
        assert_eq!(config.limit_for("qr-generator-v2.0.0-cdn"), None);
        assert_eq!(config.limit_for("qr-generator-v1.0.0-dynamic"), None);
    }

    #[test]
    fn test_manifest_resolved_against_origin() {
        let config = config();
        assert_eq!(config.root.as_str(), "https://qr.example.com/");
        assert_eq!(config.static_assets[0].as_str(), "https://qr.example.com/");
        assert_eq!(config.static_assets[1].as_str(), "https://qr.example.com/index.html");
        assert_eq!(
            config.static_assets[5].as_str(),
            "https://cdn.jsdelivr.net/npm/qrcode/build/qrcode.min.js"
        );
        assert_eq!(config.classifier.manifest, config.static_assets);
    }

    #[test]
    fn test_invalid_asset_rejected() {
        let app = AppConfig { static_assets: vec!["javascript:alert(1)".into()], ..Default::default() };
        assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }
}
