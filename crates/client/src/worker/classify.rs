//! Request classification.
//!
//! A request falls into exactly one class. Rules run in order and the
//! first match wins:
//!
//! 1. **Static**: URL is in the install manifest, or its path ends with a static extension.
//! 2. **Cdn**: host is on the CDN allowlist.
//! 3. **Api**: path contains an API segment, or the method is not GET.
//! 4. **Other**: everything else (navigations, dynamic content).

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use super::config::CacheRole;
use super::strategy::Strategy;
use crate::fetch::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    Static,
    Cdn,
    Api,
    Other,
}

impl RequestClass {
    /// Strategy that serves this class.
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Static | RequestClass::Cdn => Strategy::CacheFirst,
            RequestClass::Api => Strategy::NetworkFirst,
            RequestClass::Other => Strategy::StaleWhileRevalidate,
        }
    }

    /// Cache this class reads from and writes to.
    pub fn cache_role(self) -> CacheRole {
        match self {
            RequestClass::Static => CacheRole::Static,
            RequestClass::Cdn => CacheRole::Cdn,
            RequestClass::Api | RequestClass::Other => CacheRole::Dynamic,
        }
    }
}

/// Predicate table driving `classify`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierTable {
    /// Resolved install manifest.
    pub manifest: Vec<Url>,
    /// Path suffixes such as `.css`.
    pub static_extensions: Vec<String>,
    /// Lowercase host names.
    pub cdn_hosts: Vec<String>,
    /// Path fragments such as `/api/`.
    pub api_segments: Vec<String>,
}

impl ClassifierTable {
    pub fn classify(&self, request: &Request) -> RequestClass {
        if self.in_manifest(&request.url) || self.has_static_extension(&request.url) {
            RequestClass::Static
        } else if self.is_cdn_host(&request.url) {
            RequestClass::Cdn
        } else if self.has_api_segment(&request.url) || request.method != Method::GET {
            RequestClass::Api
        } else {
            RequestClass::Other
        }
    }

    fn in_manifest(&self, url: &Url) -> bool {
        let without_fragment = &url[..Position::AfterQuery];
        self.manifest.iter().any(|asset| asset.as_str() == without_fragment)
    }

    fn has_static_extension(&self, url: &Url) -> bool {
        let path = url.path();
        self.static_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    fn is_cdn_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.cdn_hosts.iter().any(|cdn| cdn.eq_ignore_ascii_case(host)))
    }

    fn has_api_segment(&self, url: &Url) -> bool {
        let path = url.path();
        self.api_segments.iter().any(|segment| path.contains(segment.as_str()))
    }
}
