//! Network access for the worker.
//!
//! ### Request model
//! - A `Request` is the descriptor of one intercepted page request:
//!   method, absolute URL, whether it is a navigation, and an optional body.
//!
//! ### Network seam
//! - Strategies only see the `Network` trait. `FetchClient` is the reqwest
//!   implementation; tests substitute scripted networks.
//! - `Ok` means the network produced a response of any status. `Err` means
//!   no response at all (offline, DNS failure, reset, timeout).

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use reqwest::Method;

pub use self::url::{UrlError, is_http, resolve};

use qrsw_core::{AppConfig, Error, ResponsePayload};

/// Accept header sent with navigations.
const NAVIGATE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Descriptor of one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: ::url::Url,
    pub method: Method,
    pub navigational: bool,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: ::url::Url) -> Self {
        Self { url, method, navigational: false, body: None }
    }

    /// A plain GET, as issued for scripts, styles and manifest assets.
    pub fn get(url: ::url::Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level navigation.
    pub fn navigate(url: ::url::Url) -> Self {
        Self { navigational: true, ..Self::get(url) }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Only safe reads are ever written to a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a single attempt; no retries.
    ///
    /// A body over the size limit is `FetchTooLarge`, which the strategies
    /// handle like an unreachable network.
    async fn fetch(&self, request: &Request) -> Result<ResponsePayload, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "qr-offline/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "qr-offline/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<ResponsePayload, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.as_str());
        if request.navigational {
            builder = builder.header(header::ACCEPT, NAVIGATE_ACCEPT);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout: {}", request.url))
            } else {
                Error::Network(format!("{}: {}", request.url, e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(ResponsePayload {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "qr-offline/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_request_constructors() {
        let url = ::url::Url::parse("https://example.com/").unwrap();
        let nav = Request::navigate(url.clone());
        assert!(nav.navigational);
        assert!(nav.is_cacheable());

        let post = Request::new(Method::POST, url).with_body("{}");
        assert!(!post.is_cacheable());
        assert_eq!(post.body.as_deref(), Some(b"{}".as_slice()));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let config = FetchConfig { timeout: Duration::from_millis(500), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/unreachable").unwrap());

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
