//! URL resolution for manifest entries and intercepted requests.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// True for the schemes the worker intercepts.
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolve a manifest path or request URL against the application origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative paths (`./`, `/style.css`) against `origin`
/// 3. Reject non-http(s) schemes
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !is_http(&resolved) {
        return Err(UrlError::UnsupportedScheme(resolved.scheme().to_string()));
    }

    resolved.set_fragment(None);

    Ok(resolved)
}
