//! URL canonicalization and origin-relative resolution.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string so equal requests produce equal cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    finish(parsed)
}

/// Resolve a manifest or page-relative URL (`/index.html`, `tiles/1/0/0.png`) against `origin`.
///
/// Absolute URLs are canonicalized as-is.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    finish(joined)
}

fn finish(mut parsed: url::Url) -> Result<url::Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("unpkg.com/leaflet/dist/leaflet.js").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("unpkg.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host_and_fragment() {
        let url = canonicalize("https://A.TILE.OpenStreetMap.org/1/0/0.png#x").unwrap();
        assert_eq!(url.as_str(), "https://a.tile.openstreetmap.org/1/0/0.png");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com/app.js?v=3&b=2").unwrap();
        assert_eq!(url.query(), Some("v=3&b=2"));
    }

    #[test]
    fn test_canonicalize_rejects() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve(&origin(), "/").unwrap().as_str(), "http://localhost:8080/");
        assert_eq!(resolve(&origin(), "/index.html").unwrap().as_str(), "http://localhost:8080/index.html");
        assert_eq!(resolve(&origin(), "tiles/3/1/2.png").unwrap().as_str(), "http://localhost:8080/tiles/3/1/2.png");
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve(&origin(), "https://unpkg.com/leaflet/dist/leaflet.css").unwrap();
        assert_eq!(url.as_str(), "https://unpkg.com/leaflet/dist/leaflet.css");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
    }
}
