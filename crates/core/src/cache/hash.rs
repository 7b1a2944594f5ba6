//! Request keys for cache entries.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the cache key for a request: SHA-256 over method and full URL.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// URL with query and fragment removed, used for `ignore_search` matching.
pub fn strip_search(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped.to_string()
}
