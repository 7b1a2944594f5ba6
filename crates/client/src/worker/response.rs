//! Responses handed back to intercepted requests.

use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::classify::RequestClass;
use crate::fetch::FetchResponse;
use uninav_core::CachedResponse;

/// 1×1 transparent PNG served for tiles that can't be fetched.
pub const TRANSPARENT_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0, 31, 21, 196,
    137, 0, 0, 0, 12, 73, 68, 65, 84, 120, 156, 99, 96, 0, 0, 0, 2, 0, 1, 226, 33, 189, 167, 0, 0, 0, 0, 73, 69, 78, 68,
    174, 66, 96, 130,
];

/// Body of the 503 returned when neither network nor cache can answer.
pub const OFFLINE_BODY: &str = "Offline and not cached.";

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// The cached offline page, served for a failed navigation.
    Fallback,
    /// The transparent tile image.
    Placeholder,
    /// Synthesized 503.
    Offline,
}

/// The answer to one intercepted request.
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub class: RequestClass,
    pub source: ResponseSource,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RoutedResponse {
    pub fn from_network(class: RequestClass, response: FetchResponse) -> Self {
        Self {
            class,
            source: ResponseSource::Network,
            status: response.status,
            headers: response.header_pairs(),
            content_type: response.content_type,
            body: response.bytes,
        }
    }

    pub fn from_cache(class: RequestClass, source: ResponseSource, cached: CachedResponse) -> Self {
        Self {
            class,
            source,
            status: StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK),
            content_type: cached.content_type,
            headers: cached.headers,
            body: Bytes::from(cached.body),
        }
    }

    pub fn placeholder(class: RequestClass) -> Self {
        Self {
            class,
            source: ResponseSource::Placeholder,
            status: StatusCode::OK,
            content_type: Some("image/png".into()),
            headers: vec![("content-type".into(), "image/png".into())],
            body: Bytes::from_static(TRANSPARENT_PNG),
        }
    }

    pub fn offline(class: RequestClass) -> Self {
        Self {
            class,
            source: ResponseSource::Offline,
            status: StatusCode::SERVICE_UNAVAILABLE,
            content_type: Some("text/plain; charset=utf-8".into()),
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
        }
    }

    /// Body as text when the content type is textual.
    pub fn text(&self) -> Option<String> {
        let content_type = self.content_type.as_deref()?;
        let textual = content_type.starts_with("text/")
            || content_type.contains("json")
            || content_type.contains("javascript")
            || content_type.contains("xml");
        if !textual {
            return None;
        }
        std::str::from_utf8(&self.body).ok().map(str::to_string)
    }
}
