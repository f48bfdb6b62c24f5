use bytes::Bytes;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use reqwest::StatusCode;
use url::Url;

/// Character encoding a response body was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    pub fn from_encoding(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }

    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.0
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

#[derive(Debug)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub body_raw: Bytes,
    pub body_utf8: String,
    pub charset: Charset,
    pub fetched_at: DateTime<Utc>,
}

/// An undecoded response body.
#[derive(Debug, Clone)]
pub struct Download {
    pub url_final: Url,
    /// `Content-Type` header, `text/html` when absent.
    pub content_type: String,
    pub body: Bytes,
}
