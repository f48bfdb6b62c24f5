use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// --- Pipeline payloads ---

/// A discovered link travelling between pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UrlRef {
    pub location: String,
    pub title: Option<String>,
}

impl UrlRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            title: None,
        }
    }

    pub fn titled(location: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            location: location.into(),
            title: (!title.trim().is_empty()).then_some(title),
        }
    }
}

/// --- Tables ---

/// Persisted article, unique by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub text: String,
    pub crawled_at: DateTime<Utc>,
}

impl Article {
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text: text.into(),
            crawled_at: Utc::now(),
        }
    }
}

/// Episode page of a podcast plus the transcript it links to. Unique by
/// the episode `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PodcastTranscript {
    pub url: String,
    pub title: String,
    pub page_content: String,
    /// Empty when no transcript could be downloaded or read.
    pub transcript: String,
    pub transcript_url: Option<String>,
    pub crawled_at: DateTime<Utc>,
}
