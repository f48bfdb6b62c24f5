pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryArticleStore;
pub use postgres::PgArticleStore;
pub use sqlite::SqliteArticleStore;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::entities::{Article, PodcastTranscript};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid article: {0}")]
    InvalidArticle(String),

    #[error("store operation cancelled")]
    Cancelled,
}

/// Persistence for articles, keyed by URL.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert or replace the article with the same URL.
    async fn save(&self, article: &Article) -> Result<(), StoreError>;

    /// Insert the articles whose URL is not stored yet, atomically. Returns
    /// how many rows were written.
    async fn insert_missing(&self, articles: &[Article]) -> Result<u64, StoreError>;

    async fn existing_urls(&self) -> Result<HashSet<String>, StoreError>;

    /// The subset of `urls` already stored.
    async fn existing_among(&self, urls: &[String]) -> Result<HashSet<String>, StoreError>;

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Persistence for podcast transcripts, keyed by episode URL.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Insert or replace the transcript of the same episode.
    async fn save_transcript(&self, transcript: &PodcastTranscript) -> Result<(), StoreError>;

    /// The subset of episode `urls` that already have a record.
    async fn existing_transcripts(&self, urls: &[String]) -> Result<HashSet<String>, StoreError>;
}

pub(crate) fn validate(article: &Article) -> Result<(), StoreError> {
    if article.url.trim().is_empty() {
        return Err(StoreError::InvalidArticle("empty url".into()));
    }
    Ok(())
}

pub(crate) fn validate_transcript(transcript: &PodcastTranscript) -> Result<(), StoreError> {
    if transcript.url.trim().is_empty() {
        return Err(StoreError::InvalidArticle("empty episode url".into()));
    }
    Ok(())
}
