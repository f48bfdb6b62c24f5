use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::entities::{Article, PodcastTranscript};
use crate::repositories::{ArticleStore, StoreError, TranscriptStore, validate, validate_transcript};

/// In-process store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    articles: DashMap<String, Article>,
    transcripts: DashMap<String, PodcastTranscript>,
    saves: AtomicU64,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let store = Self::new();
        for article in articles {
            store.articles.insert(article.url.clone(), article);
        }
        store
    }

    pub fn get(&self, url: &str) -> Option<Article> {
        self.articles.get(url).map(|entry| entry.value().clone())
    }

    /// Number of `save` calls, including overwrites.
    pub fn save_calls(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> HashSet<String> {
        self.articles.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn transcript(&self, url: &str) -> Option<PodcastTranscript> {
        self.transcripts.get(url).map(|entry| entry.value().clone())
    }

    pub fn transcript_count(&self) -> usize {
        self.transcripts.len()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        validate(article)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.articles.insert(article.url.clone(), article.clone());
        Ok(())
    }

    async fn insert_missing(&self, articles: &[Article]) -> Result<u64, StoreError> {
        for article in articles {
            validate(article)?;
        }

        let mut inserted = 0;
        for article in articles {
            if let Entry::Vacant(slot) = self.articles.entry(article.url.clone()) {
                slot.insert(article.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.urls())
    }

    async fn existing_among(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        Ok(urls
            .iter()
            .filter(|url| self.articles.contains_key(url.as_str()))
            .cloned()
            .collect())
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        articles.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(articles)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.articles.len() as u64)
    }
}

#[async_trait]
impl TranscriptStore for MemoryArticleStore {
    async fn save_transcript(&self, transcript: &PodcastTranscript) -> Result<(), StoreError> {
        validate_transcript(transcript)?;
        self.transcripts
            .insert(transcript.url.clone(), transcript.clone());
        Ok(())
    }

    async fn existing_transcripts(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        Ok(urls
            .iter()
            .filter(|url| self.transcripts.contains_key(url.as_str()))
            .cloned()
            .collect())
    }
}
