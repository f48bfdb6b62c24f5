use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::entities::{Article, UrlRef};
use crate::pipeline::errors::ProcessError;
use crate::repositories::StoreError;
use crate::urls::SourceError;

/// First-stage producer that needs no input URL; its configuration is bound
/// at construction.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, cancel: &CancellationToken) -> Result<Vec<UrlRef>, SourceError>;
}

/// Turns one URL into zero or more URLs. Called once with the base URL at
/// the first stage, once per input URL at later stages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<UrlRef>, SourceError>;
}

/// Fetches one article page and extracts an [`Article`] from it.
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    async fn process(&self, cancel: &CancellationToken, url: &str) -> Result<Article, ProcessError>;
}

#[async_trait]
pub trait ContentSaver: Send + Sync {
    async fn save(&self, cancel: &CancellationToken, article: &Article) -> Result<(), StoreError>;
}
