//! One-shot copy of every stored article from the document store into the
//! relational store. URLs already present in the target are skipped.

use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::entities::Article;
use crate::repositories::{ArticleStore, StoreError};

pub const BATCH_SIZE: usize = 100;
pub const BATCH_WORKERS: usize = 5;
const PROGRESS_EVERY: u64 = 1000;

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("reading source articles: {0}")]
    Source(#[source] StoreError),

    #[error("batch [{start}:{end}] failed: {source}")]
    Batch {
        start: usize,
        end: usize,
        #[source]
        source: StoreError,
    },

    #[error("replication cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub processed: u64,
    pub inserted: u64,
}

pub struct Replicator {
    source: Arc<dyn ArticleStore>,
    target: Arc<dyn ArticleStore>,
    batch_size: usize,
    workers: usize,
}

impl Replicator {
    pub fn new(source: Arc<dyn ArticleStore>, target: Arc<dyn ArticleStore>) -> Self {
        Self {
            source,
            target,
            batch_size: BATCH_SIZE,
            workers: BATCH_WORKERS,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, workers: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.workers = workers.max(1);
        self
    }

    /// Copy everything. The first failing batch aborts the run; batches
    /// already committed stay committed.
    #[instrument(skip_all)]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ReplicationReport, ReplicationError> {
        let articles = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReplicationError::Cancelled),
            all = self.source.all_articles() => all.map_err(ReplicationError::Source)?,
        };
        let total = articles.len();
        info!(total, "loaded source articles");

        let mut report = ReplicationReport::default();
        let batches = articles
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, batch)| {
                let start = index * self.batch_size;
                self.copy_batch(cancel, batch, start)
            });

        let mut results = stream::iter(batches).buffer_unordered(self.workers);
        while let Some((processed, inserted)) = results.try_next().await? {
            let before = report.processed;
            report.processed += processed;
            report.inserted += inserted;

            if report.processed / PROGRESS_EVERY > before / PROGRESS_EVERY {
                info!(
                    processed = report.processed,
                    total,
                    inserted = report.inserted,
                    "replication progress"
                );
            }
        }

        info!(
            processed = report.processed,
            inserted = report.inserted,
            "replication complete"
        );
        Ok(report)
    }

    async fn copy_batch(
        &self,
        cancel: &CancellationToken,
        batch: &[Article],
        start: usize,
    ) -> Result<(u64, u64), ReplicationError> {
        let end = start + batch.len();
        let failed = |source| ReplicationError::Batch { start, end, source };

        if cancel.is_cancelled() {
            return Err(ReplicationError::Cancelled);
        }

        let urls: Vec<String> = batch
            .iter()
            .filter(|article| !article.url.is_empty())
            .map(|article| article.url.clone())
            .collect();
        let existing = self.target.existing_among(&urls).await.map_err(failed)?;

        let missing: Vec<Article> = batch
            .iter()
            .filter(|article| !article.url.is_empty() && !existing.contains(&article.url))
            .cloned()
            .collect();
        debug!(start, end, existing = existing.len(), missing = missing.len(), "batch checked");

        if missing.is_empty() {
            return Ok((batch.len() as u64, 0));
        }

        let inserted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReplicationError::Cancelled),
            inserted = self.target.insert_missing(&missing) => inserted.map_err(failed)?,
        };
        debug!(start, end, inserted, "batch inserted");
        Ok((batch.len() as u64, inserted))
    }
}
