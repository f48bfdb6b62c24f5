use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use blogharvest::{
    entities::Article,
    replication::{ReplicationError, ReplicationReport, Replicator},
    repositories::{ArticleStore, MemoryArticleStore, PgArticleStore, SqliteArticleStore, StoreError},
};
use tokio_util::sync::CancellationToken;

fn articles(count: usize) -> Vec<Article> {
    (0..count)
        .map(|i| Article::new(format!("https://ex.com/post-{i}"), format!("Post {i}"), "body"))
        .collect()
}

async fn sqlite_with(count: usize) -> SqliteArticleStore {
    let store = SqliteArticleStore::connect("sqlite::memory:").await.unwrap();
    for article in articles(count) {
        store.save(&article).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_replicates_sqlite_into_target() {
    let source = Arc::new(sqlite_with(1234).await);
    let target = Arc::new(MemoryArticleStore::with_articles(articles(34)));

    let report = Replicator::new(source, target.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report,
        ReplicationReport {
            processed: 1234,
            inserted: 1200,
        }
    );
    assert_eq!(target.count().await.unwrap(), 1234);
    assert_eq!(target.get("https://ex.com/post-1000").unwrap().title, "Post 1000");
}

/// Target whose writes always fail.
struct ReadOnly(MemoryArticleStore);

#[async_trait]
impl ArticleStore for ReadOnly {
    async fn save(&self, _: &Article) -> Result<(), StoreError> {
        Err(StoreError::InvalidArticle("read only".into()))
    }

    async fn insert_missing(&self, _: &[Article]) -> Result<u64, StoreError> {
        Err(StoreError::InvalidArticle("read only".into()))
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StoreError> {
        self.0.existing_urls().await
    }

    async fn existing_among(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        self.0.existing_among(urls).await
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        self.0.all_articles().await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.0.count().await
    }
}

#[tokio::test]
async fn test_first_failing_batch_aborts() {
    let source = Arc::new(MemoryArticleStore::with_articles(articles(300)));
    let target = Arc::new(ReadOnly(MemoryArticleStore::new()));

    let result = Replicator::new(source, target).run(&CancellationToken::new()).await;

    assert!(matches!(result, Err(ReplicationError::Batch { .. })), "{result:?}");
}

#[tokio::test]
async fn test_fully_replicated_target_gets_no_writes() {
    let source = Arc::new(MemoryArticleStore::with_articles(articles(150)));
    let target = Arc::new(ReadOnly(MemoryArticleStore::with_articles(articles(150))));

    let report = Replicator::new(source, target)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(report.processed, 150);
}

#[tokio::test]
async fn test_replicates_into_postgres() {
    let Ok(dsn) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let target = PgArticleStore::connect(&dsn).await.unwrap();
    let before = target.existing_among(&articles(120).into_iter().map(|a| a.url).collect::<Vec<_>>())
        .await
        .unwrap();

    let source = Arc::new(sqlite_with(120).await);
    let report = Replicator::new(source, Arc::new(target))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 120);
    assert_eq!(report.inserted, 120 - before.len() as u64);
}
