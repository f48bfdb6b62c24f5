use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::entities::Article;
use crate::repositories::{ArticleStore, StoreError, validate};

/// Relational replica (`article` table).
#[derive(Debug, Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    /// Connect to `dsn` and make sure the schema exists.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    #[instrument(skip_all, fields(url = %article.url))]
    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        validate(article)?;

        sqlx::query(
            r#"
            INSERT INTO article (url, title, text, crawled_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (url) DO UPDATE
              SET title      = EXCLUDED.title,
                  text       = EXCLUDED.text,
                  crawled_at = EXCLUDED.crawled_at
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.text)
        .bind(article.crawled_at)
        .execute(&self.pool)
        .await?;

        debug!("article upserted");
        Ok(())
    }

    #[instrument(skip_all, fields(batch = articles.len()))]
    async fn insert_missing(&self, articles: &[Article]) -> Result<u64, StoreError> {
        for article in articles {
            validate(article)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT INTO article (url, title, text, crawled_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (url) DO NOTHING
                "#,
            )
            .bind(&article.url)
            .bind(&article.title)
            .bind(&article.text)
            .bind(article.crawled_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StoreError> {
        let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM article")
            .fetch_all(&self.pool)
            .await?;
        Ok(urls.into_iter().collect())
    }

    async fn existing_among(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<String> = sqlx::query_scalar("SELECT url FROM article WHERE url = ANY($1)")
            .bind(urls)
            .fetch_all(&self.pool)
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        let articles = sqlx::query_as::<_, Article>(
            "SELECT url, title, text, crawled_at FROM article ORDER BY url",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Option<PgArticleStore> {
        let dsn = std::env::var("TEST_DATABASE_URL").ok()?;
        let store = PgArticleStore::connect(&dsn).await.unwrap();
        sqlx::query("TRUNCATE article").execute(&store.pool).await.unwrap();
        Some(store)
    }

    #[tokio::test]
    async fn upsert_and_insert_missing() {
        let Some(store) = store().await else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return;
        };

        store.save(&Article::new("https://ex.com/a", "v1", "")).await.unwrap();
        store.save(&Article::new("https://ex.com/a", "v2", "")).await.unwrap();
        let inserted = store
            .insert_missing(&[
                Article::new("https://ex.com/a", "ignored", ""),
                Article::new("https://ex.com/b", "b", ""),
            ])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.count().await.unwrap(), 2);
        let among = store
            .existing_among(&["https://ex.com/b".into(), "https://ex.com/z".into()])
            .await
            .unwrap();
        assert_eq!(among, HashSet::from(["https://ex.com/b".to_string()]));
    }
}
