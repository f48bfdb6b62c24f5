use async_trait::async_trait;
use sqlx::{
    QueryBuilder, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{collections::HashSet, str::FromStr};
use tracing::{debug, instrument};

use crate::entities::{Article, PodcastTranscript};
use crate::repositories::{ArticleStore, StoreError, TranscriptStore, validate, validate_transcript};

/// Document store backed by a SQLite file (`articles` table).
#[derive(Debug, Clone)]
pub struct SqliteArticleStore {
    pool: SqlitePool,
}

impl SqliteArticleStore {
    /// Open (creating if needed) the database at `url` and apply migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ArticleStore for SqliteArticleStore {
    #[instrument(skip_all, fields(url = %article.url))]
    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        validate(article)?;

        sqlx::query(
            r#"
            INSERT INTO articles (url, title, text, crawled_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (url) DO UPDATE
              SET title      = excluded.title,
                  text       = excluded.text,
                  crawled_at = excluded.crawled_at
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
                INSERT INTO articles (url, title, text, crawled_at)
                VALUES (?, ?, ?, ?)
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
        let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM articles")
            .fetch_all(&self.pool)
            .await?;
        Ok(urls.into_iter().collect())
    }

    async fn existing_among(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT url FROM articles WHERE url IN (");
        let mut separated = query.separated(", ");
        for url in urls {
            separated.push_bind(url.as_str());
        }
        separated.push_unseparated(")");

        let found: Vec<String> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(found.into_iter().collect())
    }

    async fn all_articles(&self) -> Result<Vec<Article>, StoreError> {
        let articles = sqlx::query_as::<_, Article>(
            "SELECT url, title, text, crawled_at FROM articles ORDER BY url",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl TranscriptStore for SqliteArticleStore {
    #[instrument(skip_all, fields(url = %transcript.url))]
    async fn save_transcript(&self, transcript: &PodcastTranscript) -> Result<(), StoreError> {
        validate_transcript(transcript)?;

        sqlx::query(
            r#"
            INSERT INTO podcast_transcripts
              (url, title, page_content, transcript, transcript_url, crawled_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (url) DO UPDATE
              SET title          = excluded.title,
                  page_content   = excluded.page_content,
                  transcript     = excluded.transcript,
                  transcript_url = excluded.transcript_url,
                  crawled_at     = excluded.crawled_at
            "#,
        )
        .bind(&transcript.url)
        .bind(&transcript.title)
        .bind(&transcript.page_content)
        .bind(&transcript.transcript)
        .bind(transcript.transcript_url.as_deref())
        .bind(transcript.crawled_at)
        .execute(&self.pool)
        .await?;

        debug!("transcript saved");
        Ok(())
    }

    async fn existing_transcripts(&self, urls: &[String]) -> Result<HashSet<String>, StoreError> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT url FROM podcast_transcripts WHERE url IN (");
        let mut separated = query.separated(", ");
        for url in urls {
            separated.push_bind(url.as_str());
        }
        separated.push_unseparated(")");

        let found: Vec<String> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;
        Ok(found.into_iter().collect())
    }
}
