use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{ArticleRecord, StoredArticle};

impl Database {
    // ========================================================================
    // Dedup/Upsert Sink
    // ========================================================================

    /// Insert-if-absent by link; returns the number of newly inserted rows.
    ///
    /// The whole batch runs in a single transaction so a failed call leaves
    /// the store unchanged. `INSERT OR IGNORE` keyed on the `link` UNIQUE
    /// constraint makes re-ingestion idempotent: the store, not the caller,
    /// decides which links already exist, and the caller derives
    /// `skipped = batch - inserted` from the returned count.
    ///
    /// Batch size of 50 keeps us well under SQLite's 999 bind parameter
    /// limit (9 columns * 50 = 450). The insert count is read back via
    /// `changes()` instead of before/after COUNT scans.
    pub async fn upsert_articles(&self, records: &[ArticleRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        const BATCH_SIZE: usize = 50;
        let mut total_inserted: usize = 0;

        for chunk in records.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO articles \
                 (publisher, publisher_slug, source_feed_url, title, summary, link, image_url, published_at, ingested_at) ",
            );

            builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.publisher)
                    .push_bind(&record.publisher_slug)
                    .push_bind(&record.source_feed_url)
                    .push_bind(&record.title)
                    .push_bind(&record.summary)
                    .push_bind(&record.link)
                    .push_bind(&record.image_url)
                    .push_bind(record.published_at.map(|dt| dt.timestamp()))
                    .push_bind(now);
            });

            builder.build().execute(&mut *tx).await?;

            let changes: (i64,) = sqlx::query_as("SELECT changes()")
                .fetch_one(&mut *tx)
                .await?;
            total_inserted += changes.0 as usize;
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    // ========================================================================
    // Purge
    // ========================================================================

    /// Delete articles older than the cutoff; returns the number removed.
    ///
    /// Rows with no publish date fall back to their ingestion timestamp, so
    /// unparsable-date articles cannot accumulate forever. The comparison is
    /// strict: a row exactly at the cutoff is retained.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM articles WHERE COALESCE(published_at, ingested_at) < ?")
                .bind(cutoff.timestamp())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a single article by its link (the dedup key).
    pub async fn get_article_by_link(&self, link: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query_as::<_, StoredArticle>(
            r#"
            SELECT id, publisher, publisher_slug, source_feed_url, title,
                   summary, link, image_url, published_at, ingested_at
            FROM articles
            WHERE link = ?
        "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Total number of persisted articles.
    pub async fn count_articles(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
