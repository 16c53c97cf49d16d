use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors surfaced at startup.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// Canonical article unit produced by the normalizer and handed to the sink.
///
/// Constructed fresh on every run from raw feed content; never mutated after
/// normalization. `link` is the dedup key: the store keeps at most one row
/// per link value no matter how often a feed is re-fetched.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub publisher: String,
    pub publisher_slug: String,
    pub source_feed_url: String,
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Row read back from the articles table.
///
/// Timestamps are epoch seconds as stored; `ingested_at` is set at insert
/// time and doubles as the purge fallback for rows with no parseable
/// publish date.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub publisher: String,
    pub publisher_slug: String,
    pub source_feed_url: String,
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub published_at: Option<i64>,
    pub ingested_at: i64,
}
