//! The ingestion orchestrator.
//!
//! Drives registry → fetch → split → extract → normalize → upsert for every
//! feed URL of every publisher, with bounded concurrency, then purges stale
//! rows once and reports aggregate counts. Failures are contained at the
//! smallest possible scope (a URL, an item, a batch) and never abort the
//! run.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::feed::fetcher::FeedFetcher;
use crate::feed::normalize::normalize;
use crate::feed::parser::{extract_item, split_items};
use crate::registry::{FeedConfig, FeedRegistry};
use crate::storage::{ArticleRecord, Database};

/// Aggregate counters for one orchestration run. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Valid article records observed across all feeds
    pub total: u64,
    /// Records newly persisted this run
    pub inserted: u64,
    /// Records whose link already existed in the store
    pub skipped: u64,
    /// Records lost to persistence failures
    pub errors: u64,
}

impl RunStats {
    fn absorb(&mut self, other: RunStats) {
        self.total += other.total;
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Tunables threaded in from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Age in days past which persisted articles are purged
    pub retention_days: i64,
    /// Number of feeds fetched and processed concurrently
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            retention_days: 90,
            concurrency: 4,
        }
    }
}

/// Run the full ingestion pipeline once.
///
/// Feeds are fully independent, so they run through a bounded worker pool;
/// each worker returns its own counters and the totals are summed after the
/// join, which keeps the aggregation free of shared mutable state. The purge
/// is sequenced strictly after the join since it reads the same table the
/// workers write.
pub async fn run(
    db: &Database,
    fetcher: &FeedFetcher,
    registry: &FeedRegistry,
    options: RunOptions,
) -> RunStats {
    // Owned (publisher, url) pairs so each worker future is independent of a
    // per-item borrow lifetime; this keeps the stream closure general enough
    // to satisfy the axum handler's higher-ranked bounds.
    let work: Vec<(FeedConfig, String)> = registry
        .publishers()
        .iter()
        .flat_map(|p| p.feed_urls.iter().map(move |url| (p.clone(), url.clone())))
        .collect();

    let outcomes: Vec<RunStats> = stream::iter(work)
        .map(|(publisher, url)| async move {
            process_feed(db, fetcher, &publisher, &url).await
        })
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    let mut stats = RunStats::default();
    for outcome in outcomes {
        stats.absorb(outcome);
    }

    // Purge failure is non-fatal: the run still reports success
    let cutoff = Utc::now() - Duration::days(options.retention_days);
    match db.delete_older_than(cutoff).await {
        Ok(purged) if purged > 0 => {
            tracing::info!(purged, retention_days = options.retention_days, "Purged stale articles");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Purge failed");
        }
    }

    tracing::info!(
        total = stats.total,
        inserted = stats.inserted,
        skipped = stats.skipped,
        errors = stats.errors,
        "Ingestion run complete"
    );
    stats
}

/// Process one feed URL end to end, returning its counters.
async fn process_feed(
    db: &Database,
    fetcher: &FeedFetcher,
    publisher: &FeedConfig,
    url: &str,
) -> RunStats {
    // Fetch failures yield zero articles, not errors: the feed simply
    // contributes nothing until the next scheduled run.
    let Some(document) = fetcher.fetch(url).await else {
        return RunStats::default();
    };

    let records: Vec<ArticleRecord> = split_items(&document)
        .into_iter()
        .map(extract_item)
        .filter_map(|item| normalize(item, publisher, url))
        .collect();

    if records.is_empty() {
        tracing::debug!(feed = %url, "No usable items in feed");
        return RunStats::default();
    }

    let total = records.len() as u64;
    match db.upsert_articles(&records).await {
        Ok(inserted) => {
            let inserted = inserted as u64;
            tracing::info!(
                feed = %url,
                publisher = %publisher.slug,
                total,
                inserted,
                "Feed processed"
            );
            RunStats {
                total,
                inserted,
                skipped: total.saturating_sub(inserted),
                errors: 0,
            }
        }
        Err(e) => {
            // No partial-success accounting within a batch
            tracing::warn!(feed = %url, error = %e, "Failed to persist batch");
            RunStats {
                total,
                inserted: 0,
                skipped: 0,
                errors: total,
            }
        }
    }
}
