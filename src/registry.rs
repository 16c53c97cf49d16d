//! The publisher feed registry: pure, immutable data describing which feeds
//! a run polls.
//!
//! The registry is constructed explicitly (from config at startup, or
//! directly in tests) and handed to the orchestrator, never read from a
//! module-level constant, so tests can substitute a small registry pointing
//! at a mock server.

use crate::config::PublisherConfig;

/// One publisher and its feed URLs.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Display name, copied verbatim onto every article record.
    pub name: String,
    /// Stable identifier for downstream consumers.
    pub slug: String,
    /// Feed URLs in the order they are processed.
    pub feed_urls: Vec<String>,
}

/// Immutable collection of every publisher a run processes.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    publishers: Vec<FeedConfig>,
}

impl FeedRegistry {
    pub fn new(publishers: Vec<FeedConfig>) -> Self {
        Self { publishers }
    }

    /// Build the registry from the deployment config.
    pub fn from_config(publishers: &[PublisherConfig]) -> Self {
        let publishers = publishers
            .iter()
            .map(|p| FeedConfig {
                name: p.name.clone(),
                slug: p.slug.clone(),
                feed_urls: p.feeds.clone(),
            })
            .collect();
        Self { publishers }
    }

    pub fn publishers(&self) -> &[FeedConfig] {
        &self.publishers
    }

    /// Total number of feed URLs across all publishers.
    pub fn feed_count(&self) -> usize {
        self.publishers.iter().map(|p| p.feed_urls.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}
