//! Bounded-time feed fetching.
//!
//! One best-effort GET per feed URL. Every failure mode (network error,
//! non-2xx status, timeout, oversized body) collapses to "no content for
//! this URL" with a structured warning, so a single bad feed can never
//! abort an ingestion run. There is deliberately no retry or backoff; a
//! failed feed waits for the next scheduled run.

use anyhow::Result;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Maximum accepted response body (10MB).
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024;

/// Identifying client header sent with every fetch.
const USER_AGENT: &str = concat!("newswire/", env!("CARGO_PKG_VERSION"), " (feed ingestion)");

/// Media types we ask feed servers for.
const ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8";

/// Errors that can occur while fetching a single feed.
///
/// These stay internal to the fetch scope: callers observe them only as an
/// absent document plus a log line.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-feed timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// HTTP fetcher shared across all feeds of a run.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl FeedFetcher {
    /// Build a fetcher with the given per-request timeout in seconds.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Fetch the raw feed document, or nothing.
    ///
    /// Failures are logged with the feed URL and never propagate; the
    /// orchestrator treats `None` as a zero-article feed and moves on.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Feed fetch failed");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .get(url)
                .header(reqwest::header::ACCEPT, ACCEPT)
                .send(),
        )
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        // Feeds occasionally lie about their encoding; lossy decoding keeps
        // the rest of the document usable.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
