//! Assembly of canonical article records from extracted fields.
//!
//! The normalizer owns the record invariants: a usable title, an absolute
//! link, a bounded summary. Items that fail validation are dropped silently;
//! one bad item never rejects the rest of its feed.

use crate::feed::parser::ExtractedItem;
use crate::registry::FeedConfig;
use crate::storage::ArticleRecord;

/// Maximum stored summary length, in characters.
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Build an [`ArticleRecord`] from extracted fields, or reject the item.
///
/// Requires a non-empty trimmed title and an absolute http(s) link; anything
/// else is `None`. The summary is truncated to [`MAX_SUMMARY_CHARS`].
/// Publisher identity and the source feed URL pass through unchanged.
pub fn normalize(
    item: ExtractedItem,
    publisher: &FeedConfig,
    feed_url: &str,
) -> Option<ArticleRecord> {
    let title = item
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();
    let link = item.link.filter(|l| is_absolute_http_url(l))?;

    Some(ArticleRecord {
        publisher: publisher.name.clone(),
        publisher_slug: publisher.slug.clone(),
        source_feed_url: feed_url.to_string(),
        title,
        summary: item.summary.map(|s| truncate_chars(&s, MAX_SUMMARY_CHARS)),
        link,
        image_url: item.image_url,
        published_at: item.published_at,
    })
}

/// True for a parseable URL with an http or https scheme.
fn is_absolute_http_url(link: &str) -> bool {
    url::Url::parse(link)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
