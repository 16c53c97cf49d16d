//! Tolerant RSS/Atom item scanning.
//!
//! Publisher feeds in the wild mix dialects, omit tags, wrap some fields in
//! CDATA and escape others, and hang metadata off half a dozen namespaces.
//! This module scans raw feed text with layered, best-effort extraction:
//! every probe degrades to the next fallback rather than rejecting the item.
//!
//! The layered fallback order (CDATA before inline text, the alias tag
//! lists, link and image source priority) is the conformance contract for
//! this module; the regex scanning behind it is an implementation detail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Tag aliases probed for the article summary, in order.
const SUMMARY_TAGS: &[&str] = &["description", "content:encoded", "summary", "content"];

/// Tag aliases probed for the publish date, in order.
const DATE_TAGS: &[&str] = &["pubDate", "published", "updated", "dc:date"];

/// Fields pulled out of a single item/entry fragment, before validation.
#[derive(Debug, Clone, Default)]
pub struct ExtractedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Item Splitting
// ============================================================================

/// Split a raw feed document into item-scoped fragments.
///
/// RSS `<item>` blocks are tried first; only if none are found does the
/// scanner fall back to Atom `<entry>` blocks. Order follows the source
/// document. Malformed or unclosed blocks are simply not matched, and an
/// empty or unparseable document yields an empty Vec rather than an error.
pub fn split_items(document: &str) -> Vec<&str> {
    static ITEM_RE: OnceLock<Regex> = OnceLock::new();
    static ENTRY_RE: OnceLock<Regex> = OnceLock::new();

    let item_re =
        ITEM_RE.get_or_init(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item\s*>").unwrap());
    let items: Vec<&str> = item_re
        .captures_iter(document)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !items.is_empty() {
        return items;
    }

    let entry_re =
        ENTRY_RE.get_or_init(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry\s*>").unwrap());
    entry_re
        .captures_iter(document)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

// ============================================================================
// Field Extraction
// ============================================================================

/// Extract every field of interest from one item fragment.
pub fn extract_item(fragment: &str) -> ExtractedItem {
    let published_at = DATE_TAGS
        .iter()
        .find_map(|tag| tag_text(fragment, tag))
        .and_then(|raw| parse_date(&raw));

    ExtractedItem {
        title: tag_text(fragment, "title"),
        link: extract_link(fragment),
        summary: SUMMARY_TAGS.iter().find_map(|tag| tag_text(fragment, tag)),
        image_url: extract_image(fragment),
        published_at,
    }
}

/// Best-effort text content of `tag` within the fragment.
///
/// CDATA-wrapped content is tried first (the common case for publisher
/// feeds), then plain inline content. Either way the text is cleaned:
/// entities unescaped, markup stripped, whitespace collapsed. Returns `None`
/// for a missing tag or one that cleans down to nothing.
pub fn tag_text(fragment: &str, tag: &str) -> Option<String> {
    let t = regex::escape(tag);

    let cdata = Regex::new(&format!(
        r"(?is)<{t}\b[^>]*>\s*<!\[CDATA\[(.*?)\]\]>\s*</{t}\s*>"
    ))
    .ok()?;
    if let Some(c) = cdata.captures(fragment) {
        let text = clean_text(&c[1]);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let plain = Regex::new(&format!(r"(?is)<{t}\b[^>]*>(.*?)</{t}\s*>")).ok()?;
    let c = plain.captures(fragment)?;
    let text = clean_text(&c[1]);
    (!text.is_empty()).then_some(text)
}

/// Resolve the article link: plain `<link>` text, then an attribute-style
/// Atom link, then `<guid>` as a last resort. Only absolute http(s) URLs
/// are accepted.
fn extract_link(fragment: &str) -> Option<String> {
    if let Some(text) = tag_text(fragment, "link") {
        if is_http_url(&text) {
            return Some(text);
        }
    }

    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    let href_re = HREF_RE.get_or_init(|| {
        Regex::new(r#"(?i)<link\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).unwrap()
    });
    if let Some(c) = href_re.captures(fragment) {
        let href = c[1].trim().to_string();
        if is_http_url(&href) {
            return Some(href);
        }
    }

    if let Some(guid) = tag_text(fragment, "guid") {
        if is_http_url(&guid) {
            return Some(guid);
        }
    }

    None
}

/// Resolve the article image, first match wins: `<media:content url>`,
/// `<media:thumbnail url>`, an `<enclosure>` whose type is an image
/// (attribute order independent), then the first inline `<img src>` that
/// does not look like a tracking pixel.
fn extract_image(fragment: &str) -> Option<String> {
    static MEDIA_CONTENT_RE: OnceLock<Regex> = OnceLock::new();
    static MEDIA_THUMB_RE: OnceLock<Regex> = OnceLock::new();
    static ENCLOSURE_RE: OnceLock<Regex> = OnceLock::new();
    static TYPE_ATTR_RE: OnceLock<Regex> = OnceLock::new();
    static URL_ATTR_RE: OnceLock<Regex> = OnceLock::new();
    static IMG_RE: OnceLock<Regex> = OnceLock::new();

    let media_content = MEDIA_CONTENT_RE.get_or_init(|| {
        Regex::new(r#"(?i)<media:content\b[^>]*\burl\s*=\s*["']([^"']+)["']"#).unwrap()
    });
    if let Some(c) = media_content.captures(fragment) {
        return Some(c[1].to_string());
    }

    let media_thumb = MEDIA_THUMB_RE.get_or_init(|| {
        Regex::new(r#"(?i)<media:thumbnail\b[^>]*\burl\s*=\s*["']([^"']+)["']"#).unwrap()
    });
    if let Some(c) = media_thumb.captures(fragment) {
        return Some(c[1].to_string());
    }

    // Enclosures carry url and type in either order, so match the whole tag
    // and probe attributes separately.
    let enclosure_re =
        ENCLOSURE_RE.get_or_init(|| Regex::new(r"(?i)<enclosure\b[^>]*>").unwrap());
    let type_re = TYPE_ATTR_RE
        .get_or_init(|| Regex::new(r#"(?i)\btype\s*=\s*["']image[^"']*["']"#).unwrap());
    let url_re = URL_ATTR_RE
        .get_or_init(|| Regex::new(r#"(?i)\burl\s*=\s*["']([^"']+)["']"#).unwrap());
    for m in enclosure_re.find_iter(fragment) {
        let tag = m.as_str();
        if type_re.is_match(tag) {
            if let Some(c) = url_re.captures(tag) {
                return Some(c[1].to_string());
            }
        }
    }

    let img_re = IMG_RE
        .get_or_init(|| Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());
    img_re
        .captures_iter(fragment)
        .map(|c| c[1].to_string())
        .find(|src| !looks_like_tracking_pixel(src))
}

fn looks_like_tracking_pixel(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("pixel") || lower.contains("tracking")
}

fn is_http_url(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

// ============================================================================
// Date Parsing
// ============================================================================

/// Parse a feed date string into a UTC timestamp.
///
/// RSS uses RFC 2822 (`Mon, 06 Jan 2025 10:00:00 GMT`), Atom and dc:date use
/// RFC 3339 (`2025-01-06T10:00:00Z`); a couple of naive forms show up in
/// feeds that never read either standard. Anything unparsable is `None`;
/// a bad date never rejects the item.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

// ============================================================================
// Text Cleaning
// ============================================================================

/// Clean raw tag content into plain text.
///
/// Entities are unescaped before markup is stripped, so entity-escaped HTML
/// (`&lt;p&gt;…`) and CDATA-wrapped HTML normalize to the same text.
fn clean_text(raw: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static WS_RE: OnceLock<Regex> = OnceLock::new();

    let unescaped = unescape_entities(raw);
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let stripped = tag_re.replace_all(&unescaped, " ");
    // \s is Unicode-aware, so literal non-breaking spaces collapse too
    let ws_re = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    ws_re.replace_all(&stripped, " ").trim().to_string()
}

/// Unescape the five common HTML entities plus `&nbsp;`.
///
/// `&amp;` is replaced last so already-escaped entities (`&amp;lt;`) come out
/// as their literal text instead of double-decoding.
fn unescape_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

// ============================================================================
// Tests
// ============================================================================
