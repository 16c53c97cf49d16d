//! Feed handling: fetching, item scanning, and record assembly.
//!
//! The module is organized into three submodules:
//!
//! - [`fetcher`] - Bounded-time HTTP retrieval, one best-effort attempt per feed
//! - [`parser`] - Tolerant document → items → fields scanning across RSS/Atom dialects
//! - [`normalize`] - Validation and assembly of canonical article records
//!
//! The parser deliberately exposes a small surface (`split_items`,
//! `extract_item`) so the scanning strategy can be replaced with a streaming
//! XML parser without touching the normalizer or the storage contracts.

pub mod fetcher;
pub mod normalize;
pub mod parser;

pub use fetcher::FeedFetcher;
