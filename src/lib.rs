//! Publisher feed ingestion pipeline.
//!
//! Polls a registry of heterogeneous RSS/Atom feeds, extracts article
//! records from loosely-specified XML with layered best-effort scanning,
//! deduplicates them against a SQLite store keyed by article link, and
//! prunes rows past the retention window. Triggered over HTTP by an
//! external scheduler; see [`server`] for the endpoint contract.

pub mod config;
pub mod feed;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod storage;
