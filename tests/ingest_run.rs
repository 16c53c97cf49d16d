//! End-to-end ingestion scenarios: mock feed servers in front of the full
//! fetch → split → extract → normalize → upsert → purge pipeline.
//!
//! Each test creates its own in-memory SQLite database and wiremock server
//! for isolation.

use chrono::{Duration, Utc};
use newswire::feed::FeedFetcher;
use newswire::ingest::{self, RunOptions};
use newswire::registry::{FeedConfig, FeedRegistry};
use newswire::storage::{ArticleRecord, Database};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn fetcher() -> FeedFetcher {
    FeedFetcher::new(5).unwrap()
}

fn options() -> RunOptions {
    RunOptions {
        retention_days: 90,
        concurrency: 4,
    }
}

fn registry_for(feed_urls: Vec<String>) -> FeedRegistry {
    FeedRegistry::new(vec![FeedConfig {
        name: "The Gazette".to_string(),
        slug: "gazette".to_string(),
        feed_urls,
    }])
}

async fn mount_feed(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Extraction and Counting Scenarios
// ============================================================================

const THREE_ITEMS_ONE_UNTITLED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>The Gazette</title>
    <item>
      <title>First story</title>
      <link>https://gazette.example/stories/1</link>
      <description>Alpha</description>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <link>https://gazette.example/stories/2</link>
      <description>No title on this one</description>
    </item>
    <item>
      <title>Third story</title>
      <link>https://gazette.example/stories/3</link>
    </item>
  </channel>
</rss>"#;

#[tokio::test]
async fn test_run_counts_valid_items_and_drops_untitled() {
    let server = MockServer::start().await;
    mount_feed(&server, "/rss", THREE_ITEMS_ONE_UNTITLED).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);

    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errors, 0);

    // The untitled item was dropped without halting its siblings
    assert!(db
        .get_article_by_link("https://gazette.example/stories/1")
        .await
        .unwrap()
        .is_some());
    assert!(db
        .get_article_by_link("https://gazette.example/stories/2")
        .await
        .unwrap()
        .is_none());
    assert!(db
        .get_article_by_link("https://gazette.example/stories/3")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_rerun_unchanged_feed_is_idempotent() {
    let server = MockServer::start().await;
    mount_feed(&server, "/rss", THREE_ITEMS_ONE_UNTITLED).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);

    let first = ingest::run(&db, &fetcher(), &registry, options()).await;
    assert_eq!(first.inserted, 2);

    let second = ingest::run(&db, &fetcher(), &registry, options()).await;
    assert_eq!(second.total, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.errors, 0);

    assert_eq!(db.count_articles().await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_link_within_feed_persists_once() {
    let body = r#"<rss version="2.0"><channel>
        <item><title>Morning edition</title><link>https://gazette.example/daily</link></item>
        <item><title>Evening edition</title><link>https://gazette.example/daily</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/rss", body).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);

    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(db.count_articles().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failing_feed_contributes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);

    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;

    // FetchFailure is not an error bucket: the feed just yields zero articles
    assert_eq!(stats.total, 0);
    assert_eq!(stats.errors, 0);
    assert_eq!(db.count_articles().await.unwrap(), 0);
}

#[tokio::test]
async fn test_one_bad_feed_never_aborts_the_run() {
    let good = r#"<rss version="2.0"><channel>
        <item><title>Works</title><link>https://alpha.example/1</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/good", good).await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let db = test_db().await;
    let registry = FeedRegistry::new(vec![
        FeedConfig {
            name: "Alpha Daily".to_string(),
            slug: "alpha".to_string(),
            feed_urls: vec![format!("{}/good", server.uri())],
        },
        FeedConfig {
            name: "Broken Herald".to_string(),
            slug: "broken".to_string(),
            feed_urls: vec![format!("{}/bad", server.uri())],
        },
    ]);

    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;

    assert_eq!(stats.total, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_atom_feed_parses_via_entry_fallback() {
    let body = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Gazette Atom</title>
  <entry>
    <title>Atom entry</title>
    <link rel="alternate" href="https://gazette.example/atom/1"/>
    <summary>From the atom side</summary>
    <updated>2025-01-06T10:00:00Z</updated>
  </entry>
</feed>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/atom", body).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/atom", server.uri())]);

    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;
    assert_eq!(stats.inserted, 1);

    let stored = db
        .get_article_by_link("https://gazette.example/atom/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Atom entry");
    assert_eq!(stored.summary.as_deref(), Some("From the atom side"));
    assert!(stored.published_at.is_some());
}

#[tokio::test]
async fn test_cdata_and_escaped_summaries_store_identically() {
    let body = r#"<rss version="2.0"><channel>
        <item>
            <title>CDATA flavored</title>
            <link>https://gazette.example/cdata</link>
            <content:encoded><![CDATA[<p>Hello <b>world</b> &amp; friends</p>]]></content:encoded>
        </item>
        <item>
            <title>Entity flavored</title>
            <link>https://gazette.example/escaped</link>
            <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt; &amp; friends&lt;/p&gt;</description>
        </item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/rss", body).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);
    ingest::run(&db, &fetcher(), &registry, options()).await;

    let a = db
        .get_article_by_link("https://gazette.example/cdata")
        .await
        .unwrap()
        .unwrap();
    let b = db
        .get_article_by_link("https://gazette.example/escaped")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(a.summary.as_deref(), Some("Hello world & friends"));
    assert_eq!(a.summary, b.summary);
}

#[tokio::test]
async fn test_media_thumbnail_beats_inline_img() {
    let body = r#"<rss version="2.0"><channel>
        <item>
            <title>Illustrated</title>
            <link>https://gazette.example/pictures</link>
            <media:thumbnail url="https://img.gazette.example/thumb.jpg"/>
            <description><![CDATA[<img src="https://img.gazette.example/inline.jpg"> story text]]></description>
        </item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/rss", body).await;

    let db = test_db().await;
    let registry = registry_for(vec![format!("{}/rss", server.uri())]);
    ingest::run(&db, &fetcher(), &registry, options()).await;

    let stored = db
        .get_article_by_link("https://gazette.example/pictures")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.image_url.as_deref(),
        Some("https://img.gazette.example/thumb.jpg")
    );
}

#[tokio::test]
async fn test_publisher_identity_passes_through() {
    let body = r#"<rss version="2.0"><channel>
        <item><title>Identity</title><link>https://gazette.example/id</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/rss", body).await;

    let db = test_db().await;
    let feed_url = format!("{}/rss", server.uri());
    let registry = registry_for(vec![feed_url.clone()]);
    ingest::run(&db, &fetcher(), &registry, options()).await;

    let stored = db
        .get_article_by_link("https://gazette.example/id")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.publisher, "The Gazette");
    assert_eq!(stored.publisher_slug, "gazette");
    assert_eq!(stored.source_feed_url, feed_url);
}

// ============================================================================
// Purge Scenarios
// ============================================================================

fn aged_record(link: &str, days_old: i64) -> ArticleRecord {
    ArticleRecord {
        publisher: "The Gazette".to_string(),
        publisher_slug: "gazette".to_string(),
        source_feed_url: "https://gazette.example/rss".to_string(),
        title: "Old news".to_string(),
        summary: None,
        link: link.to_string(),
        image_url: None,
        published_at: Some(Utc::now() - Duration::days(days_old)),
    }
}

#[tokio::test]
async fn test_run_purges_stale_articles() {
    let body = r#"<rss version="2.0"><channel>
        <item><title>Fresh</title><link>https://gazette.example/fresh</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_feed(&server, "/rss", body).await;

    let db = test_db().await;
    db.upsert_articles(&[
        aged_record("https://gazette.example/stale", 120),
        aged_record("https://gazette.example/recent", 30),
    ])
    .await
    .unwrap();

    let registry = registry_for(vec![format!("{}/rss", server.uri())]);
    ingest::run(&db, &fetcher(), &registry, options()).await;

    // Stale row purged, recent row and the freshly ingested one retained
    assert!(db
        .get_article_by_link("https://gazette.example/stale")
        .await
        .unwrap()
        .is_none());
    assert!(db
        .get_article_by_link("https://gazette.example/recent")
        .await
        .unwrap()
        .is_some());
    assert!(db
        .get_article_by_link("https://gazette.example/fresh")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_purge_runs_even_when_every_feed_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = test_db().await;
    db.upsert_articles(&[aged_record("https://gazette.example/stale", 120)])
        .await
        .unwrap();

    let registry = registry_for(vec![format!("{}/rss", server.uri())]);
    let stats = ingest::run(&db, &fetcher(), &registry, options()).await;

    assert_eq!(stats.total, 0);
    assert_eq!(db.count_articles().await.unwrap(), 0);
}
