// tests/ingest_pipeline.rs
// Whole-run behaviour with scripted fetchers: isolation, ordering,
// bounded concurrency and the storage handoff.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sudan_news_pipeline::ingest::error::FeedError;
use sudan_news_pipeline::ingest::extract::FieldExtractor;
use sudan_news_pipeline::ingest::fetcher::FeedFetcher;
use sudan_news_pipeline::ingest::parser::XmlFeedParser;
use sudan_news_pipeline::ingest::sink::{
    ArticleId, ArticleStore, EntityExtractor, EntityReport, MemoryStore, NewArticle,
    NullEntityExtractor,
};
use sudan_news_pipeline::ingest::types::{FeedDescriptor, SourceCategory};
use sudan_news_pipeline::relevance::{KeywordTierSet, RelevanceClassifier};
use sudan_news_pipeline::Pipeline;

const ARABIC_RSS: &str = include_str!("fixtures/arabic_rss.xml");
const ATOM: &str = include_str!("fixtures/atom.xml");

enum Script {
    Body(&'static str),
    Fail(u16),
    Stall,
    Panic,
}

struct ScriptedFetcher {
    scripts: HashMap<&'static str, Script>,
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        match self.scripts.get(url) {
            Some(Script::Body(b)) => Ok(b.to_string()),
            Some(Script::Fail(code)) => Err(FeedError::Status(*code)),
            Some(Script::Stall) => Err(FeedError::Timeout(Duration::from_secs(10))),
            Some(Script::Panic) => panic!("scripted panic for {url}"),
            None => Err(FeedError::Status(404)),
        }
    }
}

fn tiers() -> KeywordTierSet {
    KeywordTierSet {
        tier_a_definitive: vec!["السودان".into(), "الخرطوم".into(), "Sudan".into()],
        tier_a_strong: vec!["الدعم السريع".into()],
        tier_b_context: vec!["جدة".into(), "ceasefire".into()],
        exclusion_keywords: vec![],
    }
}

fn feed(url: &str, category: SourceCategory) -> FeedDescriptor {
    FeedDescriptor {
        url: url.into(),
        source: url.trim_start_matches("https://").into(),
        category,
    }
}

fn pipeline(scripts: Vec<(&'static str, Script)>) -> Pipeline {
    Pipeline::new(
        Arc::new(ScriptedFetcher {
            scripts: scripts.into_iter().collect(),
        }),
        Arc::new(XmlFeedParser),
        FieldExtractor::default(),
        RelevanceClassifier::new(&tiers()),
    )
}

#[tokio::test]
async fn failing_feeds_do_not_affect_siblings() {
    let p = pipeline(vec![
        ("https://slow.test", Script::Stall),
        ("https://down.test", Script::Fail(503)),
        ("https://ar.test", Script::Body(ARABIC_RSS)),
        ("https://boom.test", Script::Panic),
        ("https://garbage.test", Script::Body("<rss><channel><item>")),
        ("https://world.test", Script::Body(ATOM)),
    ]);
    let feeds = vec![
        feed("https://slow.test", SourceCategory::Local),
        feed("https://down.test", SourceCategory::Local),
        feed("https://ar.test", SourceCategory::Local),
        feed("https://boom.test", SourceCategory::Local),
        feed("https://garbage.test", SourceCategory::Local),
        feed("https://world.test", SourceCategory::International),
    ];

    let reports = p.with_concurrency(2).collect(&feeds).await;

    let order: Vec<_> = reports.iter().map(|r| r.feed.url.as_str()).collect();
    assert_eq!(
        order,
        feeds.iter().map(|f| f.url.as_str()).collect::<Vec<_>>()
    );
    for i in [0, 1, 3, 4] {
        assert_eq!(reports[i].items, 0, "feed {i} should contribute nothing");
        assert!(reports[i].accepted.is_empty());
    }

    // local: clashes in Khartoum, Jeddah talks, untitled Sudan item; not gold prices
    assert_eq!(reports[2].items, 4);
    let urls: Vec<_> = reports[2]
        .accepted
        .iter()
        .map(|a| a.article_url.as_str())
        .collect();
    assert_eq!(urls, vec!["https://news.test/a/1", "https://news.test/a/2", "N/A"]);
    assert_eq!(reports[2].rejected, 1);

    // international: only the Sudan headline
    assert_eq!(reports[5].items, 2);
    assert_eq!(reports[5].accepted.len(), 1);
    assert_eq!(
        reports[5].accepted[0].article_url,
        "https://world.test/sudan-talks"
    );
}

#[tokio::test]
async fn same_candidates_in_other_category_can_be_rejected() {
    let p = pipeline(vec![("https://ar.test", Script::Body(ARABIC_RSS))]);
    let reports = p
        .collect(&[feed("https://ar.test", SourceCategory::International)])
        .await;
    // Jeddah item: context keyword in title and body counts once (3 < 4)
    let urls: Vec<_> = reports[0]
        .accepted
        .iter()
        .map(|a| a.article_url.as_str())
        .collect();
    assert_eq!(urls, vec!["https://news.test/a/1", "N/A"]);
}

struct SlowFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl FeedFetcher for SlowFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FeedError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("<rss><channel/></rss>".to_string())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_is_bounded() {
    let fetcher = Arc::new(SlowFetcher {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let p = Pipeline::new(
        fetcher.clone(),
        Arc::new(XmlFeedParser),
        FieldExtractor::default(),
        RelevanceClassifier::new(&tiers()),
    )
    .with_concurrency(3);

    let feeds: Vec<_> = (0..10)
        .map(|i| FeedDescriptor {
            url: format!("https://f{i}.test"),
            source: format!("f{i}"),
            category: SourceCategory::Local,
        })
        .collect();
    let reports = p.collect(&feeds).await;

    assert_eq!(reports.len(), 10);
    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight fetches was {peak}");
    assert!(peak >= 2, "feeds were not processed concurrently");
}

/// Fails on one URL, records the rest.
struct FlakyStore {
    inner: MemoryStore,
    reject_url: &'static str,
}

#[async_trait]
impl ArticleStore for FlakyStore {
    async fn insert_article(&self, article: &NewArticle) -> anyhow::Result<ArticleId> {
        if article.article_url == self.reject_url {
            anyhow::bail!("constraint violation");
        }
        self.inner.insert_article(article).await
    }

    async fn insert_entities(&self, id: ArticleId, e: &EntityReport) -> anyhow::Result<()> {
        self.inner.insert_entities(id, e).await
    }
}

struct EchoExtractor;

#[async_trait]
impl EntityExtractor for EchoExtractor {
    async fn analyze(&self, text: &str) -> anyhow::Result<EntityReport> {
        Ok(EntityReport {
            cities: text
                .split_whitespace()
                .filter(|w| w.contains("الخرطوم"))
                .map(str::to_string)
                .collect(),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn store_failures_are_per_article() {
    let p = pipeline(vec![("https://ar.test", Script::Body(ARABIC_RSS))]);
    let store = FlakyStore {
        inner: MemoryStore::new(),
        reject_url: "https://news.test/a/2",
    };

    let report = p
        .run_once(
            &[feed("https://ar.test", SourceCategory::Local)],
            &store,
            &EchoExtractor,
        )
        .await;

    assert_eq!(report.accepted(), 3);
    assert_eq!(report.stored, 2);
    assert_eq!(report.store_errors, 1);

    let saved = store.inner.articles();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|a| a.category == SourceCategory::Local));

    let entities = store.inner.entities();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].1.cities, vec!["الخرطوم".to_string()]);
}

#[tokio::test]
async fn empty_run_stores_nothing() {
    let p = pipeline(vec![]);
    let store = MemoryStore::new();
    let report = p
        .run_once(
            &[feed("https://missing.test", SourceCategory::Local)],
            &store,
            &NullEntityExtractor,
        )
        .await;
    assert_eq!(report.stored, 0);
    assert!(store.articles().is_empty());
}
