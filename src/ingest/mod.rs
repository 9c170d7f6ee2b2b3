// src/ingest/mod.rs
//! Per-run orchestration: fetch → parse → extract → classify for every feed,
//! then hand accepted articles to the store and entity extractor.

pub mod config;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod parser;
pub mod sink;
pub mod types;

use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::dates::DateNormalizer;
use crate::html::ScraperHtml;
use crate::ingest::config::PipelineConfig;
use crate::ingest::extract::FieldExtractor;
use crate::ingest::fetcher::{fetch_and_parse, FeedFetcher, HttpFeedFetcher};
use crate::ingest::parser::{FeedParser, XmlFeedParser};
use crate::ingest::sink::{ArticleStore, EntityExtractor, NewArticle};
use crate::ingest::types::{ArticleCandidate, FeedDescriptor};
use crate::relevance::RelevanceClassifier;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items parsed from feeds.");
        describe_counter!(
            "feed_fetch_errors_total",
            "Feeds that contributed nothing because of transport/status/parse errors."
        );
        describe_counter!(
            "feed_articles_accepted_total",
            "Articles that passed the relevance gate."
        );
        describe_counter!(
            "feed_articles_rejected_total",
            "Articles dropped by the relevance gate."
        );
        describe_counter!(
            "feed_store_errors_total",
            "Accepted articles the store or entity extractor failed on."
        );
        describe_histogram!("feed_parse_ms", "Feed document parse time in milliseconds.");
    });
}

/// Outcome for one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedReport {
    pub feed: FeedDescriptor,
    /// Items found in the document (0 when fetch/parse failed).
    pub items: usize,
    /// Accepted candidates, in document order.
    pub accepted: Vec<ArticleCandidate>,
    pub rejected: usize,
}

impl FeedReport {
    fn empty(feed: FeedDescriptor) -> Self {
        Self {
            feed,
            items: 0,
            accepted: Vec::new(),
            rejected: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Same order as the input feeds.
    pub feeds: Vec<FeedReport>,
    pub stored: usize,
    pub store_errors: usize,
}

impl RunReport {
    pub fn accepted(&self) -> usize {
        self.feeds.iter().map(|f| f.accepted.len()).sum()
    }
}

/// The assembled pipeline. Cheap to clone; all parts are shared and immutable.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn FeedFetcher>,
    parser: Arc<dyn FeedParser>,
    extractor: Arc<FieldExtractor>,
    classifier: Arc<RelevanceClassifier>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        parser: Arc<dyn FeedParser>,
        extractor: FieldExtractor,
        classifier: RelevanceClassifier,
    ) -> Self {
        Self {
            fetcher,
            parser,
            extractor: Arc::new(extractor),
            classifier: Arc::new(classifier),
            concurrency: 4,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Production wiring: reqwest fetcher, quick-xml parser, scraper HTML.
    pub fn from_config(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFeedFetcher::new(cfg.request_timeout(), &cfg.user_agent)?;
        let dates = DateNormalizer::new(Arc::new(cfg.timezone()?));
        let extractor = FieldExtractor::new(Arc::new(ScraperHtml), dates);
        let classifier = RelevanceClassifier::new(&cfg.keywords);
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(XmlFeedParser),
            extractor,
            classifier,
        )
        .with_concurrency(cfg.concurrency))
    }

    pub fn classifier(&self) -> &RelevanceClassifier {
        &self.classifier
    }

    /// Fetch, parse, extract and classify one feed. Never fails.
    pub async fn process_feed(&self, feed: &FeedDescriptor) -> FeedReport {
        ensure_metrics_described();

        let items = fetch_and_parse(self.fetcher.as_ref(), self.parser.as_ref(), feed).await;
        let mut report = FeedReport::empty(feed.clone());
        report.items = items.len();

        for item in &items {
            let candidate = self.extractor.extract(item, &feed.source);
            if self.classifier.classify(&candidate, feed.category) {
                report.accepted.push(candidate);
            } else {
                report.rejected += 1;
            }
        }

        counter!("feed_articles_accepted_total").increment(report.accepted.len() as u64);
        counter!("feed_articles_rejected_total").increment(report.rejected as u64);
        tracing::info!(
            source = %feed.source,
            category = %feed.category,
            items = report.items,
            accepted = report.accepted.len(),
            "feed processed"
        );
        report
    }

    /// Process feeds with at most `concurrency` in flight. Each feed runs in
    /// its own task so even a panic only costs that feed its articles.
    pub async fn collect(&self, feeds: &[FeedDescriptor]) -> Vec<FeedReport> {
        let tasks = feeds.iter().cloned().map(|feed| {
            let this = self.clone();
            async move {
                let fallback = feed.clone();
                match tokio::spawn(async move { this.process_feed(&feed).await }).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(
                            feed = %fallback.url,
                            source = %fallback.source,
                            error = %e,
                            "unexpected error while processing feed"
                        );
                        FeedReport::empty(fallback)
                    }
                }
            }
        });

        stream::iter(tasks)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Full run: collect every feed, then store accepted articles and their
    /// entities one at a time. Store/NER failures are logged per article.
    pub async fn run_once(
        &self,
        feeds: &[FeedDescriptor],
        store: &dyn ArticleStore,
        entities: &dyn EntityExtractor,
    ) -> RunReport {
        let mut report = RunReport {
            feeds: self.collect(feeds).await,
            ..RunReport::default()
        };

        for feed in &report.feeds {
            let mut stored_here = 0usize;
            for candidate in &feed.accepted {
                let article = NewArticle::from_candidate(candidate.clone(), feed.feed.category);
                match deliver(&article, store, entities).await {
                    Ok(()) => stored_here += 1,
                    Err(e) => {
                        tracing::error!(
                            source = %feed.feed.source,
                            url = %article.article_url,
                            error = ?e,
                            "failed to store article"
                        );
                        counter!("feed_store_errors_total").increment(1);
                        report.store_errors += 1;
                    }
                }
            }
            if stored_here > 0 {
                tracing::info!(source = %feed.feed.source, stored = stored_here, "articles stored");
            }
            report.stored += stored_here;
        }

        if report.stored > 0 {
            tracing::info!(total = report.stored, "articles saved");
        } else {
            tracing::info!("no articles were saved from any feed");
        }
        report
    }
}

async fn deliver(
    article: &NewArticle,
    store: &dyn ArticleStore,
    entities: &dyn EntityExtractor,
) -> anyhow::Result<()> {
    let id = store.insert_article(article).await?;
    let found = entities.analyze(&article.analysis_text()).await?;
    store.insert_entities(id, &found).await?;
    Ok(())
}
