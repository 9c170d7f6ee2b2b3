// src/ingest/fetcher.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::time::{Duration, Instant};

use crate::ingest::encoding::{charset_from_content_type, decode_feed};
use crate::ingest::error::FeedError;
use crate::ingest::parser::FeedParser;
use crate::ingest::types::{FeedDescriptor, RawFeedItem};

pub const DEFAULT_USER_AGENT: &str = "sudan-news-pipeline/0.1 (+rss)";

/// Retrieves the body of a feed as text, already decoded from its charset.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FeedError>;
}

/// reqwest-backed fetcher with a per-request timeout.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_err(&self, e: reqwest::Error) -> FeedError {
        if e.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else {
            FeedError::Transport(e)
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        // reqwest's own timeout covers connect + body; the outer one is a backstop
        // for clients injected via `with_client` without a timeout.
        let fut = async {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.map_err(e))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FeedError::Status(status.as_u16()));
            }
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = resp.bytes().await.map_err(|e| self.map_err(e))?;
            Ok(decode_feed(
                &bytes,
                content_type.as_deref().and_then(charset_from_content_type),
            ))
        };
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(FeedError::Timeout(self.timeout)),
        }
    }
}

/// Fetch + parse one feed. Never fails: every error is logged and turns into
/// an empty item list so sibling feeds keep going.
pub async fn fetch_and_parse(
    fetcher: &dyn FeedFetcher,
    parser: &dyn FeedParser,
    feed: &FeedDescriptor,
) -> Vec<RawFeedItem> {
    let body = match fetcher.fetch(&feed.url).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(
                feed = %feed.url,
                source = %feed.source,
                kind = e.kind(),
                error = %e,
                "error fetching feed"
            );
            counter!("feed_fetch_errors_total", "kind" => e.kind()).increment(1);
            return Vec::new();
        }
    };

    let t0 = Instant::now();
    match parser.parse(&body) {
        Ok(items) => {
            histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            counter!("feed_items_total").increment(items.len() as u64);
            tracing::info!(
                feed = %feed.url,
                source = %feed.source,
                items = items.len(),
                "parsed feed"
            );
            items
        }
        Err(e) => {
            tracing::error!(
                feed = %feed.url,
                source = %feed.source,
                kind = e.kind(),
                error = %e,
                "error parsing feed"
            );
            counter!("feed_fetch_errors_total", "kind" => e.kind()).increment(1);
            Vec::new()
        }
    }
}
