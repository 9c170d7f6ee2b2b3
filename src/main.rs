//! Batch entrypoint: one pass over every configured feed.
//!
//! Accepted articles are written as JSON lines to stdout; logs go to stderr.

use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sudan_news_pipeline::ingest::sink::{JsonLinesStore, NullEntityExtractor};
use sudan_news_pipeline::metrics::{Metrics, ENV_METRICS_PATH};
use sudan_news_pipeline::{load_config_default, Pipeline};

/// RUST_LOG controls the filter (default `info`); LOG_FORMAT=json switches
/// to structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    let cfg = load_config_default()?;
    let feeds = cfg.feed_descriptors();
    if cfg.keywords.is_empty() {
        tracing::warn!("all keyword tiers are empty; nothing will be accepted");
    }
    tracing::info!(
        feeds = feeds.len(),
        concurrency = cfg.concurrency,
        timeout_secs = cfg.request_timeout_secs,
        "starting feed run"
    );

    let pipeline = Pipeline::from_config(&cfg)?;
    let store = JsonLinesStore::new(std::io::stdout());
    let report = pipeline
        .run_once(&feeds, &store, &NullEntityExtractor)
        .await;

    tracing::info!(
        accepted = report.accepted(),
        stored = report.stored,
        store_errors = report.store_errors,
        "feed run finished"
    );

    if let (Some(m), Ok(p)) = (metrics, std::env::var(ENV_METRICS_PATH)) {
        if let Err(e) = m.write_to(&PathBuf::from(p)) {
            tracing::warn!(error = ?e, "failed to write metrics snapshot");
        }
    }
    Ok(())
}
