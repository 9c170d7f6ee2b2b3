// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dates::{FixedOffsetZone, DEFAULT_APP_UTC_OFFSET};
use crate::ingest::fetcher::DEFAULT_USER_AGENT;
use crate::ingest::types::{FeedDescriptor, SourceCategory};
use crate::relevance::KeywordTierSet;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const ENV_CONCURRENCY: &str = "PIPELINE_CONCURRENCY";

pub const DEFAULT_CONFIG_TOML: &str = "config/pipeline.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/pipeline.json";

fn default_request_timeout_secs() -> u64 {
    10
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_app_utc_offset() -> String {
    DEFAULT_APP_UTC_OFFSET.to_string()
}

/// One `[[feeds]]` entry. Without an explicit `category` the feed is
/// international iff its `source` is listed in `international_sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub category: Option<SourceCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Feeds processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// UTC offset of the application timezone, e.g. "+02:00".
    #[serde(default = "default_app_utc_offset")]
    pub app_utc_offset: String,
    #[serde(default)]
    pub international_sources: Vec<String>,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
    #[serde(default)]
    pub keywords: KeywordTierSet,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            app_utc_offset: default_app_utc_offset(),
            international_sources: Vec::new(),
            feeds: Vec::new(),
            keywords: KeywordTierSet::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn timezone(&self) -> Result<FixedOffsetZone> {
        FixedOffsetZone::from_offset_str(&self.app_utc_offset)
    }

    pub fn category_for(&self, entry: &FeedEntry) -> SourceCategory {
        if let Some(c) = entry.category {
            return c;
        }
        let listed = self
            .international_sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(entry.source.trim()));
        if listed {
            SourceCategory::International
        } else {
            SourceCategory::Local
        }
    }

    pub fn feed_descriptors(&self) -> Vec<FeedDescriptor> {
        self.feeds
            .iter()
            .map(|f| FeedDescriptor {
                url: f.url.clone(),
                source: f.source.clone(),
                category: self.category_for(f),
            })
            .collect()
    }

    /// Clamp nonsense values, clean keyword lists, drop feeds without a URL
    /// and validate the timezone offset.
    fn sanitize(mut self) -> Result<Self> {
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.concurrency == 0 {
            self.concurrency = 1;
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self.timezone()?;

        self.feeds.retain(|f| {
            let keep = !f.url.trim().is_empty();
            if !keep {
                tracing::warn!(source = %f.source, "dropping feed entry without url");
            }
            keep
        });
        for f in &mut self.feeds {
            f.url = f.url.trim().to_string();
            f.source = f.source.trim().to_string();
            if f.source.is_empty() {
                f.source = f.url.clone();
            }
        }
        self.keywords = self.keywords.cleaned();
        Ok(self)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_positive_env(std::env::var(ENV_REQUEST_TIMEOUT_SECS).ok()) {
            self.request_timeout_secs = t;
        }
        if let Some(c) = parse_positive_env(std::env::var(ENV_CONCURRENCY).ok()) {
            self.concurrency = c as usize;
        }
    }
}

// positive integer from env; anything else is ignored
fn parse_positive_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Load from an explicit path. TOML or JSON, picked by extension then content.
pub fn load_config_from(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing pipeline config {}", path.display()))?;
    cfg.apply_env_overrides();
    Ok(cfg)
}

/// Load using env var + fallbacks:
/// 1) $PIPELINE_CONFIG_PATH
/// 2) config/pipeline.toml
/// 3) config/pipeline.json
pub fn load_config_default() -> Result<PipelineConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    for candidate in [DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_JSON] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_config_from(&pb);
        }
    }
    Err(anyhow!(
        "no pipeline config found (set {ENV_CONFIG_PATH} or create {DEFAULT_CONFIG_TOML})"
    ))
}

pub fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    let cfg: PipelineConfig = match hint_ext {
        "toml" => toml::from_str(s)?,
        "json" => serde_json::from_str(s)?,
        _ => {
            if s.trim_start().starts_with('{') {
                serde_json::from_str(s)?
            } else {
                toml::from_str(s)?
            }
        }
    };
    cfg.sanitize()
}
