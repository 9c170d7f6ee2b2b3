// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod arabic;
pub mod dates;
pub mod html;
pub mod ingest;
pub mod metrics;
pub mod relevance;

pub use crate::arabic::normalize_arabic;
pub use crate::ingest::config::{load_config_default, load_config_from, PipelineConfig};
pub use crate::ingest::types::{ArticleCandidate, FeedDescriptor, RawFeedItem, SourceCategory};
pub use crate::ingest::{FeedReport, Pipeline, RunReport};
pub use crate::relevance::{KeywordTierSet, RelevanceClassifier};
