// src/ingest/error.rs
use thiserror::Error;

/// Recoverable per-feed failures. The pipeline logs them and carries on with
/// zero items for the affected feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to parse feed document: {0}")]
    Parse(String),
}

impl FeedError {
    /// Short label used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Transport(_) => "transport",
            FeedError::Timeout(_) => "timeout",
            FeedError::Status(_) => "status",
            FeedError::Parse(_) => "parse",
        }
    }
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}
