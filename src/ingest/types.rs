// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder stored when a feed omits the title, link or artwork.
pub const NOT_AVAILABLE: &str = "N/A";

/// Which decision procedure applies to a feed's articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Local,
    International,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Local => "local",
            SourceCategory::International => "international",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub url: String,
    /// Identifier of the publishing outlet, e.g. "aljazeera.net".
    pub source: String,
    pub category: SourceCategory,
}

/// Where a media reference came from inside an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `<media:content url=".."/>`
    Content,
    /// `<media:thumbnail url=".."/>`
    Thumbnail,
    /// Plain RSS `<enclosure url=".." type=".."/>`
    Enclosure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: Option<String>,
    /// `type` attribute (MIME), when present.
    pub mime: Option<String>,
    /// `medium` attribute of `media:content`, when present.
    pub medium: Option<String>,
}

/// One feed entry as parsed, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    /// Usually HTML.
    pub description: Option<String>,
    pub pub_date: Option<String>,
    pub link: Option<String>,
    /// `content:encoded` (RSS) or `<content>` (Atom).
    pub encoded_content: Option<String>,
    pub media: Vec<MediaRef>,
}

/// Normalized article derived from one [`RawFeedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub source: String,
    pub headline: String,
    /// Plain text, no markup.
    pub description: String,
    /// `YYYY-MM-DD HH:MM:SS` in the application timezone.
    pub published_at: Option<String>,
    pub article_url: String,
    pub image_url: String,
}
