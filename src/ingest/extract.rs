// src/ingest/extract.rs
//! RawFeedItem → ArticleCandidate.
//!
//! Artwork lives in different places depending on the publisher, so image
//! resolution is an ordered list of [`ImageStrategy`]s: structured media
//! declarations first, then `<img>` tags in the fuller encoded body, then in
//! the plain description.

use std::sync::Arc;

use crate::dates::DateNormalizer;
use crate::html::{HtmlParser, ScraperHtml};
use crate::ingest::types::{ArticleCandidate, MediaKind, RawFeedItem, NOT_AVAILABLE};

/// One way of finding an item's image.
pub trait ImageStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, item: &RawFeedItem, html: &dyn HtmlParser) -> Option<String>;
}

/// `media:content`, then `media:thumbnail`, then an image `<enclosure>`.
#[derive(Debug, Default)]
pub struct MediaEnclosure;

impl ImageStrategy for MediaEnclosure {
    fn name(&self) -> &'static str {
        "media_enclosure"
    }

    fn resolve(&self, item: &RawFeedItem, _html: &dyn HtmlParser) -> Option<String> {
        let by_kind = |kind: MediaKind| {
            item.media
                .iter()
                .filter(|m| m.kind == kind)
                .filter(|m| kind != MediaKind::Enclosure || is_image_mime(m.mime.as_deref()))
                .find_map(|m| m.url.clone())
        };
        by_kind(MediaKind::Content)
            .or_else(|| by_kind(MediaKind::Thumbnail))
            .or_else(|| by_kind(MediaKind::Enclosure))
    }
}

fn is_image_mime(mime: Option<&str>) -> bool {
    mime.is_some_and(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
}

/// First `<img>` inside `content:encoded`.
#[derive(Debug, Default)]
pub struct EncodedContentImage;

impl ImageStrategy for EncodedContentImage {
    fn name(&self) -> &'static str {
        "encoded_content_img"
    }

    fn resolve(&self, item: &RawFeedItem, html: &dyn HtmlParser) -> Option<String> {
        item.encoded_content
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| html.first_image_src(s))
    }
}

/// First `<img>` inside the description.
#[derive(Debug, Default)]
pub struct DescriptionImage;

impl ImageStrategy for DescriptionImage {
    fn name(&self) -> &'static str {
        "description_img"
    }

    fn resolve(&self, item: &RawFeedItem, html: &dyn HtmlParser) -> Option<String> {
        item.description
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| html.first_image_src(s))
    }
}

pub fn default_image_strategies() -> Vec<Box<dyn ImageStrategy>> {
    vec![
        Box::new(MediaEnclosure),
        Box::new(EncodedContentImage),
        Box::new(DescriptionImage),
    ]
}

pub struct FieldExtractor {
    html: Arc<dyn HtmlParser>,
    dates: DateNormalizer,
    images: Vec<Box<dyn ImageStrategy>>,
}

impl FieldExtractor {
    pub fn new(html: Arc<dyn HtmlParser>, dates: DateNormalizer) -> Self {
        Self {
            html,
            dates,
            images: default_image_strategies(),
        }
    }

    /// Replace the image strategy chain (evaluated in the given order).
    pub fn with_image_strategies(mut self, images: Vec<Box<dyn ImageStrategy>>) -> Self {
        self.images = images;
        self
    }

    pub fn extract(&self, item: &RawFeedItem, source: &str) -> ArticleCandidate {
        let headline = item
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        let description = item
            .description
            .as_deref()
            .map(|d| self.html.text_content(d))
            .unwrap_or_default();

        let published_at = item
            .pub_date
            .as_deref()
            .and_then(|d| self.dates.normalize_for(d, source));

        let article_url = item
            .link
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        ArticleCandidate {
            source: source.to_string(),
            headline,
            description,
            published_at,
            article_url,
            image_url: self
                .resolve_image(item)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// First strategy with a hit wins.
    pub fn resolve_image(&self, item: &RawFeedItem) -> Option<String> {
        self.images.iter().find_map(|s| {
            let hit = s.resolve(item, self.html.as_ref());
            if hit.is_some() {
                tracing::trace!(strategy = s.name(), "image resolved");
            }
            hit
        })
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(Arc::new(ScraperHtml), DateNormalizer::default())
    }
}
