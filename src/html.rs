// src/html.rs
//! HTML capability used by field extraction.
//!
//! Feed descriptions and `content:encoded` bodies are HTML fragments. The
//! extractor only needs two things from them, plain text and the first image,
//! so it talks to this trait rather than to a concrete parser.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

pub trait HtmlParser: Send + Sync {
    /// Text content of `html`: tags dropped, whitespace runs collapsed, trimmed.
    fn text_content(&self, html: &str) -> String;

    /// `src` of the first `<img>` that carries a non-empty one.
    fn first_image_src(&self, html: &str) -> Option<String>;
}

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("img selector"));

/// [`HtmlParser`] backed by `scraper` (html5ever).
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperHtml;

impl HtmlParser for ScraperHtml {
    fn text_content(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        let joined: String = fragment.root_element().text().collect();
        collapse_whitespace(&joined)
    }

    fn first_image_src(&self, html: &str) -> Option<String> {
        if html.trim().is_empty() {
            return None;
        }
        let fragment = Html::parse_fragment(html);
        fragment
            .select(&IMG)
            .filter_map(|el| el.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string)
    }
}

/// Collapse any whitespace run (including NBSP) to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
