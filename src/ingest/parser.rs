// src/ingest/parser.rs
//! Feed-document parsing: RSS 2.0, RSS 1.0 (RDF) and Atom into [`RawFeedItem`]s.
//!
//! Streaming, namespace-aware parse over `quick_xml::NsReader`. Only the
//! fields the extractor needs are captured; everything else is skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::ingest::error::FeedError;
use crate::ingest::types::{MediaKind, MediaRef, RawFeedItem};

const NS_MEDIA: &[u8] = b"http://search.yahoo.com/mrss/";
const NS_CONTENT: &[u8] = b"http://purl.org/rss/1.0/modules/content/";
const NS_DC: &[u8] = b"http://purl.org/dc/elements/1.1/";
const NS_ATOM: &[u8] = b"http://www.w3.org/2005/Atom";
const NS_RSS1: &[u8] = b"http://purl.org/rss/1.0/";
const NS_OTHER: &[u8] = b"urn:x-unrecognized";

/// Turns a feed document into its entries, in document order.
pub trait FeedParser: Send + Sync {
    fn parse(&self, document: &str) -> Result<Vec<RawFeedItem>, FeedError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct XmlFeedParser;

impl FeedParser for XmlFeedParser {
    fn parse(&self, document: &str) -> Result<Vec<RawFeedItem>, FeedError> {
        let doc = document.trim_start_matches('\u{FEFF}').trim_start();
        // Text is not trimmed per event: a field may interleave text and CDATA
        // and the spaces between them are content. Fields are trimmed on close.
        let mut reader = NsReader::from_str(doc);

        let mut state = ParseState::default();
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    state.depth += 1;
                    let (ns, local) = reader.resolve_element(e.name());
                    state.open(resolve_ns(&ns), local.as_ref(), &e);
                }
                Event::Empty(e) => {
                    state.depth += 1;
                    let (ns, local) = reader.resolve_element(e.name());
                    state.open(resolve_ns(&ns), local.as_ref(), &e);
                    state.close();
                }
                Event::End(_) => state.close(),
                Event::Text(t) => state.text(&decode_text(&t)),
                Event::CData(c) => state.text(&String::from_utf8_lossy(&c)),
                Event::Eof => break,
                _ => {}
            }
        }

        if state.depth != 0 {
            return Err(FeedError::Parse("unexpected end of document".into()));
        }
        match state.root {
            None => Err(FeedError::Parse("document has no root element".into())),
            Some(root) if !is_feed_root(&root) => {
                tracing::warn!(
                    root = %String::from_utf8_lossy(&root),
                    "document is not an RSS/Atom feed"
                );
                Ok(Vec::new())
            }
            Some(_) => Ok(state.items),
        }
    }
}

fn is_feed_root(local: &[u8]) -> bool {
    matches!(local, b"rss" | b"RDF" | b"feed")
}

fn same_ns(a: &[u8], b: &[u8]) -> bool {
    fn strip(s: &[u8]) -> &[u8] {
        s.strip_suffix(b"/").unwrap_or(s)
    }
    strip(a) == strip(b)
}

/// Bound namespaces resolve normally; undeclared well-known prefixes
/// (`media:` without an `xmlns:media`) are mapped by name since feeds do that.
fn resolve_ns<'a>(r: &'a ResolveResult<'a>) -> Option<&'a [u8]> {
    match r {
        ResolveResult::Bound(Namespace(ns)) => Some(*ns),
        ResolveResult::Unknown(prefix) => Some(match prefix.as_slice() {
            b"media" => NS_MEDIA,
            b"content" => NS_CONTENT,
            b"dc" => NS_DC,
            b"atom" => NS_ATOM,
            _ => NS_OTHER,
        }),
        ResolveResult::Unbound => None,
    }
}

fn decode_text(bytes: &[u8]) -> String {
    html_escape::decode_html_entities(&String::from_utf8_lossy(bytes)).into_owned()
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .map(|a| decode_text(&a.value).trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    PubDate,
    Link,
    Encoded,
    Summary,
    AtomContent,
    Published,
    Updated,
    DcDate,
}

fn classify(ns: Option<&[u8]>, local: &[u8]) -> Option<Field> {
    match ns {
        Some(ns) if same_ns(ns, NS_CONTENT) => (local == b"encoded").then_some(Field::Encoded),
        Some(ns) if same_ns(ns, NS_DC) => (local == b"date").then_some(Field::DcDate),
        Some(ns) if !same_ns(ns, NS_ATOM) && !same_ns(ns, NS_RSS1) => None,
        _ => match local {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            b"link" => Some(Field::Link),
            b"summary" => Some(Field::Summary),
            b"content" => Some(Field::AtomContent),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        },
    }
}

fn is_item(ns: Option<&[u8]>, local: &[u8]) -> bool {
    match ns {
        None => local == b"item" || local == b"entry",
        Some(ns) if same_ns(ns, NS_RSS1) => local == b"item",
        Some(ns) if same_ns(ns, NS_ATOM) => local == b"entry",
        Some(_) => false,
    }
}

#[derive(Debug, Default)]
struct ItemBuilder {
    title: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    link: Option<String>,
    encoded: Option<String>,
    summary: Option<String>,
    atom_content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
    // (rel, href) of Atom-style links
    links: Vec<(Option<String>, String)>,
    media: Vec<MediaRef>,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
            Field::Link => &mut self.link,
            Field::Encoded => &mut self.encoded,
            Field::Summary => &mut self.summary,
            Field::AtomContent => &mut self.atom_content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
        }
    }

    fn build(self) -> RawFeedItem {
        let href = self
            .links
            .iter()
            .find(|(rel, _)| rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| self.links.first())
            .map(|(_, href)| href.clone());

        RawFeedItem {
            title: self.title,
            description: self
                .description
                .or(self.summary)
                .or_else(|| self.atom_content.clone()),
            pub_date: self
                .pub_date
                .or(self.published)
                .or(self.dc_date)
                .or(self.updated),
            link: self.link.or(href),
            encoded_content: self.encoded.or(self.atom_content),
            media: self.media,
        }
    }
}

#[derive(Debug, Default)]
struct ParseState {
    depth: usize,
    root: Option<Vec<u8>>,
    items: Vec<RawFeedItem>,
    // (depth of the <item>/<entry>, fields so far)
    item: Option<(usize, ItemBuilder)>,
    // (field, depth of its element, accumulated text)
    field: Option<(Field, usize, String)>,
}

impl ParseState {
    /// Called with `depth` already pointing at the opened element.
    fn open(&mut self, ns: Option<&[u8]>, local: &[u8], e: &BytesStart<'_>) {
        let depth = self.depth;
        if self.root.is_none() {
            self.root = Some(local.to_vec());
        }

        let Some((item_depth, builder)) = self.item.as_mut() else {
            if is_item(ns, local) {
                self.item = Some((depth, ItemBuilder::default()));
            }
            return;
        };

        if ns.is_some_and(|n| same_ns(n, NS_MEDIA)) {
            let kind = match local {
                b"content" => Some(MediaKind::Content),
                b"thumbnail" => Some(MediaKind::Thumbnail),
                _ => None,
            };
            if let Some(kind) = kind {
                builder.media.push(MediaRef {
                    kind,
                    url: attr(e, "url"),
                    mime: attr(e, "type"),
                    medium: attr(e, "medium"),
                });
            }
            return;
        }

        if depth != *item_depth + 1 {
            return;
        }

        if ns.is_none() && local == b"enclosure" {
            builder.media.push(MediaRef {
                kind: MediaKind::Enclosure,
                url: attr(e, "url"),
                mime: attr(e, "type"),
                medium: None,
            });
            return;
        }

        let field = classify(ns, local);
        if field == Some(Field::Link) {
            if let Some(href) = attr(e, "href") {
                builder.links.push((attr(e, "rel"), href));
            }
        }
        if let Some(field) = field {
            self.field = Some((field, depth, String::new()));
        }
    }

    fn text(&mut self, s: &str) {
        if let Some((_, _, buf)) = self.field.as_mut() {
            buf.push_str(s);
        }
    }

    /// Called before `depth` is decremented for the closing element.
    fn close(&mut self) {
        let depth = self.depth;

        if matches!(self.field, Some((_, d, _)) if d == depth) {
            if let (Some((field, _, buf)), Some((_, builder))) = (self.field.take(), self.item.as_mut()) {
                let value = buf.trim();
                let slot = builder.slot(field);
                if slot.is_none() && !value.is_empty() {
                    *slot = Some(value.to_string());
                }
            }
        }

        if matches!(self.item, Some((d, _)) if d == depth) {
            if let Some((_, builder)) = self.item.take() {
                self.items.push(builder.build());
            }
        }

        self.depth = self.depth.saturating_sub(1);
    }
}
