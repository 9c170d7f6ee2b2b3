// tests/feed_parsing.rs
// Fixture documents through the parser and field extractor.

use sudan_news_pipeline::ingest::encoding::decode_feed;
use sudan_news_pipeline::ingest::extract::FieldExtractor;
use sudan_news_pipeline::ingest::parser::{FeedParser, XmlFeedParser};
use sudan_news_pipeline::ingest::types::{ArticleCandidate, SourceCategory};
use sudan_news_pipeline::relevance::{KeywordTierSet, RelevanceClassifier};

const ARABIC_RSS: &str = include_str!("fixtures/arabic_rss.xml");
const ATOM: &str = include_str!("fixtures/atom.xml");
const CP1256_RSS: &[u8] = include_bytes!("fixtures/cp1256_rss.xml");

fn candidates(doc: &str, source: &str) -> Vec<ArticleCandidate> {
    let items = XmlFeedParser.parse(doc).expect("fixture parses");
    let ex = FieldExtractor::default();
    items.iter().map(|i| ex.extract(i, source)).collect()
}

#[test]
fn arabic_rss_items_in_document_order() {
    let c = candidates(ARABIC_RSS, "news.test");
    assert_eq!(c.len(), 4);
    let urls: Vec<_> = c.iter().map(|a| a.article_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://news.test/a/1",
            "https://news.test/a/2",
            "https://news.test/a/3",
            "N/A"
        ]
    );
    assert!(c.iter().all(|a| a.source == "news.test"));
}

#[test]
fn arabic_rss_fields_are_normalized() {
    let c = candidates(ARABIC_RSS, "news.test");

    // media:content wins over the description <img>; GMT → +02:00
    assert_eq!(c[0].image_url, "https://news.test/img/media1.jpg");
    assert_eq!(c[0].description, "تجددت الاشتباكات صباح اليوم.");
    assert_eq!(c[0].published_at.as_deref(), Some("2024-05-14 10:30:00"));

    // entity-escaped description, image from content:encoded, dc:date
    assert_eq!(c[1].description, "وفدا التفاوض يصلان إلى جدة");
    assert_eq!(c[1].image_url, "https://news.test/img/enc2.jpg");
    assert_eq!(c[1].published_at.as_deref(), Some("2024-05-14 11:00:00"));

    // unparseable date only loses the date
    assert_eq!(c[2].headline, "أسعار الذهب ترتفع");
    assert_eq!(c[2].published_at, None);
    assert_eq!(c[2].image_url, "N/A");

    assert_eq!(c[3].headline, "N/A");
    assert_eq!(c[3].description, "خبر بلا عنوان عن السودان");
}

#[test]
fn atom_entries_use_alternate_link_and_thumbnail() {
    let c = candidates(ATOM, "world.test");
    assert_eq!(c.len(), 2);

    assert_eq!(c[0].headline, "Sudan ceasefire talks stall");
    assert_eq!(c[0].article_url, "https://world.test/sudan-talks");
    assert_eq!(c[0].description, "Negotiators left Jeddah without a deal.");
    assert_eq!(c[0].image_url, "https://world.test/thumb.jpg");
    assert_eq!(c[0].published_at.as_deref(), Some("2024-05-14 08:00:00"));

    assert_eq!(c[1].article_url, "https://world.test/markets");
    // 20:00 at -04:00 is 02:00 next day at +02:00
    assert_eq!(c[1].published_at.as_deref(), Some("2024-05-15 02:00:00"));
}

#[test]
fn garbage_is_an_error_not_a_panic() {
    assert!(XmlFeedParser.parse("<rss><channel><item>").is_err());
    assert!(XmlFeedParser.parse("").is_err());
}

#[test]
fn windows_1256_document_classifies_on_arabic_keywords() {
    let doc = decode_feed(CP1256_RSS, None);
    let c = candidates(&doc, "cp.test");
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].headline, "اشتباكات في السودان");
    assert_eq!(c[0].published_at.as_deref(), Some("2024-05-14 10:30:00"));

    let classifier = RelevanceClassifier::new(&KeywordTierSet {
        tier_a_definitive: vec!["السودان".into()],
        ..Default::default()
    });
    assert!(classifier.classify(&c[0], SourceCategory::International));
}
