// src/ingest/encoding.rs
//! Raw feed bytes → text.
//!
//! Arabic publishers still serve windows-1256 and friends. The charset is
//! taken from, in order: a byte-order mark, the `encoding` of the XML
//! declaration, the HTTP `Content-Type` charset, then UTF-8.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// The `charset=` parameter of a `Content-Type` value, if any.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|part| part.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, v)| v.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|v| !v.is_empty())
}

/// `encoding="…"` from the XML declaration, resolved to a known encoding.
pub fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    let head = &bytes[start..bytes.len().min(start + 512)];
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = rest[1..].split(quote).next()?;

    let enc = Encoding::for_label(label.trim().as_bytes())?;
    // An ASCII-readable declaration cannot really be UTF-16.
    if enc == UTF_16LE || enc == UTF_16BE {
        Some(UTF_8)
    } else {
        Some(enc)
    }
}

/// Decode a feed document. Malformed sequences become U+FFFD.
pub fn decode_feed(bytes: &[u8], http_charset: Option<&str>) -> String {
    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    let enc = declared_encoding(bytes)
        .or_else(|| http_charset.and_then(|c| Encoding::for_label(c.trim().as_bytes())))
        .unwrap_or(UTF_8);

    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!(encoding = enc.name(), "feed body had undecodable bytes");
    }
    text.into_owned()
}
