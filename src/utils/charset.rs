//! Response body decoding with charset detection.
//!
//! Catalogue pages are served in a mix of UTF-8 and legacy GB encodings, often
//! without a correct header. The charset is resolved in this order:
//!
//! 1. `charset=` parameter of the `Content-Type` response header
//! 2. a byte-order mark
//! 3. a `<meta charset>` declaration in the first 2 KB of the document
//! 4. the configured default (GBK)
//!
//! Decoding never fails: malformed input falls back to lossy UTF-8.

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::sync::OnceLock;

/// Number of leading bytes inspected for a `<meta>` charset declaration.
const SNIFF_WINDOW: usize = 2048;

/// Default charset for pages that declare nothing.
pub const DEFAULT_CHARSET: &str = "gbk";

fn meta_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
            .expect("valid meta charset regex")
    })
}

/// Collapse charset aliases onto the label `encoding_rs` should resolve.
pub fn canonical_charset(label: &str) -> String {
    let label = label
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase();

    match label.as_str() {
        "gb2312" | "gbk" | "x-gbk" | "cp936" => "gbk".to_string(),
        "utf8" => "utf-8".to_string(),
        _ => label,
    }
}

fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(canonical_charset(label).as_bytes())
}

/// Extract the charset parameter from a `Content-Type` header.
pub fn charset_from_headers(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| canonical_charset(value))
        .filter(|value| !value.is_empty())
}

/// Sniff a `<meta>` charset declaration from the head of the document.
pub fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let caps = meta_charset_regex().captures(window)?;
    let label = String::from_utf8_lossy(caps.get(1)?.as_bytes()).to_string();
    Some(canonical_charset(&label))
}

/// Resolve which encoding a body should be decoded with.
pub fn detect_encoding(
    bytes: &[u8],
    headers: &HeaderMap,
    default_charset: &str,
) -> &'static Encoding {
    if let Some(encoding) = charset_from_headers(headers).as_deref().and_then(lookup) {
        tracing::debug!("Charset from response header: {}", encoding.name());
        return encoding;
    }

    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        tracing::debug!("Charset from byte-order mark: {}", encoding.name());
        return encoding;
    }

    if let Some(encoding) = sniff_meta_charset(bytes).as_deref().and_then(lookup) {
        tracing::debug!("Charset from meta declaration: {}", encoding.name());
        return encoding;
    }

    lookup(default_charset).unwrap_or(UTF_8)
}

/// Decode a response body to text. Never fails.
pub fn decode(bytes: &[u8], headers: &HeaderMap, default_charset: &str) -> String {
    let encoding = detect_encoding(bytes, headers, default_charset);

    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };

    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => text.into_owned(),
        None => {
            tracing::debug!(
                "Body is not valid {}, falling back to lossy UTF-8",
                encoding.name()
            );
            String::from_utf8_lossy(body).into_owned()
        }
    }
}
