//! Field normalizers: pure functions that turn scraped text into typed values.

use regex::Regex;
use std::sync::OnceLock;

/// The "ten thousand" unit used by catalogue word counts (e.g. `35.5万字`).
const TEN_THOUSAND_MARKER: char = '万';

fn unit_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*万").expect("valid word count regex"))
}

/// Parse a word count such as `128,000`, `35.5万字` or `字数：1234`.
///
/// Unparseable or empty input yields 0, which callers must read as "unknown".
pub fn parse_word_count(raw: &str) -> u64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != '，')
        .collect();

    if cleaned.contains(TEN_THOUSAND_MARKER) {
        return unit_number_regex()
            .captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(|value| (value * 10_000.0).round() as u64)
            .unwrap_or(0);
    }

    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().unwrap_or(0)
}

/// Resolve a scraped link against the catalogue's base origin.
///
/// - absolute `http(s)://` URLs pass through unchanged
/// - protocol-relative `//host/path` gets `https:`
/// - root-relative `/path` is prefixed with the base origin
/// - anything else is joined to the base origin with one slash
pub fn normalize_url(raw: &str, base: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return raw.to_string();
    }

    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{}", rest);
    }

    let base = base.trim_end_matches('/');
    if raw.starts_with('/') {
        format!("{}{}", base, raw)
    } else {
        format!("{}/{}", base, raw.trim_start_matches("./"))
    }
}

/// Rewrite an absolute image URL into an image-proxy request.
///
/// The scheme is stripped; secure originals are tagged with an `ssl:` prefix
/// so the proxy fetches them over TLS. Empty and already-proxied URLs are
/// returned unchanged.
pub fn proxy_image_url(url: &str, proxy_base: &str) -> String {
    let url = url.trim();
    if url.is_empty() || proxy_base.is_empty() || url.starts_with(proxy_base) {
        return url.to_string();
    }

    let lower = url.to_ascii_lowercase();
    let (secure, rest) = if lower.starts_with("https://") {
        (true, &url["https://".len()..])
    } else if lower.starts_with("http://") {
        (false, &url["http://".len()..])
    } else {
        // Not absolute; nothing sensible to proxy.
        return url.to_string();
    };

    let target = if secure {
        format!("ssl:{}", rest)
    } else {
        rest.to_string()
    };

    format!("{}?url={}", proxy_base, urlencoding::encode(&target))
}

/// Normalize a field label before matching it against the label vocabulary.
///
/// Strips whitespace and both half-width and full-width colons, then
/// lowercases the remainder.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '：')
        .collect::<String>()
        .to_lowercase()
}

/// Collapse runs of whitespace (including full-width spaces) into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
