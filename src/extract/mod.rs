//! Page classification and record extraction.
//!
//! - [`classify`]: decide whether a page is a listing or a single work's detail page
//! - [`extract_list`]: listing page → records
//! - [`extract_detail`]: detail page → one record, through ordered fallbacks
//! - [`scan_label_value_fields`]: label/value scan shared by all of the above
//!
//! Everything here is synchronous and works on [`MarkupNode`] trees only.
//! Parsing problems never surface as errors; they degrade to defaults or to an
//! empty result.
//!
//! [`MarkupNode`]: crate::markup::MarkupNode

mod classifier;
mod detail;
mod fields;
mod list;

pub use classifier::{classify, is_detail_url, ClassificationDecision, ClassificationRule};
pub use detail::{extract_detail, extract_detail_fields, DetailFields};
pub use fields::{scan_label_value_fields, FieldLabel, RawFieldTable};
pub use list::{extract_list, extract_list_rows, is_unparseable_batch};

use crate::config::Config;
use crate::utils::{normalize_url, proxy_image_url};

/// Settings the extractors need to build absolute, proxied URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractContext {
    /// Base origin of the catalogue
    pub base_url: String,
    /// Image proxy endpoint for covers
    pub image_proxy: String,
    /// Maximum records taken from one listing
    pub max_results: usize,
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExtractContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.source.base_url.trim_end_matches('/').to_string(),
            image_proxy: config.source.image_proxy.clone(),
            max_results: config.extraction.max_results,
        }
    }

    /// Resolve a scraped link against the base origin
    pub fn absolutize(&self, raw: &str) -> String {
        normalize_url(raw, &self.base_url)
    }

    /// Resolve and proxy a scraped image link
    pub fn cover_url(&self, raw: &str) -> String {
        proxy_image_url(&self.absolutize(raw), &self.image_proxy)
    }
}

/// Image attributes checked for a cover, lazy-loading ones first.
pub(crate) const IMAGE_SOURCE_ATTRS: [&str; 3] = ["data-original", "data-src", "src"];

/// Raw image link of an `<img>` node; inline `data:` placeholders are skipped
pub(crate) fn image_source<N: crate::markup::MarkupNode>(img: &N) -> Option<String> {
    IMAGE_SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.attr(attr))
        .find(|src| !is_inline_data(src))
}

fn is_inline_data(src: &str) -> bool {
    src.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{MarkupNode, Page};

    fn first_img_source(html: &str) -> Option<String> {
        let page = Page::parse(html, "");
        let img = page.root().select_first("img")?;
        image_source(&img)
    }

    #[test]
    fn test_image_source_prefers_lazy_attrs() {
        assert_eq!(
            first_img_source(r#"<img data-src="/a.jpg" src="/loading.gif">"#).as_deref(),
            Some("/a.jpg")
        );
    }

    #[test]
    fn test_image_source_skips_data_uris() {
        assert_eq!(first_img_source(r#"<img src="DATA:image/gif;base64,R0lGODlh">"#), None);
        assert_eq!(
            first_img_source(r#"<img data-src="data:image/gif;base64,R0lGODlh" src="/c.jpg">"#)
                .as_deref(),
            Some("/c.jpg")
        );
    }

    #[test]
    fn test_placeholder_only_cover_stays_empty() {
        let page = Page::parse(
            r#"<div class="book-list"><div class="book-item">
                <img src="data:image/gif;base64,R0lGODlh">
                <h3><a href="/book/1">书名</a></h3><p>作者：某人</p>
            </div></div>"#,
            "",
        );
        let records = extract_list(&page.root(), &ExtractContext::default());
        assert_eq!(records[0].cover(), "");
    }
}
