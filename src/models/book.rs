//! Book record models produced by the extractors.

use serde::{Deserialize, Serialize};

/// Author placeholder used when no author could be resolved.
pub const DEFAULT_AUTHOR: &str = "未知作者";

/// Synopsis placeholder used when no synopsis could be resolved.
pub const DEFAULT_DESCRIPTION: &str = "暂无简介";

/// A book found on the remote catalogue.
///
/// Records are immutable once built; fields that could not be resolved carry
/// their defaults. A `word_count` of 0 means "unknown", never "empty book".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    title: String,
    author: String,
    cover: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    category: String,
    word_count: u64,
    description: String,
    source_url: String,
}

impl SearchRecord {
    /// Book title (never empty)
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author name, or [`DEFAULT_AUTHOR`]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Cover URL expressed through the image proxy, or empty
    pub fn cover(&self) -> &str {
        &self.cover
    }

    /// Publishing platform / first-release site
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Category, possibly empty
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Word count; 0 when unknown
    pub fn word_count(&self) -> u64 {
        self.word_count
    }

    /// Synopsis, or [`DEFAULT_DESCRIPTION`]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute URL of the work's page, or empty
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Whether the author is still the placeholder
    pub fn has_default_author(&self) -> bool {
        self.author == DEFAULT_AUTHOR
    }

    /// Whether the synopsis is still the placeholder
    pub fn has_default_description(&self) -> bool {
        self.description == DEFAULT_DESCRIPTION
    }

    /// Row carries nothing but a title: default author, unknown word count
    /// and no synopsis.
    pub fn is_empty_shaped(&self) -> bool {
        self.has_default_author() && self.word_count == 0 && self.has_default_description()
    }

    /// Row looks like a single work's detail fragment: it has a synopsis but
    /// neither author nor word count resolved.
    pub fn is_detail_shaped(&self) -> bool {
        self.has_default_author() && self.word_count == 0 && !self.has_default_description()
    }
}

/// Builder for [`SearchRecord`]; the only way extractors construct records.
#[derive(Debug, Clone, Default)]
pub struct SearchRecordBuilder {
    title: String,
    author: Option<String>,
    cover: String,
    platform: Option<String>,
    category: String,
    word_count: u64,
    description: Option<String>,
    source_url: String,
}

fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into().trim().to_string();
    (!value.is_empty()).then_some(value)
}

impl SearchRecordBuilder {
    /// Create a builder for a record with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            ..Default::default()
        }
    }

    /// Set author; blank values keep the default
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = non_blank(author);
        self
    }

    /// Set cover URL (already proxied)
    pub fn cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = cover.into().trim().to_string();
        self
    }

    /// Set platform; blank values clear it
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = non_blank(platform);
        self
    }

    /// Set category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into().trim().to_string();
        self
    }

    /// Set word count
    pub fn word_count(mut self, word_count: u64) -> Self {
        self.word_count = word_count;
        self
    }

    /// Set synopsis; blank values keep the default
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    /// Set source URL (absolute)
    pub fn source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = source_url.into().trim().to_string();
        self
    }

    /// Build the record; `None` when the title is empty
    pub fn build(self) -> Option<SearchRecord> {
        if self.title.is_empty() {
            return None;
        }

        Some(SearchRecord {
            title: self.title,
            author: self.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            cover: self.cover,
            platform: self.platform,
            category: self.category,
            word_count: self.word_count,
            description: self
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            source_url: self.source_url,
        })
    }
}

/// Partial metadata returned by a standalone detail fetch.
///
/// Every field is independently optional; absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DetailMeta {
    /// True when nothing was found
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.platform.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let record = SearchRecordBuilder::new("  诡秘之主 ").build().unwrap();

        assert_eq!(record.title(), "诡秘之主");
        assert_eq!(record.author(), DEFAULT_AUTHOR);
        assert_eq!(record.description(), DEFAULT_DESCRIPTION);
        assert_eq!(record.word_count(), 0);
        assert_eq!(record.platform(), None);
        assert!(record.is_empty_shaped());
        assert!(!record.is_detail_shaped());
    }

    #[test]
    fn test_builder_rejects_empty_title() {
        assert!(SearchRecordBuilder::new("   ").author("someone").build().is_none());
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let record = SearchRecordBuilder::new("Title")
            .author("  ")
            .description("")
            .platform(" ")
            .build()
            .unwrap();

        assert!(record.has_default_author());
        assert!(record.has_default_description());
        assert_eq!(record.platform(), None);
    }

    #[test]
    fn test_detail_shaped() {
        let record = SearchRecordBuilder::new("Title")
            .description("A long synopsis")
            .build()
            .unwrap();
        assert!(record.is_detail_shaped());

        let with_author = SearchRecordBuilder::new("Title")
            .author("爱潜水的乌贼")
            .description("A long synopsis")
            .build()
            .unwrap();
        assert!(!with_author.is_detail_shaped());
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let record = SearchRecordBuilder::new("Title")
            .word_count(355_000)
            .source_url("https://www.yousuu.com/book/1")
            .build()
            .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["wordCount"], 355_000);
        assert_eq!(json["sourceUrl"], "https://www.yousuu.com/book/1");
        assert!(json.get("platform").is_none());
    }

    #[test]
    fn test_detail_meta_skips_missing_fields() {
        let meta = DetailMeta {
            platform: Some("起点中文网".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"platform":"起点中文网"}"#);
        assert!(!meta.is_empty());
        assert!(DetailMeta::default().is_empty());
    }
}
