//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{DetailMeta, SearchRecord, SearchRecordBuilder};
use crate::sources::{Source, SourceError};
use crate::utils::{validate_detail_url, validate_keyword};

/// A mock source that returns predefined responses.
///
/// Keywords and URLs without a canned response yield an empty result. Input
/// validation matches [`CatalogueSource`](crate::sources::CatalogueSource).
#[derive(Debug, Default)]
pub struct MockSource {
    search_responses: Mutex<HashMap<String, Result<Vec<SearchRecord>, SourceError>>>,
    detail_responses: Mutex<HashMap<String, DetailMeta>>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records returned for a keyword.
    pub fn set_search_response(&self, keyword: &str, records: Vec<SearchRecord>) {
        let mut guard = self.search_responses.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(keyword.trim().to_string(), Ok(records));
    }

    /// Make a keyword fail with the given error.
    pub fn set_search_error(&self, keyword: &str, error: SourceError) {
        let mut guard = self.search_responses.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(keyword.trim().to_string(), Err(error));
    }

    /// Set the metadata returned for a detail URL.
    pub fn set_detail_response(&self, url: &str, meta: DetailMeta) {
        let mut guard = self.detail_responses.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(url.trim().to_string(), meta);
    }

    /// Clear all configured responses.
    pub fn clear_responses(&self) {
        self.search_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.detail_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Keywords searched so far, in call order.
    pub fn searched_keywords(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, keyword: &str) -> Result<Vec<SearchRecord>, SourceError> {
        let keyword = validate_keyword(keyword)?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(keyword.clone());

        let guard = self.search_responses.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(&keyword).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_detail(&self, url: &str) -> Result<DetailMeta, SourceError> {
        let url = validate_detail_url(url)?;
        let guard = self.detail_responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(&url).cloned().unwrap_or_default())
    }
}

/// Helper function to create a mock record for testing; `None` for a blank title.
pub fn make_record(title: &str, author: &str, word_count: u64) -> Option<SearchRecord> {
    SearchRecordBuilder::new(title)
        .author(author)
        .word_count(word_count)
        .description(format!("{}的简介", title))
        .source_url(format!("https://www.yousuu.com/book/{}", word_count))
        .build()
}
