//! HTTP-backed catalogue search.
//!
//! A search fetches the catalogue's search endpoint, decodes the body, decides
//! whether the server answered with a listing or redirected straight to a
//! work's detail page, and runs the matching extractor.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::Config;
use crate::extract::{classify, extract_detail, extract_detail_fields, extract_list, ExtractContext};
use crate::markup::Page;
use crate::models::{DetailMeta, SearchRecord};
use crate::sources::{Source, SourceError};
use crate::utils::{decode, validate_detail_url, validate_keyword, FetchedPage, HttpClient};

/// Search orchestrator for the remote catalogue.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct CatalogueSource {
    client: HttpClient,
    ctx: ExtractContext,
    search_path: String,
    default_charset: String,
    allow_keyword_truncation: bool,
}

impl CatalogueSource {
    /// Create a source with the default configuration
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&Config::default())
    }

    /// Create a source from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a source around an existing client
    pub fn with_client(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            ctx: ExtractContext::from_config(config),
            search_path: config.source.search_path.clone(),
            default_charset: config.transport.default_charset.clone(),
            allow_keyword_truncation: config.extraction.allow_keyword_truncation,
        }
    }

    fn search_path_for(&self, keyword: &str) -> String {
        format!("{}{}", self.search_path, urlencoding::encode(keyword))
    }

    fn parse(&self, fetched: &FetchedPage) -> Page {
        let html = decode(&fetched.bytes, &fetched.headers, &self.default_charset);
        Page::parse(&html, fetched.final_url.clone())
    }

    async fn search_once(&self, keyword: &str) -> Result<Vec<SearchRecord>, SourceError> {
        let fetched = self.client.fetch(&self.search_path_for(keyword)).await?;
        let records = records_from_page(&self.parse(&fetched), &self.ctx);
        tracing::info!(
            "Search {:?} returned {} record(s) from {} (HTTP {})",
            keyword,
            records.len(),
            fetched.final_url,
            fetched.status
        );
        Ok(records)
    }
}

/// Classify a search response and run the matching extractor.
pub(crate) fn records_from_page(page: &Page, ctx: &ExtractContext) -> Vec<SearchRecord> {
    let root = page.root();

    if classify(&root, page.url(), ctx).is_detail_page {
        return extract_detail(&root, page.url(), ctx).into_iter().collect();
    }

    let records = extract_list(&root, ctx);

    // A listing holding a detail-shaped row is usually a misrendered detail
    // page; the detail extractor gets the first go at it.
    if records.iter().any(SearchRecord::is_detail_shaped) {
        if let Some(record) = extract_detail(&root, page.url(), ctx) {
            tracing::debug!("Listing re-dispatched to the detail extractor");
            return vec![record];
        }
    }

    records
}

fn keyword_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?[^\d\s])\s*(?:（[^（）]*）|\([^()]*\)|【[^【】]*】|\d+)$")
            .expect("valid keyword suffix regex")
    })
}

/// Drop a trailing volume number or bracketed edition note from a keyword.
///
/// Returns `None` when there is nothing to remove.
pub fn shorten_keyword(keyword: &str) -> Option<String> {
    let caps = keyword_suffix_regex().captures(keyword.trim())?;
    let shorter = caps.get(1)?.as_str().trim();
    (!shorter.is_empty()).then(|| shorter.to_string())
}

#[async_trait]
impl Source for CatalogueSource {
    fn id(&self) -> &str {
        "catalogue"
    }

    fn name(&self) -> &str {
        "Catalogue"
    }

    async fn search(&self, keyword: &str) -> Result<Vec<SearchRecord>, SourceError> {
        let keyword = validate_keyword(keyword)?;
        let records = self.search_once(&keyword).await?;

        if records.is_empty() && self.allow_keyword_truncation {
            if let Some(shorter) = shorten_keyword(&keyword) {
                tracing::warn!(
                    "No results for {:?}; retrying as {:?}, which may match a different work",
                    keyword,
                    shorter
                );
                return self.search_once(&shorter).await;
            }
        }

        Ok(records)
    }

    async fn fetch_detail(&self, url: &str) -> Result<DetailMeta, SourceError> {
        let url = validate_detail_url(url)?;
        let fetched = self.client.fetch(&url).await?;
        let meta = extract_detail_fields(&self.parse(&fetched).root()).into_meta();

        if meta.is_empty() {
            tracing::debug!("No detail metadata found at {}", fetched.final_url);
        }
        Ok(meta)
    }
}
