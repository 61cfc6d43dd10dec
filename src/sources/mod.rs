//! Catalogue sources with a trait-based interface.
//!
//! This module defines the [`Source`] trait implemented by [`CatalogueSource`],
//! the HTTP-backed search orchestrator, and by [`MockSource`] for consumers'
//! tests.
//!
//! # Errors
//!
//! Every operation fails only with a [`SourceError`]:
//!
//! - [`SourceError::Validation`]: the input was rejected before any I/O
//! - [`SourceError::Transport`]: the page could not be retrieved
//!
//! Pages that parse into nothing useful are not errors; they yield an empty
//! result.

mod catalogue;
pub mod mock;

pub use catalogue::{shorten_keyword, CatalogueSource};
pub use mock::MockSource;

use async_trait::async_trait;

use crate::models::{BatchEntry, DetailMeta, SearchRecord};
use crate::utils::ValidationError;

/// The Source trait defines the interface of a book catalogue.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search the catalogue for a free-text title or author keyword.
    ///
    /// An empty result is a normal outcome, not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<SearchRecord>, SourceError>;

    /// Fetch a detail page and return whatever metadata it carries
    async fn fetch_detail(&self, url: &str) -> Result<DetailMeta, SourceError>;

    /// Search several keywords one after another.
    ///
    /// Requests are never issued concurrently. One entry is returned per
    /// keyword, in input order, and a failure never aborts the batch.
    async fn search_batch(&self, keywords: &[String]) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(keywords.len());

        for (index, keyword) in keywords.iter().enumerate() {
            tracing::debug!("Batch search {}/{}: {}", index + 1, keywords.len(), keyword);
            let outcome = self.search(keyword).await;
            if let Err(e) = &outcome {
                tracing::warn!("Batch keyword {:?} failed: {}", keyword, e);
            }
            entries.push(BatchEntry::new(keyword.clone(), outcome));
        }

        entries
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout or body-read failure; retried over the timeout ladder
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network { attempts: usize, message: String },

    /// The server answered with a status outside 2xx/3xx; never retried
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request could not be built or sent at all (bad URL, redirect loop)
    #[error("Client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Whether another attempt on the timeout ladder may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network { .. })
    }

    /// Classify a reqwest failure for a single attempt
    pub fn from_reqwest(err: &reqwest::Error, url: &str) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return TransportError::Network {
                attempts: 1,
                message: format!("{}: {}", url, err),
            };
        }

        if let Some(status) = err.status() {
            return TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            };
        }

        TransportError::Client(format!("{}: {}", url, err))
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Invalid input, reported before any request is made
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The page could not be retrieved
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SourceError {
    /// HTTP status of a status failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
