//! Batch search models.

use crate::models::SearchRecord;
use crate::sources::SourceError;

/// Outcome of one keyword in a batch search.
#[derive(Debug)]
pub struct BatchEntry {
    /// Keyword as supplied by the caller
    pub keyword: String,

    /// Records found, or the error that stopped this keyword
    pub outcome: Result<Vec<SearchRecord>, SourceError>,
}

impl BatchEntry {
    /// Create a new batch entry
    pub fn new(keyword: impl Into<String>, outcome: Result<Vec<SearchRecord>, SourceError>) -> Self {
        Self {
            keyword: keyword.into(),
            outcome,
        }
    }

    /// Records found for this keyword (empty on error)
    pub fn records(&self) -> &[SearchRecord] {
        self.outcome.as_deref().unwrap_or(&[])
    }

    /// Whether the keyword failed
    pub fn is_err(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Summary counts over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub keywords: usize,
    pub matched: usize,
    pub empty: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Tally a finished batch
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut summary, entry| {
            summary.keywords += 1;
            match &entry.outcome {
                Ok(records) if records.is_empty() => summary.empty += 1,
                Ok(_) => summary.matched += 1,
                Err(_) => summary.failed += 1,
            }
            summary
        })
    }
}
