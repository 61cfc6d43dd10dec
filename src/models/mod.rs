//! Core data models for book records and batch searches.

mod book;
mod search;

pub use book::{DetailMeta, SearchRecord, SearchRecordBuilder, DEFAULT_AUTHOR, DEFAULT_DESCRIPTION};
pub use search::{BatchEntry, BatchSummary};
