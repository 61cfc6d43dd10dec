//! # bookmeta
//!
//! Bibliographic metadata extraction for a web book catalogue.
//!
//! Given a free-text title or author keyword, bookmeta fetches the catalogue's
//! search page, tells listing pages apart from single-work detail pages, and
//! turns either into structured [`SearchRecord`]s.
//!
//! ## Architecture
//!
//! - [`sources`]: the [`Source`] trait and the HTTP-backed [`CatalogueSource`]
//! - [`extract`]: page classification, list and detail extraction
//! - [`markup`]: CSS-query layer over parsed HTML
//! - [`models`]: records and batch results
//! - [`utils`]: transport, charset decoding, normalizers and validation
//! - [`config`]: configuration management
//!
//! ```rust,no_run
//! use bookmeta::{CatalogueSource, Source};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), bookmeta::SourceError> {
//! let source = CatalogueSource::new()?;
//! for record in source.search("诡秘之主").await? {
//!     println!("{} / {}", record.title(), record.author());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod extract;
pub mod markup;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{BatchEntry, DetailMeta, SearchRecord};
pub use sources::{CatalogueSource, Source, SourceError, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
