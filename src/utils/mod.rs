//! Utility modules supporting catalogue searches.
//!
//! - [`HttpClient`]: HTTP client bound to the catalogue origin, retrying over a timeout ladder
//! - [`with_timeout_ladder`]: run an operation over a [`RetryPolicy`]
//! - [`decode`]: turn a response body into text using header, BOM and `<meta>` hints
//! - [`parse_word_count`], [`normalize_url`], [`proxy_image_url`]: field normalizers
//! - [`validate_keyword`], [`validate_detail_url`]: input validation
//!
//! # Retry over a timeout ladder
//!
//! ```rust,no_run
//! use bookmeta::utils::{with_timeout_ladder, RetryPolicy, TokioSleeper};
//! use bookmeta::sources::TransportError;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), TransportError> {
//! let policy = RetryPolicy::default();
//! let body = with_timeout_ladder(&policy, &TokioSleeper, |attempt, timeout| async move {
//!     println!("attempt {} with timeout {:?}", attempt, timeout);
//!     Ok::<_, TransportError>("page")
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod charset;
mod http;
mod normalize;
mod retry;
mod validate;

pub use charset::{decode, detect_encoding, DEFAULT_CHARSET};
pub use http::{FetchedPage, HttpClient, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT};
pub use normalize::{
    collapse_whitespace, normalize_label, normalize_url, parse_word_count, proxy_image_url,
};
pub use retry::{
    with_timeout_ladder, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BACKOFF_BASE,
    DEFAULT_TIMEOUT_LADDER_SECS,
};
pub use validate::{validate_detail_url, validate_keyword, ValidationError};
