//! Input validation for search keywords and detail-page URLs.
//!
//! Validation failures are surfaced immediately to the caller and are never
//! retried.

use thiserror::Error;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Search keyword is empty")]
    EmptyKeyword,

    #[error("Detail URL is empty")]
    EmptyUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Validate a free-text search keyword.
///
/// Returns the trimmed keyword, or [`ValidationError::EmptyKeyword`] when
/// nothing is left after trimming.
pub fn validate_keyword(keyword: &str) -> Result<String, ValidationError> {
    let keyword = keyword.trim();

    if keyword.is_empty() {
        return Err(ValidationError::EmptyKeyword);
    }

    Ok(keyword.to_string())
}

/// Validate a detail-page URL before it is handed to the transport.
///
/// Relative paths are accepted (they are resolved against the base origin
/// later); absolute URLs must parse and use an HTTP scheme.
pub fn validate_detail_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    // Check for null bytes and embedded newlines
    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(ValidationError::InvalidUrl(
            "contains control characters".to_string(),
        ));
    }

    let lower = url.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let parsed =
            url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        if parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl("missing host".to_string()));
        }
    } else if lower.starts_with("javascript:") || lower.starts_with("data:") {
        return Err(ValidationError::InvalidUrl(format!(
            "unsupported scheme in {}",
            url
        )));
    }

    Ok(url.to_string())
}
