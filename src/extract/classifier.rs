//! Listing vs. detail page classification.
//!
//! The catalogue renders listing rows and single-work detail fragments with
//! the same markup, and a search for an exact title often redirects straight
//! to the work's page. Structure alone cannot tell the two apart, so the
//! decision is an ordered rule table mixing URL shape, structural markers and
//! row content shape. Rules are evaluated top-down; the first match wins.

use regex::Regex;
use std::sync::OnceLock;

use crate::extract::list::extract_list_rows;
use crate::extract::ExtractContext;
use crate::markup::MarkupNode;
use crate::models::SearchRecord;

/// Elements only a detail page carries.
const DETAIL_MARKERS: [&str; 4] = [
    ".tab-pane",
    ".detail-cover",
    ".font-large",
    ".book-detail",
];

/// Rows inspected by the misrendered-listing rule.
const LEADING_ROWS: usize = 3;

/// Detail-shaped rows among the leading rows needed to call it a detail page.
const MISRENDERED_MAJORITY: usize = 2;

fn detail_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/book/\d+(?:\.html?)?/?$").expect("valid detail path regex"))
}

/// Whether a URL (absolute or root-relative) has the detail-page path shape
pub fn is_detail_url(url: &str) -> bool {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    detail_path_regex().is_match(&path)
}

/// Which rule decided the page type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    /// Final URL has the detail path shape
    DetailUrl,
    /// One row, with a synopsis but no author or word count
    SingleDetailShapedRow,
    /// Detail markers present and at most one row
    DetailMarkersFewRows,
    /// Detail markers present and most leading rows are detail-shaped
    DetailMarkersMisrenderedRows,
    /// Nothing pointed at a detail page
    Listing,
}

impl ClassificationRule {
    pub fn is_detail(self) -> bool {
        !matches!(self, ClassificationRule::Listing)
    }
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationDecision {
    pub is_detail_page: bool,
    pub rule: ClassificationRule,
}

impl From<ClassificationRule> for ClassificationDecision {
    fn from(rule: ClassificationRule) -> Self {
        Self {
            is_detail_page: rule.is_detail(),
            rule,
        }
    }
}

/// Facts gathered once per page and fed to every rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PageEvidence {
    pub detail_url: bool,
    pub has_detail_markers: bool,
    pub row_count: usize,
    /// Detail-shape flag of the first [`LEADING_ROWS`] rows
    pub leading_rows_detail_shaped: Vec<bool>,
}

impl PageEvidence {
    pub(crate) fn gather<N: MarkupNode>(
        root: &N,
        resolved_url: &str,
        ctx: &ExtractContext,
    ) -> Self {
        let rows = extract_list_rows(root, ctx);
        Self {
            detail_url: is_detail_url(resolved_url),
            has_detail_markers: DETAIL_MARKERS
                .iter()
                .any(|marker| root.select_first(marker).is_some()),
            row_count: rows.len(),
            leading_rows_detail_shaped: rows
                .iter()
                .take(LEADING_ROWS)
                .map(SearchRecord::is_detail_shaped)
                .collect(),
        }
    }
}

type RulePredicate = fn(&PageEvidence) -> bool;

fn detail_url(e: &PageEvidence) -> bool {
    e.detail_url
}

fn single_detail_shaped_row(e: &PageEvidence) -> bool {
    e.row_count == 1 && e.leading_rows_detail_shaped.first().copied().unwrap_or(false)
}

fn detail_markers_few_rows(e: &PageEvidence) -> bool {
    e.has_detail_markers && e.row_count <= 1
}

fn detail_markers_misrendered_rows(e: &PageEvidence) -> bool {
    let shaped = e
        .leading_rows_detail_shaped
        .iter()
        .filter(|shaped| **shaped)
        .count();
    e.has_detail_markers && e.row_count > 1 && shaped >= MISRENDERED_MAJORITY
}

/// The ordered rule table. Order is significant.
const RULES: [(ClassificationRule, RulePredicate); 4] = [
    (ClassificationRule::DetailUrl, detail_url),
    (ClassificationRule::SingleDetailShapedRow, single_detail_shaped_row),
    (ClassificationRule::DetailMarkersFewRows, detail_markers_few_rows),
    (
        ClassificationRule::DetailMarkersMisrenderedRows,
        detail_markers_misrendered_rows,
    ),
];

pub(crate) fn decide(evidence: &PageEvidence) -> ClassificationDecision {
    RULES
        .iter()
        .find(|(_, predicate)| predicate(evidence))
        .map(|(rule, _)| *rule)
        .unwrap_or(ClassificationRule::Listing)
        .into()
}

/// Classify a fetched page as a listing or a detail page.
pub fn classify<N: MarkupNode>(
    root: &N,
    resolved_url: &str,
    ctx: &ExtractContext,
) -> ClassificationDecision {
    let evidence = PageEvidence::gather(root, resolved_url, ctx);
    let decision = decide(&evidence);
    tracing::debug!(
        url = resolved_url,
        rows = evidence.row_count,
        markers = evidence.has_detail_markers,
        rule = ?decision.rule,
        "Classified page"
    );
    decision
}
