//! Listing page extraction.

use crate::extract::fields::{scan_label_value_fields, FieldLabel};
use crate::extract::{image_source, ExtractContext};
use crate::markup::MarkupNode;
use crate::models::{SearchRecord, SearchRecordBuilder};
use crate::utils::parse_word_count;

/// Query matching one listing row.
pub const ROW_SELECTOR: &str = ".book-list .book-item, .result-list .result-item";

const TITLE_SELECTORS: [&str; 5] = [".book-title", ".title a", "h3 a", "h3", "h4 a"];

const SYNOPSIS_SELECTORS: [&str; 4] = [".book-intro", ".intro", ".desc", "p.description"];

/// Row nodes of a listing, in document order
pub fn row_nodes<N: MarkupNode>(root: &N) -> Vec<N> {
    root.select_all(ROW_SELECTOR)
}

fn row_link<N: MarkupNode>(row: &N, title: &N) -> Option<String> {
    title
        .attr("href")
        .or_else(|| title.select_first("a[href]").and_then(|a| a.attr("href")))
        .or_else(|| row.select_first("a[href]").and_then(|a| a.attr("href")))
}

/// Turn one row into a record; rows without a title are skipped
pub fn extract_row<N: MarkupNode>(row: &N, ctx: &ExtractContext) -> Option<SearchRecord> {
    let title_node = row.select_first_of(&TITLE_SELECTORS)?;
    let title = title_node.text();
    if title.is_empty() {
        return None;
    }

    let fields = scan_label_value_fields(row);
    let description = row
        .select_first_of(&SYNOPSIS_SELECTORS)
        .map(|node| node.text())
        .unwrap_or_default();
    let cover = row
        .select_first("img")
        .and_then(|img| image_source(&img))
        .map(|src| ctx.cover_url(&src))
        .unwrap_or_default();
    let source_url = row_link(row, &title_node)
        .map(|href| ctx.absolutize(&href))
        .unwrap_or_default();

    SearchRecordBuilder::new(title)
        .author(fields.get(FieldLabel::Author).unwrap_or_default())
        .category(fields.get(FieldLabel::Category).unwrap_or_default())
        .platform(fields.get(FieldLabel::Platform).unwrap_or_default())
        .word_count(
            fields
                .get(FieldLabel::WordCount)
                .map(parse_word_count)
                .unwrap_or(0),
        )
        .description(description)
        .cover(cover)
        .source_url(source_url)
        .build()
}

/// Every titled row of a listing, truncated to `ctx.max_results`, without the
/// "no results" post-pass.
pub fn extract_list_rows<N: MarkupNode>(root: &N, ctx: &ExtractContext) -> Vec<SearchRecord> {
    row_nodes(root)
        .iter()
        .filter_map(|row| extract_row(row, ctx))
        .take(ctx.max_results)
        .collect()
}

/// True when every record carries nothing but a title.
///
/// That shape means the markup matched but held no real results.
pub fn is_unparseable_batch(records: &[SearchRecord]) -> bool {
    !records.is_empty() && records.iter().all(SearchRecord::is_empty_shaped)
}

/// Extract a listing page's records.
pub fn extract_list<N: MarkupNode>(root: &N, ctx: &ExtractContext) -> Vec<SearchRecord> {
    let records = extract_list_rows(root, ctx);
    if is_unparseable_batch(&records) {
        tracing::debug!(
            "All {} listing rows are empty-shaped; treating as no results",
            records.len()
        );
        return Vec::new();
    }
    records
}
