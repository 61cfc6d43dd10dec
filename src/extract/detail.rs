//! Detail page extraction.
//!
//! Detail pages come in several skins, so every field is resolved through an
//! ordered chain of independent strategies; a later strategy only runs when
//! the earlier ones produced nothing usable. Only the title is mandatory.

use crate::extract::classifier::is_detail_url;
use crate::extract::fields::{
    clean_value, scan_label_value_fields, split_inline, FieldLabel, RawFieldTable,
};
use crate::extract::list::extract_list_rows;
use crate::extract::{image_source, ExtractContext};
use crate::markup::MarkupNode;
use crate::models::{DetailMeta, SearchRecord, SearchRecordBuilder};
use crate::utils::{normalize_label, parse_word_count};

/// Large-font heading used by the main detail skin
const LARGE_TITLE_SELECTOR: &str = ".font-large, .text-large";

const TITLE_SELECTORS: [&str; 5] = ["h1", ".book-title", ".book-name", ".title", "h2"];

/// Separators between the work and the site name in `<title>`
const TITLE_SEPARATORS: [char; 7] = ['_', '-', '|', '–', '—', '·', '｜'];

const DETAIL_COVER_SELECTOR: &str = ".detail-cover img";

const COVER_SELECTORS: [&str; 4] = [
    ".book-cover img",
    ".cover img",
    "img.cover",
    "img[src*='cover']",
];

/// Containers holding the work's header block
const DETAIL_CONTAINER_SELECTORS: [&str; 3] = [".book-detail", ".detail-info", ".book-info"];

const TAB_PANE_SELECTOR: &str = ".tab-pane";

/// A synopsis block must be longer than this many characters
const MIN_SYNOPSIS_CHARS: usize = 20;

/// Words that only appear in the information table, never in a synopsis
const TABLE_KEYWORDS: [&str; 6] = ["类型", "分类", "来源", "平台", "字数", "状态"];

const SYNOPSIS_SELECTORS: [&str; 6] = [
    ".book-intro",
    ".intro",
    ".synopsis",
    ".description",
    "#intro",
    ".book-desc",
];

const INFO_LINE_SELECTORS: [&str; 3] = [".info-line", ".book-meta", ".tag-line"];

const INFO_LINE_SEPARATORS: [char; 5] = ['|', '｜', '·', '•', '/'];

const STATUS_WORDS: [&str; 6] = ["连载", "连载中", "完结", "已完结", "完本", "太监"];

/// Page-level declarations of the work's own address, in order of trust
const CANONICAL_LINK_SELECTORS: [(&str, &str); 2] = [
    (r#"link[rel="canonical"]"#, "href"),
    (r#"meta[property="og:url"]"#, "content"),
];

/// Fields resolved from a detail page; `None` means no strategy found it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub title: Option<String>,
    pub cover: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub platform: Option<String>,
    pub word_count: Option<u64>,
}

impl DetailFields {
    /// Fill every still-missing field from a label/value table
    fn absorb(&mut self, table: &RawFieldTable) {
        fill(&mut self.author, table.get(FieldLabel::Author));
        fill(&mut self.category, table.get(FieldLabel::Category));
        fill(&mut self.platform, table.get(FieldLabel::Platform));
        if self.word_count.is_none() {
            self.word_count = table.get(FieldLabel::WordCount).and_then(word_count);
        }
    }

    fn has_table_fields(&self) -> bool {
        self.category.is_some() || self.platform.is_some() || self.word_count.is_some()
    }

    /// Convert into a record; `None` without a title
    pub fn into_record(self, source_url: &str, ctx: &ExtractContext) -> Option<SearchRecord> {
        let title = self.title?;
        SearchRecordBuilder::new(title)
            .author(self.author.unwrap_or_default())
            .cover(
                self.cover
                    .map(|src| ctx.cover_url(&src))
                    .unwrap_or_default(),
            )
            .platform(self.platform.unwrap_or_default())
            .category(self.category.unwrap_or_default())
            .word_count(self.word_count.unwrap_or(0))
            .description(self.description.unwrap_or_default())
            .source_url(ctx.absolutize(source_url))
            .build()
    }

    /// Keep only the metadata a standalone detail fetch reports
    pub fn into_meta(self) -> DetailMeta {
        DetailMeta {
            category: self.category,
            platform: self.platform,
            description: self.description,
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        *slot = value.and_then(clean_value);
    }
}

fn word_count(raw: &str) -> Option<u64> {
    Some(parse_word_count(raw)).filter(|count| *count > 0)
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

// ---- title -------------------------------------------------------------

fn title_from_document_title(raw: &str) -> Option<String> {
    raw.split(TITLE_SEPARATORS)
        .map(|segment| segment.trim().trim_matches(['《', '》']).trim())
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn resolve_title<N: MarkupNode>(root: &N) -> Option<String> {
    if let Some(title) = root
        .select_first(LARGE_TITLE_SELECTOR)
        .and_then(|n| non_empty(n.text()))
    {
        return Some(title);
    }

    let from_selectors = TITLE_SELECTORS.iter().find_map(|selector| {
        root.select_first(selector)
            .and_then(|n| non_empty(n.text()))
    });
    if from_selectors.is_some() {
        return from_selectors;
    }

    root.select_first("title")
        .map(|n| n.text())
        .and_then(|raw| title_from_document_title(&raw))
}

// ---- cover -------------------------------------------------------------

fn resolve_cover<N: MarkupNode>(root: &N) -> Option<String> {
    root.select_first(DETAIL_COVER_SELECTOR)
        .and_then(|img| image_source(&img))
        .or_else(|| {
            COVER_SELECTORS
                .iter()
                .filter_map(|selector| root.select_first(selector))
                .find_map(|img| image_source(&img))
        })
}

// ---- author ------------------------------------------------------------

fn is_author_prefix(prefix: &str) -> bool {
    let normalized = normalize_label(prefix);
    let trimmed = prefix.trim_end();
    FieldLabel::Author.aliases().iter().any(|alias| {
        let alias = normalize_label(alias);
        normalized == alias
            || (normalized.ends_with(&alias) && (trimmed.ends_with(':') || trimmed.ends_with('：')))
    })
}

/// `作者：<a>name</a>`: an author label directly followed by a link
fn author_from_label_link<N: MarkupNode>(root: &N) -> Option<String> {
    root.select_all("*").into_iter().find_map(|element| {
        let link = element
            .children()
            .into_iter()
            .find(|child| child.tag_name() == "a")?;
        let name = non_empty(link.text())?;
        let text = element.text();
        let prefix = &text[..text.find(&name)?];
        is_author_prefix(prefix).then_some(name)
    })
}

fn detail_container<N: MarkupNode>(root: &N) -> N {
    root.select_first_of(&DETAIL_CONTAINER_SELECTORS)
        .unwrap_or_else(|| root.clone())
}

// ---- synopsis ----------------------------------------------------------

fn is_synopsis_block(text: &str) -> bool {
    text.chars().count() > MIN_SYNOPSIS_CHARS
        && !TABLE_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

fn synopsis_from_tab<N: MarkupNode>(pane: &N) -> Option<String> {
    pane.select_all("div")
        .into_iter()
        .map(|div| div.text())
        .find(|text| is_synopsis_block(text))
}

fn resolve_synopsis<N: MarkupNode>(root: &N, panes: &[N]) -> Option<String> {
    if let Some(synopsis) = panes.first().and_then(synopsis_from_tab) {
        return Some(synopsis);
    }

    let from_selectors = SYNOPSIS_SELECTORS.iter().find_map(|selector| {
        root.select_first(selector)
            .and_then(|n| non_empty(n.text()))
    });
    if from_selectors.is_some() {
        return from_selectors;
    }

    root.select_first(r#"meta[name="description"], meta[property="og:description"]"#)
        .and_then(|meta| meta.attr("content"))
}

// ---- information table & compact info line -----------------------------

const TABLE_LABELS: [FieldLabel; 4] = [
    FieldLabel::Category,
    FieldLabel::Platform,
    FieldLabel::WordCount,
    FieldLabel::Status,
];

/// Read table cells as `label：value` or as a label cell followed by a value cell
fn fields_from_table<N: MarkupNode>(pane: &N) -> RawFieldTable {
    let mut table = RawFieldTable::default();
    let cells: Vec<String> = pane
        .select_all("td, th")
        .into_iter()
        .map(|cell| cell.text())
        .collect();

    for (index, cell) in cells.iter().enumerate() {
        for label in TABLE_LABELS {
            if let Some(value) = label.value_in(cell) {
                table.insert(label, value);
            } else if FieldLabel::recognize(cell) == Some(label) {
                if let Some(next) = cells.get(index + 1) {
                    if FieldLabel::recognize(next).is_none() {
                        table.insert(label, next.as_str());
                    }
                }
            }
        }
    }

    table
}

fn looks_like_word_count(fragment: &str) -> bool {
    fragment.chars().any(|c| c.is_ascii_digit())
        && (fragment.contains('字') || fragment.contains('万'))
}

fn info_line_fragments<N: MarkupNode>(line: &N) -> Vec<String> {
    let text = line.text();
    let fragments: Vec<String> = if text.contains(INFO_LINE_SEPARATORS) {
        text.split(INFO_LINE_SEPARATORS).map(str::to_string).collect()
    } else {
        let children = line.children();
        if children.len() >= 2 {
            // Icon-separated: icons carry no text, so each text child is a fragment
            children.iter().map(|child| child.text()).collect()
        } else {
            text.split_whitespace().map(str::to_string).collect()
        }
    };

    fragments
        .into_iter()
        .map(|fragment| fragment.trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Decompose a line like `起点中文网 | 玄幻 | 连载 | 35.5万字` by position
fn fields_from_info_line<N: MarkupNode>(line: &N) -> RawFieldTable {
    let mut table = RawFieldTable::default();
    let mut positional = Vec::new();

    for fragment in info_line_fragments(line) {
        if let Some((label, value)) = split_inline(&fragment) {
            table.insert(label, value);
        } else if looks_like_word_count(&fragment) {
            table.insert(FieldLabel::WordCount, fragment);
        } else if STATUS_WORDS.contains(&fragment.as_str()) {
            table.insert(FieldLabel::Status, fragment);
        } else {
            positional.push(fragment);
        }
    }

    let mut positional = positional.into_iter();
    if let Some(platform) = positional.next() {
        table.insert(FieldLabel::Platform, platform);
    }
    if let Some(category) = positional.next() {
        table.insert(FieldLabel::Category, category);
    }

    table
}

// ---- assembly ----------------------------------------------------------

/// Resolve every detail field through its fallback chain.
pub fn extract_detail_fields<N: MarkupNode>(root: &N) -> DetailFields {
    let panes = root.select_all(TAB_PANE_SELECTOR);
    let mut fields = DetailFields {
        title: resolve_title(root),
        cover: resolve_cover(root),
        ..Default::default()
    };

    fields.author = author_from_label_link(root).or_else(|| {
        scan_label_value_fields(&detail_container(root))
            .get(FieldLabel::Author)
            .map(str::to_string)
    });

    fields.description = resolve_synopsis(root, &panes);

    if let Some(info_pane) = panes.get(1) {
        fields.absorb(&fields_from_table(info_pane));
    }
    if !fields.has_table_fields() {
        if let Some(line) = root.select_first_of(&INFO_LINE_SELECTORS) {
            tracing::debug!("Information table empty; decomposing compact info line");
            fields.absorb(&fields_from_info_line(&line));
        }
    }

    let page_fields = scan_label_value_fields(root);
    if !fields.has_table_fields() {
        tracing::debug!("No table or info line; scanning whole page for labels");
    }
    // Covers both the whole-page fallback and the final backfill pass
    fields.absorb(&page_fields);

    fields
}

// ---- source url --------------------------------------------------------

/// Address of the work shown on the page.
///
/// A redirect that already landed on a detail path is trusted as is. Pages
/// served under a search URL fall back to the link of their only
/// detail-shaped row, then to the page's canonical declarations, and only
/// then to the URL they were fetched from.
fn canonical_url<N: MarkupNode>(root: &N, resolved_url: &str, ctx: &ExtractContext) -> String {
    if is_detail_url(resolved_url) {
        return resolved_url.to_string();
    }

    let linked_rows: Vec<String> = extract_list_rows(root, ctx)
        .into_iter()
        .filter(SearchRecord::is_detail_shaped)
        .map(|record| record.source_url().to_string())
        .collect();
    if let [only] = linked_rows.as_slice() {
        if !only.is_empty() {
            return only.clone();
        }
    }

    CANONICAL_LINK_SELECTORS
        .iter()
        .find_map(|(selector, attr)| root.select_first(selector).and_then(|n| n.attr(attr)))
        .unwrap_or_else(|| resolved_url.to_string())
}

/// Extract a detail page into one record; `None` when no title resolves.
pub fn extract_detail<N: MarkupNode>(
    root: &N,
    resolved_url: &str,
    ctx: &ExtractContext,
) -> Option<SearchRecord> {
    let source_url = canonical_url(root, resolved_url, ctx);
    let record = extract_detail_fields(root).into_record(&source_url, ctx);
    if record.is_none() {
        tracing::debug!("No title found on detail page {}", resolved_url);
    }
    record
}
