//! Label/value field scanning shared by the list, detail and whole-page paths.
//!
//! Catalogue markup writes metadata as a short label followed by its value,
//! either in a sibling element (`<span>作者：</span><span>X</span>`) or inline
//! in the same element (`<p>作者：X</p>`). [`scan_label_value_fields`] turns
//! any subtree into a [`RawFieldTable`].

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::markup::MarkupNode;
use crate::utils::normalize_label;

/// Labels the scanners recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLabel {
    Author,
    Category,
    Platform,
    WordCount,
    Status,
}

impl FieldLabel {
    pub const ALL: [FieldLabel; 5] = [
        FieldLabel::Author,
        FieldLabel::Category,
        FieldLabel::Platform,
        FieldLabel::WordCount,
        FieldLabel::Status,
    ];

    /// Label spellings as they appear in markup
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            FieldLabel::Author => &["作者", "author"],
            FieldLabel::Category => &["类型", "分类", "类别", "category", "type"],
            FieldLabel::Platform => &["来源", "平台", "首发", "首发网站", "platform", "source"],
            FieldLabel::WordCount => &["字数", "总字数", "words", "word count"],
            FieldLabel::Status => &["状态", "status"],
        }
    }

    /// Match raw label text (whitespace and colons tolerated)
    pub fn recognize(raw: &str) -> Option<Self> {
        let normalized = normalize_label(raw);
        if normalized.is_empty() {
            return None;
        }

        Self::ALL.into_iter().find(|label| {
            label
                .aliases()
                .iter()
                .any(|alias| normalize_label(alias) == normalized)
        })
    }

    /// Regex matching `label[:：]value` at the start of a text, colon optional
    pub fn inline_regex(self) -> &'static Regex {
        static REGEXES: OnceLock<HashMap<FieldLabel, Regex>> = OnceLock::new();
        let regexes = REGEXES.get_or_init(|| {
            FieldLabel::ALL
                .into_iter()
                .map(|label| {
                    // Longest alias first so "首发网站" is not cut short by "首发"
                    let mut aliases = label.aliases().to_vec();
                    aliases.sort_by_key(|alias| std::cmp::Reverse(alias.chars().count()));
                    let alternatives = aliases
                        .iter()
                        .map(|alias| regex::escape(alias).replace(' ', r"\s*"))
                        .collect::<Vec<_>>()
                        .join("|");
                    let pattern = format!(r"(?i)^\s*(?:{})\s*[:：]?\s*(.*)$", alternatives);
                    (label, Regex::new(&pattern).expect("valid label regex"))
                })
                .collect()
        });
        &regexes[&self]
    }

    /// Extract the value following this label at the start of `text`.
    ///
    /// Returns `None` when the label is absent or nothing follows it.
    pub fn value_in(self, text: &str) -> Option<String> {
        let caps = self.inline_regex().captures(text)?;
        clean_value(caps.get(1)?.as_str())
    }
}

/// Strip stray separators left around a scraped value.
pub(crate) fn clean_value(raw: &str) -> Option<String> {
    let value = raw
        .trim()
        .trim_start_matches([':', '：'])
        .trim()
        .to_string();
    (!value.is_empty()).then_some(value)
}

/// Split `label：value` text into a recognized label and its value.
pub(crate) fn split_inline(text: &str) -> Option<(FieldLabel, String)> {
    let (label, value) = text.split_once([':', '：'])?;
    let label = FieldLabel::recognize(label)?;
    Some((label, clean_value(value)?))
}

/// Label → value mapping gathered from one subtree. First value per label wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldTable {
    fields: HashMap<FieldLabel, String>,
}

impl RawFieldTable {
    /// Record a value unless the label already has one or the value is blank
    pub fn insert(&mut self, label: FieldLabel, value: impl Into<String>) {
        let Some(value) = clean_value(&value.into()) else {
            return;
        };
        self.fields.entry(label).or_insert(value);
    }

    pub fn get(&self, label: FieldLabel) -> Option<&str> {
        self.fields.get(&label).map(String::as_str)
    }
}

/// Inline tags that may wrap the value of an inline `label：value` element.
const INLINE_VALUE_TAGS: [&str; 6] = ["a", "span", "em", "b", "strong", "i"];

/// Scan a subtree for label/value pairs, in document order.
pub fn scan_label_value_fields<N: MarkupNode>(node: &N) -> RawFieldTable {
    let mut table = RawFieldTable::default();

    let mut elements = vec![node.clone()];
    elements.extend(node.select_all("*"));

    for element in &elements {
        let children = element.children();

        // Sibling form: label element followed by its value element
        for pair in children.windows(2) {
            let Some(label) = FieldLabel::recognize(&pair[0].text()) else {
                continue;
            };
            let value = pair[1].text();
            if FieldLabel::recognize(&value).is_some() {
                continue;
            }
            table.insert(label, value);
        }

        // Inline form: `label：value` inside one element
        let inline_candidate = match children.as_slice() {
            [] => true,
            [only] => INLINE_VALUE_TAGS.contains(&only.tag_name().as_str()),
            _ => false,
        };
        if inline_candidate {
            if let Some((label, value)) = split_inline(&element.text()) {
                table.insert(label, value);
            }
        }
    }

    table
}
