//! Markup query layer.
//!
//! The classifier and extractors only talk to HTML through [`MarkupNode`]:
//! select by CSS query, walk element children, read text and attributes.
//! [`Node`] is the `scraper`-backed implementation and [`Page`] owns a parsed
//! document together with the URL it was finally served from.

use scraper::{ElementRef, Html, Selector};

use crate::utils::collapse_whitespace;

/// Structural queries over an element tree.
pub trait MarkupNode: Sized + Clone {
    /// All descendants matching a CSS query, in document order.
    ///
    /// An unparseable query matches nothing.
    fn select_all(&self, query: &str) -> Vec<Self>;

    /// First descendant matching a CSS query
    fn select_first(&self, query: &str) -> Option<Self> {
        self.select_all(query).into_iter().next()
    }

    /// Concatenated descendant text, whitespace collapsed and trimmed
    fn text(&self) -> String;

    /// Attribute value, trimmed; `None` when absent or blank
    fn attr(&self, name: &str) -> Option<String>;

    /// Element children in document order (text nodes skipped)
    fn children(&self) -> Vec<Self>;

    /// Lowercase tag name
    fn tag_name(&self) -> String;

    /// First descendant matched by any query, trying the queries in order
    fn select_first_of(&self, queries: &[&str]) -> Option<Self> {
        queries.iter().find_map(|query| self.select_first(query))
    }
}

fn parse_selector(query: &str) -> Option<Selector> {
    match Selector::parse(query) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!("Ignoring invalid selector {:?}: {:?}", query, e);
            None
        }
    }
}

/// An element of a parsed [`Page`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

impl<'a> Node<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> MarkupNode for Node<'a> {
    fn select_all(&self, query: &str) -> Vec<Self> {
        parse_selector(query)
            .map(|selector| self.element.select(&selector).map(Node::new).collect())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        collapse_whitespace(&self.element.text().collect::<String>())
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.element
            .value()
            .attr(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn children(&self) -> Vec<Self> {
        self.element.child_elements().map(Node::new).collect()
    }

    fn tag_name(&self) -> String {
        self.element.value().name().to_ascii_lowercase()
    }
}

/// A parsed page and the URL it was served from after redirects.
#[derive(Debug)]
pub struct Page {
    document: Html,
    url: String,
}

impl Page {
    /// Parse decoded HTML
    pub fn parse(html: &str, url: impl Into<String>) -> Self {
        Self {
            document: Html::parse_document(html),
            url: url.into(),
        }
    }

    /// Final resolved URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Root `<html>` element
    pub fn root(&self) -> Node<'_> {
        Node::new(self.document.root_element())
    }
}
