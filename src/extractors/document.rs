// src/extractors/document.rs
use crate::utils::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html, Selector};

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z!/]").expect("Failed to compile MARKUP_RE"));
static TABLE_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<table\b").expect("Failed to compile TABLE_OPEN_RE"));
static TABLE_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</table\s*>").expect("Failed to compile TABLE_CLOSE_RE"));

// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

// Text inside these flows into its surrounding block without a break
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "big", "bdi", "bdo", "cite", "code", "em", "font", "i", "mark", "q", "s",
    "small", "span", "strong", "sub", "sup", "tt", "u",
];

/// A filing document parsed for extraction: the element tree plus its
/// reader-visible text with whitespace collapsed.
pub struct Document {
    html: Html,
    text: String,
}

impl Document {
    /// Parses raw HTML. `None` means the tree is unavailable and nothing in
    /// the document should be trusted.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Err(reason) = check_well_formed(raw) {
            tracing::warn!("Document rejected before extraction: {}", reason);
            return None;
        }

        let html = Html::parse_document(raw);
        if !html.errors.is_empty() {
            tracing::trace!("HTML parser recovered from {} errors", html.errors.len());
        }
        let text = visible_text(&html);
        Some(Self { html, text })
    }

    /// All `<table>` elements in document order.
    pub fn tables(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html.select(&TABLE_SELECTOR)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Structural checks run before building a tree. The HTML parser recovers from
/// anything, so truncation has to be caught on the raw text.
pub fn check_well_formed(raw: &str) -> Result<(), ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if raw.contains('\0') {
        return Err(ParseError::Binary);
    }
    if !MARKUP_RE.is_match(raw) {
        return Err(ParseError::NoMarkup);
    }
    if let Some(open) = raw.rfind('<') {
        if raw.rfind('>').map_or(true, |close| close < open) {
            return Err(ParseError::TruncatedTag);
        }
    }
    let opened = TABLE_OPEN_RE.find_iter(raw).count();
    let closed = TABLE_CLOSE_RE.find_iter(raw).count();
    if opened > closed {
        return Err(ParseError::UnclosedTable { opened, closed });
    }
    Ok(())
}

/// Collects visible text. Text nodes sharing a block element are joined
/// directly; crossing into another block (cell, paragraph, div) inserts a space.
fn visible_text(html: &Html) -> String {
    let mut text = String::new();
    let mut last_block: Option<ElementRef<'_>> = None;

    for node in html.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let parent = match node.parent().and_then(ElementRef::wrap) {
            Some(parent) => parent,
            None => continue,
        };
        if std::iter::once(parent)
            .chain(parent.ancestors().filter_map(ElementRef::wrap))
            .any(|el| HIDDEN_ELEMENTS.contains(&el.value().name()))
        {
            continue;
        }

        let block = block_ancestor(parent);
        if last_block.is_some_and(|prev| prev.id() != block.id()) {
            text.push(' ');
        }
        last_block = Some(block);
        text.push_str(&chunk.text);
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn block_ancestor(element: ElementRef<'_>) -> ElementRef<'_> {
    let mut current = element;
    loop {
        let name = current.value().name();
        let inline = INLINE_ELEMENTS.contains(&name) || name.starts_with("ix:");
        if !inline {
            return current;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_and_plain_text() {
        assert!(matches!(check_well_formed("   \n"), Err(ParseError::Empty)));
        assert!(matches!(check_well_formed("net income of $5"), Err(ParseError::NoMarkup)));
        assert!(matches!(check_well_formed("<p>a\0b</p>"), Err(ParseError::Binary)));
    }

    #[test]
    fn test_rejects_truncated_documents() {
        assert!(matches!(
            check_well_formed("<html><body><p>Net income of $5 million</p"),
            Err(ParseError::TruncatedTag)
        ));
        assert!(matches!(
            check_well_formed("<html><body><table><tr><td>Net income</td><td>$1,2"),
            Err(ParseError::UnclosedTable { opened: 1, closed: 0 })
        ));
        assert!(Document::parse("<html><body><table><tr><td>Net").is_none());
    }

    #[test]
    fn test_accepts_fragments_and_full_documents() {
        assert!(check_well_formed("<table><tr><td>Net income</td></tr></table>").is_ok());
        assert!(check_well_formed("<p>Net income of $5 million</p>").is_ok());
        assert!(Document::parse("<!DOCTYPE html><html><body><p>x</p></body></html>").is_some());
    }

    #[test]
    fn test_visible_text_skips_hidden_and_joins_inline() {
        let html = r#"<html><head><title>10-Q</title><style>td { color: red }</style></head><body>
            <p>Net <b>income</b> of <span>$</span><span>(456)</span> million</p>
            <script>var netIncome = 1;</script>
            <table><tr><td><span>Net income</span></td><td><span>1,234</span></td></tr></table>
            </body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.text(), "Net income of $(456) million Net income 1,234");
        assert_eq!(doc.tables().count(), 1);
    }
}
