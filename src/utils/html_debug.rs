// src/utils/html_debug.rs
use crate::utils::error::AppError;
use regex::Regex;
use std::fs;
use std::path::Path;

// Background colors cycled across highlight types
const PALETTE: &[&str] = &["#FFFF00", "#90EE90", "#ADD8E6", "#FFA500", "#FFC0CB"];

/// A byte range of the raw HTML to highlight, tagged with what matched there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub kind: String,
}

/// Wraps each highlight in a titled `<span>`. Overlapping highlights after the
/// first one are dropped.
pub fn annotate_html(html: &str, highlights: &[Highlight]) -> String {
    let mut kinds: Vec<&str> = highlights.iter().map(|h| h.kind.as_str()).collect();
    kinds.sort_unstable();
    kinds.dedup();

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    for (i, kind) in kinds.iter().enumerate() {
        debug_html.push_str(&format!(
            ".highlight-{} {{ background-color: {}; }}\n",
            i,
            PALETTE[i % PALETTE.len()]
        ));
        debug_html.push_str(&format!("/* highlight-{} = {} */\n", i, kind));
    }
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|h| (h.start, h.end));

    let mut last_pos = 0;
    for highlight in sorted {
        if highlight.start < last_pos || highlight.end > html.len() {
            continue;
        }
        debug_html.push_str(&html[last_pos..highlight.start]);

        let class = kinds.iter().position(|k| *k == highlight.kind).unwrap_or(0);
        debug_html.push_str(&format!(
            "<span class=\"highlight-{}\" title=\"Position: {}-{}, Field: {}\">",
            class, highlight.start, highlight.end, highlight.kind
        ));
        debug_html.push_str(&html[highlight.start..highlight.end]);
        debug_html.push_str("</span>");

        last_pos = highlight.end;
    }
    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    debug_html
}

/// Creates a debug version of an HTML document with every match of the given
/// `(kind, pattern)` regexes highlighted, and writes it to `path`.
pub fn create_debug_html<P: AsRef<Path>>(html: &str, path: P, patterns: &[(&str, &str)]) -> Result<(), AppError> {
    let mut highlights = Vec::new();

    for (kind, pattern) in patterns {
        let re = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("Invalid regex pattern '{}': {}", pattern, e)))?;
        highlights.extend(re.find_iter(html).map(|m| Highlight {
            start: m.start(),
            end: m.end(),
            kind: kind.to_string(),
        }));
    }

    fs::write(path.as_ref(), annotate_html(html, &highlights))?;
    tracing::info!("Saved debug HTML to {} ({} highlights)", path.as_ref().display(), highlights.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_wraps_matches_and_skips_overlaps() {
        let html = "<td>Net income</td><td>1,234</td>";
        let highlights = vec![
            Highlight { start: 4, end: 14, kind: "net_income".to_string() },
            Highlight { start: 8, end: 14, kind: "other".to_string() },
        ];
        let annotated = annotate_html(html, &highlights);

        assert!(annotated.contains(
            "<td><span class=\"highlight-0\" title=\"Position: 4-14, Field: net_income\">Net income</span></td><td>1,234</td>"
        ));
        assert_eq!(annotated.matches("<span").count(), 1);
    }

    #[test]
    fn test_create_debug_html_rejects_bad_pattern() {
        let path = std::env::temp_dir().join("filing_metrics_bad_pattern.html");
        let result = create_debug_html("<p>x</p>", &path, &[("net_income", "(")]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
