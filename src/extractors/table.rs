// src/extractors/table.rs
//! Table-first strategy: find a row whose leading cell matches a label and
//! read the number chosen by the column policy.

use crate::extractors::document::Document;
use crate::extractors::numeric::{canonical_value, caption_scale, parse_cell, parse_number, NumericToken};
use crate::extractors::spec::{normalize_label, ColumnPolicy, FieldSpec, Label, Scale, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Selector};

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to compile ROW_SELECTOR"));

// A footnote reference in its own cell: "(1)", "(a)", "(ab)"
static FOOTNOTE_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((?:\d|[A-Za-z]{1,2})\)$").expect("Failed to compile FOOTNOTE_CELL_RE"));

// How far around a table to look for a "(in millions)" caption
const CAPTION_ANCESTOR_LEVELS: usize = 3;
const CAPTION_SIBLING_LOOKBACK: usize = 6;

/// A label prepared for row matching.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    normalized: String,
    under: Vec<String>,
}

impl LabelMatcher {
    pub fn new(label: &Label) -> Self {
        Self {
            normalized: normalize_label(&label.text),
            under: label.under.iter().map(|h| normalize_label(h)).collect(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        !self.under.is_empty()
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// `leading` is the normalized leading cell, `section` the normalized text
    /// of the closest heading row above it in the same table.
    pub fn matches(&self, leading: &str, section: Option<&str>) -> bool {
        if self.normalized.is_empty() || leading != self.normalized {
            return false;
        }
        if !self.is_scoped() {
            return true;
        }
        section.is_some_and(|heading| self.under.iter().any(|u| heading.contains(u.as_str())))
    }
}

/// Where a table match came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableHit {
    pub value: Decimal,
    pub table_index: usize,
    pub row_index: usize,
}

/// Scans every table in document order for the first row matching `label`.
pub fn find_in_tables(
    document: &Document,
    label: &LabelMatcher,
    spec: &FieldSpec,
    policy: ColumnPolicy,
) -> Option<TableHit> {
    for (table_index, table) in document.tables().enumerate() {
        let mut section: Option<String> = None;

        for (row_index, row) in table.select(&ROW_SELECTOR).enumerate() {
            let cells = row_cells(row);
            let Some(lead_pos) = cells.iter().position(|c| !c.is_empty()) else {
                continue;
            };
            if parse_number(&cells[lead_pos]).is_some() {
                continue; // header rows of years, not labels
            }

            let leading = normalize_label(&cells[lead_pos]);
            let numbers: Vec<NumericToken> = value_cells(&cells[lead_pos + 1..])
                .iter()
                .filter_map(|c| parse_cell(c))
                .collect();

            if numbers.is_empty() {
                if !leading.is_empty() {
                    section = Some(leading);
                }
                continue;
            }
            if !label.matches(&leading, section.as_deref()) {
                continue;
            }

            let token = match policy {
                ColumnPolicy::Leftmost => numbers.first(),
                ColumnPolicy::Rightmost => numbers.last(),
            }?;
            let caption = table_caption_scale(table, spec.kind)
                .or_else(|| caption_scale(document.text(), spec.kind));
            let Some(value) = canonical_value(token, spec.kind, caption, spec.default_scale) else {
                continue;
            };

            tracing::trace!(
                "Table match for '{}' on label '{}' (table {}, row {}): {}",
                spec.name,
                label.normalized(),
                table_index,
                row_index,
                value
            );
            return Some(TableHit { value, table_index, row_index });
        }
    }
    None
}

/// Text of each direct `td`/`th` child, whitespace collapsed.
fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| {
            let text: String = cell.text().collect();
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect()
}

/// Cells after the label, minus a footnote reference sitting right after it.
/// The reference is only dropped when a real value follows, so a lone `(5)`
/// still reads as -5.
fn value_cells(cells: &[String]) -> &[String] {
    let Some(first) = cells.iter().position(|c| !c.is_empty()) else {
        return cells;
    };
    let rest = &cells[first + 1..];
    if FOOTNOTE_CELL_RE.is_match(&cells[first]) && rest.iter().any(|c| parse_cell(c).is_some()) {
        rest
    } else {
        cells
    }
}

/// Looks for a scale caption inside the table, then in the elements just
/// before it (and before its parents).
fn table_caption_scale(table: ElementRef<'_>, kind: ValueKind) -> Option<Scale> {
    let own_text = table.text().collect::<Vec<_>>().join(" ");
    if let Some(scale) = caption_scale(&own_text, kind) {
        return Some(scale);
    }

    let mut level = Some(table);
    for _ in 0..CAPTION_ANCESTOR_LEVELS {
        let element = level?;
        for sibling in element
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .take(CAPTION_SIBLING_LOOKBACK)
        {
            let text = sibling.text().collect::<Vec<_>>().join(" ");
            if let Some(scale) = caption_scale(&text, kind) {
                return Some(scale);
            }
        }
        level = element.parent().and_then(ElementRef::wrap);
    }
    None
}
