// src/extractors/text.rs
//! Text fallback: ordered regexes anchored on a label phrase followed, within a
//! bounded window, by a numeric token.

use crate::extractors::numeric::{canonical_value, parse_number, NumericToken};
use crate::extractors::spec::{normalize_label, Scale, ValueKind};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;

/// Maximum number of characters between a label and the start of its value.
pub const LABEL_VALUE_WINDOW: usize = 60;

// Extra room past the window so a value starting near its edge is read whole
const VALUE_TAIL: usize = 40;

// Numeric token with optional currency, sign/parentheses and trailing scale word
const VALUE_FRAGMENT: &str = r"(?P<value>\(?\s*(?:US)?\s*[$€£]?\s*\(?\s*-?\s*(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*%?\s*\)?)(?:\s*(?P<scale>thousand|million|billion)s?\b)?";

// Separators allowed between label words, in visible text and in raw HTML
const LABEL_WORD_SEPARATOR: &str = r"(?:[\s\-–—]|&nbsp;|&#160;|&#xa0;)+";

static VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){}", VALUE_FRAGMENT)).expect("Failed to compile VALUE_RE"));

// Text right before a day of month: "September ", "Sept. "
static MONTH_BEFORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept?|oct|nov|dec)\.?\s+$")
        .expect("Failed to compile MONTH_BEFORE_RE")
});

// Text right before a year in a full date: "September 30, "
static MONTH_DAY_BEFORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept?|oct|nov|dec)\.?\s+\d{1,2},?\s+$")
        .expect("Failed to compile MONTH_DAY_BEFORE_RE")
});

static FISCAL_BEFORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:fiscal|year)\s+$").expect("Failed to compile FISCAL_BEFORE_RE"));

static YEAR_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:,|\)|was\b|were\b)").expect("Failed to compile YEAR_AFTER_RE"));

static BARE_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}$").expect("Failed to compile BARE_YEAR_RE"));

/// Regex source matching a label's words in visible text or raw HTML, or
/// `None` when the label normalizes to nothing.
pub fn label_pattern(label: &str) -> Option<String> {
    let words: Vec<String> = normalize_label(label)
        .split_whitespace()
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(format!(r"(?i)\b{}\b", words.join(LABEL_WORD_SEPARATOR)))
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Label phrase; the value is searched for in the window after it.
    Label(Regex),
    /// User expression with its own `value` group.
    Custom(Regex),
}

/// A compiled text-fallback expression.
#[derive(Debug, Clone)]
pub struct TextPattern {
    matcher: Matcher,
}

impl TextPattern {
    /// Builds the expression for a label: its words joined by flexible
    /// whitespace or hyphens. The value is the first acceptable number
    /// starting within [`LABEL_VALUE_WINDOW`] characters after the label.
    pub fn for_label(field: &str, label: &str) -> Result<Option<Self>, ExtractError> {
        let Some(pattern) = label_pattern(label) else {
            return Ok(None);
        };
        let regex = Regex::new(&pattern).map_err(|source| ExtractError::InvalidPattern {
            field: field.to_string(),
            source,
        })?;
        Ok(Some(Self { matcher: Matcher::Label(regex) }))
    }

    /// Compiles a user-supplied expression. It must name a `value` group.
    pub fn custom(field: &str, pattern: &str) -> Result<Self, ExtractError> {
        let regex = Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
            field: field.to_string(),
            source,
        })?;
        if !regex.capture_names().flatten().any(|name| name == "value") {
            return Err(ExtractError::MissingValueGroup {
                field: field.to_string(),
                pattern: pattern.to_string(),
            });
        }
        Ok(Self { matcher: Matcher::Custom(regex) })
    }

    pub fn as_str(&self) -> &str {
        match &self.matcher {
            Matcher::Label(regex) | Matcher::Custom(regex) => regex.as_str(),
        }
    }

    /// First match in `text` that yields a value of `kind`.
    pub fn find(
        &self,
        text: &str,
        kind: ValueKind,
        caption: Option<Scale>,
        default_scale: Scale,
    ) -> Option<Decimal> {
        match &self.matcher {
            Matcher::Label(regex) => regex
                .find_iter(text)
                .find_map(|m| value_after_label(&text[m.end()..], kind, caption, default_scale)),
            Matcher::Custom(regex) => regex.captures_iter(text).find_map(|caps| {
                let token = token_from(&caps, kind)?;
                canonical_value(&token, kind, caption, default_scale)
            }),
        }
    }
}

/// Scans the window after a label for the first number that is neither a date
/// part nor, for amounts and counts, a percentage.
fn value_after_label(rest: &str, kind: ValueKind, caption: Option<Scale>, default_scale: Scale) -> Option<Decimal> {
    let window_end = byte_offset(rest, LABEL_VALUE_WINDOW);
    let scan = &rest[..byte_offset(rest, LABEL_VALUE_WINDOW + VALUE_TAIL)];

    for caps in VALUE_RE.captures_iter(scan) {
        let Some(whole) = caps.get(0) else { continue };
        let raw = whole.as_str();
        let start = whole.start() + (raw.len() - raw.trim_start().len());
        if start > window_end {
            break;
        }
        // Digits glued to a word: "Q3", "FY2024"
        if scan[..start].chars().next_back().is_some_and(char::is_alphanumeric) {
            continue;
        }
        if is_date_part(&scan[..start], raw.trim(), &scan[whole.end()..]) {
            continue;
        }
        let Some(token) = token_from(&caps, kind) else { continue };
        if let Some(value) = canonical_value(&token, kind, caption, default_scale) {
            return Some(value);
        }
    }
    None
}

fn token_from(caps: &Captures<'_>, kind: ValueKind) -> Option<NumericToken> {
    let mut token = parse_number(caps.name("value")?.as_str())?;
    if token.percent && kind != ValueKind::Ratio {
        return None;
    }
    if let Some(word) = caps.name("scale") {
        token.scale = Scale::from_word(word.as_str()).or(token.scale);
    }
    Some(token)
}

/// A day after a month name, or a bare year inside a date or before "was".
fn is_date_part(before: &str, token: &str, after: &str) -> bool {
    if MONTH_BEFORE_RE.is_match(before) {
        return true;
    }
    BARE_YEAR_RE.is_match(token)
        && (YEAR_AFTER_RE.is_match(after) || MONTH_DAY_BEFORE_RE.is_match(before) || FISCAL_BEFORE_RE.is_match(before))
}

/// Byte offset of the `chars`-th character, clamped to the end of `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

/// Applies `patterns` in priority order; the first one that matches wins.
pub fn find_in_text(
    text: &str,
    patterns: &[TextPattern],
    kind: ValueKind,
    caption: Option<Scale>,
    default_scale: Scale,
) -> Option<(usize, Decimal)> {
    patterns
        .iter()
        .enumerate()
        .find_map(|(index, pattern)| {
            pattern
                .find(text, kind, caption, default_scale)
                .map(|value| (index, value))
        })
}
