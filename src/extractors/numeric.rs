// src/extractors/numeric.rs
//! Numeric token parsing and scale normalization.

use crate::extractors::spec::{Scale, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

// A whole cell or captured token that is only a number with its decorations:
// currency symbol, sign or parentheses, percent, trailing scale word.
static NUMBER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        (?:US)?
        (?P<lead>[\s$€£(\-−–]*)
        (?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)
        \s*(?P<pct>%)?
        \s*(?P<close>\))?
        \s*(?:(?P<scale>thousand|million|billion)s?)?
        \s*\)?
        \s*$",
    )
    .expect("Failed to compile NUMBER_TOKEN_RE")
});

// Captions such as "(in millions, except per share data)"
static CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s+(?P<scale>thousands|millions|billions)\b(?P<rest>[^)]{0,80})")
        .expect("Failed to compile CAPTION_RE")
});

// Captions that scale share counts separately: "(shares in thousands)"
static SHARES_CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bshares\s+in\s+(?P<scale>thousands|millions|billions)\b")
        .expect("Failed to compile SHARES_CAPTION_RE")
});

/// Scale caption phrase alone, for highlighting captions in raw HTML.
pub const CAPTION_HIGHLIGHT_PATTERN: &str = r"(?i)\bin\s+(?:thousands|millions|billions)\b";

static EXCEPT_SHARES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)except\s+(?:for\s+)?(?:number\s+of\s+)?shares?\b")
        .expect("Failed to compile EXCEPT_SHARES_RE")
});

/// A parsed number before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericToken {
    /// Signed value as printed.
    pub value: Decimal,
    /// Scale word written right after the number, if any.
    pub scale: Option<Scale>,
    pub percent: bool,
}

/// Parses a numeric token such as `"1,234,567"`, `"(1,234)"`, `"$ (456) million"`
/// or `"12.5%"`. Returns `None` when the text carries anything besides the
/// number and its decorations.
///
/// An opening parenthesis without its closing partner still marks the value
/// negative: filings often put the `)` in the next table cell.
pub fn parse_number(raw: &str) -> Option<NumericToken> {
    let caps = NUMBER_TOKEN_RE.captures(raw)?;
    let digits = caps.name("num")?.as_str().replace(',', "");
    let magnitude = Decimal::from_str(&digits).ok()?;

    let lead = caps.name("lead").map_or("", |m| m.as_str());
    let negative = lead.contains(['(', '-', '−', '–']) || caps.name("close").is_some();

    Some(NumericToken {
        value: if negative { -magnitude } else { magnitude },
        scale: caps.name("scale").and_then(|m| Scale::from_word(m.as_str())),
        percent: caps.name("pct").is_some(),
    })
}

/// Parses a table cell. A cell holding only a dash is a printed nil, read as zero.
pub fn parse_cell(text: &str) -> Option<NumericToken> {
    let stripped = text.trim_matches(|c: char| c.is_whitespace() || c == '$');
    if matches!(stripped, "—" | "–" | "-" | "−") {
        return Some(NumericToken { value: Decimal::ZERO, scale: None, percent: false });
    }
    parse_number(text)
}

/// Finds the first scale caption in `text` that applies to a value of `kind`.
///
/// Share counts honour "(shares in millions)" and ignore a general caption
/// that says "except share" data. Ratios never scale.
pub fn caption_scale(text: &str, kind: ValueKind) -> Option<Scale> {
    match kind {
        ValueKind::Ratio => None,
        ValueKind::Currency => CAPTION_RE
            .captures(text)
            .and_then(|caps| Scale::from_word(&caps["scale"])),
        ValueKind::Shares => {
            if let Some(caps) = SHARES_CAPTION_RE.captures(text) {
                return Scale::from_word(&caps["scale"]);
            }
            let caps = CAPTION_RE.captures(text)?;
            if EXCEPT_SHARES_RE.is_match(&caps["rest"]) {
                Some(Scale::Units)
            } else {
                Scale::from_word(&caps["scale"])
            }
        }
    }
}

/// Applies scale and percent rules and returns the value in base units.
///
/// Scale precedence: the token's own scale word, then the caption, then the
/// field's default. `None` when the scaled value does not fit in a `Decimal`.
pub fn canonical_value(
    token: &NumericToken,
    kind: ValueKind,
    caption: Option<Scale>,
    default_scale: Scale,
) -> Option<Decimal> {
    let value = match kind {
        ValueKind::Ratio if token.percent => token.value.checked_div(Decimal::ONE_HUNDRED)?,
        ValueKind::Ratio => token.value,
        ValueKind::Currency | ValueKind::Shares => {
            let scale = token.scale.or(caption).unwrap_or(default_scale);
            let scaled = token.value.checked_mul(scale.multiplier());
            if scaled.is_none() {
                tracing::debug!("Dropping {} {:?}: scaled value overflows", token.value, scale);
            }
            scaled?
        }
    };
    Some(value.normalize())
}
