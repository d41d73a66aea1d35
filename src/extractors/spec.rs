// src/extractors/spec.rs
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// --- Normalization Patterns (Lazy Static) ---
// Parenthetical notes such as "(loss)", "(1)", "(in millions)"
static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^()]*\)").expect("Failed to compile PARENTHETICAL_RE"));

// Footnote digits glued to the end of a word: "income1" -> "income"
static TRAILING_FOOTNOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])\d{1,2}\b").expect("Failed to compile TRAILING_FOOTNOTE_RE"));

/// What a field measures. Decides which scale captions apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Currency,
    Shares,
    Ratio,
}

/// Multiplier between a printed number and its canonical base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    #[default]
    Units,
    Thousands,
    Millions,
    Billions,
}

impl Scale {
    pub fn multiplier(self) -> Decimal {
        match self {
            Scale::Units => Decimal::ONE,
            Scale::Thousands => Decimal::from(1_000),
            Scale::Millions => Decimal::from(1_000_000),
            Scale::Billions => Decimal::from(1_000_000_000),
        }
    }

    /// Parses a scale word such as "million", "Millions" or "thousand".
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_ascii_lowercase();
        let stem = word.strip_suffix('s').unwrap_or(&word);
        match stem {
            "thousand" => Some(Scale::Thousands),
            "million" => Some(Scale::Millions),
            "billion" => Some(Scale::Billions),
            _ => None,
        }
    }
}

/// Which period column wins when a matched row carries several numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// First numeric cell. Filings conventionally put the current period first.
    #[default]
    Leftmost,
    /// Last numeric cell, for layouts that list the prior period first.
    Rightmost,
}

/// One candidate label for a field.
///
/// A label with `under` headings is scoped: it only matches table rows that
/// sit below a heading row containing one of those phrases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "LabelRepr")]
pub struct Label {
    pub text: String,
    pub under: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Plain(String),
    Scoped {
        text: String,
        #[serde(default)]
        under: Vec<String>,
    },
}

impl From<LabelRepr> for Label {
    fn from(repr: LabelRepr) -> Self {
        match repr {
            LabelRepr::Plain(text) => Label { text, under: Vec::new() },
            LabelRepr::Scoped { text, under } => Label { text, under },
        }
    }
}

impl Label {
    pub fn scoped<S: Into<String>>(text: &str, under: impl IntoIterator<Item = S>) -> Self {
        Self {
            text: text.to_string(),
            under: under.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        !self.under.is_empty()
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label { text: text.to_string(), under: Vec::new() }
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label { text, under: Vec::new() }
    }
}

/// A named target value: its label vocabulary, kind and scale rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Candidate labels in priority order.
    pub labels: Vec<Label>,
    pub kind: ValueKind,
    /// Scale used when neither the token nor a caption names one.
    #[serde(default)]
    pub default_scale: Scale,
    /// Extra text-fallback regexes, tried after the label-derived ones.
    /// Each must have a `value` group; a `scale` group is optional.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Value reported when a readable document yields no match.
    #[serde(default)]
    pub default_value: Option<Decimal>,
}

impl FieldSpec {
    pub fn new<L: Into<Label>>(name: &str, labels: impl IntoIterator<Item = L>, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
            kind,
            default_scale: Scale::Units,
            patterns: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_default_scale(mut self, scale: Scale) -> Self {
        self.default_scale = scale;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    pub fn with_default_value(mut self, value: Decimal) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Shared normalization for labels and table cell text: case-fold, drop
/// parenthetical notes and footnote markers, turn dashes into spaces, strip
/// punctuation, collapse whitespace.
pub fn normalize_label(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_notes = PARENTHETICAL_RE.replace_all(&lowered, " ");
    let without_footnotes = TRAILING_FOOTNOTE_RE.replace_all(&without_notes, "$1");

    let cleaned: String = without_footnotes
        .chars()
        .map(|c| match c {
            '-' | '–' | '—' | '−' | '/' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .filter(|c| !matches!(c, '*' | '†' | '‡' | '§' | ':' | ',' | '.' | ';' | '\'' | '’' | '(' | ')'))
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
