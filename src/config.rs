// src/config.rs
//! Field spec configuration: the built-in table and JSON overrides.

use crate::extractors::{FieldSpec, Label, Scale, ValueKind};
use crate::utils::AppError;
use std::path::Path;

// Headings that introduce the basic/diluted share count rows
const SHARE_COUNT_HEADINGS: &[&str] = &[
    "weighted average shares",
    "weighted average common shares",
    "weighted average number of shares",
    "shares used in computation",
    "shares used in computing",
];

/// The built-in field table: net income, preferred dividends and
/// weighted-average diluted shares.
pub fn default_field_specs() -> Vec<FieldSpec> {
    let mut diluted_labels: Vec<Label> = [
        "Weighted average diluted shares outstanding",
        "Weighted average diluted shares",
        "Weighted average shares outstanding diluted",
        "Weighted average common shares outstanding diluted",
        "Diluted weighted average shares outstanding",
        "Diluted weighted average common shares outstanding",
    ]
    .into_iter()
    .map(Label::from)
    .collect();
    diluted_labels.push(Label::scoped("Diluted", SHARE_COUNT_HEADINGS.iter().copied()));
    diluted_labels.push(Label::scoped("Diluted shares", SHARE_COUNT_HEADINGS.iter().copied()));

    vec![
        FieldSpec::new(
            "net_income",
            [
                "Net income",
                "Net income attributable to common stockholders",
                "Net income attributable to common shareholders",
                "Net earnings",
                "Net income (loss)",
            ],
            ValueKind::Currency,
        ),
        // Most issuers have no preferred stock; an absent row stays "not found"
        FieldSpec::new(
            "preferred_dividends",
            [
                "Preferred stock dividends",
                "Dividends on preferred stock",
                "Preferred dividends",
                "Dividends to preferred stockholders",
                "Preferred stock dividends and accretion",
            ],
            ValueKind::Currency,
        ),
        FieldSpec {
            name: "diluted_shares".to_string(),
            labels: diluted_labels,
            kind: ValueKind::Shares,
            default_scale: Scale::Units,
            patterns: vec![
                r"(?i)\bdiluted\s+weighted[\s\-]+average\s+(?:common\s+)?shares(?:\s+outstanding)?[^\d]{0,40}?(?P<value>\d{1,3}(?:,\d{3})+|\d+)(?:\s*(?P<scale>thousand|million|billion)s?\b)?".to_string(),
            ],
            default_value: None,
        },
    ]
}

/// Parses a JSON array of field specs.
pub fn parse_field_specs(json: &str) -> Result<Vec<FieldSpec>, AppError> {
    let specs: Vec<FieldSpec> =
        serde_json::from_str(json).map_err(|e| AppError::Config(format!("Invalid field spec file: {}", e)))?;
    if specs.is_empty() {
        return Err(AppError::Config("Field spec file defines no fields".to_string()));
    }
    Ok(specs)
}

/// Loads field specs from a JSON file.
pub fn load_field_specs<P: AsRef<Path>>(path: P) -> Result<Vec<FieldSpec>, AppError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let specs = parse_field_specs(&json)?;
    tracing::info!("Loaded {} field specs from {}", specs.len(), path.display());
    Ok(specs)
}
