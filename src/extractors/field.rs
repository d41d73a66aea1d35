// src/extractors/field.rs
use crate::extractors::document::Document;
use crate::extractors::numeric::{caption_scale, CAPTION_HIGHLIGHT_PATTERN};
use crate::extractors::spec::{ColumnPolicy, FieldSpec};
use crate::extractors::table::{find_in_tables, LabelMatcher};
use crate::extractors::text::{find_in_text, label_pattern, TextPattern};
use crate::utils::error::ExtractError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

/// Highlight kind used for scale captions in debug output.
pub const SCALE_CAPTION_KIND: &str = "scale_caption";

/// Which strategy produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    TableCell,
    TextPattern,
    /// The field's opt-in default, used when nothing matched. Recorded in the
    /// run metadata but exported as an empty CSV cell.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractedValue {
    pub value: Decimal,
    pub method: ExtractionMethod,
}

/// One requested field and what was found for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub name: String,
    /// `None` means not found.
    pub value: Option<ExtractedValue>,
}

/// Per-document outcome: one entry per field spec, in spec order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    fields: Vec<FieldOutcome>,
}

impl ExtractionResult {
    pub fn get(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> Option<Decimal> {
        self.get(name).and_then(|f| f.value).map(|v| v.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn found_count(&self) -> usize {
        self.fields.iter().filter(|f| f.value.is_some()).count()
    }
}

struct CompiledField {
    spec: FieldSpec,
    labels: Vec<LabelMatcher>,
    text_patterns: Vec<TextPattern>,
    // Label phrases and custom patterns, for annotated debug output
    highlights: Vec<String>,
}

impl CompiledField {
    fn compile(spec: FieldSpec) -> Result<Self, ExtractError> {
        if spec.labels.is_empty() && spec.patterns.is_empty() {
            return Err(ExtractError::EmptyFieldSpec(spec.name.clone()));
        }

        let labels = spec.labels.iter().map(LabelMatcher::new).collect();

        // Scoped labels only make sense inside tables
        let mut text_patterns = Vec::new();
        for label in spec.labels.iter().filter(|l| !l.is_scoped()) {
            if let Some(pattern) = TextPattern::for_label(&spec.name, &label.text)? {
                text_patterns.push(pattern);
            }
        }
        for pattern in &spec.patterns {
            text_patterns.push(TextPattern::custom(&spec.name, pattern)?);
        }

        let highlights = spec
            .labels
            .iter()
            .filter_map(|label| label_pattern(&label.text))
            .chain(spec.patterns.iter().cloned())
            .collect();

        Ok(Self { spec, labels, text_patterns, highlights })
    }

    fn resolve(&self, document: &Document, policy: ColumnPolicy) -> Option<ExtractedValue> {
        let spec = &self.spec;

        if let Some(hit) = self
            .labels
            .iter()
            .find_map(|label| find_in_tables(document, label, spec, policy))
        {
            return Some(ExtractedValue { value: hit.value, method: ExtractionMethod::TableCell });
        }

        let caption = caption_scale(document.text(), spec.kind);
        if let Some((index, value)) =
            find_in_text(document.text(), &self.text_patterns, spec.kind, caption, spec.default_scale)
        {
            tracing::trace!("Text pattern #{} matched for '{}'", index, spec.name);
            return Some(ExtractedValue { value, method: ExtractionMethod::TextPattern });
        }

        spec.default_value.map(|value| ExtractedValue { value, method: ExtractionMethod::Default })
    }
}

/// Resolves a fixed, ordered set of field specs against filing documents.
///
/// Construction validates the configuration and compiles every pattern once;
/// [`FieldExtractor::extract`] itself never fails.
pub struct FieldExtractor {
    fields: Vec<CompiledField>,
    policy: ColumnPolicy,
}

impl FieldExtractor {
    pub fn new(specs: Vec<FieldSpec>, policy: ColumnPolicy) -> Result<Self, ExtractError> {
        if specs.is_empty() {
            return Err(ExtractError::NoFieldSpecs);
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.name.clone()) {
                return Err(ExtractError::DuplicateField(spec.name));
            }
            fields.push(CompiledField::compile(spec)?);
        }

        tracing::debug!("Compiled {} field specs with {:?} column policy", fields.len(), policy);
        Ok(Self { fields, policy })
    }

    pub fn policy(&self) -> ColumnPolicy {
        self.policy
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.spec.name.as_str())
    }

    pub fn specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|f| &f.spec)
    }

    /// `(kind, regex)` pairs for annotated debug output: every field's label
    /// phrases and custom patterns, then the scale caption.
    pub fn debug_patterns(&self) -> Vec<(&str, &str)> {
        let mut patterns: Vec<(&str, &str)> = self
            .fields
            .iter()
            .flat_map(|f| f.highlights.iter().map(move |p| (f.spec.name.as_str(), p.as_str())))
            .collect();
        patterns.push((SCALE_CAPTION_KIND, CAPTION_HIGHLIGHT_PATTERN));
        patterns
    }

    /// A result with every field "not found", for documents that never arrived.
    pub fn not_found(&self) -> ExtractionResult {
        ExtractionResult {
            fields: self
                .fields
                .iter()
                .map(|f| FieldOutcome { name: f.spec.name.clone(), value: None })
                .collect(),
        }
    }

    /// Extracts every field from raw HTML. Unparseable documents resolve every
    /// field to "not found" without applying defaults.
    pub fn extract(&self, html: &str) -> ExtractionResult {
        let Some(document) = Document::parse(html) else {
            return self.not_found();
        };

        let fields = self
            .fields
            .iter()
            .map(|field| {
                let value = field.resolve(&document, self.policy);
                match &value {
                    Some(found) => tracing::debug!(
                        "Resolved '{}' = {} via {:?}",
                        field.spec.name,
                        found.value,
                        found.method
                    ),
                    None => tracing::debug!("No value found for '{}'", field.spec.name),
                }
                FieldOutcome { name: field.spec.name.clone(), value }
            })
            .collect();

        ExtractionResult { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::spec::{Label, Scale, ValueKind};
    use crate::utils::html_debug;

    fn specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("net_income", ["Net income", "Net earnings"], ValueKind::Currency),
            FieldSpec::new("preferred_dividends", ["Preferred stock dividends"], ValueKind::Currency),
            FieldSpec::new(
                "diluted_shares",
                [Label::scoped("Diluted", ["weighted average shares"])],
                ValueKind::Shares,
            ),
        ]
    }

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(specs(), ColumnPolicy::Leftmost).unwrap()
    }

    const STATEMENT: &str = r#"<html><body>
        <p>CONSOLIDATED STATEMENTS OF OPERATIONS (in millions, except per share data)</p>
        <table>
          <tr><td></td><td>2024</td><td>2023</td></tr>
          <tr><td>Net income</td><td>$</td><td>15,328</td><td>$</td><td>9,870</td></tr>
          <tr><td>Weighted-average shares used in computation of earnings per share:</td></tr>
          <tr><td>Basic</td><td>10,492</td><td>10,365</td></tr>
          <tr><td>Diluted</td><td>10,767</td><td>10,670</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_every_spec_has_an_entry() {
        let extractor = extractor();
        for html in [STATEMENT, "<p>nothing here</p>", "", "<table><tr><td>Net"] {
            let result = extractor.extract(html);
            assert_eq!(result.len(), 3);
            let names: Vec<&str> = result.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["net_income", "preferred_dividends", "diluted_shares"]);
        }
    }

    #[test]
    fn test_statement_table_extraction() {
        let result = extractor().extract(STATEMENT);

        let net = result.get("net_income").unwrap().value.unwrap();
        assert_eq!(net.value, Decimal::from(15_328_000_000_i64));
        assert_eq!(net.method, ExtractionMethod::TableCell);

        let shares = result.get("diluted_shares").unwrap().value.unwrap();
        assert_eq!(shares.value, Decimal::from(10_767_000_000_i64));

        assert_eq!(result.get("preferred_dividends").unwrap().value, None);
        assert_eq!(result.found_count(), 2);
    }

    #[test]
    fn test_opt_in_default_value() {
        let extractor = FieldExtractor::new(
            vec![FieldSpec::new("preferred_dividends", ["Preferred stock dividends"], ValueKind::Currency)
                .with_default_value(Decimal::ZERO)],
            ColumnPolicy::Leftmost,
        )
        .unwrap();

        let preferred = extractor.extract(STATEMENT).get("preferred_dividends").unwrap().value.unwrap();
        assert_eq!(preferred.value, Decimal::ZERO);
        assert_eq!(preferred.method, ExtractionMethod::Default);

        // Unreadable documents never get defaults
        assert_eq!(extractor.extract("<table><tr><td>Net").found_count(), 0);
    }

    #[test]
    fn test_overflowing_value_is_not_found() {
        let extractor = FieldExtractor::new(
            vec![FieldSpec::new("net_income", ["Net income"], ValueKind::Currency)],
            ColumnPolicy::Leftmost,
        )
        .unwrap();
        let result = extractor.extract("<p>net income of 99999999999999999999999999 billion</p>");
        assert_eq!(result.len(), 1);
        assert_eq!(result.value("net_income"), None);
    }

    #[test]
    fn test_debug_html_marks_labels_and_captions() {
        let extractor = extractor();
        let html = r#"<p>(in millions)</p><table><tr><td style="width:50%">Net&#160;income</td><td>1,234</td></tr></table>"#;
        let path = std::env::temp_dir().join(format!("filing_metrics_annotated_{}.html", std::process::id()));

        html_debug::create_debug_html(html, &path, &extractor.debug_patterns()).unwrap();
        let annotated = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(annotated.contains("Field: net_income\">Net&#160;income</span>"));
        assert!(annotated.contains("Field: scale_caption\">in millions</span>"));
    }

    #[test]
    fn test_two_period_row_prefers_left_column() {
        let extractor = FieldExtractor::new(
            vec![FieldSpec::new("net_income", ["Net income"], ValueKind::Currency)],
            ColumnPolicy::Leftmost,
        )
        .unwrap();
        let result = extractor.extract("<table><tr><td>Net income</td><td>$1,234</td><td>$987</td></tr></table>");
        assert_eq!(result.value("net_income"), Some(Decimal::from(1_234)));
    }

    #[test]
    fn test_text_fallback_when_no_table_matches() {
        let result = extractor().extract("<html><body><p>We recorded net income of $(456) million.</p></body></html>");
        let net = result.get("net_income").unwrap().value.unwrap();
        assert_eq!(net.value, Decimal::from(-456_000_000));
        assert_eq!(net.method, ExtractionMethod::TextPattern);
        assert_eq!(result.get("diluted_shares").unwrap().value, None);
    }

    #[test]
    fn test_missing_label_is_not_found() {
        let extractor = FieldExtractor::new(
            vec![FieldSpec::new("net_income", ["Net income"], ValueKind::Currency)],
            ColumnPolicy::Leftmost,
        )
        .unwrap();
        let result = extractor.extract("<html><body><p>Revenue grew 12%.</p></body></html>");
        assert_eq!(result.get("net_income").unwrap().value, None);
        assert_eq!(result.found_count(), 0);
    }

    #[test]
    fn test_malformed_html_yields_all_not_found() {
        let extractor = extractor();
        let truncated = &STATEMENT[..STATEMENT.find("10,767").unwrap()];
        for html in [truncated, "", "\u{0}\u{1}", "just text"] {
            let result = extractor.extract(html);
            assert_eq!(result, extractor.not_found());
            // Defaults are not applied to unreadable documents
            assert_eq!(result.get("preferred_dividends").unwrap().value, None);
        }
    }

    #[test]
    fn test_extract_is_idempotent() {
        let extractor = extractor();
        let first = extractor.extract(STATEMENT);
        let second = extractor.extract(STATEMENT);
        assert_eq!(first, second);
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            FieldExtractor::new(Vec::new(), ColumnPolicy::Leftmost),
            Err(ExtractError::NoFieldSpecs)
        ));

        let empty = FieldSpec::new("x", Vec::<Label>::new(), ValueKind::Ratio);
        assert!(matches!(
            FieldExtractor::new(vec![empty], ColumnPolicy::Leftmost),
            Err(ExtractError::EmptyFieldSpec(name)) if name == "x"
        ));

        let dup = vec![
            FieldSpec::new("net_income", ["Net income"], ValueKind::Currency),
            FieldSpec::new("net_income", ["Net earnings"], ValueKind::Currency),
        ];
        assert!(matches!(
            FieldExtractor::new(dup, ColumnPolicy::Leftmost),
            Err(ExtractError::DuplicateField(_))
        ));

        let bad = FieldSpec::new("net_income", ["Net income"], ValueKind::Currency).with_pattern("(?P<value>");
        assert!(matches!(
            FieldExtractor::new(vec![bad], ColumnPolicy::Leftmost),
            Err(ExtractError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_rightmost_policy_and_default_scale() {
        let extractor = FieldExtractor::new(
            vec![FieldSpec::new("net_income", ["Net income"], ValueKind::Currency)
                .with_default_scale(Scale::Thousands)],
            ColumnPolicy::Rightmost,
        )
        .unwrap();
        let result = extractor.extract("<table><tr><td>Net income</td><td>1,234</td><td>987</td></tr></table>");
        assert_eq!(result.value("net_income"), Some(Decimal::from(987_000)));
        assert_eq!(extractor.policy(), ColumnPolicy::Rightmost);
    }
}
