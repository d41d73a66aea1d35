// src/assembler/mod.rs
//! Drives fetch -> extract for each filing and collects the resulting rows.

use crate::edgar::{DocumentFetcher, FilingInfo};
use crate::extractors::{ExtractionResult, FieldExtractor};
use serde::Serialize;

/// One output row: a filing and what was extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub filing_id: String,
    pub filing_date: String,
    pub report_date: Option<String>,
    pub document_url: String,
    /// Set when the document could not be fetched; the result is then all "not found".
    pub fetch_error: Option<String>,
    pub result: ExtractionResult,
}

impl Record {
    pub fn new(filing: &FilingInfo, result: ExtractionResult) -> Self {
        Self {
            filing_id: filing.accession_number.clone(),
            filing_date: filing.filing_date.clone(),
            report_date: filing.report_date.clone(),
            document_url: filing.primary_doc_url(),
            fetch_error: None,
            result,
        }
    }

    pub fn with_fetch_error(mut self, error: String) -> Self {
        self.fetch_error = Some(error);
        self
    }
}

/// Fetches and extracts every filing in order, one at a time.
pub async fn collect_records<F: DocumentFetcher>(
    fetcher: &F,
    filings: &[FilingInfo],
    extractor: &FieldExtractor,
) -> Vec<Record> {
    collect_records_with(fetcher, filings, extractor, |_, _| {}).await
}

/// Like [`collect_records`], handing each fetched document to `inspect`
/// before extraction (used for debug dumps).
pub async fn collect_records_with<F, I>(
    fetcher: &F,
    filings: &[FilingInfo],
    extractor: &FieldExtractor,
    mut inspect: I,
) -> Vec<Record>
where
    F: DocumentFetcher,
    I: FnMut(&FilingInfo, &str),
{
    let mut records = Vec::with_capacity(filings.len());

    for (i, filing) in filings.iter().enumerate() {
        tracing::info!(
            "Processing filing {}/{}: {} ({})",
            i + 1,
            filings.len(),
            filing.accession_number,
            filing.filing_date
        );

        let record = match fetcher.fetch_document(filing).await {
            Ok(html) => {
                tracing::info!("Successfully downloaded document ({} bytes)", html.len());
                inspect(filing, &html);
                let result = extractor.extract(&html);
                tracing::info!(
                    "Extracted {}/{} fields from {}",
                    result.found_count(),
                    result.len(),
                    filing.accession_number
                );
                Record::new(filing, result)
            }
            Err(e) => {
                tracing::error!("Failed to download filing document {}: {}", filing.accession_number, e);
                Record::new(filing, extractor.not_found()).with_fetch_error(e.to_string())
            }
        };
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{ColumnPolicy, FieldSpec, ValueKind};
    use crate::utils::error::EdgarError;
    use rust_decimal::Decimal;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct StubFetcher {
        documents: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl DocumentFetcher for StubFetcher {
        async fn fetch_document(&self, filing: &FilingInfo) -> Result<String, EdgarError> {
            self.calls.borrow_mut().push(filing.accession_number.clone());
            self.documents
                .get(&filing.accession_number)
                .cloned()
                .ok_or_else(|| EdgarError::FilingDocNotFound(filing.primary_doc_url()))
        }
    }

    fn filing(accession: &str, date: &str) -> FilingInfo {
        FilingInfo {
            accession_number: accession.to_string(),
            filing_date: date.to_string(),
            report_date: None,
            form_type: "10-Q".to_string(),
            ticker: "TST".to_string(),
            company_name: "Test Co".to_string(),
            cik: "0000000042".to_string(),
            primary_doc: format!("{}.htm", accession),
        }
    }

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(
            vec![FieldSpec::new("net_income", ["Net income"], ValueKind::Currency)],
            ColumnPolicy::Leftmost,
        )
        .unwrap()
    }

    #[test]
    fn test_records_keep_order_and_survive_fetch_errors() {
        let fetcher = StubFetcher {
            documents: HashMap::from([
                ("c".to_string(), "<table><tr><td>Net income</td><td>3</td></tr></table>".to_string()),
                ("a".to_string(), "<p>Net income of $1 million</p>".to_string()),
            ]),
            calls: RefCell::new(Vec::new()),
        };
        let filings = vec![filing("c", "2024-11-01"), filing("b", "2024-08-01"), filing("a", "2024-05-01")];
        let extractor = extractor();

        let records = tokio_test::block_on(collect_records(&fetcher, &filings, &extractor));

        let ids: Vec<&str> = records.iter().map(|r| r.filing_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(*fetcher.calls.borrow(), vec!["c", "b", "a"]);

        assert_eq!(records[0].result.value("net_income"), Some(Decimal::from(3)));
        assert!(records[0].fetch_error.is_none());

        assert_eq!(records[1].result, extractor.not_found());
        assert!(records[1].fetch_error.as_deref().unwrap().contains("b.htm"));

        assert_eq!(records[2].result.value("net_income"), Some(Decimal::from(1_000_000)));
    }

    #[test]
    fn test_inspect_sees_only_fetched_documents() {
        let fetcher = StubFetcher {
            documents: HashMap::from([("a".to_string(), "<p>hello</p>".to_string())]),
            calls: RefCell::new(Vec::new()),
        };
        let filings = vec![filing("a", "2024-05-01"), filing("missing", "2024-02-01")];
        let mut seen = Vec::new();

        let records = tokio_test::block_on(collect_records_with(
            &fetcher,
            &filings,
            &extractor(),
            |filing, html| seen.push((filing.accession_number.clone(), html.len())),
        ));

        assert_eq!(records.len(), 2);
        assert_eq!(seen, vec![("a".to_string(), "<p>hello</p>".len())]);
    }
}
