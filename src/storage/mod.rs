// src/storage/mod.rs
use crate::assembler::Record;
use crate::extractors::{ColumnPolicy, ExtractionMethod};
use crate::utils::error::StorageError;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the filing identifier column.
pub const FILING_ID_COLUMN: &str = "filing_id";

/// Run-level facts written next to the CSV.
#[derive(Debug, Serialize)]
pub struct RunMetadata<'a> {
    pub ticker: &'a str,
    pub form: &'a str,
    pub column_policy: ColumnPolicy,
    pub fields: Vec<&'a str>,
    pub records: &'a [Record],
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes all records as one CSV file under the base directory
    pub fn save_records_csv(
        &self,
        file_name: &str,
        field_names: &[&str],
        records: &[Record],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(file_name);
        let file = fs::File::create(&file_path).map_err(StorageError::IoError)?;
        write_records_csv(file, field_names, records)?;

        tracing::info!("Saved {} records to {}", records.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the run in JSON format, next to the CSV
    pub fn save_run_metadata(&self, csv_file_name: &str, metadata: &RunMetadata<'_>) -> Result<PathBuf, StorageError> {
        let stem = Path::new(csv_file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("records");
        let file_path = self.base_dir.join(format!("{}_meta.json", stem));

        let document = serde_json::json!({
            "ticker": metadata.ticker,
            "form": metadata.form,
            "column_policy": metadata.column_policy,
            "fields": metadata.fields,
            "record_count": metadata.records.len(),
            "records": metadata.records,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&document)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }

    /// Directory for debug artifacts of one filing: /base_dir/TICKER/accession/debug
    pub fn debug_dir(&self, ticker: &str, accession: &str) -> Result<PathBuf, StorageError> {
        let dir = self
            .base_dir
            .join(ticker.to_uppercase())
            .join(accession)
            .join("debug");
        fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
        Ok(dir)
    }

    /// Saves the raw filing for debugging
    pub fn save_raw_filing(&self, ticker: &str, accession: &str, content: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.debug_dir(ticker, accession)?.join("raw_filing.html");
        let mut file = fs::File::create(&file_path).map_err(StorageError::IoError)?;
        file.write_all(content.as_bytes()).map_err(StorageError::IoError)?;
        Ok(file_path)
    }
}

/// Serializes records as CSV: `filing_id` followed by one column per field, in
/// the given order. Values are plain decimals. Missing values and configured
/// defaults are empty; the metadata sidecar keeps the defaults.
pub fn write_records_csv<W: Write>(writer: W, field_names: &[&str], records: &[Record]) -> Result<(), StorageError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(field_names.len() + 1);
    header.push(FILING_ID_COLUMN);
    header.extend_from_slice(field_names);
    wtr.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(header.len());
        row.push(record.filing_id.clone());
        for name in field_names {
            let cell = record
                .result
                .get(name)
                .and_then(|f| f.value)
                .filter(|v| v.method != ExtractionMethod::Default)
                .map(|v| v.value.to_string())
                .unwrap_or_default();
            row.push(cell);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(StorageError::IoError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::FilingInfo;
    use crate::extractors::{FieldExtractor, FieldSpec, ValueKind};
    use rust_decimal::Decimal;

    fn filing(accession: &str) -> FilingInfo {
        FilingInfo {
            accession_number: accession.to_string(),
            filing_date: "2024-11-01".to_string(),
            report_date: Some("2024-09-30".to_string()),
            form_type: "10-Q".to_string(),
            ticker: "TST".to_string(),
            company_name: "Test Co".to_string(),
            cik: "0000000042".to_string(),
            primary_doc: "doc.htm".to_string(),
        }
    }

    fn sample_records() -> (FieldExtractor, Vec<Record>) {
        let extractor = FieldExtractor::new(
            vec![
                FieldSpec::new("net_income", ["Net income"], ValueKind::Currency),
                FieldSpec::new("diluted_shares", ["Diluted shares"], ValueKind::Shares),
            ],
            ColumnPolicy::Leftmost,
        )
        .unwrap();
        let html = "<p>net income of $(456) million</p><table><tr><td>Diluted shares</td><td>1,234,567</td></tr></table>";
        let records = vec![
            Record::new(&filing("0001-24-000002"), extractor.extract(html)),
            Record::new(&filing("0001-24-000001"), extractor.not_found()),
        ];
        (extractor, records)
    }

    #[test]
    fn test_csv_layout() {
        let (extractor, records) = sample_records();
        let names: Vec<&str> = extractor.field_names().collect();

        let mut out = Vec::new();
        write_records_csv(&mut out, &names, &records).unwrap();
        let csv_text = String::from_utf8(out).unwrap();

        assert_eq!(
            csv_text,
            "filing_id,net_income,diluted_shares\n\
             0001-24-000002,-456000000,1234567\n\
             0001-24-000001,,\n"
        );
    }

    #[test]
    fn test_csv_leaves_defaults_empty() {
        let extractor = FieldExtractor::new(
            vec![
                FieldSpec::new("net_income", ["Net income"], ValueKind::Currency),
                FieldSpec::new("preferred_dividends", ["Preferred dividends"], ValueKind::Currency)
                    .with_default_value(Decimal::ZERO),
            ],
            ColumnPolicy::Leftmost,
        )
        .unwrap();
        let result = extractor.extract("<table><tr><td>Net income</td><td>1,234</td></tr></table>");
        assert_eq!(result.value("preferred_dividends"), Some(Decimal::ZERO));
        let records = vec![Record::new(&filing("0001-24-000003"), result)];
        let names: Vec<&str> = extractor.field_names().collect();

        let mut out = Vec::new();
        write_records_csv(&mut out, &names, &records).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "filing_id,net_income,preferred_dividends\n0001-24-000003,1234,\n"
        );
    }

    #[test]
    fn test_save_csv_and_metadata() {
        let dir = std::env::temp_dir().join(format!("filing_metrics_storage_{}", std::process::id()));
        let storage = StorageManager::new(&dir).unwrap();
        let (extractor, records) = sample_records();
        let names: Vec<&str> = extractor.field_names().collect();

        let csv_path = storage.save_records_csv("TST_10-Q_data.csv", &names, &records).unwrap();
        assert!(fs::read_to_string(&csv_path).unwrap().starts_with("filing_id,net_income"));

        let metadata = RunMetadata {
            ticker: "TST",
            form: "10-Q",
            column_policy: ColumnPolicy::Leftmost,
            fields: names.clone(),
            records: &records,
        };
        let meta_path = storage.save_run_metadata("TST_10-Q_data.csv", &metadata).unwrap();
        assert!(meta_path.ends_with("TST_10-Q_data_meta.json"));

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&meta_path).unwrap()).unwrap();
        assert_eq!(json["record_count"], 2);
        assert_eq!(json["column_policy"], "leftmost");
        assert_eq!(json["records"][0]["result"]["fields"][0]["value"]["method"], "text_pattern");

        fs::remove_dir_all(&dir).unwrap();
    }
}
