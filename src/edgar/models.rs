// src/edgar/models.rs
use crate::utils::error::EdgarError;
use serde::{Deserialize, Serialize};

/// Entry of https://www.sec.gov/files/company_tickers.json
#[derive(Debug, Deserialize)]
pub struct TickerEntry {
    pub cik_str: u64,
    pub ticker: String,
    #[serde(default)]
    pub title: String,
}

/// The parts of the EDGAR company submission index this tool reads.
/// Example: https://data.sec.gov/submissions/CIK0001018724.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    pub cik: String,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented list of recent filings: index `i` of every vector
/// describes the same filing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsList {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub report_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// Simple struct representing a specific filing we want to process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingInfo {
    pub accession_number: String,
    pub filing_date: String,
    pub report_date: Option<String>,
    pub form_type: String,
    pub ticker: String,
    pub company_name: String,
    pub cik: String,
    pub primary_doc: String,
}

impl FilingInfo {
    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        let cik = self.cik.trim_start_matches('0');
        format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
            cik, acc_no_dashes, self.primary_doc
        )
    }

    pub fn year(&self) -> Option<u32> {
        self.filing_date.get(0..4)?.parse().ok()
    }
}

/// Which filings to pick from a submission index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingQuery {
    pub form: String,
    pub start_year: Option<u32>,
    pub end_year: Option<u32>,
    pub limit: Option<usize>,
}

impl CompanySubmission {
    fn filing_at(&self, i: usize, ticker: &str) -> Result<FilingInfo, EdgarError> {
        let recent = &self.filings.recent;
        let field = |values: &Vec<String>, what: &str| {
            values
                .get(i)
                .cloned()
                .ok_or_else(|| EdgarError::Parse(format!("Missing {} for filing #{}", what, i)))
        };

        Ok(FilingInfo {
            accession_number: field(&recent.accession_number, "accession number")?,
            filing_date: field(&recent.filing_date, "filing date")?,
            report_date: recent.report_date.get(i).filter(|d| !d.is_empty()).cloned(),
            form_type: field(&recent.form, "form type")?,
            ticker: ticker.to_uppercase(),
            company_name: self.name.clone(),
            cik: format!("{:0>10}", self.cik),
            primary_doc: field(&recent.primary_document, "primary document")?,
        })
    }

    /// Filings matching `query`, newest first.
    pub fn select_filings(&self, ticker: &str, query: &FilingQuery) -> Result<Vec<FilingInfo>, EdgarError> {
        let mut filings = Vec::new();

        for (i, form) in self.filings.recent.form.iter().enumerate() {
            if !form.eq_ignore_ascii_case(&query.form) {
                continue;
            }
            let filing = self.filing_at(i, ticker)?;
            let year = filing
                .year()
                .ok_or_else(|| EdgarError::Parse(format!("Invalid filing date: {}", filing.filing_date)))?;

            if query.start_year.is_some_and(|start| year < start)
                || query.end_year.is_some_and(|end| year > end)
            {
                continue;
            }
            filings.push(filing);
        }

        // ISO dates sort lexically
        filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
        if let Some(limit) = query.limit {
            filings.truncate(limit);
        }
        Ok(filings)
    }

    /// The filing with this accession number, with or without dashes.
    pub fn find_accession(&self, ticker: &str, accession: &str) -> Result<Option<FilingInfo>, EdgarError> {
        let wanted = accession.replace('-', "");
        match self
            .filings
            .recent
            .accession_number
            .iter()
            .position(|acc| acc.replace('-', "") == wanted)
        {
            Some(i) => self.filing_at(i, ticker).map(Some),
            None => Ok(None),
        }
    }
}
