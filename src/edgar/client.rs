// src/edgar/client.rs
use crate::edgar::models::{CompanySubmission, FilingInfo, FilingQuery, TickerEntry};
use crate::edgar::DocumentFetcher;
use crate::utils::error::EdgarError;
use reqwest::header;
use std::collections::HashMap;
use std::time::Duration;

const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";

/// Connection settings for EDGAR.
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    /// SEC requires a User-Agent naming the requester and a contact address.
    pub user_agent: String,
    /// Pause before every request. SEC asks for at most 10 requests/second.
    pub request_delay: Duration,
    pub timeout: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: "filing_metrics admin@example.com".to_string(),
            request_delay: Duration::from_millis(150),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client configured for EDGAR interaction.
pub struct EdgarClient {
    http: reqwest::Client,
    config: EdgarConfig,
}

impl EdgarClient {
    pub fn new(config: EdgarConfig) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        tracing::debug!("Using User-Agent: {}", config.user_agent);
        Ok(Self { http, config })
    }

    async fn get(&self, url: &str, accept: &'static str) -> Result<reqwest::Response, EdgarError> {
        // --- Basic Rate Limiting ---
        tokio::time::sleep(self.config.request_delay).await;

        let response = self.http.get(url).header(header::ACCEPT, accept).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN {
                tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
                return Err(EdgarError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::FilingDocNotFound(url.to_string()));
            }
            return Err(EdgarError::Http(status));
        }
        Ok(response)
    }

    /// Downloads a specific filing document from its URL.
    pub async fn download_filing_doc(&self, url: &str) -> Result<String, EdgarError> {
        tracing::info!("Downloading document from: {}", url);
        let response = self.get(url, "text/html,application/xhtml+xml,text/plain,*/*").await?;
        let body = response.text().await?;
        tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Gets the zero-padded CIK (Central Index Key) for a ticker symbol
    pub async fn get_cik_from_ticker(&self, ticker: &str) -> Result<String, EdgarError> {
        let ticker = ticker.to_uppercase();
        let companies: HashMap<String, TickerEntry> =
            self.get(COMPANY_TICKERS_URL, "application/json").await?.json().await?;

        companies
            .values()
            .find(|company| company.ticker.eq_ignore_ascii_case(&ticker))
            .map(|company| format!("{:010}", company.cik_str))
            .ok_or_else(|| EdgarError::Parse(format!("Could not find CIK for ticker {}", ticker)))
    }

    /// Fetches the company submission data for a given CIK
    pub async fn get_company_submissions(&self, cik: &str) -> Result<CompanySubmission, EdgarError> {
        let url = format!("{}/CIK{}.json", SUBMISSIONS_URL, cik);
        let submission = self.get(&url, "application/json").await?.json().await?;
        Ok(submission)
    }

    /// Finds filings of the queried form for a ticker, newest first
    pub async fn find_filings(&self, ticker: &str, query: &FilingQuery) -> Result<Vec<FilingInfo>, EdgarError> {
        let cik = self.get_cik_from_ticker(ticker).await?;
        let submissions = self.get_company_submissions(&cik).await?;
        let filings = submissions.select_filings(ticker, query)?;
        tracing::info!("Found {} {} filings for {}", filings.len(), query.form, ticker.to_uppercase());
        Ok(filings)
    }

    /// Looks up one filing of a ticker by accession number
    pub async fn find_filing_by_accession(&self, ticker: &str, accession: &str) -> Result<FilingInfo, EdgarError> {
        let cik = self.get_cik_from_ticker(ticker).await?;
        let submissions = self.get_company_submissions(&cik).await?;
        submissions
            .find_accession(ticker, accession)?
            .ok_or_else(|| EdgarError::FilingNotFound(accession.to_string()))
    }
}

impl DocumentFetcher for EdgarClient {
    async fn fetch_document(&self, filing: &FilingInfo) -> Result<String, EdgarError> {
        self.download_filing_doc(&filing.primary_doc_url()).await
    }
}
