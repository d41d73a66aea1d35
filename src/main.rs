// src/main.rs
use clap::Parser;
use filing_metrics::assembler::collect_records_with;
use filing_metrics::config;
use filing_metrics::edgar::{EdgarClient, EdgarConfig, FilingQuery};
use filing_metrics::extractors::{ColumnPolicy, FieldExtractor};
use filing_metrics::storage::{RunMetadata, StorageManager};
use filing_metrics::utils::{self, html_debug, AppError};
use std::path::PathBuf;
use std::time::Duration;

/// Extracts net income, preferred dividends and diluted shares from SEC filings into CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbol of the company
    #[arg(short, long)]
    ticker: String,

    /// Form type to process
    #[arg(long, default_value = "10-Q")]
    form: String,

    /// Number of most recent filings to process
    #[arg(short, long, default_value_t = 3)]
    limit: usize,

    /// Earliest filing year (optional)
    #[arg(long)]
    start_year: Option<u32>,

    /// Latest filing year (optional)
    #[arg(long)]
    end_year: Option<u32>,

    /// Specific SEC accession number (optional, overrides limit/years)
    #[arg(short, long)]
    accession_number: Option<String>,

    /// Output directory for the CSV, metadata and debug files
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// CSV file name (default: <TICKER>_<form>_data.csv)
    #[arg(long)]
    output_file: Option<String>,

    /// JSON file replacing the built-in field specs
    #[arg(long)]
    field_specs: Option<PathBuf>,

    /// Which period column to read when a row shows several
    #[arg(long, value_enum, default_value_t = ColumnPolicy::Leftmost)]
    column_policy: ColumnPolicy,

    /// User-Agent sent to EDGAR (SEC requires a contact address)
    #[arg(long, env = "EDGAR_USER_AGENT")]
    user_agent: Option<String>,

    /// Delay before each EDGAR request, in milliseconds
    #[arg(long, env = "EDGAR_REQUEST_DELAY_MS", default_value_t = 150)]
    request_delay_ms: u64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Debug mode - save raw and annotated HTML files for each filing
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Build the extractor; an empty or invalid field table stops the run here
    let specs = match &args.field_specs {
        Some(path) => config::load_field_specs(path)?,
        None => config::default_field_specs(),
    };
    let extractor = FieldExtractor::new(specs, args.column_policy)?;
    let field_names: Vec<&str> = extractor.field_names().collect();

    // 4. Initialize storage and the EDGAR client
    let storage = StorageManager::new(&args.output_dir)?;
    let mut edgar_config = EdgarConfig {
        request_delay: Duration::from_millis(args.request_delay_ms),
        timeout: Duration::from_secs(args.timeout_secs),
        ..EdgarConfig::default()
    };
    if let Some(user_agent) = &args.user_agent {
        edgar_config.user_agent = user_agent.clone();
    } else {
        tracing::warn!("No --user-agent / EDGAR_USER_AGENT set; SEC may reject the default one");
    }
    let client = EdgarClient::new(edgar_config)?;

    // 5. Find the filings to process
    let filings = match &args.accession_number {
        Some(accession) => {
            tracing::info!("Processing specific filing: {}", accession);
            vec![client.find_filing_by_accession(&args.ticker, accession).await?]
        }
        None => {
            let query = FilingQuery {
                form: args.form.clone(),
                start_year: args.start_year,
                end_year: args.end_year,
                limit: Some(args.limit),
            };
            client.find_filings(&args.ticker, &query).await?
        }
    };

    if filings.is_empty() {
        return Err(AppError::Config(format!(
            "No {} filings found for ticker {} in the specified range",
            args.form, args.ticker
        )));
    }

    // 6. Fetch and extract each filing in order
    let debug_patterns = extractor.debug_patterns();
    let records = collect_records_with(&client, &filings, &extractor, |filing, html| {
        if !args.debug {
            return;
        }
        match storage.save_raw_filing(&filing.ticker, &filing.accession_number, html) {
            Ok(path) => tracing::info!("Saved raw filing to: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save raw filing: {}", e),
        }
        let annotated = storage
            .debug_dir(&filing.ticker, &filing.accession_number)
            .map(|dir| dir.join("filing_annotated.html"));
        match annotated {
            Ok(path) => {
                if let Err(e) = html_debug::create_debug_html(html, &path, &debug_patterns) {
                    tracing::warn!("Failed to create debug HTML: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to create debug directory: {}", e),
        }
    })
    .await;

    // 7. Write the table and its metadata
    let output_file = args
        .output_file
        .clone()
        .unwrap_or_else(|| format!("{}_{}_data.csv", args.ticker.to_uppercase(), args.form));
    let csv_path = storage.save_records_csv(&output_file, &field_names, &records)?;
    let metadata = RunMetadata {
        ticker: &args.ticker,
        form: &args.form,
        column_policy: extractor.policy(),
        fields: field_names.clone(),
        records: &records,
    };
    storage.save_run_metadata(&output_file, &metadata)?;

    for record in &records {
        let values: Vec<String> = record
            .result
            .iter()
            .map(|f| match f.value {
                Some(v) => format!("{}={}", f.name, v.value),
                None => format!("{}=<not found>", f.name),
            })
            .collect();
        tracing::info!("{} ({}): {}", record.filing_id, record.filing_date, values.join(", "));
    }

    let failed = records.iter().filter(|r| r.fetch_error.is_some()).count();
    if failed > 0 {
        tracing::warn!("{} of {} filings could not be fetched", failed, records.len());
    }
    tracing::info!("Processing finished. Wrote {} rows to {}", records.len(), csv_path.display());

    Ok(())
}
