// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Could not find filing: {0}")]
    FilingNotFound(String),

    #[error("Could not find filing document: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

/// Problems with the extractor configuration. Document content never produces
/// one of these: unreadable documents and missing values are normal outcomes.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No field specs configured")]
    NoFieldSpecs,

    #[error("Field spec '{0}' has no labels and no patterns")]
    EmptyFieldSpec(String),

    #[error("Duplicate field spec name: {0}")]
    DuplicateField(String),

    #[error("Invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern for field '{field}' has no `value` group: {pattern}")]
    MissingValueGroup { field: String, pattern: String },
}

/// Why a document could not be turned into a trustworthy tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,

    #[error("document contains binary data")]
    Binary,

    #[error("document contains no markup")]
    NoMarkup,

    #[error("document ends inside a tag")]
    TruncatedTag,

    #[error("document is truncated inside a table ({opened} opened, {closed} closed)")]
    UnclosedTable { opened: usize, closed: usize },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError),

    #[error("Extractor setup failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
