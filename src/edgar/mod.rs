// src/edgar/mod.rs
pub mod client;
pub mod models;

pub use client::{EdgarClient, EdgarConfig};
pub use models::{FilingInfo, FilingQuery};

use crate::utils::error::EdgarError;

/// Source of raw filing documents.
#[allow(async_fn_in_trait)]
pub trait DocumentFetcher {
    async fn fetch_document(&self, filing: &FilingInfo) -> Result<String, EdgarError>;
}
