// src/lib.rs
//! Extracts net income, preferred dividends and diluted share counts from
//! quarterly filing HTML and exports them as CSV.

pub mod assembler;
pub mod config;
pub mod edgar;
pub mod extractors;
pub mod storage;
pub mod utils;
