// src/extractors/mod.rs
pub mod document;
pub mod field;
pub mod numeric;
pub mod spec;
pub mod table;
pub mod text;

// Re-export key extraction types for convenience
pub use field::{ExtractedValue, ExtractionMethod, ExtractionResult, FieldExtractor, FieldOutcome};
pub use spec::{ColumnPolicy, FieldSpec, Label, Scale, ValueKind};
