pub mod artifact;
pub mod core;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod provenance;
pub mod table;

pub use core::error::{LedgerError, Result};
pub use core::model::{NormalizedToken, PageSide, TokenNormalization, WordToken};
pub use pipeline::{process_document, process_page, PageOutcome, PipelineConfig};
