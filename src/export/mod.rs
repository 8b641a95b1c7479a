pub mod json_export;
pub mod markdown_export;

use chrono::{DateTime, Utc};

use crate::core::error::Result;
use crate::pipeline::PageOutcome;

pub use json_export::JsonExporter;
pub use markdown_export::MarkdownExporter;

pub trait Exporter {
    fn export(&self, pages: &[PageOutcome], recorded_at: DateTime<Utc>) -> Result<()>;
}

pub(crate) fn page_dir_name(page_idx: usize) -> String {
    format!("page_{:03}", page_idx + 1)
}
