use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::artifact::{
    RecordCandidatesProvenanceArtifact, TableProvenanceArtifact, TokensNormalizedArtifact,
    RECORD_CANDIDATES_PROVENANCE_FILE, TABLE_EXTRACTION_FILE, TABLE_PROVENANCE_FILE,
    TOKENS_NORMALIZED_FILE,
};
use crate::core::error::Result;
use crate::export::{page_dir_name, Exporter};
use crate::pipeline::PageOutcome;

/// Writes the per-page JSON artifacts under `page_NNN/`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn write_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string_pretty(value)?;
        fs::write(dir.join(file), data)?;
        Ok(())
    }
}

impl Exporter for JsonExporter {
    fn export(&self, pages: &[PageOutcome], recorded_at: DateTime<Utc>) -> Result<()> {
        for page in pages {
            let dir = self.out_dir.join(page_dir_name(page.page_idx));
            fs::create_dir_all(&dir)?;

            Self::write_json(
                &dir,
                TOKENS_NORMALIZED_FILE,
                &TokensNormalizedArtifact::new(&page.tokens, recorded_at),
            )?;
            Self::write_json(&dir, TABLE_EXTRACTION_FILE, &page.table)?;
            Self::write_json(
                &dir,
                TABLE_PROVENANCE_FILE,
                &TableProvenanceArtifact::new(&page.table_provenance, recorded_at),
            )?;
            if let Some(records) = &page.record_provenance {
                Self::write_json(
                    &dir,
                    RECORD_CANDIDATES_PROVENANCE_FILE,
                    &RecordCandidatesProvenanceArtifact::new(records, recorded_at),
                )?;
            }
            debug!(dir = %dir.display(), "wrote page artifacts");
        }
        Ok(())
    }
}
