//! Envelopes for the JSON artifacts handed to the rendering collaborator.
//!
//! `recorded_at` is supplied by the caller so the core never reads a clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::model::{NormalizedToken, PageDimensions, TokenNormalization};
use crate::provenance::record::{FieldProvenance, RecordProvenanceResult};
use crate::provenance::table::{CellProvenance, TableProvenanceResult};

pub const TOKENS_NORMALIZED_FILE: &str = "tokens_normalized.json";
pub const TABLE_EXTRACTION_FILE: &str = "table_extraction.json";
pub const TABLE_PROVENANCE_FILE: &str = "table_provenance.json";
pub const RECORD_CANDIDATES_PROVENANCE_FILE: &str = "record_candidates_provenance.json";

pub const TOKEN_NORMALIZE_METHOD: &str = "token_normalize_v1";
pub const TABLE_PROVENANCE_METHOD: &str = "table_provenance_v1";
pub const RECORD_CANDIDATES_PROVENANCE_METHOD: &str = "record_candidates_provenance_v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokensNormalizedArtifact {
    pub method: String,
    pub page_dimensions: PageDimensions,
    pub tokens: Vec<NormalizedToken>,
    pub recorded_at: DateTime<Utc>,
}

impl TokensNormalizedArtifact {
    pub fn new(normalization: &TokenNormalization, recorded_at: DateTime<Utc>) -> Self {
        Self {
            method: TOKEN_NORMALIZE_METHOD.to_string(),
            page_dimensions: normalization.page_dimensions,
            tokens: normalization.tokens.clone(),
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableProvenanceArtifact {
    pub method: String,
    pub page_dimensions: PageDimensions,
    pub cells: Vec<CellProvenance>,
    pub cell_coverage_rate: f64,
    pub token_orphans_count: usize,
    pub total_tokens: usize,
    pub recorded_at: DateTime<Utc>,
}

impl TableProvenanceArtifact {
    pub fn new(provenance: &TableProvenanceResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            method: TABLE_PROVENANCE_METHOD.to_string(),
            page_dimensions: provenance.page_dimensions,
            cells: provenance.cells.clone(),
            cell_coverage_rate: provenance.cell_coverage_rate,
            token_orphans_count: provenance.token_orphans_count,
            total_tokens: provenance.total_tokens,
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordCandidatesProvenanceArtifact {
    pub method: String,
    pub fields: Vec<FieldProvenance>,
    pub field_coverage_rate: f64,
    pub recorded_at: DateTime<Utc>,
}

impl RecordCandidatesProvenanceArtifact {
    pub fn new(provenance: &RecordProvenanceResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            method: RECORD_CANDIDATES_PROVENANCE_METHOD.to_string(),
            fields: provenance.fields.clone(),
            field_coverage_rate: provenance.field_coverage_rate,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tokens_artifact_carries_method_and_timestamp() {
        let normalization = TokenNormalization::empty(PageDimensions {
            width: 10.0,
            height: 20.0,
        });
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(TokensNormalizedArtifact::new(&normalization, at)).unwrap();
        assert_eq!(json["method"], "token_normalize_v1");
        assert_eq!(json["recorded_at"], "2024-03-01T12:00:00Z");
        assert_eq!(json["page_dimensions"]["height"], 20.0);
    }
}
