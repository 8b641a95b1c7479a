use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::model::{NormalizedToken, PageDimensions, TokenNormalization};
use crate::provenance::bundle::ProvenanceBundle;
use crate::table::model::{TableCell, TableExtractionResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellProvenance {
    pub row_index: usize,
    pub column_key: String,
    #[serde(flatten)]
    pub bundle: ProvenanceBundle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableProvenanceResult {
    pub page_dimensions: PageDimensions,
    pub cells: Vec<CellProvenance>,
    pub cell_coverage_rate: f64,
    pub token_orphans_count: usize,
    pub total_tokens: usize,
}

impl TableProvenanceResult {
    pub fn cell(&self, row_index: usize, column_key: &str) -> Option<&CellProvenance> {
        self.cells
            .iter()
            .find(|c| c.row_index == row_index && c.column_key == column_key)
    }
}

/// Tokens backing one cell.
///
/// The token's center must fall in the cell's column band. With a cell box
/// it must also lie inside the box; without one, the token's text must occur
/// in the cell content.
fn match_cell_tokens<'a>(
    cell: &TableCell,
    extraction: &TableExtractionResult,
    tokens: &'a [NormalizedToken],
) -> Vec<&'a NormalizedToken> {
    let band = extraction.band_for(&cell.column_key, cell.column_index);

    if let Some(bbox) = cell.bbox {
        // A cell box can spill into the next band when a wide token was
        // assigned by overlap; the band keeps neighbours out.
        return tokens
            .iter()
            .filter(|t| {
                let (cx, cy) = t.center();
                bbox.contains_point(cx, cy)
                    && band.map_or(true, |b| cx >= b.start && cx <= b.end)
            })
            .collect();
    }

    if cell.content.trim().is_empty() {
        return Vec::new();
    }
    let Some(band) = band else {
        return Vec::new();
    };
    // TODO: substring matching can claim a repeated name or initial for
    // every cell of the row that contains it; restrict to bbox matching once
    // all extractors emit cell boxes.
    tokens
        .iter()
        .filter(|t| {
            let (cx, _) = t.center();
            cx >= band.start && cx <= band.end && cell.content.contains(t.text.as_str())
        })
        .collect()
}

/// Links every table cell to the normalized tokens it was built from.
pub fn build_table_provenance(
    normalization: &TokenNormalization,
    extraction: &TableExtractionResult,
) -> TableProvenanceResult {
    let tokens = &normalization.tokens;
    let mut assigned: HashSet<u32> = HashSet::new();
    let mut covered = 0_usize;

    let cells: Vec<CellProvenance> = extraction
        .cells()
        .map(|cell| {
            let matched = match_cell_tokens(cell, extraction, tokens);
            assigned.extend(matched.iter().map(|t| t.token_id));
            let bundle = ProvenanceBundle::from_tokens(&matched);
            if !bundle.is_empty() {
                covered += 1;
            }
            CellProvenance {
                row_index: cell.row_index,
                column_key: cell.column_key.clone(),
                bundle,
            }
        })
        .collect();

    let cell_coverage_rate = if cells.is_empty() {
        0.0
    } else {
        covered as f64 / cells.len() as f64
    };
    let token_orphans_count = tokens.len().saturating_sub(assigned.len());

    debug!(
        cells = cells.len(),
        cell_coverage_rate,
        token_orphans_count,
        total_tokens = tokens.len(),
        "table provenance built"
    );

    TableProvenanceResult {
        page_dimensions: normalization.page_dimensions,
        cells,
        cell_coverage_rate,
        token_orphans_count,
        total_tokens: tokens.len(),
    }
}
