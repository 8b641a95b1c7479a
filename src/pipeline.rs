use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::model::{PageSide, TokenNormalization};
use crate::ocr::schema::{OcrPage, OcrResult};
use crate::ocr::tokens::normalize_tokens;
use crate::provenance::record::{
    build_record_candidate_provenance, RecordCandidateSet, RecordProvenanceResult,
};
use crate::provenance::table::{build_table_provenance, TableProvenanceResult};
use crate::table::extractor::{extract_generic, extract_with_template};
use crate::table::model::{RowType, TableExtractionResult};
use crate::table::rows::DEFAULT_MERGE_GAP_FRAC;
use crate::table::selector::{resolve_template, select_template, TemplateMatch};
use crate::table::template::TemplateSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub record_type: Option<String>,
    pub external_layout: Option<Value>,
    pub page_side: PageSide,
}

impl PipelineConfig {
    pub fn new(record_type: Option<String>) -> Self {
        Self {
            record_type,
            ..Self::default()
        }
    }

    pub fn with_external_layout(mut self, layout: Value) -> Self {
        self.external_layout = Some(layout);
        self
    }

    pub fn with_page_side(mut self, page_side: PageSide) -> Self {
        self.page_side = page_side;
        self
    }
}

/// Everything produced for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutcome {
    pub page_idx: usize,
    pub template_match: TemplateMatch,
    pub tokens: TokenNormalization,
    pub table: TableExtractionResult,
    pub table_provenance: TableProvenanceResult,
    pub record_provenance: Option<RecordProvenanceResult>,
}

/// Runs selection, extraction, normalization and provenance for one page.
pub fn process_page(
    page_idx: usize,
    page: &OcrPage,
    config: &PipelineConfig,
    candidates: Option<&RecordCandidateSet>,
) -> PageOutcome {
    let record_type = config.record_type.as_deref();
    let layout = config.external_layout.as_ref();

    let template_match = select_template(record_type, layout);
    let template = resolve_template(&template_match, record_type, layout);
    let table = match &template {
        Some(template) => extract_with_template(page, template),
        None => extract_generic(page, DEFAULT_MERGE_GAP_FRAC),
    };
    let tokens = normalize_tokens(page, config.page_side);
    let table_provenance = build_table_provenance(&tokens, &table);
    let record_provenance =
        candidates.map(|set| build_record_candidate_provenance(&table_provenance, set));

    report_quality(page_idx, &template_match, &table, &table_provenance);
    if let Some(template) = &template {
        for key in empty_required_columns(template, &table) {
            warn!(page_idx, column = key, "required column is empty on every data row");
        }
    }

    PageOutcome {
        page_idx,
        template_match,
        tokens,
        table,
        table_provenance,
        record_provenance,
    }
}

fn report_quality(
    page_idx: usize,
    template_match: &TemplateMatch,
    table: &TableExtractionResult,
    provenance: &TableProvenanceResult,
) {
    let reasons: Vec<String> = template_match.reasons.iter().map(|r| r.to_string()).collect();
    debug!(
        page_idx,
        template_id = template_match.selected_template_id.as_deref().unwrap_or("none"),
        confidence = template_match.confidence,
        reasons = ?reasons,
        data_rows = table.data_rows,
        cell_coverage_rate = provenance.cell_coverage_rate,
        token_orphans_count = provenance.token_orphans_count,
        "page processed"
    );

    if !template_match.is_selected() {
        debug!(page_idx, "no template selected; columns derived from token projection");
    }
    if provenance.total_tokens > 0 && provenance.cell_coverage_rate == 0.0 {
        warn!(page_idx, total_tokens = provenance.total_tokens, "no cell is backed by a token");
    }
    if table.ambiguous_tokens > 0 {
        warn!(
            page_idx,
            ambiguous_tokens = table.ambiguous_tokens,
            "tokens straddle column bands; template fit may be off"
        );
    }
}

/// Keys of required template columns that hold no text in any data row.
/// Pages without data rows report nothing.
pub fn empty_required_columns<'a>(
    template: &'a TemplateSpec,
    table: &TableExtractionResult,
) -> Vec<&'a str> {
    if table.data_rows == 0 {
        return Vec::new();
    }
    let data_cells: Vec<_> = table
        .tables
        .iter()
        .flat_map(|t| t.rows.iter())
        .filter(|r| r.row_type == RowType::Row)
        .flat_map(|r| r.cells.iter())
        .collect();
    template
        .required_columns()
        .filter(|column| {
            !data_cells
                .iter()
                .any(|cell| cell.column_key == column.key && !cell.content.trim().is_empty())
        })
        .map(|column| column.key.as_str())
        .collect()
}

/// Processes every page independently and in parallel; results keep page order.
///
/// `candidates_by_page[i]` feeds page `i`; missing entries skip record provenance.
pub fn process_document(
    result: &OcrResult,
    config: &PipelineConfig,
    candidates_by_page: &[Option<RecordCandidateSet>],
) -> Vec<PageOutcome> {
    result
        .pages
        .par_iter()
        .enumerate()
        .map(|(page_idx, page)| {
            let candidates = candidates_by_page.get(page_idx).and_then(Option::as_ref);
            process_page(page_idx, page, config, candidates)
        })
        .collect()
}
