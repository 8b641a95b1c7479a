use tracing::debug;

use crate::core::confidence::{bbox_union, mean_confidence};
use crate::core::model::{PageSide, WordToken};
use crate::ocr::schema::OcrPage;
use crate::ocr::tokens::{extract_word_tokens, page_dimensions};
use crate::table::model::{ColumnBand, RowType, Table, TableCell, TableExtractionResult, TableRow};
use crate::table::rows::cluster_rows;
use crate::table::template::{RowModel, TemplateColumn, TemplateSource, TemplateSpec};

pub const GENERIC_TEMPLATE_ID: &str = "generic";

/// Column chosen for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAssignment {
    pub column_index: usize,
    pub ambiguous: bool,
}

/// Assigns a token to the band with the largest horizontal overlap.
///
/// Equal overlaps go to the column declared first. The token is ambiguous
/// when its center sits inside a different band. A token overlapping no band
/// is placed by its center, or left unassigned when the center is in a gap.
pub fn assign_column(token: &WordToken, columns: &[TemplateColumn]) -> Option<ColumnAssignment> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, column) in columns.iter().enumerate() {
        let overlap = token.bbox.horizontal_overlap(column.x0_norm, column.x1_norm);
        if overlap > 0.0 && best.map_or(true, |(_, best_overlap)| overlap > best_overlap) {
            best = Some((idx, overlap));
        }
    }

    let center_column = columns.iter().position(|c| c.contains_x(token.cx));
    match best {
        Some((column_index, _)) => Some(ColumnAssignment {
            column_index,
            ambiguous: center_column.is_some_and(|c| c != column_index),
        }),
        None => center_column.map(|column_index| ColumnAssignment {
            column_index,
            ambiguous: false,
        }),
    }
}

#[derive(Debug, Default)]
struct AssignmentStats {
    ambiguous: usize,
    assigned: usize,
}

fn build_row(
    row_index: usize,
    row_type: RowType,
    tokens: &[WordToken],
    columns: &[TemplateColumn],
    stats: &mut AssignmentStats,
) -> TableRow {
    let mut buckets: Vec<Vec<&WordToken>> = vec![Vec::new(); columns.len()];
    for token in tokens {
        if let Some(assignment) = assign_column(token, columns) {
            stats.assigned += 1;
            if assignment.ambiguous {
                stats.ambiguous += 1;
            }
            buckets[assignment.column_index].push(token);
        }
    }

    let cells = columns
        .iter()
        .zip(buckets)
        .enumerate()
        .map(|(column_index, (column, assigned))| TableCell {
            row_index,
            column_index,
            column_key: column.key.clone(),
            content: assigned
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            confidence: mean_confidence(assigned.iter().map(|t| t.confidence)),
            token_count: Some(assigned.len()),
            bbox: bbox_union(assigned.iter().map(|t| t.bbox)),
        })
        .collect();

    TableRow {
        row_index,
        row_type,
        cells,
    }
}

fn row_text(row: &[WordToken]) -> String {
    row.iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_lowercase()
}

/// Drops the first row whose text is exactly a stop keyword and everything after it.
fn truncate_at_stop_keyword(rows: &mut Vec<Vec<WordToken>>, stop_keywords: &[String]) {
    if stop_keywords.is_empty() {
        return;
    }
    let keywords: Vec<String> = stop_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .collect();
    if let Some(stop) = rows.iter().position(|row| keywords.contains(&row_text(row))) {
        rows.truncate(stop);
    }
}

fn extract_rows(
    tokens: Vec<WordToken>,
    template: &TemplateSpec,
    page: &OcrPage,
) -> TableExtractionResult {
    let total_tokens = tokens.len();
    let (header_tokens, data_tokens): (Vec<WordToken>, Vec<WordToken>) = tokens
        .into_iter()
        .partition(|t| template.header_cut_norm > 0.0 && t.cy < template.header_cut_norm);
    let data_token_count = data_tokens.len();

    let merge_gap_frac = template.row_model.merge_gap_frac;
    let mut data_rows = cluster_rows(&data_tokens, merge_gap_frac);
    truncate_at_stop_keyword(&mut data_rows, &template.row_model.stop_keywords);
    if let Some(max_rows) = template.row_model.max_rows {
        data_rows.truncate(max_rows);
    }

    let mut stats = AssignmentStats::default();
    let mut rows = Vec::with_capacity(data_rows.len() + 1);
    let has_header_row = !header_tokens.is_empty();
    if has_header_row {
        // Multi-line headers read top to bottom, then left to right.
        let header_reading_order: Vec<WordToken> = cluster_rows(&header_tokens, merge_gap_frac)
            .into_iter()
            .flatten()
            .collect();
        rows.push(build_row(
            0,
            RowType::Header,
            &header_reading_order,
            &template.columns,
            &mut stats,
        ));
    }
    let first_data_index = rows.len();
    for (offset, row) in data_rows.iter().enumerate() {
        rows.push(build_row(
            first_data_index + offset,
            RowType::Row,
            row,
            &template.columns,
            &mut stats,
        ));
    }

    let column_count = template.columns.len();
    let tables = if rows.is_empty() {
        Vec::new()
    } else {
        vec![Table {
            row_count: rows.len(),
            column_count,
            has_header_row,
            rows,
        }]
    };

    TableExtractionResult {
        layout_id: None,
        page_dimensions: page_dimensions(page),
        tables,
        column_bands: template
            .columns
            .iter()
            .map(|c| ColumnBand {
                key: c.key.clone(),
                start: c.x0_norm,
                end: c.x1_norm,
            })
            .collect(),
        columns_detected: column_count,
        header_y_threshold: template.header_cut_norm,
        total_tokens,
        data_tokens: data_token_count,
        data_rows: data_rows.len(),
        template_locked: false,
        template_id: None,
        ambiguous_tokens: stats.ambiguous,
        total_assigned_tokens: stats.assigned,
    }
}

/// Builds the page table by locking tokens to the template's column bands.
pub fn extract_with_template(page: &OcrPage, template: &TemplateSpec) -> TableExtractionResult {
    let mut result = extract_rows(extract_word_tokens(page), template, page);
    result.template_locked = true;
    result.template_id = Some(template.template_id.clone());
    if template.source == TemplateSource::External {
        result.layout_id = Some(template.template_id.clone());
    }

    debug!(
        template_id = %template.template_id,
        data_rows = result.data_rows,
        ambiguous_tokens = result.ambiguous_tokens,
        assigned = result.total_assigned_tokens,
        total = result.total_tokens,
        "template-locked extraction"
    );
    result
}

/// Column bands from the horizontal projection of the tokens: overlapping
/// x-spans merge, gaps separate columns.
pub fn derive_column_bands(tokens: &[WordToken]) -> Vec<TemplateColumn> {
    let mut spans: Vec<(f64, f64)> = tokens
        .iter()
        .map(|t| (t.bbox.x0.clamp(0.0, 1.0), t.bbox.x1.clamp(0.0, 1.0)))
        // Off-page tokens clamp to a zero-width span and would open an empty column.
        .filter(|(x0, x1)| x0 < x1)
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in spans {
        match merged.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => merged.push((x0, x1)),
        }
    }

    merged
        .into_iter()
        .enumerate()
        .map(|(idx, (x0, x1))| TemplateColumn {
            key: format!("col_{}", idx + 1),
            x0_norm: x0,
            x1_norm: x1,
            required: false,
            aliases: Vec::new(),
        })
        .collect()
}

/// Extraction without a template. Bands come from the token projection and
/// there is no header row.
pub fn extract_generic(page: &OcrPage, merge_gap_frac: f64) -> TableExtractionResult {
    let tokens = extract_word_tokens(page);
    let spec = TemplateSpec {
        template_id: GENERIC_TEMPLATE_ID.to_string(),
        name: "Generic projection".to_string(),
        record_type: None,
        page_side: PageSide::Full,
        header_cut_norm: 0.0,
        columns: derive_column_bands(&tokens),
        row_model: RowModel {
            merge_gap_frac,
            ..RowModel::default()
        },
        source: TemplateSource::Builtin,
    };
    let result = extract_rows(tokens, &spec, page);
    debug!(
        columns = result.columns_detected,
        data_rows = result.data_rows,
        "generic extraction"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::ocr::schema::{BoundingPoly, OcrBlock, OcrParagraph, OcrWord, Vertex};
    use crate::table::rows::DEFAULT_MERGE_GAP_FRAC;
    use crate::table::template::builtin_for_record_type;
    use pretty_assertions::assert_eq;

    /// Page of 1000x1000 px; boxes are given in normalized units.
    fn page(words: &[(&str, [f64; 4])]) -> OcrPage {
        let words = words
            .iter()
            .map(|(text, [x0, y0, x1, y1])| OcrWord {
                text: Some(text.to_string()),
                symbols: Vec::new(),
                confidence: Some(0.9),
                bounding_box: Some(BoundingPoly {
                    vertices: vec![
                        Vertex { x: x0 * 1000.0, y: y0 * 1000.0 },
                        Vertex { x: x1 * 1000.0, y: y0 * 1000.0 },
                        Vertex { x: x1 * 1000.0, y: y1 * 1000.0 },
                        Vertex { x: x0 * 1000.0, y: y1 * 1000.0 },
                    ],
                }),
            })
            .collect();
        OcrPage {
            width: 1000.0,
            height: 1000.0,
            blocks: vec![OcrBlock {
                region: None,
                paragraphs: vec![OcrParagraph { words }],
            }],
        }
    }

    fn column(key: &str, x0: f64, x1: f64) -> TemplateColumn {
        TemplateColumn {
            key: key.to_string(),
            x0_norm: x0,
            x1_norm: x1,
            required: false,
            aliases: Vec::new(),
        }
    }

    fn spec(columns: Vec<TemplateColumn>) -> TemplateSpec {
        TemplateSpec {
            template_id: "test".into(),
            name: "test".into(),
            record_type: None,
            page_side: PageSide::Full,
            header_cut_norm: 0.0,
            columns,
            row_model: RowModel::default(),
            source: TemplateSource::External,
        }
    }

    fn content<'a>(result: &'a TableExtractionResult, row: usize, key: &str) -> &'a str {
        result.cell(row, key).map(|c| c.content.as_str()).unwrap_or_default()
    }

    #[test]
    fn scenario_a_builtin_baptism_rows() {
        let page = page(&[
            ("1", [0.01, 0.30, 0.04, 0.32]),
            ("1899-05-10", [0.08, 0.30, 0.17, 0.32]),
            ("John", [0.20, 0.30, 0.26, 0.32]),
            ("2", [0.01, 0.36, 0.04, 0.38]),
            ("1899-06-02", [0.08, 0.36, 0.17, 0.38]),
            ("Maria", [0.20, 0.36, 0.27, 0.38]),
        ]);
        let template = builtin_for_record_type("baptism").unwrap();
        let result = extract_with_template(&page, template);

        assert_eq!(result.data_rows, 2);
        assert!(result.template_locked);
        assert_eq!(result.template_id.as_deref(), Some("baptism"));
        assert_eq!(result.layout_id, None);
        assert_eq!(content(&result, 0, "name"), "John");
        assert_eq!(content(&result, 1, "name"), "Maria");
        assert_eq!(content(&result, 0, "date"), "1899-05-10");
        assert_eq!(result.ambiguous_tokens, 0);
        assert_eq!(result.total_assigned_tokens, 6);
        assert_eq!(result.tables[0].column_count, template.columns.len());
        assert!(!result.tables[0].has_header_row);
    }

    #[test]
    fn scenario_b_token_straddling_gap_is_ambiguous() {
        let template = spec(vec![column("left", 0.0, 0.2), column("narrow", 0.24, 0.27)]);
        let page = page(&[("Wide", [0.05, 0.5, 0.45, 0.52])]);
        let result = extract_with_template(&page, &template);

        assert!(result.ambiguous_tokens >= 1);
        assert_eq!(content(&result, 0, "left"), "Wide");
        assert_eq!(content(&result, 0, "narrow"), "");
        assert_eq!(result.layout_id.as_deref(), Some("test"));
    }

    #[test]
    fn equal_overlap_goes_to_first_declared_column() {
        let columns = vec![column("a", 0.0, 0.25), column("b", 0.5, 0.75)];
        let token = WordToken::new("x".into(), None, BBox::new(0.125, 0.0, 0.625, 0.1));
        let assignment = assign_column(&token, &columns).unwrap();
        assert_eq!(assignment.column_index, 0);
        // Center 0.375 lies in the gap, which is not ambiguity.
        assert!(!assignment.ambiguous);

        let reversed = vec![column("b", 0.5, 0.75), column("a", 0.0, 0.25)];
        assert_eq!(assign_column(&token, &reversed).unwrap().column_index, 0);
    }

    #[test]
    fn tokens_outside_every_band_stay_unassigned() {
        let template = spec(vec![column("a", 0.0, 0.2)]);
        let page = page(&[("in", [0.05, 0.5, 0.1, 0.52]), ("out", [0.6, 0.5, 0.7, 0.52])]);
        let result = extract_with_template(&page, &template);
        assert_eq!(result.total_tokens, 2);
        assert_eq!(result.total_assigned_tokens, 1);
        assert_eq!(content(&result, 0, "a"), "in");
    }

    #[test]
    fn header_row_comes_first_and_data_rows_follow() {
        let mut template = spec(vec![column("number", 0.0, 0.1), column("name", 0.1, 0.5)]);
        template.header_cut_norm = 0.15;
        let page = page(&[
            ("No.", [0.01, 0.05, 0.05, 0.07]),
            ("Name", [0.2, 0.05, 0.3, 0.07]),
            ("1", [0.01, 0.3, 0.05, 0.32]),
            ("Anna", [0.2, 0.3, 0.3, 0.32]),
        ]);
        let result = extract_with_template(&page, &template);
        let table = &result.tables[0];
        assert!(table.has_header_row);
        assert_eq!(table.rows[0].row_type, RowType::Header);
        assert_eq!(table.rows[1].row_index, 1);
        assert_eq!(content(&result, 0, "name"), "Name");
        assert_eq!(content(&result, 1, "name"), "Anna");
        assert_eq!(result.data_tokens, 2);
        assert_eq!(result.data_rows, 1);
    }

    #[test]
    fn stop_keyword_and_max_rows_truncate() {
        let mut template = spec(vec![column("name", 0.0, 0.5)]);
        template.row_model.stop_keywords = vec!["Total".into()];
        let page = page(&[
            ("Anna", [0.1, 0.30, 0.2, 0.32]),
            ("Ben", [0.1, 0.40, 0.2, 0.42]),
            ("total", [0.1, 0.50, 0.2, 0.52]),
            ("Carl", [0.1, 0.60, 0.2, 0.62]),
        ]);
        assert_eq!(extract_with_template(&page, &template).data_rows, 2);

        template.row_model.max_rows = Some(1);
        let result = extract_with_template(&page, &template);
        assert_eq!(result.data_rows, 1);
        assert_eq!(content(&result, 0, "name"), "Anna");
    }

    #[test]
    fn cell_bbox_and_confidence_cover_assigned_tokens() {
        let template = spec(vec![column("name", 0.0, 0.5)]);
        let page = page(&[("Anna", [0.1, 0.30, 0.2, 0.32]), ("Maria", [0.22, 0.30, 0.3, 0.32])]);
        let result = extract_with_template(&page, &template);
        let cell = result.cell(0, "name").unwrap();
        assert_eq!(cell.content, "Anna Maria");
        assert_eq!(cell.token_count, Some(2));
        let bbox = cell.bbox.unwrap();
        assert!((bbox.x0 - 0.1).abs() < 1e-9 && (bbox.x1 - 0.3).abs() < 1e-9);
        assert!((cell.confidence.unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn generic_extraction_derives_bands_from_gaps() {
        let page = page(&[
            ("1", [0.02, 0.30, 0.05, 0.32]),
            ("Anna", [0.30, 0.30, 0.40, 0.32]),
            ("2", [0.03, 0.40, 0.06, 0.42]),
            ("Ben", [0.32, 0.40, 0.38, 0.42]),
        ]);
        let result = extract_generic(&page, DEFAULT_MERGE_GAP_FRAC);
        assert!(!result.template_locked);
        assert_eq!(result.template_id, None);
        assert_eq!(result.columns_detected, 2);
        assert_eq!(content(&result, 1, "col_2"), "Ben");
        assert_eq!(result.total_assigned_tokens, 4);
    }

    #[test]
    fn off_page_tokens_do_not_open_a_column() {
        let page = page(&[
            ("1", [0.02, 0.30, 0.05, 0.32]),
            ("Anna", [0.30, 0.30, 0.40, 0.32]),
            ("smudge", [1.05, 0.30, 1.20, 0.32]),
        ]);
        let result = extract_generic(&page, DEFAULT_MERGE_GAP_FRAC);
        assert_eq!(result.columns_detected, 2);
        assert_eq!(result.total_assigned_tokens, 2);
        assert_eq!(content(&result, 0, "col_2"), "Anna");
    }

    #[test]
    fn empty_page_yields_empty_table() {
        let page = OcrPage {
            width: 1000.0,
            height: 1000.0,
            blocks: Vec::new(),
        };
        let result = extract_with_template(&page, builtin_for_record_type("funeral").unwrap());
        assert_eq!(result.data_rows, 0);
        assert_eq!(result.total_tokens, 0);
        assert!(result.tables.is_empty());
    }
}
