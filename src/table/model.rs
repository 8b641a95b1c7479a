use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;
use crate::core::model::PageDimensions;

/// Table extraction output. The same shape is produced by the
/// template-locked and generic paths; the last four fields are diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableExtractionResult {
    pub layout_id: Option<String>,
    pub page_dimensions: PageDimensions,
    pub tables: Vec<Table>,
    pub column_bands: Vec<ColumnBand>,
    pub columns_detected: usize,
    pub header_y_threshold: f64,
    pub total_tokens: usize,
    pub data_tokens: usize,
    pub data_rows: usize,
    #[serde(default)]
    pub template_locked: bool,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub ambiguous_tokens: usize,
    #[serde(default)]
    pub total_assigned_tokens: usize,
}

impl TableExtractionResult {
    pub fn empty(page_dimensions: PageDimensions) -> Self {
        Self {
            layout_id: None,
            page_dimensions,
            tables: Vec::new(),
            column_bands: Vec::new(),
            columns_detected: 0,
            header_y_threshold: 0.0,
            total_tokens: 0,
            data_tokens: 0,
            data_rows: 0,
            template_locked: false,
            template_id: None,
            ambiguous_tokens: 0,
            total_assigned_tokens: 0,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .flat_map(|r| r.cells.iter())
    }

    /// Band for a cell, by key first and then by position.
    pub fn band_for(&self, column_key: &str, column_index: usize) -> Option<&ColumnBand> {
        self.column_bands
            .iter()
            .find(|b| b.key == column_key)
            .or_else(|| self.column_bands.get(column_index))
    }

    pub fn cell(&self, row_index: usize, column_key: &str) -> Option<&TableCell> {
        self.cells()
            .find(|c| c.row_index == row_index && c.column_key == column_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnBand {
    pub key: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub row_count: usize,
    pub column_count: usize,
    pub has_header_row: bool,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowType {
    Header,
    Row,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub row_index: usize,
    #[serde(rename = "type")]
    pub row_type: RowType,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableCell {
    pub row_index: usize,
    pub column_index: usize,
    pub column_key: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}
