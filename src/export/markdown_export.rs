use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::core::error::Result;
use crate::export::Exporter;
use crate::pipeline::PageOutcome;
use crate::table::model::{RowType, TableExtractionResult};

/// Renders every page's table as Markdown into `tables.md` for review.
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    out_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn escape(text: &str) -> String {
        text.replace('|', "\\|").replace('\n', " ")
    }

    pub fn format_table(table: &TableExtractionResult) -> String {
        let keys: Vec<&str> = table.column_bands.iter().map(|b| b.key.as_str()).collect();
        if keys.is_empty() {
            return "_No table detected._\n".to_string();
        }

        let mut out = String::new();
        out.push_str(&format!("| {} |\n", keys.join(" | ")));
        out.push_str(&format!("|{}\n", " --- |".repeat(keys.len())));
        for row in table.tables.iter().flat_map(|t| t.rows.iter()) {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| match row.row_type {
                    RowType::Header => format!("**{}**", Self::escape(&c.content)),
                    RowType::Row => Self::escape(&c.content),
                })
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out
    }

    fn format_page(page: &PageOutcome) -> String {
        let table = &page.table;
        let template = table.template_id.as_deref().unwrap_or("generic");
        let mut out = format!("## Page {}\n\n", page.page_idx + 1);
        out.push_str(&format!(
            "Template `{}` · {} rows · coverage {:.0}% · {} orphan tokens · {} ambiguous\n\n",
            template,
            table.data_rows,
            page.table_provenance.cell_coverage_rate * 100.0,
            page.table_provenance.token_orphans_count,
            table.ambiguous_tokens,
        ));
        out.push_str(&Self::format_table(table));
        out
    }
}

impl Exporter for MarkdownExporter {
    fn export(&self, pages: &[PageOutcome], recorded_at: DateTime<Utc>) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let mut out = format!(
            "# Extracted ledger tables\n\n_Recorded {}_\n\n",
            recorded_at.to_rfc3339()
        );
        for page in pages {
            out.push_str(&Self::format_page(page));
            out.push('\n');
        }
        fs::write(self.out_dir.join("tables.md"), out)?;
        Ok(())
    }
}
