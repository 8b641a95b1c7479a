//! Column-layout templates.
//!
//! A template describes one ledger layout: an ordered list of column bands
//! (fractions of page width), a header cut (fraction of page height) and the
//! row clustering parameters. Built-in templates cover the three sacramental
//! registers; external layouts are adapted from template-store rows.

use std::io::Read;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::error::{LedgerError, Result};
use crate::core::model::PageSide;
use crate::table::rows::DEFAULT_MERGE_GAP_FRAC;

pub const DEFAULT_HEADER_CUT: f64 = 0.15;
pub const DEFAULT_MAX_ROWS: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateColumn {
    pub key: String,
    pub x0_norm: f64,
    pub x1_norm: f64,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TemplateColumn {
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x0_norm && x <= self.x1_norm
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RowModel {
    pub merge_gap_frac: f64,
    pub stop_keywords: Vec<String>,
    pub max_rows: Option<usize>,
}

impl Default for RowModel {
    fn default() -> Self {
        Self {
            merge_gap_frac: DEFAULT_MERGE_GAP_FRAC,
            stop_keywords: Vec::new(),
            max_rows: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSource {
    Builtin,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateSpec {
    pub template_id: String,
    pub name: String,
    pub record_type: Option<String>,
    pub page_side: PageSide,
    pub header_cut_norm: f64,
    pub columns: Vec<TemplateColumn>,
    pub row_model: RowModel,
    pub source: TemplateSource,
}

impl TemplateSpec {
    pub fn required_columns(&self) -> impl Iterator<Item = &TemplateColumn> {
        self.columns.iter().filter(|c| c.required)
    }
}

fn column(key: &str, x0: f64, x1: f64, required: bool, aliases: &[&str]) -> TemplateColumn {
    TemplateColumn {
        key: key.to_string(),
        x0_norm: x0,
        x1_norm: x1,
        required,
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

fn builtin(id: &str, name: &str, columns: Vec<TemplateColumn>) -> TemplateSpec {
    TemplateSpec {
        template_id: id.to_string(),
        name: name.to_string(),
        record_type: Some(id.to_string()),
        page_side: PageSide::Full,
        header_cut_norm: DEFAULT_HEADER_CUT,
        columns,
        row_model: RowModel {
            merge_gap_frac: DEFAULT_MERGE_GAP_FRAC,
            stop_keywords: vec!["total".into(), "summa".into(), "continued".into()],
            max_rows: Some(DEFAULT_MAX_ROWS),
        },
        source: TemplateSource::Builtin,
    }
}

static BUILTIN_TEMPLATES: Lazy<Vec<TemplateSpec>> = Lazy::new(|| {
    vec![
        builtin(
            "baptism",
            "Baptism register",
            vec![
                column("number", 0.00, 0.07, true, &["no", "entry_number"]),
                column("date", 0.07, 0.18, true, &["baptism_date"]),
                column("name", 0.18, 0.36, true, &["child", "child_name"]),
                column("parents", 0.36, 0.58, false, &["father", "mother"]),
                column("godparents", 0.58, 0.78, false, &["sponsors"]),
                column("priest", 0.78, 0.90, false, &["officiant", "clergy"]),
                column("notes", 0.90, 1.00, false, &["remarks"]),
            ],
        ),
        builtin(
            "marriage",
            "Marriage register",
            vec![
                column("number", 0.00, 0.07, true, &["no", "entry_number"]),
                column("date", 0.07, 0.18, true, &["marriage_date"]),
                column("groom", 0.18, 0.38, true, &["groom_name"]),
                column("bride", 0.38, 0.58, true, &["bride_name"]),
                column("witnesses", 0.58, 0.80, false, &[]),
                column("priest", 0.80, 0.92, false, &["officiant", "clergy"]),
                column("notes", 0.92, 1.00, false, &["remarks"]),
            ],
        ),
        builtin(
            "funeral",
            "Funeral register",
            vec![
                column("number", 0.00, 0.07, true, &["no", "entry_number"]),
                column("date", 0.07, 0.18, true, &["death_date"]),
                column("name", 0.18, 0.40, true, &["deceased", "deceased_name"]),
                column("age", 0.40, 0.48, false, &[]),
                column("residence", 0.48, 0.66, false, &["address"]),
                column("burial_date", 0.66, 0.78, false, &["burial"]),
                column("priest", 0.78, 0.90, false, &["officiant", "clergy"]),
                column("notes", 0.90, 1.00, false, &["remarks", "cause"]),
            ],
        ),
    ]
});

pub fn builtin_templates() -> &'static [TemplateSpec] {
    &BUILTIN_TEMPLATES
}

pub fn builtin_for_record_type(record_type: &str) -> Option<&'static TemplateSpec> {
    let wanted = record_type.trim();
    if wanted.is_empty() {
        return None;
    }
    BUILTIN_TEMPLATES.iter().find(|t| {
        t.record_type
            .as_deref()
            .is_some_and(|rt| rt.eq_ignore_ascii_case(wanted))
    })
}

/// One band as written by the template store in the list form.
#[derive(Debug, Deserialize)]
struct BandEntry {
    key: String,
    #[serde(alias = "x0_norm", alias = "x0")]
    start: f64,
    #[serde(alias = "x1_norm", alias = "x1")]
    end: f64,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    aliases: Vec<String>,
}

/// The two accepted shapes of `column_bands`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnBands {
    List(Vec<BandEntry>),
    Keyed(Map<String, Value>),
}

impl ColumnBands {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            // Stored as text in some template rows.
            Value::String(raw) => serde_json::from_str(raw).ok(),
            Value::Array(_) | Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    fn into_columns(self) -> Option<Vec<TemplateColumn>> {
        let entries = match self {
            ColumnBands::List(entries) => entries,
            ColumnBands::Keyed(map) => map
                .into_iter()
                .map(|(key, bounds)| {
                    let [start, end]: [f64; 2] = serde_json::from_value(bounds).ok()?;
                    Some(BandEntry {
                        key,
                        start,
                        end,
                        required: false,
                        aliases: Vec::new(),
                    })
                })
                .collect::<Option<Vec<_>>>()?,
        };

        if entries.is_empty() {
            return None;
        }

        entries
            .into_iter()
            .map(|e| {
                let valid = !e.key.trim().is_empty()
                    && (0.0..=1.0).contains(&e.start)
                    && (0.0..=1.0).contains(&e.end)
                    && e.start < e.end;
                valid.then(|| TemplateColumn {
                    key: e.key.trim().to_string(),
                    x0_norm: e.start,
                    x1_norm: e.end,
                    required: e.required,
                    aliases: e.aliases,
                })
            })
            .collect()
    }
}

/// Identifier of an external layout row, accepting string or numeric ids.
pub fn layout_row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Adapts a template-store row into a [`TemplateSpec`].
///
/// Returns `None` when the row has no usable id or its bands fit neither
/// accepted shape. A single malformed band rejects the whole row.
pub fn adapt_layout_row(row: &Value) -> Option<TemplateSpec> {
    let template_id = layout_row_id(row)?;
    let columns = row
        .get("column_bands")
        .and_then(ColumnBands::from_value)
        .and_then(ColumnBands::into_columns);
    let Some(columns) = columns else {
        debug!(template_id = %template_id, "layout row has no usable column bands");
        return None;
    };

    let header_cut_norm = row
        .get("header_y_threshold")
        .and_then(Value::as_f64)
        .filter(|v| (0.0..1.0).contains(v))
        .unwrap_or(DEFAULT_HEADER_CUT);
    let page_side = row
        .get("page_side")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    let row_model = row
        .get("row_model")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    Some(TemplateSpec {
        name: row
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&template_id)
            .to_string(),
        record_type: row
            .get("record_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        template_id,
        page_side,
        header_cut_norm,
        columns,
        row_model,
        source: TemplateSource::External,
    })
}

/// Reads one template-store row. The row must be a JSON object; its bands
/// are validated later by [`adapt_layout_row`].
pub fn read_layout_row<R: Read>(reader: R) -> Result<Value> {
    let row: Value = serde_json::from_reader(reader)?;
    if !row.is_object() {
        return Err(LedgerError::InvalidInput(format!(
            "layout row must be a JSON object, got {}",
            json_kind(&row)
        )));
    }
    Ok(row)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keys(spec: &TemplateSpec) -> Vec<&str> {
        spec.columns.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        let spec = builtin_for_record_type(" Baptism ").unwrap();
        assert_eq!(spec.template_id, "baptism");
        assert!(builtin_for_record_type("confirmation").is_none());
        assert!(builtin_for_record_type("").is_none());
        assert_eq!(builtin_templates().len(), 3);
    }

    #[test]
    fn builtin_bands_are_ordered_and_in_range() {
        for spec in builtin_templates() {
            for pair in spec.columns.windows(2) {
                assert!(pair[0].x1_norm <= pair[1].x0_norm, "{}", spec.template_id);
            }
            assert!(spec.columns.iter().all(|c| c.x0_norm >= 0.0 && c.x1_norm <= 1.0));
            assert!(spec.required_columns().count() >= 3);
        }
    }

    #[test]
    fn adapts_list_form() {
        let row = json!({
            "id": 17,
            "name": "St. Mary 1890s",
            "record_type": "baptism",
            "column_bands": [
                {"key": "number", "start": 0.0, "end": 0.1},
                {"key": "name", "start": 0.3, "end": 0.6, "aliases": ["child"]}
            ],
            "header_y_threshold": 0.2
        });
        let spec = adapt_layout_row(&row).unwrap();
        assert_eq!(spec.template_id, "17");
        assert_eq!(spec.source, TemplateSource::External);
        assert_eq!(keys(&spec), vec!["number", "name"]);
        assert_eq!(spec.header_cut_norm, 0.2);
        assert_eq!(spec.columns[1].aliases, vec!["child".to_string()]);
    }

    #[test]
    fn adapts_keyed_form_preserving_order() {
        let row = json!({
            "id": "tpl-a",
            "column_bands": {"zeta": [0.5, 0.9], "alpha": [0.0, 0.4]}
        });
        let spec = adapt_layout_row(&row).unwrap();
        assert_eq!(keys(&spec), vec!["zeta", "alpha"]);
        assert_eq!(spec.header_cut_norm, DEFAULT_HEADER_CUT);
        assert_eq!(spec.name, "tpl-a");
    }

    #[test]
    fn adapts_bands_stored_as_text() {
        let row = json!({
            "id": "tpl-b",
            "column_bands": "[{\"key\":\"date\",\"start\":0.1,\"end\":0.2}]"
        });
        assert_eq!(keys(&adapt_layout_row(&row).unwrap()), vec!["date"]);
    }

    #[test]
    fn rejects_malformed_rows() {
        let bad = [
            json!({"id": "x"}),
            json!({"id": "x", "column_bands": []}),
            json!({"id": "x", "column_bands": 12}),
            json!({"id": "x", "column_bands": "not json"}),
            json!({"id": "x", "column_bands": {"a": [0.5, 0.2]}}),
            json!({"id": "x", "column_bands": {"a": "wide"}}),
            json!({"id": "x", "column_bands": [{"key": "a", "start": 0.1, "end": 1.5}]}),
            json!({"column_bands": [{"key": "a", "start": 0.1, "end": 0.5}]}),
        ];
        for row in bad {
            assert!(adapt_layout_row(&row).is_none(), "{row}");
        }
    }

    #[test]
    fn layout_row_must_be_an_object() {
        let row = read_layout_row(r#"{"id": 3, "column_bands": []}"#.as_bytes()).unwrap();
        assert_eq!(row["id"], 3);

        let err = read_layout_row("[1, 2]".as_bytes()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)), "{err}");
        assert!(err.to_string().contains("an array"));
        assert!(matches!(
            read_layout_row("{".as_bytes()),
            Err(LedgerError::Json(_))
        ));
    }
}
