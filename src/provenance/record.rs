use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::error::Result;
use crate::provenance::bundle::ProvenanceBundle;
use crate::provenance::table::TableProvenanceResult;

/// A record proposed by the external classifier for one table row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordCandidate {
    #[serde(default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub source_row_index: Option<i64>,
    #[serde(default)]
    pub needs_review: bool,
}

impl RecordCandidate {
    pub fn source_row(&self) -> Option<usize> {
        self.source_row_index.and_then(|i| usize::try_from(i).ok())
    }

    /// Fields carrying a value: not null, and not blank when a string.
    pub fn populated_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|(name, value)| {
            let populated = match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            };
            populated.then_some(name.as_str())
        })
    }
}

/// Classifier output for one page: candidates plus the table column key to
/// field name mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordCandidateSet {
    #[serde(default)]
    pub candidates: Vec<RecordCandidate>,
    #[serde(rename = "columnMapping", default)]
    pub column_mapping: Map<String, Value>,
}

/// Classifier output files hold either one set or one entry per page.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateSets {
    PerPage(Vec<Option<RecordCandidateSet>>),
    Single(RecordCandidateSet),
}

impl RecordCandidateSet {
    /// Reads classifier output, indexed by page. A single set feeds page 0.
    pub fn read_per_page<R: Read>(reader: R) -> Result<Vec<Option<Self>>> {
        Ok(match serde_json::from_reader(reader)? {
            CandidateSets::PerPage(sets) => sets,
            CandidateSets::Single(set) => vec![Some(set)],
        })
    }

    /// Field name to the column keys that feed it, in mapping order.
    /// Entries whose target is not a string are ignored.
    pub fn field_columns(&self) -> HashMap<&str, Vec<&str>> {
        let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
        for (column_key, field) in &self.column_mapping {
            if let Some(field) = field.as_str() {
                index.entry(field).or_default().push(column_key.as_str());
            }
        }
        index
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldProvenance {
    pub candidate_index: usize,
    pub field_name: String,
    #[serde(flatten)]
    pub bundle: ProvenanceBundle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordProvenanceResult {
    pub fields: Vec<FieldProvenance>,
    pub field_coverage_rate: f64,
}

/// Carries cell provenance through the column mapping onto candidate fields.
///
/// A field without a mapping entry reads the cell whose column key equals
/// the field name, which is the case for template-locked tables.
pub fn build_record_candidate_provenance(
    table: &TableProvenanceResult,
    set: &RecordCandidateSet,
) -> RecordProvenanceResult {
    let field_columns = set.field_columns();
    let cells: HashMap<(usize, &str), &ProvenanceBundle> = table
        .cells
        .iter()
        .map(|c| ((c.row_index, c.column_key.as_str()), &c.bundle))
        .collect();

    let mut fields = Vec::new();
    for (candidate_index, candidate) in set.candidates.iter().enumerate() {
        let row = candidate.source_row();
        for field_name in candidate.populated_fields() {
            let bundle = match row {
                Some(row) => {
                    let keys = field_columns
                        .get(field_name)
                        .map(Vec::as_slice)
                        .unwrap_or(std::slice::from_ref(&field_name));
                    ProvenanceBundle::merge(
                        keys.iter().filter_map(|key| cells.get(&(row, *key)).copied()),
                    )
                }
                None => ProvenanceBundle::default(),
            };
            fields.push(FieldProvenance {
                candidate_index,
                field_name: field_name.to_string(),
                bundle,
            });
        }
    }

    let covered = fields.iter().filter(|f| !f.bundle.is_empty()).count();
    let field_coverage_rate = if fields.is_empty() {
        0.0
    } else {
        covered as f64 / fields.len() as f64
    };
    debug!(
        candidates = set.candidates.len(),
        fields = fields.len(),
        field_coverage_rate,
        "record candidate provenance built"
    );

    RecordProvenanceResult {
        fields,
        field_coverage_rate,
    }
}
