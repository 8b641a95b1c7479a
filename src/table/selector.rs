use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::table::template::{adapt_layout_row, builtin_for_record_type, layout_row_id, TemplateSpec};

pub const EXTERNAL_CONFIDENCE: f64 = 1.0;
pub const BUILTIN_CONFIDENCE: f64 = 0.85;

/// Why a template was or was not selected. Serialized as the audit string,
/// e.g. `BUILTIN_MATCH:baptism`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MatchReason {
    ExternalTemplate(String),
    ExternalTemplateInvalid(String),
    BuiltinMatch(String),
    NoTemplateMatch,
}

impl Display for MatchReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExternalTemplate(id) => write!(f, "EXTERNAL_TEMPLATE:{id}"),
            Self::ExternalTemplateInvalid(id) => write!(f, "EXTERNAL_TEMPLATE_INVALID:{id}"),
            Self::BuiltinMatch(id) => write!(f, "BUILTIN_MATCH:{id}"),
            Self::NoTemplateMatch => f.write_str("NO_TEMPLATE_MATCH"),
        }
    }
}

impl From<MatchReason> for String {
    fn from(reason: MatchReason) -> Self {
        reason.to_string()
    }
}

impl TryFrom<String> for MatchReason {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "NO_TEMPLATE_MATCH" {
            return Ok(Self::NoTemplateMatch);
        }
        let (code, id) = value
            .split_once(':')
            .ok_or_else(|| format!("unknown match reason: {value}"))?;
        let id = id.to_string();
        match code {
            "EXTERNAL_TEMPLATE" => Ok(Self::ExternalTemplate(id)),
            "EXTERNAL_TEMPLATE_INVALID" => Ok(Self::ExternalTemplateInvalid(id)),
            "BUILTIN_MATCH" => Ok(Self::BuiltinMatch(id)),
            _ => Err(format!("unknown match reason: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub selected_template_id: Option<String>,
    pub confidence: f64,
    pub reasons: Vec<MatchReason>,
}

impl TemplateMatch {
    pub fn is_selected(&self) -> bool {
        self.selected_template_id.is_some()
    }
}

/// Picks the template governing a page: external layout, then built-in for
/// the record type, then nothing.
pub fn select_template(record_type: Option<&str>, external_layout: Option<&Value>) -> TemplateMatch {
    let mut reasons = Vec::new();

    if let Some(row) = external_layout {
        if let Some(spec) = adapt_layout_row(row) {
            reasons.push(MatchReason::ExternalTemplate(spec.template_id.clone()));
            return TemplateMatch {
                selected_template_id: Some(spec.template_id),
                confidence: EXTERNAL_CONFIDENCE,
                reasons,
            };
        }
        let id = layout_row_id(row).unwrap_or_else(|| "unknown".to_string());
        reasons.push(MatchReason::ExternalTemplateInvalid(id));
    }

    if let Some(spec) = record_type.and_then(builtin_for_record_type) {
        reasons.push(MatchReason::BuiltinMatch(spec.template_id.clone()));
        return TemplateMatch {
            selected_template_id: Some(spec.template_id.clone()),
            confidence: BUILTIN_CONFIDENCE,
            reasons,
        };
    }

    reasons.push(MatchReason::NoTemplateMatch);
    TemplateMatch {
        selected_template_id: None,
        confidence: 0.0,
        reasons,
    }
}

/// Materializes the spec behind a match. The external layout wins whenever
/// it adapts and carries the selected id.
pub fn resolve_template(
    selection: &TemplateMatch,
    record_type: Option<&str>,
    external_layout: Option<&Value>,
) -> Option<TemplateSpec> {
    let selected = selection.selected_template_id.as_deref()?;

    if let Some(spec) = external_layout
        .and_then(adapt_layout_row)
        .filter(|spec| spec.template_id == selected)
    {
        return Some(spec);
    }

    record_type
        .and_then(builtin_for_record_type)
        .filter(|spec| spec.template_id == selected)
        .cloned()
}
