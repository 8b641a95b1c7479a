use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Word-level OCR output as produced by the Vision OCR collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

impl OcrResult {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub blocks: Vec<OcrBlock>,
}

/// A block with its region tag already resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawOcrBlock")]
pub struct OcrBlock {
    #[serde(rename = "_region", skip_serializing_if = "Option::is_none")]
    pub region: Option<i32>,
    pub paragraphs: Vec<OcrParagraph>,
}

/// Wire shape of a block. Upstream tags regions as either `_region` or
/// `_regionIndex`; `_region` wins when both are present.
#[derive(Deserialize)]
struct RawOcrBlock {
    #[serde(rename = "_region", default)]
    region: Option<i32>,
    #[serde(rename = "_regionIndex", default)]
    region_index: Option<i32>,
    #[serde(default)]
    paragraphs: Vec<OcrParagraph>,
}

impl From<RawOcrBlock> for OcrBlock {
    fn from(raw: RawOcrBlock) -> Self {
        Self {
            region: raw.region.or(raw.region_index),
            paragraphs: raw.paragraphs,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrParagraph {
    #[serde(default)]
    pub words: Vec<OcrWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrWord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<OcrSymbol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "boundingBox", alias = "bounding_box", default)]
    pub bounding_box: Option<BoundingPoly>,
}

impl OcrWord {
    /// Trimmed word text, assembled from symbols when `text` is absent or blank.
    pub fn resolved_text(&self) -> String {
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => self
                .symbols
                .iter()
                .map(|s| s.text.as_str())
                .collect::<String>()
                .trim()
                .to_string(),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.bounding_box
            .as_ref()
            .map(|b| b.vertices.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrSymbol {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Vision omits zero coordinates, so both default to 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}
