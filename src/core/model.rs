use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;

/// Region index recorded for tokens whose block carries no region tag.
pub const FULL_PAGE_REGION: i32 = -1;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageSide {
    Left,
    Right,
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// Transient word used for clustering and column assignment. `bbox` is
/// page-normalized but not clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub text: String,
    pub confidence: Option<f64>,
    pub bbox: BBox,
    pub cx: f64,
    pub cy: f64,
}

impl WordToken {
    pub fn new(text: String, confidence: Option<f64>, bbox: BBox) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            text,
            confidence,
            bbox,
            cx,
            cy,
        }
    }

    pub fn height(&self) -> f64 {
        self.bbox.height()
    }
}

/// Stable, ID-addressable token. All provenance references these IDs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedToken {
    pub token_id: u32,
    pub text: String,
    pub confidence: Option<f64>,
    pub bbox_px: BBox,
    pub bbox_norm: BBox,
    pub source_region_index: i32,
    pub page_side: PageSide,
}

impl NormalizedToken {
    pub fn center(&self) -> (f64, f64) {
        self.bbox_norm.center()
    }
}

/// Output of one normalization run over a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenNormalization {
    pub page_dimensions: PageDimensions,
    pub tokens: Vec<NormalizedToken>,
}

impl TokenNormalization {
    pub fn empty(page_dimensions: PageDimensions) -> Self {
        Self {
            page_dimensions,
            tokens: Vec::new(),
        }
    }
}
