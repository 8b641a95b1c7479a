use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::confidence::{aggregate_confidence, bbox_union, mean_confidence};
use crate::core::geometry::BBox;
use crate::core::model::NormalizedToken;

/// Source tokens behind one cell or field, with derived box and confidence.
///
/// `token_ids` is sorted and free of duplicates. `bbox_union` is `None`
/// exactly when there are no tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProvenanceBundle {
    pub token_ids: Vec<u32>,
    pub bbox_union: Option<BBox>,
    pub confidence: Option<f64>,
}

impl ProvenanceBundle {
    pub fn from_tokens(tokens: &[&NormalizedToken]) -> Self {
        let ids: BTreeSet<u32> = tokens.iter().map(|t| t.token_id).collect();
        Self {
            token_ids: ids.into_iter().collect(),
            bbox_union: bbox_union(tokens.iter().map(|t| t.bbox_norm)),
            confidence: aggregate_confidence(tokens),
        }
    }

    /// Union of ids and boxes; confidences are averaged without weighting.
    pub fn merge<'a, I>(bundles: I) -> Self
    where
        I: IntoIterator<Item = &'a ProvenanceBundle>,
    {
        let bundles: Vec<&ProvenanceBundle> = bundles.into_iter().collect();
        let ids: BTreeSet<u32> = bundles
            .iter()
            .flat_map(|b| b.token_ids.iter().copied())
            .collect();
        if ids.is_empty() {
            return Self::default();
        }
        Self {
            token_ids: ids.into_iter().collect(),
            bbox_union: bbox_union(bundles.iter().filter_map(|b| b.bbox_union)),
            confidence: mean_confidence(bundles.iter().map(|b| b.confidence)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }
}
