use crate::core::geometry::BBox;
use crate::core::model::NormalizedToken;

/// Tightest box enclosing `boxes`, clamped to the unit square.
pub fn bbox_union<I>(boxes: I) -> Option<BBox>
where
    I: IntoIterator<Item = BBox>,
{
    boxes
        .into_iter()
        .map(|b| BBox::from_points([(b.x0, b.y0), (b.x1, b.y1)]).unwrap_or(b))
        .reduce(|acc, b| acc.union(&b))
        .map(|b| b.clamp_unit())
}

/// Area-weighted mean confidence over the tokens that carry one.
///
/// Area is normalized width times height. When every confident token is
/// degenerate (zero total area) the plain mean is returned instead.
pub fn aggregate_confidence(tokens: &[&NormalizedToken]) -> Option<f64> {
    weighted_confidence(
        tokens
            .iter()
            .filter_map(|t| t.confidence.map(|c| (c, t.bbox_norm.area()))),
    )
}

/// Mean of `(confidence, area)` samples weighted by area.
fn weighted_confidence<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let samples: Vec<(f64, f64)> = samples.into_iter().collect();
    if samples.is_empty() {
        return None;
    }

    let total_area: f64 = samples.iter().map(|(_, area)| area).sum();
    if total_area > 0.0 {
        let weighted: f64 = samples.iter().map(|(c, area)| c * area).sum();
        Some(weighted / total_area)
    } else {
        mean_confidence(samples.iter().map(|(c, _)| Some(*c)))
    }
}

/// Unweighted mean of the present values.
pub fn mean_confidence<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
