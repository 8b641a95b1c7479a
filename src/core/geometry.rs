use serde::{Deserialize, Serialize};

/// Axis-aligned box. In every artifact it is written as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box enclosing all points, regardless of winding order.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self::new(x, y, x, y);
        for (x, y) in iter {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Length of the horizontal intersection with the band `[x0, x1]`.
    pub fn horizontal_overlap(&self, x0: f64, x1: f64) -> f64 {
        (self.x1.min(x1) - self.x0.max(x0)).max(0.0)
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn clamp(&self, x_max: f64, y_max: f64) -> Self {
        Self {
            x0: self.x0.clamp(0.0, x_max),
            y0: self.y0.clamp(0.0, y_max),
            x1: self.x1.clamp(0.0, x_max),
            y1: self.y1.clamp(0.0, y_max),
        }
    }

    pub fn clamp_unit(&self) -> Self {
        self.clamp(1.0, 1.0)
    }

    /// Divides pixel coordinates by the page dimensions.
    pub fn normalize(&self, width: f64, height: f64) -> Self {
        Self {
            x0: self.x0 / width,
            y0: self.y0 / height,
            x1: self.x1 / width,
            y1: self.y1 / height,
        }
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}
