use serde::{Deserialize, Serialize};

/// Which corner of the page the `t`/`b` coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
    #[serde(default)]
    pub coord_origin: CoordOrigin,
}

impl BoundingBox {
    pub fn new(l: f64, t: f64, r: f64, b: f64) -> Self {
        Self {
            l,
            t,
            r,
            b,
            coord_origin: CoordOrigin::TopLeft,
        }
    }

    /// Builds a top-left box from the extremes of a set of points.
    /// Returns `None` for an empty set.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut points = points.into_iter();
        let (x0, y0) = points.next()?;
        let init = Self::new(x0, y0, x0, y0);
        Some(points.fold(init, |acc, (x, y)| {
            Self::new(acc.l.min(x), acc.t.min(y), acc.r.max(x), acc.b.max(y))
        }))
    }

    pub fn width(&self) -> f64 {
        (self.r - self.l).abs()
    }

    pub fn height(&self) -> f64 {
        (self.b - self.t).abs()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Grows the box outward to whole page units.
    pub fn snapped(&self) -> Self {
        Self {
            l: self.l.floor(),
            t: self.t.floor(),
            r: self.r.ceil(),
            b: self.b.ceil(),
            coord_origin: self.coord_origin,
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            l: self.l + dx,
            t: self.t + dy,
            r: self.r + dx,
            b: self.b + dy,
            coord_origin: self.coord_origin,
        }
    }

    /// Converts to top-left origin given the page height.
    pub fn to_top_left_origin(&self, page_height: f64) -> Self {
        match self.coord_origin {
            CoordOrigin::TopLeft => *self,
            CoordOrigin::BottomLeft => Self::new(
                self.l,
                page_height - self.t,
                self.r,
                page_height - self.b,
            ),
        }
    }

    /// Overlapping region of two top-left boxes, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let l = self.l.max(other.l);
        let t = self.t.max(other.t);
        let r = self.r.min(other.r);
        let b = self.b.min(other.b);
        (r > l && b > t).then(|| Self::new(l, t, r, b))
    }

    pub fn intersection_area(&self, other: &Self) -> f64 {
        self.intersection(other).map_or(0.0, |i| i.area())
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.l.min(other.l),
            self.t.min(other.t),
            self.r.max(other.r),
            self.b.max(other.b),
        )
    }
}

/// A recognized text span, the pipeline's unit of text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCell {
    pub index: usize,
    pub text: String,
    pub orig: String,
    pub from_ocr: bool,
    pub confidence: f64,
    pub rect: BoundingBox,
}

impl TextCell {
    pub fn from_ocr(index: usize, text: impl Into<String>, confidence: f64, rect: BoundingBox) -> Self {
        let text = text.into();
        Self {
            index,
            orig: text.clone(),
            text,
            from_ocr: true,
            confidence,
            rect,
        }
    }

    pub fn programmatic(index: usize, text: impl Into<String>, rect: BoundingBox) -> Self {
        let text = text.into();
        Self {
            index,
            orig: text.clone(),
            text,
            from_ocr: false,
            confidence: 1.0,
            rect,
        }
    }
}
