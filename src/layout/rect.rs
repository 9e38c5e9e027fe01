/// Axis-aligned rectangle in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn short_edge(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `max(w/h, h/w)`: 1.0 for a square, growing as the shape stretches.
    /// Degenerate rectangles (a zero or non-finite side) report infinity.
    pub fn aspect_ratio(&self) -> f64 {
        if !(self.width > 0.0 && self.height > 0.0) || !self.width.is_finite() || !self.height.is_finite() {
            return f64::INFINITY;
        }
        (self.width / self.height).max(self.height / self.width)
    }
}

/// NaN and infinities (0/0 or x/0 from all-zero weights) collapse to 0.
pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
