use std::fmt;

use serde::Serialize;

/// Axis-aligned 2-D bounds in ground units.
///
/// Starts empty (`min = +inf`, `max = -inf`) so the first [`Extent::update`] establishes
/// the bounds. `update` folds coordinates unconditionally with `f64::min`/`f64::max`: a NaN
/// coordinate is not rejected, it simply never wins a comparison. Filtering invalid input is
/// up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::new()
    }
}

impl Extent {
    pub const fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub const fn from_bounds(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    #[inline]
    pub fn update(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[minx: {:.12}, maxx: {:.12}, miny: {:.12}, maxy: {:.12}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}
