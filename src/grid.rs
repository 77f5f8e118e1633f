//! Point-to-grid interpolation.
//!
//! The renderer only talks to [`Grid`] and [`GridFactory`]; [`RadiusGrid`] is the built-in
//! implementation that accumulates every point within a radius of each grid node.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Squared distances below this are treated as a point sitting on the node.
const MIN_DISTANCE_2: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Max,
    /// Inverse distance weighted mean.
    Idw,
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Statistic::Max),
            "idw" => Ok(Statistic::Idw),
            other => Err(Error::UnsupportedStatistic(other.to_string())),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Max => f.write_str("max"),
            Statistic::Idw => f.write_str("idw"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    /// Lower left node.
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub radius: f64,
    pub statistic: Statistic,
}

pub trait Grid {
    /// May be called any number of times, in any order, before `finalize`.
    fn add_point(&mut self, x: f64, y: f64, z: f64);

    fn finalize(&mut self);

    /// Row-major, `width * height` values, row 0 is the northmost row. NaN marks nodes that
    /// received no point.
    fn values(&self, statistic: Statistic) -> &[f64];
}

pub trait GridFactory: Sync {
    type Grid: Grid;

    fn create(&self, params: &GridParams) -> Self::Grid;
}

pub struct RadiusGridFactory;

impl GridFactory for RadiusGridFactory {
    type Grid = RadiusGrid;

    fn create(&self, params: &GridParams) -> RadiusGrid {
        RadiusGrid::new(*params)
    }
}

/// Node based grid: node (col, row) sits at `origin + (col, row) * resolution`, rows counted
/// from the south edge while accumulating. Only the statistic the grid was created for is
/// accumulated, the other one reads back as all NaN.
pub struct RadiusGrid {
    params: GridParams,
    max: Vec<f64>,
    idw: Vec<f64>,
    weights: Vec<f64>,
}

impl RadiusGrid {
    pub fn new(params: GridParams) -> Self {
        let len = params.width * params.height;

        Self {
            params,
            max: vec![f64::NAN; len],
            idw: vec![0.0; len],
            weights: vec![0.0; len],
        }
    }

    /// Inclusive node index range within `radius` of `v` along one axis.
    fn node_range(&self, v: f64, origin: f64, len: usize) -> Option<(usize, usize)> {
        let GridParams {
            resolution, radius, ..
        } = self.params;

        let lo = ((v - radius - origin) / resolution).ceil().max(0.0);
        let hi = ((v + radius - origin) / resolution).floor();
        if hi < 0.0 || lo > hi || lo >= len as f64 {
            return None;
        }

        Some((lo as usize, (hi as usize).min(len - 1)))
    }
}

impl Grid for RadiusGrid {
    fn add_point(&mut self, x: f64, y: f64, z: f64) {
        let p = self.params;
        let Some((col_lo, col_hi)) = self.node_range(x, p.origin_x, p.width) else {
            return;
        };
        let Some((row_lo, row_hi)) = self.node_range(y, p.origin_y, p.height) else {
            return;
        };
        let radius_2 = p.radius * p.radius;

        for row in row_lo..=row_hi {
            let dy = p.origin_y + row as f64 * p.resolution - y;
            // Stored north-up.
            let offset = (p.height - 1 - row) * p.width;

            for col in col_lo..=col_hi {
                let dx = p.origin_x + col as f64 * p.resolution - x;
                let d2 = dx * dx + dy * dy;
                if d2 > radius_2 {
                    continue;
                }

                let i = offset + col;
                match p.statistic {
                    Statistic::Max => {
                        if self.max[i].is_nan() || z > self.max[i] {
                            self.max[i] = z;
                        }
                    }
                    Statistic::Idw => {
                        let w = 1.0 / d2.max(MIN_DISTANCE_2);
                        self.idw[i] += z * w;
                        self.weights[i] += w;
                    }
                }
            }
        }
    }

    fn finalize(&mut self) {
        for (value, &weight) in self.idw.iter_mut().zip(&self.weights) {
            *value = if weight > 0.0 {
                *value / weight
            } else {
                f64::NAN
            };
        }
    }

    fn values(&self, statistic: Statistic) -> &[f64] {
        match statistic {
            Statistic::Max => &self.max,
            Statistic::Idw => &self.idw,
        }
    }
}
