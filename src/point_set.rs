use crate::extent::Extent;

/// Upper bound on storage reserved up front from a declared point count. Headers can claim
/// more points than the data holds, anything past this grows on push.
pub const MAX_RESERVED_POINTS: usize = 1 << 24;

/// Columnar point storage. Index `i` of `x`, `y` and `z` is one point.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,

    pub extent: Extent,

    /// Coordinate system description (WKT) when the source carries one.
    pub srs: Option<String>,
}

impl PointSet {
    /// Reserves room for `count` points, capped at [`MAX_RESERVED_POINTS`].
    pub fn with_capacity(count: usize) -> Self {
        let count = count.min(MAX_RESERVED_POINTS);

        Self {
            x: Vec::with_capacity(count),
            y: Vec::with_capacity(count),
            z: Vec::with_capacity(count),
            ..Self::default()
        }
    }

    /// Appends a point and grows the extent to include it.
    #[inline]
    pub fn push(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
        self.extent.update(x, y);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| (x, y, z))
    }
}
