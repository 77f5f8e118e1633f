//! Splits the extent of a point set into tiles small enough to render independently.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::observer::{Event, Observer};
use crate::util::get_raster_size;

/// Rasters smaller than this on both axes get their resolution refined.
pub const MIN_RASTER_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub radius: f64,
    pub bounds: Extent,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TileOptions {
    /// Ground units per pixel.
    pub resolution: f64,
    /// Maximum tile edge, in pixels.
    pub tile_size: usize,
    pub radiuses: Vec<f64>,
    pub max_tiles: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TilePlan {
    /// Sorted by ascending radius.
    pub tiles: Vec<Tile>,
    /// Resolution and radiuses after the minimum size correction.
    pub resolution: f64,
    pub radiuses: Vec<f64>,
    pub width: usize,
    pub height: usize,
    pub splits: usize,
}

pub fn plan_tiles(
    extent: &Extent,
    options: &TileOptions,
    out_dir: &Path,
    observer: &dyn Observer,
) -> Result<TilePlan> {
    validate(options)?;

    let mut resolution = options.resolution;
    let mut radiuses = options.radiuses.clone();

    let (width, height) = get_raster_size(extent, resolution);
    let (mut width, mut height) = (width.max(1), height.max(1));

    if width < MIN_RASTER_SIZE && height < MIN_RASTER_SIZE {
        let larger = width.max(height);
        let ratio = larger as f64 / MIN_RASTER_SIZE as f64;

        resolution *= ratio;
        radiuses.iter_mut().for_each(|r| *r *= ratio);

        let keep_aspect = |smaller: usize| {
            ((smaller * MIN_RASTER_SIZE) as f64 / larger as f64).ceil() as usize
        };
        (width, height) = if width >= height {
            (MIN_RASTER_SIZE, keep_aspect(height))
        } else {
            (keep_aspect(width), MIN_RASTER_SIZE)
        };

        observer.event(Event::ResolutionFloor { ratio, resolution });
    }

    let total_pixels = width as f64 * height as f64;
    let tile_pixels = options.tile_size as f64 * options.tile_size as f64;
    let splits = ((total_pixels / tile_pixels).ceil().log2().ceil() as usize).max(1);

    let count = splits * splits * radiuses.len();
    if let Some(max) = options.max_tiles {
        if count > max {
            return Err(Error::TooManyTiles { count, max });
        }
    }

    let cells = split_extent(extent, splits);
    let mut tiles = Vec::with_capacity(count);
    for &radius in &radiuses {
        for &(col, row, bounds) in &cells {
            tiles.push(Tile {
                radius,
                bounds,
                path: out_dir.join(format!("r{radius}_{col}_{row}.tif")),
            });
        }
    }

    // Cheaper (smaller radius) tiles first; sort_by is stable.
    tiles.sort_by(|a, b| a.radius.total_cmp(&b.radius));

    observer.event(Event::TilesPlanned {
        count: tiles.len(),
        splits,
        width,
        height,
    });

    Ok(TilePlan {
        tiles,
        resolution,
        radiuses,
        width,
        height,
        splits,
    })
}

fn validate(options: &TileOptions) -> Result<()> {
    if !(options.resolution.is_finite() && options.resolution > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "resolution must be positive, got {}",
            options.resolution
        )));
    }
    if options.tile_size == 0 {
        return Err(Error::InvalidArgument("tile size must be positive".into()));
    }
    if options.radiuses.is_empty() {
        return Err(Error::InvalidArgument("at least one radius is required".into()));
    }
    if let Some(r) = options
        .radiuses
        .iter()
        .find(|r| !(r.is_finite() && **r > 0.0))
    {
        return Err(Error::InvalidArgument(format!(
            "radius must be positive, got {r}"
        )));
    }
    // Tile file names are keyed by radius.
    for (i, r) in options.radiuses.iter().enumerate() {
        if options.radiuses[..i].contains(r) {
            return Err(Error::InvalidArgument(format!("radius {r} given more than once")));
        }
    }

    Ok(())
}

/// `splits` x `splits` cells of equal ground size. The last column and row end exactly on
/// the extent so that the cells cover it without gaps. (col, row, bounds)
fn split_extent(extent: &Extent, splits: usize) -> Vec<(usize, usize, Extent)> {
    let step_x = extent.width() / splits as f64;
    let step_y = extent.height() / splits as f64;

    let edge = |min: f64, max: f64, step: f64, i: usize| {
        if i == splits {
            max
        } else {
            min + step * i as f64
        }
    };

    let mut cells = Vec::with_capacity(splits * splits);
    for col in 0..splits {
        for row in 0..splits {
            cells.push((
                col,
                row,
                Extent::from_bounds(
                    edge(extent.min_x, extent.max_x, step_x, col),
                    edge(extent.min_x, extent.max_x, step_x, col + 1),
                    edge(extent.min_y, extent.max_y, step_y, row),
                    edge(extent.min_y, extent.max_y, step_y, row + 1),
                ),
            ));
        }
    }

    cells
}
