use std::path::PathBuf;

use log::{debug, info};

use crate::extent::Extent;

/// Progress and diagnostics emitted by the reader, planner and renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ReadingPoints {
        path: PathBuf,
        count: usize,
    },
    PlyHeader {
        ascii: bool,
        normals: bool,
        colors: bool,
        views: bool,
        segmentation: bool,
    },
    SpatialReference(String),
    PointsLoaded {
        count: usize,
        extent: Extent,
    },
    ResolutionFloor {
        ratio: f64,
        resolution: f64,
    },
    TilesPlanned {
        count: usize,
        splits: usize,
        width: usize,
        height: usize,
    },
    TileRendered {
        done: usize,
        total: usize,
        path: PathBuf,
    },
    ManifestWritten(PathBuf),
}

pub trait Observer: Send + Sync {
    fn event(&self, event: Event);
}

/// Forwards events to the `log` facade.
pub struct LogObserver;

impl Observer for LogObserver {
    fn event(&self, event: Event) {
        match event {
            Event::ReadingPoints { path, count } => {
                info!("Reading {count} points from {}", path.display())
            }
            Event::PlyHeader {
                ascii,
                normals,
                colors,
                views,
                segmentation,
            } => debug!(
                "PLY header: ascii={ascii} normals={normals} colors={colors} views={views} segmentation={segmentation}"
            ),
            Event::SpatialReference(wkt) => debug!("Spatial reference: {wkt}"),
            Event::PointsLoaded { count, extent } => {
                info!("Loaded {count} points, extent: {extent}")
            }
            Event::ResolutionFloor { ratio, resolution } => info!(
                "Raster too small, scaling resolution and radiuses by {ratio} (new resolution: {resolution})"
            ),
            Event::TilesPlanned {
                count,
                splits,
                width,
                height,
            } => info!("Raster size {width}x{height}, {splits}x{splits} splits, {count} tiles"),
            Event::TileRendered { done, total, path } => {
                info!("[{done}/{total}] Wrote {}", path.display())
            }
            Event::ManifestWritten(path) => info!("Wrote {}", path.display()),
        }
    }
}

#[cfg(test)]
pub use self::recording::RecordingObserver;
