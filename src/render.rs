use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::grid::{Grid, GridFactory, GridParams, Statistic};
use crate::observer::{Event, Observer};
use crate::point_set::PointSet;
use crate::raster::{north_up_transform, RasterSpec, RasterWriter};
use crate::tiling::{Tile, TilePlan};
use crate::util::get_tile_size;
use crate::NODATA;

pub const MANIFEST_NAME: &str = "tiles.json";

/// Creates `out_dir`, replacing an existing one only when `force` is set.
pub fn prepare_output_dir(out_dir: &Path, force: bool) -> Result<()> {
    if out_dir.exists() {
        if !force {
            return Err(Error::OutputExists(out_dir.to_path_buf()));
        }
        fs::remove_dir_all(out_dir)?;
    }

    fs::create_dir_all(out_dir)?;
    Ok(())
}

pub struct Renderer<'a, F, W> {
    pub grids: &'a F,
    pub writer: &'a W,
    pub observer: &'a dyn Observer,
}

impl<F: GridFactory, W: RasterWriter> Renderer<'_, F, W> {
    /// Renders every tile of `plan` in parallel, then writes the manifest into `out_dir`.
    /// The first failing tile aborts the run.
    pub fn render(
        &self,
        points: &PointSet,
        plan: &TilePlan,
        statistic: Statistic,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let total = plan.tiles.len();
        let done = Mutex::new(0usize);

        plan.tiles.par_iter().try_for_each(|tile| {
            self.render_tile(points, tile, plan.resolution, statistic)?;

            let mut done = done.lock().unwrap_or_else(PoisonError::into_inner);
            *done += 1;
            self.observer.event(Event::TileRendered {
                done: *done,
                total,
                path: tile.path.clone(),
            });

            Ok::<(), Error>(())
        })?;

        let manifest = write_manifest(out_dir, plan, statistic)?;
        self.observer.event(Event::ManifestWritten(manifest.clone()));

        Ok(manifest)
    }

    fn render_tile(
        &self,
        points: &PointSet,
        tile: &Tile,
        resolution: f64,
        statistic: Statistic,
    ) -> Result<()> {
        let (width, height) = get_tile_size(&tile.bounds, resolution);

        let mut grid = self.grids.create(&GridParams {
            origin_x: tile.bounds.min_x,
            origin_y: tile.bounds.min_y,
            width,
            height,
            resolution,
            radius: tile.radius,
            statistic,
        });

        for (x, y, z) in points.iter() {
            grid.add_point(x, y, z);
        }
        grid.finalize();

        let band: Vec<f64> = grid
            .values(statistic)
            .iter()
            .map(|&v| if v.is_nan() { NODATA } else { v })
            .collect();

        self.writer.write(
            &RasterSpec {
                path: &tile.path,
                width,
                height,
                geo_transform: north_up_transform(&tile.bounds, resolution),
                srs: points.srs.as_deref(),
                no_data: NODATA,
            },
            band,
        )
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    statistic: String,
    resolution: f64,
    radiuses: &'a [f64],
    tiles: Vec<ManifestTile>,
}

#[derive(Serialize)]
struct ManifestTile {
    radius: f64,
    bounds: Extent,
    file: String,
}

/// Lists the rendered tiles, in processing order, next to them.
fn write_manifest(out_dir: &Path, plan: &TilePlan, statistic: Statistic) -> Result<PathBuf> {
    let manifest = Manifest {
        statistic: statistic.to_string(),
        resolution: plan.resolution,
        radiuses: &plan.radiuses,
        tiles: plan
            .tiles
            .iter()
            .map(|tile| ManifestTile {
                radius: tile.radius,
                bounds: tile.bounds,
                file: tile
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect(),
    };

    let path = out_dir.join(MANIFEST_NAME);
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &manifest)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;

    use super::*;
    use crate::grid::RadiusGridFactory;
    use crate::observer::RecordingObserver;
    use crate::tiling::{plan_tiles, TileOptions};

    #[derive(Debug, Clone, PartialEq)]
    struct Written {
        path: PathBuf,
        width: usize,
        height: usize,
        geo_transform: [f64; 6],
        srs: Option<String>,
        band: Vec<f64>,
    }

    #[derive(Default)]
    struct RecordingWriter {
        written: Mutex<Vec<Written>>,
    }

    impl RasterWriter for RecordingWriter {
        fn write(&self, spec: &RasterSpec<'_>, band: Vec<f64>) -> Result<()> {
            assert_eq!(band.len(), spec.width * spec.height);
            assert_eq!(spec.no_data, NODATA);

            self.written.lock().unwrap().push(Written {
                path: spec.path.to_path_buf(),
                width: spec.width,
                height: spec.height,
                geo_transform: spec.geo_transform,
                srs: spec.srs.map(str::to_string),
                band,
            });
            Ok(())
        }
    }

    struct FailingWriter;

    impl RasterWriter for FailingWriter {
        fn write(&self, spec: &RasterSpec<'_>, _band: Vec<f64>) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("cannot write {}", spec.path.display()),
            )))
        }
    }

    fn points() -> PointSet {
        let mut points = PointSet::default();
        for (x, y, z) in [(0.0, 0.0, 1.0), (100.0, 0.0, 2.0), (0.0, 100.0, 3.0), (100.0, 100.0, 4.0)] {
            points.push(x, y, z);
        }
        points.srs = Some("LOCAL_CS[\"test\"]".into());
        points
    }

    fn plan(points: &PointSet, out_dir: &Path) -> TilePlan {
        let options = TileOptions {
            resolution: 1.0,
            tile_size: 64,
            radiuses: vec![2.0, 1.0],
            max_tiles: None,
        };
        plan_tiles(&points.extent, &options, out_dir, &RecordingObserver::default()).unwrap()
    }

    #[test]
    fn renders_every_tile() {
        let dir = TempDir::new().unwrap();
        let points = points();
        let plan = plan(&points, dir.path());
        assert_eq!(plan.splits, 2);

        let writer = RecordingWriter::default();
        let observer = RecordingObserver::default();
        let renderer = Renderer {
            grids: &RadiusGridFactory,
            writer: &writer,
            observer: &observer,
        };

        renderer.render(&points, &plan, Statistic::Max, dir.path()).unwrap();

        let written = writer.written.lock().unwrap().clone();
        assert_eq!(written.len(), 8);

        let paths: HashSet<_> = written.iter().map(|w| w.path.clone()).collect();
        let planned: HashSet<_> = plan.tiles.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths, planned);

        for w in &written {
            let tile = plan.tiles.iter().find(|t| t.path == w.path).unwrap();
            assert_eq!((w.width, w.height), (51, 51));
            assert_eq!(w.geo_transform, north_up_transform(&tile.bounds, 1.0));
            assert_eq!(w.srs.as_deref(), Some("LOCAL_CS[\"test\"]"));
            assert!(w.band.iter().all(|v| !v.is_nan()));
        }

        // Lower left tile: the point at (0, 0) lands on the bottom left pixel.
        let lower_left = written
            .iter()
            .find(|w| w.geo_transform[0] == 0.0 && w.geo_transform[3] == 50.0)
            .unwrap();
        assert_eq!(lower_left.band[50 * 51], 1.0);
        assert_eq!(lower_left.band[0], NODATA);

        let done: Vec<usize> = observer
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::TileRendered { done, total: 8, .. } => Some(*done),
                _ => None,
            })
            .collect();
        assert_eq!(done.len(), 8);
        assert_eq!(done.iter().copied().collect::<HashSet<_>>(), (1..=8).collect());
    }

    #[test]
    fn writes_manifest_in_processing_order() {
        let dir = TempDir::new().unwrap();
        let points = points();
        let plan = plan(&points, dir.path());
        let renderer = Renderer {
            grids: &RadiusGridFactory,
            writer: &RecordingWriter::default(),
            observer: &RecordingObserver::default(),
        };

        let path = renderer.render(&points, &plan, Statistic::Idw, dir.path()).unwrap();

        assert_eq!(path, dir.path().join(MANIFEST_NAME));
        let manifest: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(manifest["statistic"], "idw");
        assert_eq!(manifest["resolution"], 1.0);

        let tiles = manifest["tiles"].as_array().unwrap();
        assert_eq!(tiles.len(), 8);
        assert_eq!(tiles[0]["radius"], 1.0);
        assert_eq!(tiles[0]["file"], "r1_0_0.tif");
        assert_eq!(tiles[7]["radius"], 2.0);
        assert_eq!(tiles[7]["bounds"]["max_x"], 100.0);
    }

    #[test]
    fn writer_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let points = points();
        let plan = plan(&points, dir.path());
        let renderer = Renderer {
            grids: &RadiusGridFactory,
            writer: &FailingWriter,
            observer: &RecordingObserver::default(),
        };

        let err = renderer.render(&points, &plan, Statistic::Max, dir.path()).unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!dir.path().join(MANIFEST_NAME).exists());
    }

    #[test]
    fn output_dir_needs_force() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dem");

        prepare_output_dir(&out, false).unwrap();
        fs::write(out.join("stale.tif"), b"old").unwrap();

        assert!(matches!(
            prepare_output_dir(&out, false).unwrap_err(),
            Error::OutputExists(_)
        ));

        prepare_output_dir(&out, true).unwrap();
        assert!(out.is_dir());
        assert!(!out.join("stale.tif").exists());
    }
}
