//! Point cloud ingestion.
//!
//! `.ply` files are decoded by the built-in vertex-list reader, everything else is handed to
//! the las/laz reader when the `las` feature is enabled.

use std::path::Path;

use crate::error::{Error, Result};
use crate::observer::{Event, Observer};
use crate::point_set::PointSet;

#[cfg(feature = "las")]
mod las_reader;
pub mod ply;

/// Whether the point at source index `index` survives a decimation stride.
///
/// Indices that are a multiple of the stride (index 0 included) are dropped, so a stride of 3
/// keeps indices 1, 2, 4, 5, 7, 8, ...
#[inline]
pub fn keep_point(index: usize, decimation: usize) -> bool {
    decimation <= 1 || index % decimation != 0
}

/// Reads a point cloud, optionally keeping a single classification and decimating by stride.
pub fn read_point_set(
    path: &Path,
    class: Option<u8>,
    decimation: usize,
    observer: &dyn Observer,
) -> Result<PointSet> {
    if decimation < 1 {
        return Err(Error::InvalidArgument(format!(
            "decimation must be at least 1, got {decimation}"
        )));
    }

    let is_ply = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));

    let points = if is_ply {
        if let Some(class) = class {
            return Err(Error::UnsupportedFilter(format!(
                "classification {class} requested but PLY files ({}) carry no classification",
                path.display()
            )));
        }
        ply::read_ply(path, decimation, observer)?
    } else {
        read_external(path, class, decimation, observer)?
    };

    if points.is_empty() {
        return Err(Error::NoPointsFound(path.to_path_buf()));
    }

    observer.event(Event::PointsLoaded {
        count: points.len(),
        extent: points.extent,
    });

    Ok(points)
}

#[cfg(feature = "las")]
fn read_external(
    path: &Path,
    class: Option<u8>,
    decimation: usize,
    observer: &dyn Observer,
) -> Result<PointSet> {
    las_reader::read_las(path, class, decimation, observer)
}

#[cfg(not(feature = "las"))]
fn read_external(
    path: &Path,
    _class: Option<u8>,
    _decimation: usize,
    _observer: &dyn Observer,
) -> Result<PointSet> {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    Err(Error::UnsupportedFormat(ext))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::extent::Extent;
    use crate::observer::RecordingObserver;

    fn write_ply(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 1\n5 10 2\n-3 2 3\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn stride_one_keeps_everything() {
        assert!((0..10).all(|i| keep_point(i, 1)));
    }

    #[test]
    fn stride_three_retained_indices() {
        let kept: Vec<usize> = (0..10).filter(|&i| keep_point(i, 3)).collect();
        assert_eq!(kept, vec![1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn reads_ply_and_reports() {
        let dir = TempDir::new().unwrap();
        let path = write_ply(&dir, "cloud.PLY");
        let observer = RecordingObserver::default();

        let points = read_point_set(&path, None, 1, &observer).unwrap();

        assert_eq!(points.extent, Extent::from_bounds(-3.0, 5.0, 0.0, 10.0));
        let events = observer.events();
        assert!(matches!(events[0], Event::ReadingPoints { count: 3, .. }));
        assert_eq!(
            events.last(),
            Some(&Event::PointsLoaded {
                count: 3,
                extent: points.extent
            })
        );
    }

    #[test]
    fn rejects_zero_decimation() {
        let dir = TempDir::new().unwrap();
        let path = write_ply(&dir, "cloud.ply");
        let err = read_point_set(&path, None, 0, &RecordingObserver::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn rejects_class_filter_on_ply() {
        let dir = TempDir::new().unwrap();
        let path = write_ply(&dir, "cloud.ply");
        let err = read_point_set(&path, Some(2), 1, &RecordingObserver::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter(_)));
    }

    #[test]
    fn missing_ply_is_open_error() {
        let dir = TempDir::new().unwrap();
        let err = read_point_set(
            &dir.path().join("missing.ply"),
            None,
            1,
            &RecordingObserver::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn malformed_header_returns_no_points() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.ply");
        fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float z\nproperty float y\nend_header\n1 2 3\n",
        )
        .unwrap();
        let observer = RecordingObserver::default();

        let err = read_point_set(&path, None, 1, &observer).unwrap_err();

        assert!(matches!(err, Error::MalformedHeader(_)));
        assert!(observer.events().is_empty());
    }

    #[test]
    fn empty_ply_has_no_points() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.ply");
        fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
        )
        .unwrap();

        let err = read_point_set(&path, None, 1, &RecordingObserver::default()).unwrap_err();
        assert!(matches!(err, Error::NoPointsFound(_)));
    }
}
