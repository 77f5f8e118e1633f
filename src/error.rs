use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Invalid PLY file: {0}")]
    MalformedHeader(String),

    #[error("Truncated point data: {0}")]
    TruncatedData(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported file extension {0}, build with the `las` feature for additional file types")]
    UnsupportedFormat(String),

    #[error("No points could be fetched from {}", .0.display())]
    NoPointsFound(PathBuf),

    #[error("Too many tiles ({count}, max {max}), check the input extent and resolution")]
    TooManyTiles { count: usize, max: usize },

    #[error("Unsupported output type: {0} (expected max or idw)")]
    UnsupportedStatistic(String),

    #[error("{} exists (use --force to overwrite results)", .0.display())]
    OutputExists(PathBuf),

    #[cfg(feature = "las")]
    #[error("Las Error: {0}")]
    LasError(#[from] las::Error),

    #[error("GDAL Error: {0}")]
    GDALError(#[from] gdal::errors::GdalError),

    #[error("Manifest Error: {0}")]
    ManifestError(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
