use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use self::error::{Error, Result};
use self::grid::{RadiusGridFactory, Statistic};
use self::io::read_point_set;
use self::observer::{LogObserver, Observer};
use self::raster::GeoTiffWriter;
use self::render::{prepare_output_dir, Renderer};
use self::tiling::{plan_tiles, TileOptions};

mod error;
mod util;

mod extent;
mod grid;
mod io;
mod observer;
mod point_set;
mod raster;
mod render;
mod tiling;

#[derive(Parser)]
#[command(version, about = "Render a point cloud to a tiled raster DEM", long_about = None)]
struct Cli {
    /// Input point cloud (.ply, .las, .laz).
    input: PathBuf,

    /// Output directory for the GeoTIFF tiles.
    #[arg(short, long, default_value = "dem")]
    outdir: PathBuf,

    /// Output type: max or idw.
    #[arg(long, default_value = "max")]
    output_type: String,

    /// Comma separated list of radiuses, in ground units.
    #[arg(short, long, value_delimiter = ',', default_value = "0.56")]
    radiuses: Vec<f64>,

    /// Resolution of the output rasters, in ground units per pixel.
    #[arg(long, default_value_t = 0.1)]
    resolution: f64,

    /// Maximum tile width, in pixels.
    #[arg(short, long, default_value_t = 4096)]
    tile_size: usize,

    /// Abort if more tiles than this would be generated. 0 means no limit.
    #[arg(long, default_value_t = 0)]
    max_tiles: usize,

    /// Skip every Nth point while reading.
    #[arg(short, long, default_value_t = 1)]
    decimation: usize,

    /// Optional classification filter.
    #[arg(short, long)]
    class: Option<u8>,

    /// Number of rendering threads. Default: one per core
    #[arg(long)]
    threads: Option<usize>,

    /// Overwrite the output directory if it exists.
    #[arg(short, long)]
    force: bool,
}

pub const NODATA: f64 = -9999.0;

fn run(cli: &Cli, observer: &dyn Observer) -> Result<()> {
    let statistic: Statistic = cli.output_type.parse()?;
    let points = read_point_set(&cli.input, cli.class, cli.decimation, observer)?;

    let options = TileOptions {
        resolution: cli.resolution,
        tile_size: cli.tile_size,
        radiuses: cli.radiuses.clone(),
        max_tiles: (cli.max_tiles > 0).then_some(cli.max_tiles),
    };
    let plan = plan_tiles(&points.extent, &options, &cli.outdir, observer)?;

    prepare_output_dir(&cli.outdir, cli.force)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads.unwrap_or(0))
        .build()
        .map_err(|e| Error::InvalidArgument(format!("thread pool: {e}")))?;

    let renderer = Renderer {
        grids: &RadiusGridFactory,
        writer: &GeoTiffWriter,
        observer,
    };
    pool.install(|| renderer.render(&points, &plan, statistic, &cli.outdir))?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let cli = Cli::parse();

    match run(&cli, &LogObserver) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
