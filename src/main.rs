//! mirrorfield - axial distortion correction for mirror-microscope tiles
//!
//! Command-line front end: inspects tile addressing, per-tile normalization
//! offsets and displacement fields for a camera-array configuration.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Point3;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mirrorfield::{
    build_normalized_correction, build_normalized_corrections, parse_index_list, CameraArray,
    Config, CorrectionMode, DisplacementField, RealTransform, StrategyKind, TileId,
};

/// mirrorfield - spherical-curvature correction for a multi-camera mirror microscope
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "mirrorfield.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Active cameras, e.g. "1-8" or "0,3,7-9"
    #[arg(long)]
    cameras: Option<String>,

    /// Tiles per mosaic row
    #[arg(long)]
    columns: Option<usize>,

    /// Mirror curvature radius (um)
    #[arg(long)]
    radius: Option<f64>,

    /// Apply the forward distortion instead of removing it
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print row, column, camera and physical position of tiles
    Address {
        /// Tile indices, e.g. "0-11"
        tiles: String,
    },

    /// Measure normalization offsets for tiles
    Offsets {
        /// Tile indices, e.g. "0-11"
        tiles: String,

        /// Sampling strategy (defaults to the configured one)
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Sample the normalized displacement field of one tile
    Field {
        #[arg(long)]
        tile: TileId,

        /// Lattice spacing in pixels, applied to every axis
        #[arg(long, default_value_t = 256.0)]
        spacing: f64,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Map one point through a tile's normalized pipeline
    #[command(allow_negative_numbers = true)]
    Transform {
        #[arg(long)]
        tile: TileId,

        /// Map corrected coordinates back to recorded ones
        #[arg(long)]
        inverse: bool,

        x: f64,
        y: f64,
        z: f64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Corners,
    Middle,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Corners => StrategyKind::Corners,
            StrategyArg::Middle => StrategyKind::Middle,
        }
    }
}

/// Configuration file merged with command-line overrides
fn effective_config(args: &Args) -> Result<Config> {
    let mut config = Config::load_or_create(&args.config)?;

    if let Some(list) = &args.cameras {
        config.camera_array.active_cameras = parse_index_list(list)?;
    }
    if let Some(columns) = args.columns {
        config.camera_array.columns_per_camera_group = columns;
    }
    if let Some(radius) = args.radius {
        config.optics.radius_um = radius;
    }
    if args.simulate {
        config.optics.mode = CorrectionMode::Simulate;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("mirrorfield v{}", env!("CARGO_PKG_VERSION"));

    let config = effective_config(&args)?;
    let cameras = CameraArray::new(&config.camera_array).context("Invalid camera array")?;
    let model = config.optics.model().context("Invalid optics")?;
    let mode = config.optics.mode;
    let interval = config.volume.interval().context("Invalid volume")?;

    info!(
        "{} active cameras, {} tiles per row, radius {} um, {:?}",
        cameras.active_cameras().len(),
        config.camera_array.columns_per_camera_group,
        model.radius(),
        mode
    );

    match args.command {
        Command::Address { tiles } => {
            for tile in parse_index_list(&tiles)? {
                let a = cameras.address(tile);
                println!(
                    "tile {:>5}  row {:>4}  col {:>3}  camera {:>2}  position ({:.3}, {:.3}, {:.3})",
                    a.tile, a.row, a.column, a.camera, a.position[0], a.position[1], a.position[2]
                );
            }
        }

        Command::Offsets {
            tiles,
            strategy,
            json,
        } => {
            let tiles = parse_index_list(&tiles)?;
            let strategy = strategy
                .map(StrategyKind::from)
                .unwrap_or(config.normalization.strategy)
                .strategy();
            let corrected =
                build_normalized_corrections(&tiles, &cameras, &model, mode, &interval, strategy)?;
            let reports: Vec<_> = corrected.iter().map(|c| c.report()).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!(
                    "{:>5} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
                    "tile", "camera", "min", "max", "offset", "after min", "after max"
                );
                for r in &reports {
                    println!(
                        "{:>5} {:>6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                        r.tile, r.camera, r.before.min, r.before.max, r.offset, r.after.min, r.after.max
                    );
                }
            }
        }

        Command::Field {
            tile,
            spacing,
            json,
        } => {
            let corrected = build_normalized_correction(
                tile,
                &cameras,
                &model,
                mode,
                &interval,
                config.normalization.strategy.strategy(),
            )?;
            let field = DisplacementField::sample(&corrected.pipeline, &interval, [spacing; 3])?;
            let Some(stats) = field.stats() else {
                bail!("Displacement field for tile {} is empty", tile);
            };

            if json {
                let out = serde_json::json!({
                    "tile": tile,
                    "camera": corrected.pipeline.camera(),
                    "shape": field.shape(),
                    "stats": stats,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "Tile {} (camera {}), lattice {:?}",
                    tile,
                    corrected.pipeline.camera(),
                    field.shape()
                );
                println!("{}", stats);
            }
        }

        Command::Transform {
            tile,
            inverse,
            x,
            y,
            z,
        } => {
            let corrected = build_normalized_correction(
                tile,
                &cameras,
                &model,
                mode,
                &interval,
                config.normalization.strategy.strategy(),
            )?;
            let p = Point3::new(x, y, z);
            let q = if inverse {
                corrected.pipeline.inverse()?.apply(&p)
            } else {
                corrected.pipeline.apply(&p)
            };
            println!("{:.6} {:.6} {:.6}", q.x, q.y, q.z);
        }
    }

    Ok(())
}
