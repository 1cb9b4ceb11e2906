//! Canopy ground-truth CLI.
//!
//! Usage:
//!   lidarcanopy mask lidar-tile_0-0.las tile_0-0.tif response/tile_0-0.tif
//!   lidarcanopy batch-masks split.csv lidar/ response/ response_tiles.txt
//!   lidarcanopy select-tiles --ref-raster ortho.tif --output tiles.txt tiles/*.tif
//!   lidarcanopy evaluate response/tile_0-0.tif pred/tile_0-0.tif confusion.csv
//!
//! Tile splitting and the trained image classifier are external: this binary
//! consumes their outputs (tile GeoTIFFs and predicted class rasters).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lidarcanopy::{
    build_canopy_mask, cross_tabulate, geotiff, lidar_filename, partition_tiles, read_las_points,
    remove_tiles, valid_data_footprint, write_tile_list, CanopyParams, TileRecord,
};

// ==========================================================================
// CLI (clap)
// ==========================================================================

#[derive(Parser, Debug)]
#[command(
    name = "lidarcanopy",
    about = "Tree-canopy ground-truth masks from classified LIDAR returns",
    after_help = "Set RUST_LOG to adjust verbosity (default: info)."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the canopy mask for a single tile
    Mask(MaskArgs),
    /// Build canopy masks for every training tile of a split CSV
    BatchMasks(BatchMasksArgs),
    /// Keep only the tiles whose bounding box intersects the study area
    SelectTiles(SelectTilesArgs),
    /// Score a predicted class raster against a ground-truth mask
    Evaluate(EvaluateArgs),
}

/// Mask parameters shared by `mask` and `batch-masks`.
///
/// Every option is a true override: leaving it out uses the pipeline
/// default, and passing `0` passes `0` (zero is a legitimate nodata value or
/// threshold, never a stand-in for "unset").
#[derive(Args, Debug)]
struct MaskOptions {
    /// LIDAR classification codes counted as vegetation
    #[arg(long, value_delimiter = ',', default_values_t = vec![4u8, 5u8])]
    tree_classes: Vec<u8>,

    /// Minimum point count per cell to qualify as canopy
    #[arg(long)]
    tree_threshold: Option<u32>,

    /// Morphological opening passes
    #[arg(long)]
    opening_iterations: Option<usize>,

    /// Morphological dilation passes
    #[arg(long)]
    dilation_iterations: Option<usize>,

    /// Output value for canopy pixels
    #[arg(long)]
    tree_val: Option<u8>,

    /// Output value for non-canopy pixels
    #[arg(long)]
    nodata_val: Option<u8>,
}

impl MaskOptions {
    fn class_filter(&self) -> HashSet<u8> {
        self.tree_classes.iter().copied().collect()
    }

    fn params(&self) -> CanopyParams {
        let mut params = CanopyParams::default();
        if let Some(v) = self.tree_threshold {
            params.tree_threshold = v;
        }
        if let Some(v) = self.opening_iterations {
            params.opening_iterations = v;
        }
        if let Some(v) = self.dilation_iterations {
            params.dilation_iterations = v;
        }
        if let Some(v) = self.tree_val {
            params.tree_val = v;
        }
        if let Some(v) = self.nodata_val {
            params.nodata_val = v;
        }
        params
    }
}

#[derive(Args, Debug)]
struct MaskArgs {
    /// LAS point-cloud file covering the tile
    las_path: PathBuf,
    /// Reference tile GeoTIFF supplying the grid
    tile_path: PathBuf,
    /// Destination mask GeoTIFF
    output: PathBuf,

    #[command(flatten)]
    options: MaskOptions,
}

#[derive(Args, Debug)]
struct BatchMasksArgs {
    /// Split CSV with `img_filepath` and `train` columns
    split_csv: PathBuf,
    /// Directory holding the per-tile LAS files (lidar-<tile>.las)
    lidar_dir: PathBuf,
    /// Directory receiving the mask rasters
    response_dir: PathBuf,
    /// Destination list of generated mask paths
    output: PathBuf,

    #[command(flatten)]
    options: MaskOptions,
}

#[derive(Args, Debug)]
struct SelectTilesArgs {
    /// Candidate tile GeoTIFFs
    #[arg(value_name = "tile.tif", num_args = 1..)]
    tile_paths: Vec<PathBuf>,

    /// Reference raster whose valid-data extent defines the study area
    #[arg(long, value_name = "ref.tif")]
    ref_raster: PathBuf,

    /// Destination list of kept tile paths
    #[arg(long, short)]
    output: PathBuf,

    /// Nodata value of the reference raster
    #[arg(long, default_value_t = 0)]
    nodata: u8,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Ground-truth mask raster
    observed: PathBuf,
    /// Predicted class raster
    predicted: PathBuf,
    /// Destination confusion CSV
    output: PathBuf,
}

// ==========================================================================
// Subcommands
// ==========================================================================

/// Rasterize one tile's LAS file onto the tile grid and persist the mask.
fn make_mask(
    las_path: &Path,
    tile_path: &Path,
    output: &Path,
    class_filter: &HashSet<u8>,
    params: &CanopyParams,
) -> lidarcanopy::Result<()> {
    let grid = geotiff::read_grid(tile_path)?;
    let points = read_las_points(las_path)?;
    let mask = build_canopy_mask(&points, class_filter, &grid, params);
    geotiff::write_mask(output, &mask, params.nodata_val)?;
    Ok(())
}

fn run_mask(args: &MaskArgs) -> Result<()> {
    make_mask(
        &args.las_path,
        &args.tile_path,
        &args.output,
        &args.options.class_filter(),
        &args.options.params(),
    )
    .with_context(|| format!("building mask for '{}'", args.tile_path.display()))?;
    info!("dumped canopy mask to {}", args.output.display());
    Ok(())
}

/// Tile paths flagged as training tiles in the split CSV.
fn training_tiles(split_csv: &Path) -> Result<Vec<PathBuf>> {
    let mut reader = csv::Reader::from_path(split_csv)
        .with_context(|| format!("reading split CSV '{}'", split_csv.display()))?;
    let headers = reader.headers()?.clone();
    let img_col = headers
        .iter()
        .position(|h| h == "img_filepath")
        .context("split CSV has no 'img_filepath' column")?;
    let train_col = headers
        .iter()
        .position(|h| h == "train")
        .context("split CSV has no 'train' column")?;

    let mut tiles = Vec::new();
    for record in reader.records() {
        let record = record?;
        let is_train = matches!(
            record.get(train_col).unwrap_or(""),
            "True" | "true" | "TRUE" | "1"
        );
        if is_train {
            if let Some(path) = record.get(img_col) {
                tiles.push(PathBuf::from(path));
            }
        }
    }
    Ok(tiles)
}

fn run_batch_masks(args: &BatchMasksArgs) -> Result<()> {
    let tiles = training_tiles(&args.split_csv)?;
    let class_filter = args.options.class_filter();
    let params = args.options.params();

    let mut mask_paths: Vec<PathBuf> = Vec::with_capacity(tiles.len());
    let mut failed = 0usize;
    for tile_path in &tiles {
        let las_path = args.lidar_dir.join(lidar_filename(tile_path));
        let mask_path = args
            .response_dir
            .join(tile_path.file_name().unwrap_or_default());
        // one bad tile must not abort the batch
        match make_mask(&las_path, tile_path, &mask_path, &class_filter, &params) {
            Ok(()) => {
                info!("dumped canopy mask to {}", mask_path.display());
                mask_paths.push(mask_path);
            }
            Err(e) => {
                error!("skipping tile '{}': {}", tile_path.display(), e);
                failed += 1;
            }
        }
    }

    write_tile_list(&args.output, &mask_paths)?;
    info!(
        "dumped list of {} response tiles to {} ({} failed)",
        mask_paths.len(),
        args.output.display(),
        failed
    );
    Ok(())
}

fn run_select_tiles(args: &SelectTilesArgs) -> Result<()> {
    let nodata = args.nodata;
    let band = geotiff::read_band_u8(&args.ref_raster)
        .with_context(|| format!("reading reference raster '{}'", args.ref_raster.display()))?;
    let valid_mask = band.map(|v| u8::from(v != nodata));
    let footprint = valid_data_footprint(&valid_mask);

    let mut tiles = Vec::with_capacity(args.tile_paths.len());
    for path in &args.tile_paths {
        match TileRecord::from_path(path) {
            Ok(tile) => tiles.push(tile),
            Err(e) => error!("skipping tile '{}': {}", path.display(), e),
        }
    }

    let (kept, discarded) = partition_tiles(tiles, &footprint);
    let removed = remove_tiles(&discarded);
    info!(
        "removed {} of {} tiles that do not intersect the extent of {}",
        removed,
        discarded.len(),
        args.ref_raster.display()
    );

    let kept_paths: Vec<PathBuf> = kept.into_iter().map(|t| t.path).collect();
    write_tile_list(&args.output, &kept_paths)?;
    info!(
        "dumped list of {} tile filepaths to {}",
        kept_paths.len(),
        args.output.display()
    );
    Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let observed = geotiff::read_band_u8(&args.observed)
        .with_context(|| format!("reading observed raster '{}'", args.observed.display()))?;
    let predicted = geotiff::read_band_u8(&args.predicted)
        .with_context(|| format!("reading predicted raster '{}'", args.predicted.display()))?;

    let table = cross_tabulate(&observed, &predicted)?;
    info!("estimated accuracy score is {:.6}", table.accuracy());

    table.write_csv(&args.output)?;
    info!("dumped confusion data frame to {}", args.output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Mask(args) => run_mask(args),
        Command::BatchMasks(args) => run_batch_masks(args),
        Command::SelectTiles(args) => run_select_tiles(args),
        Command::Evaluate(args) => run_evaluate(args),
    }
}
