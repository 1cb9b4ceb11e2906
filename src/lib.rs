//! # lidarcanopy — tree-canopy ground truth from classified LIDAR returns
//!
//! Derives a binary canopy raster mask from LIDAR point classifications,
//! aligned to an orthophoto tile grid, and scores a separately trained image
//! classifier against it with a per-pixel confusion matrix.
//!
//! This crate provides:
//! - **Mask pipeline**: `rasterize_points`, `threshold_counts`,
//!   `binary_opening`/`binary_dilation`, `build_canopy_mask`
//! - **Tile selection**: `valid_data_footprint`, `partition_tiles`,
//!   `remove_tiles`
//! - **Evaluation**: `cross_tabulate`, `ConfusionTable`
//!
//! Raster files are GeoTIFF (ModelPixelScale/ModelTiepoint tags), point
//! clouds are LAS; only (x, y, classification) is consumed per point.

pub mod canopy;
pub mod confusion;
pub mod error;
pub mod footprint;
pub mod geotiff;
pub mod morphology;
pub mod point_cloud;
pub mod raster;
pub mod rasterize;
pub mod tile_select;

pub use canopy::{build_canopy_mask, default_tree_classes, CanopyParams};
pub use confusion::{cross_tabulate, ConfusionTable};
pub use error::{CanopyError, Result};
pub use footprint::valid_data_footprint;
pub use point_cloud::{lidar_filename, read_las_points, PointRecord};
pub use raster::{Grid, Raster};
pub use rasterize::rasterize_points;
pub use tile_select::{partition_tiles, remove_tiles, write_tile_list, TileRecord};
