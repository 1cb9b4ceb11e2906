//! Canopy mask construction from classified LIDAR returns.
//!
//! Pipeline: rasterize point counts → threshold → morphological opening →
//! dilation → encode to a two-valued byte raster. The thresholded counts
//! trade recall for precision: a higher `tree_threshold` demands more
//! classified returns per cell before calling it canopy.

use crate::morphology::{binary_dilation, binary_opening};
use crate::point_cloud::PointRecord;
use crate::raster::{Grid, Raster};
use crate::rasterize::rasterize_points;
use std::collections::HashSet;

/// Parameters for [`build_canopy_mask`].
///
/// Defaults are empirically chosen: threshold 15, two opening and two
/// dilation passes, uint8 output with 255 = tree, 0 = nodata. Every field is
/// overridable per call; zero is a legitimate override, distinguished from
/// "unset" by `Option` at the CLI layer rather than by any falsiness test.
#[derive(Debug, Clone, PartialEq)]
pub struct CanopyParams {
    /// Minimum accumulated point count for a cell to qualify as tree canopy.
    pub tree_threshold: u32,
    /// Opening passes removing isolated single-pixel detections.
    pub opening_iterations: usize,
    /// Dilation passes restoring canopy extent lost to the opening and
    /// closing small gaps between adjacent crowns.
    pub dilation_iterations: usize,
    /// Output value for canopy cells.
    pub tree_val: u8,
    /// Output value for everything else.
    pub nodata_val: u8,
}

impl Default for CanopyParams {
    fn default() -> Self {
        Self {
            tree_threshold: 15,
            opening_iterations: 2,
            dilation_iterations: 2,
            tree_val: 255,
            nodata_val: 0,
        }
    }
}

/// Classification codes treated as vegetation strata of interest
/// (ASPRS 4 = medium vegetation, 5 = high vegetation).
pub fn default_tree_classes() -> HashSet<u8> {
    [4u8, 5u8].into_iter().collect()
}

/// Threshold the accumulated counts into a boolean canopy raster.
///
/// Exposed separately so the monotonicity of the threshold can be reasoned
/// about without the morphology steps.
pub fn threshold_counts(counts: &Raster<u32>, tree_threshold: u32) -> Raster<bool> {
    counts.map(|c| c >= tree_threshold)
}

/// Build the binary canopy ground-truth mask for one tile.
///
/// The grid must come from the tile raster the mask will be compared
/// against. Empty point sets or a zero-area grid yield an all-nodata mask;
/// "no detected canopy" is valid output, not an error.
pub fn build_canopy_mask(
    points: &[PointRecord],
    class_filter: &HashSet<u8>,
    grid: &Grid,
    params: &CanopyParams,
) -> Raster<u8> {
    let counts = rasterize_points(points, class_filter, grid);
    let is_tree = threshold_counts(&counts, params.tree_threshold);
    let opened = binary_opening(&is_tree, params.opening_iterations);
    let dilated = binary_dilation(&opened, params.dilation_iterations);
    dilated.map(|t| if t { params.tree_val } else { params.nodata_val })
}
