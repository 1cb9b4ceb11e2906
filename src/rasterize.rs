//! Point-to-grid rasterization.
//!
//! Burns classified point returns onto a caller-supplied grid, accumulating
//! a per-cell hit count (ADD merge). Cell density approximates the local
//! confidence of the point classification and feeds the threshold step of
//! the canopy mask builder.

use crate::point_cloud::PointRecord;
use crate::raster::{Grid, Raster};
use std::collections::HashSet;

/// Rasterize points whose classification is in `class_filter` onto `grid`.
///
/// Each surviving point is a zero-area location assigned to the cell
/// containing it (affine inversion, floored). Multiple points in one cell
/// sum; points outside the grid footprint are silently dropped, which is
/// expected when the point-cloud extent exceeds the tile extent.
///
/// Pure function: `sum(cells) <= |filtered points|`, with equality iff every
/// filtered point falls inside the grid.
pub fn rasterize_points(
    points: &[PointRecord],
    class_filter: &HashSet<u8>,
    grid: &Grid,
) -> Raster<u32> {
    let mut counts = Raster::filled(grid.clone(), 0u32);
    for p in points {
        if !class_filter.contains(&p.classification) {
            continue;
        }
        if let Some((row, col)) = grid.world_to_cell(p.x, p.y) {
            counts[(row, col)] += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn veg_filter() -> HashSet<u8> {
        [4u8, 5u8].into_iter().collect()
    }

    #[test]
    fn test_rasterize_scenario() {
        // 4x4 grid, pixel size 1, world origin (0,0) at the bottom-left
        let grid = Grid::unit(4, 4);
        let points = vec![
            PointRecord { x: 0.5, y: 0.5, classification: 4 },
            PointRecord { x: 0.5, y: 0.5, classification: 5 },
            PointRecord { x: 3.5, y: 3.5, classification: 4 },
        ];
        let counts = rasterize_points(&points, &veg_filter(), &grid);
        // world (0.5, 0.5) is the bottom-left cell, (3.5, 3.5) the top-right
        assert_eq!(counts.get(3, 0), 2);
        assert_eq!(counts.get(0, 3), 1);
        assert_eq!(counts.data.iter().sum::<u32>(), 3);
    }

    #[test]
    fn test_class_filter_drops_points() {
        let grid = Grid::unit(4, 4);
        let points = vec![
            PointRecord { x: 0.5, y: 0.5, classification: 2 },
            PointRecord { x: 0.5, y: 0.5, classification: 4 },
        ];
        let counts = rasterize_points(&points, &veg_filter(), &grid);
        assert_eq!(counts.data.iter().sum::<u32>(), 1);
    }

    #[test]
    fn test_out_of_grid_points_dropped_silently() {
        let grid = Grid::unit(2, 2);
        let points = vec![
            PointRecord { x: 10.0, y: 10.0, classification: 4 },
            PointRecord { x: -1.0, y: 0.5, classification: 5 },
            PointRecord { x: 1.5, y: 1.5, classification: 4 },
        ];
        let counts = rasterize_points(&points, &veg_filter(), &grid);
        // conservation: only the in-grid point survives
        assert_eq!(counts.data.iter().sum::<u32>(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let grid = Grid::unit(3, 3);
        let counts = rasterize_points(&[], &veg_filter(), &grid);
        assert!(counts.data.iter().all(|&c| c == 0));

        let counts = rasterize_points(
            &[PointRecord { x: 0.5, y: 0.5, classification: 4 }],
            &HashSet::new(),
            &grid,
        );
        assert!(counts.data.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_additive_accumulation() {
        let grid = Grid::unit(1, 1);
        let points: Vec<PointRecord> = (0..20)
            .map(|_| PointRecord { x: 0.5, y: 0.5, classification: 5 })
            .collect();
        let counts = rasterize_points(&points, &veg_filter(), &grid);
        assert_eq!(counts.get(0, 0), 20);
    }
}
