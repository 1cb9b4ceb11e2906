//! Grid geometry and 2D rasters, analogous to a rasterio dataset's
//! `transform` + `shape` pair.

use geo::{coord, Rect};
use std::ops::{Index, IndexMut};

/// Georeferenced pixel grid: affine transform (no rotation) plus shape.
///
/// Origin is the top-left corner, rows increase southwards:
///   x = xmin + col * res_x
///   y = ymax - row * res_y
///
/// A grid is always taken from a reference raster; the rasterizer never
/// invents one. Two grids are compatible only if transform and shape are
/// identical.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub nrow: usize,
    pub ncol: usize,
    /// Resolution in X direction (cell width, map units)
    pub res_x: f64,
    /// Resolution in Y direction (cell height, map units)
    pub res_y: f64,
    /// X coordinate of the top-left corner
    pub xmin: f64,
    /// Y coordinate of the top-left corner
    pub ymax: f64,
}

impl Grid {
    pub fn new(nrow: usize, ncol: usize, res_x: f64, res_y: f64, xmin: f64, ymax: f64) -> Self {
        Self {
            nrow,
            ncol,
            res_x,
            res_y,
            xmin,
            ymax,
        }
    }

    /// Unit grid: pixel size 1, origin (0, ymax = nrow) so that world
    /// (0, 0) is the bottom-left corner.
    pub fn unit(nrow: usize, ncol: usize) -> Self {
        Self::new(nrow, ncol, 1.0, 1.0, 0.0, nrow as f64)
    }

    pub fn xmax(&self) -> f64 {
        self.xmin + self.ncol as f64 * self.res_x
    }

    pub fn ymin(&self) -> f64 {
        self.ymax - self.nrow as f64 * self.res_y
    }

    /// Convert world X,Y to row,col. Returns `None` when the coordinate
    /// falls outside the grid footprint: points beyond the tile extent are
    /// dropped, not clamped onto the border.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.xmin) / self.res_x).floor();
        let row = ((self.ymax - y) / self.res_y).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row < self.nrow && col < self.ncol {
            Some((row, col))
        } else {
            None
        }
    }

    /// Convert row,col to world X,Y (cell centre).
    pub fn cell_to_world(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.xmin + (col as f64 + 0.5) * self.res_x;
        let y = self.ymax - (row as f64 + 0.5) * self.res_y;
        (x, y)
    }

    /// World coordinates of a pixel *corner*. `row`/`col` may equal
    /// `nrow`/`ncol` for the bottom/right grid edges.
    pub fn corner_to_world(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.xmin + col as f64 * self.res_x;
        let y = self.ymax - row as f64 * self.res_y;
        (x, y)
    }

    /// Bounding box of the whole grid in world coordinates.
    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.xmin, y: self.ymin() },
            coord! { x: self.xmax(), y: self.ymax },
        )
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.nrow * self.ncol
    }

    /// A grid with zero rows or columns covers no area; any mask built on
    /// it is trivially all-nodata.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A 2D raster (row-major) over a [`Grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    pub grid: Grid,
    pub data: Vec<T>,
}

impl<T: Copy> Raster<T> {
    /// Create a raster filled with a constant value.
    pub fn filled(grid: Grid, fill: T) -> Self {
        let data = vec![fill; grid.len()];
        Self { grid, data }
    }

    /// Create a raster from an existing Vec (row-major).
    pub fn from_vec(grid: Grid, data: Vec<T>) -> Self {
        assert_eq!(data.len(), grid.len());
        Self { grid, data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.grid.ncol + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.grid.ncol + col] = val;
    }

    /// Get value at (row, col) as Option, `None` out of bounds.
    #[inline]
    pub fn get_opt(&self, row: isize, col: isize) -> Option<T> {
        if row >= 0 && col >= 0 && (row as usize) < self.grid.nrow && (col as usize) < self.grid.ncol
        {
            Some(self.data[row as usize * self.grid.ncol + col as usize])
        } else {
            None
        }
    }

    /// Apply a function to every cell, producing a raster on the same grid.
    pub fn map<U: Copy, F: Fn(T) -> U>(&self, f: F) -> Raster<U> {
        Raster {
            grid: self.grid.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Same shape and same affine transform.
    pub fn is_compatible_with<U>(&self, other: &Raster<U>) -> bool {
        self.grid == other.grid
    }
}

impl<T> Index<(usize, usize)> for Raster<T> {
    type Output = T;
    fn index(&self, (r, c): (usize, usize)) -> &T {
        &self.data[r * self.grid.ncol + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Raster<T> {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        &mut self.data[r * self.grid.ncol + c]
    }
}
