//! Binary morphology on boolean rasters.
//!
//! Cross-shaped (4-connected) structuring element. Cells outside the raster
//! count as background for both erosion and dilation.

use crate::raster::Raster;

const CROSS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Erode: a cell stays set only if it and its four neighbours are set.
/// Border cells always lose their value (out-of-bounds is background).
pub fn binary_erosion(mask: &Raster<bool>, iterations: usize) -> Raster<bool> {
    let mut current = mask.clone();
    for _ in 0..iterations {
        let mut next = current.clone();
        for r in 0..current.grid.nrow {
            for c in 0..current.grid.ncol {
                if !current.get(r, c) {
                    continue;
                }
                let keep = CROSS.iter().all(|&(dr, dc)| {
                    current
                        .get_opt(r as isize + dr, c as isize + dc)
                        .unwrap_or(false)
                });
                if !keep {
                    next.set(r, c, false);
                }
            }
        }
        current = next;
    }
    current
}

/// Dilate: a cell becomes set if it or any of its four neighbours is set.
pub fn binary_dilation(mask: &Raster<bool>, iterations: usize) -> Raster<bool> {
    let mut current = mask.clone();
    for _ in 0..iterations {
        let mut next = current.clone();
        for r in 0..current.grid.nrow {
            for c in 0..current.grid.ncol {
                if current.get(r, c) {
                    continue;
                }
                let grow = CROSS.iter().any(|&(dr, dc)| {
                    current
                        .get_opt(r as isize + dr, c as isize + dc)
                        .unwrap_or(false)
                });
                if grow {
                    next.set(r, c, true);
                }
            }
        }
        current = next;
    }
    current
}

/// Opening: erosion followed by dilation with the same iteration count.
/// Removes speckle (isolated foreground smaller than the eroded element)
/// while leaving large regions roughly in place.
pub fn binary_opening(mask: &Raster<bool>, iterations: usize) -> Raster<bool> {
    binary_dilation(&binary_erosion(mask, iterations), iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Grid;

    fn from_rows(rows: &[&[u8]]) -> Raster<bool> {
        let nrow = rows.len();
        let ncol = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().map(|&v| v != 0)).collect();
        Raster::from_vec(Grid::unit(nrow, ncol), data)
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let m = from_rows(&[&[0, 1, 0], &[1, 1, 1], &[0, 1, 0]]);
        assert_eq!(binary_erosion(&m, 0), m);
        assert_eq!(binary_dilation(&m, 0), m);
        assert_eq!(binary_opening(&m, 0), m);
    }

    #[test]
    fn test_opening_removes_speckle() {
        // A lone pixel in a sea of background vanishes, a solid block survives
        let m = from_rows(&[
            &[1, 0, 0, 0, 0, 0],
            &[0, 0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1],
        ]);
        let opened = binary_opening(&m, 1);
        assert!(!opened.get(0, 0));
        assert!(opened.get(2, 4));
    }

    #[test]
    fn test_dilation_expands_by_one() {
        let m = from_rows(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let d = binary_dilation(&m, 1);
        assert!(d.get(0, 1) && d.get(1, 0) && d.get(1, 2) && d.get(2, 1));
        // corners stay background with a cross element
        assert!(!d.get(0, 0) && !d.get(2, 2));
    }

    #[test]
    fn test_dilation_closes_small_gaps() {
        let m = from_rows(&[&[1, 0, 1]]);
        let d = binary_dilation(&m, 1);
        assert!(d.data.iter().all(|&v| v));
    }

    #[test]
    fn test_opening_then_dilation_stabilizes() {
        // Once a mask has reached a fixed point of the opening, re-running
        // the cleanup must not grow it further
        let m = from_rows(&[
            &[0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 0],
            &[0, 1, 1, 1, 0],
            &[0, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0],
        ]);
        let once = binary_opening(&m, 1);
        let twice = binary_opening(&once, 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_erosion_strips_border() {
        let m = from_rows(&[&[1, 1], &[1, 1]]);
        let e = binary_erosion(&m, 1);
        assert!(e.data.iter().all(|&v| !v));
    }
}
