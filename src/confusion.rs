//! Per-pixel confusion matrix between an observed class raster (the canopy
//! ground truth) and a predicted class raster.
//!
//! Categories only meet on the diagonal when their integer codes are equal;
//! the caller guarantees observed and predicted rasters share one encoding.

use crate::error::{CanopyError, Result};
use crate::raster::Raster;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Cross-tabulation of (observed, predicted) pixel values, normalized by the
/// total pixel count so all entries sum to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionTable {
    /// (observed, predicted) -> fraction of pixels. Sorted keys, so
    /// iteration and the CSV artifact are deterministic.
    cells: BTreeMap<(u8, u8), f64>,
    /// Total number of pixels compared.
    n_pixels: usize,
}

impl ConfusionTable {
    /// Normalized frequency for one (observed, predicted) pair.
    pub fn frequency(&self, observed: u8, predicted: u8) -> f64 {
        self.cells.get(&(observed, predicted)).copied().unwrap_or(0.0)
    }

    /// Sum of all entries; 1.0 up to floating rounding for non-empty input.
    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }

    /// Trace of the table: the fraction of pixels where observed equals
    /// predicted.
    pub fn accuracy(&self) -> f64 {
        self.cells
            .iter()
            .filter(|((obs, pred), _)| obs == pred)
            .map(|(_, &freq)| freq)
            .sum()
    }

    pub fn n_pixels(&self) -> usize {
        self.n_pixels
    }

    /// Observed class codes present, ascending.
    pub fn observed_classes(&self) -> Vec<u8> {
        let mut classes: Vec<u8> = self.cells.keys().map(|&(obs, _)| obs).collect();
        classes.dedup();
        classes
    }

    /// Predicted class codes present, ascending.
    pub fn predicted_classes(&self) -> Vec<u8> {
        let mut classes: Vec<u8> = self.cells.keys().map(|&(_, pred)| pred).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Write the table as CSV: first column the observed class, one column
    /// per predicted class, cells holding normalized frequencies. Written to
    /// a temporary path and renamed, so a failed run leaves no artifact.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        let tmp = path.with_file_name(name);

        match self.encode_csv(&tmp) {
            Ok(()) => {
                fs::rename(&tmp, path)?;
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn encode_csv(&self, path: &Path) -> Result<()> {
        let predicted = self.predicted_classes();
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["obs".to_string()];
        header.extend(predicted.iter().map(|p| p.to_string()));
        writer.write_record(&header)?;

        for obs in self.observed_classes() {
            let mut row = vec![obs.to_string()];
            row.extend(
                predicted
                    .iter()
                    .map(|&pred| self.frequency(obs, pred).to_string()),
            );
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Cross-tabulate two rasters pixel by pixel.
///
/// Grids must be compatible (same transform and shape); a mismatch fails
/// before any pixel is compared, never silently truncating or padding. Both
/// rasters flatten row-major, so cell `i` of one corresponds to cell `i` of
/// the other.
pub fn cross_tabulate(observed: &Raster<u8>, predicted: &Raster<u8>) -> Result<ConfusionTable> {
    if !observed.is_compatible_with(predicted) {
        return Err(CanopyError::ShapeMismatch {
            observed_rows: observed.grid.nrow,
            observed_cols: observed.grid.ncol,
            predicted_rows: predicted.grid.nrow,
            predicted_cols: predicted.grid.ncol,
        });
    }

    let mut counts: BTreeMap<(u8, u8), usize> = BTreeMap::new();
    for (&obs, &pred) in observed.data.iter().zip(predicted.data.iter()) {
        *counts.entry((obs, pred)).or_insert(0) += 1;
    }

    let n_pixels = observed.data.len();
    let cells = counts
        .into_iter()
        .map(|(key, count)| (key, count as f64 / n_pixels as f64))
        .collect();
    Ok(ConfusionTable { cells, n_pixels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Grid;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_hot_pixel_scenario() {
        // observed all zeros except one pixel at 255; prediction identical
        let grid = Grid::unit(4, 4);
        let mut observed = Raster::filled(grid.clone(), 0u8);
        observed.set(1, 2, 255);
        let predicted = observed.clone();

        let table = cross_tabulate(&observed, &predicted).unwrap();
        let n = grid.len() as f64;
        assert_relative_eq!(table.frequency(0, 0), (n - 1.0) / n);
        assert_relative_eq!(table.frequency(255, 255), 1.0 / n);
        assert_relative_eq!(table.accuracy(), 1.0);
    }

    #[test]
    fn test_normalization() {
        let grid = Grid::unit(3, 5);
        let observed = Raster::from_vec(
            grid.clone(),
            (0..15u8).map(|i| if i % 3 == 0 { 255 } else { 0 }).collect(),
        );
        let predicted = Raster::from_vec(
            grid,
            (0..15u8).map(|i| if i % 2 == 0 { 255 } else { 0 }).collect(),
        );
        let table = cross_tabulate(&observed, &predicted).unwrap();
        assert_relative_eq!(table.total(), 1.0, epsilon = 1e-12);
        assert!(table.cells.values().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_off_diagonal_lowers_accuracy() {
        let grid = Grid::unit(2, 2);
        let observed = Raster::from_vec(grid.clone(), vec![0, 0, 255, 255]);
        let predicted = Raster::from_vec(grid, vec![0, 255, 255, 255]);
        let table = cross_tabulate(&observed, &predicted).unwrap();
        assert_relative_eq!(table.accuracy(), 0.75);
        assert_relative_eq!(table.frequency(0, 255), 0.25);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let a = Raster::filled(Grid::unit(2, 2), 0u8);
        let b = Raster::filled(Grid::unit(2, 3), 0u8);
        assert!(matches!(
            cross_tabulate(&a, &b),
            Err(CanopyError::ShapeMismatch { .. })
        ));

        // same shape but shifted transform is also a mismatch
        let mut c = Raster::filled(Grid::unit(2, 2), 0u8);
        c.grid.xmin = 512.0;
        assert!(cross_tabulate(&a, &c).is_err());
    }

    #[test]
    fn test_csv_artifact_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confusion.csv");
        let grid = Grid::unit(2, 2);
        let observed = Raster::from_vec(grid.clone(), vec![0, 0, 255, 255]);
        let predicted = Raster::from_vec(grid, vec![0, 255, 0, 255]);
        let table = cross_tabulate(&observed, &predicted).unwrap();
        table.write_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "obs,0,255");
        assert_eq!(lines[1], "0,0.25,0.25");
        assert_eq!(lines[2], "255,0.25,0.25");
    }
}
