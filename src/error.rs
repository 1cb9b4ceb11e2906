//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the canopy pipeline.
///
/// A failure while processing one tile aborts that tile only; batch drivers
/// are expected to log the error and carry on with the remaining tiles.
#[derive(Debug, Error)]
pub enum CanopyError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Observed and predicted rasters do not share the same grid.
    /// Raised before any pixel comparison; shapes are never truncated or
    /// padded to force a match.
    #[error("raster shape mismatch: observed {observed_rows}x{observed_cols}, predicted {predicted_rows}x{predicted_cols}")]
    ShapeMismatch {
        observed_rows: usize,
        observed_cols: usize,
        predicted_rows: usize,
        predicted_cols: usize,
    },

    /// A raster file decoded to a pixel format the pipeline cannot use.
    #[error("unsupported pixel format in '{path}'")]
    UnsupportedPixelFormat { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, CanopyError>;
