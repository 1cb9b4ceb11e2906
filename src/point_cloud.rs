//! Classified LIDAR point input.
//!
//! Only the planimetric position and the classification code of each return
//! are consumed; elevations are read but not kept.

use crate::error::Result;
use las::{Read as LasRead, Reader};
use std::path::Path;

/// A single classified point return in a planar projected CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    /// ASPRS classification code (e.g. 4 = medium vegetation, 5 = high
    /// vegetation).
    pub classification: u8,
}

/// Read all point records from a LAS/LAZ file.
///
/// A malformed or unreadable file is surfaced as an error; the caller aborts
/// that tile's mask construction only. The reader is dropped on every exit
/// path, so no file handle outlives the call.
pub fn read_las_points<P: AsRef<Path>>(path: P) -> Result<Vec<PointRecord>> {
    let mut reader = Reader::from_path(path)?;
    let mut points = Vec::with_capacity(reader.header().number_of_points() as usize);
    for point in reader.points() {
        let point = point?;
        points.push(PointRecord {
            x: point.x,
            y: point.y,
            classification: u8::from(point.classification),
        });
    }
    Ok(points)
}

/// Name of the LAS file paired with an image tile: `lidar-<tile stem>.las`.
pub fn lidar_filename<P: AsRef<Path>>(tile_path: P) -> String {
    let stem = tile_path
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("lidar-{stem}.las")
}
