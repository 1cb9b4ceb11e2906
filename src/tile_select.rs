//! Tile membership in the study area.
//!
//! A tile belongs to the study area iff its bounding box intersects the
//! valid-data footprint of the reference raster. Selection is a pure
//! predicate over geometry; deleting the discarded tiles' files is a
//! separate, explicit step so the predicate can be tested without touching
//! a filesystem.

use crate::error::Result;
use crate::geotiff;
use geo::{Intersects, MultiPolygon, Rect};
use log::warn;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A candidate tile: its backing raster file and the bounding box derived
/// from the tile's own transform and shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    pub path: PathBuf,
    pub bounds: Rect<f64>,
}

impl TileRecord {
    /// Build a record by reading only the tile's GeoTIFF header.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let grid = geotiff::read_grid(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            bounds: grid.bounds(),
        })
    }
}

/// Partition candidate tiles into (kept, discarded) by bounding-box
/// intersection with the footprint.
///
/// The bounding box decides membership, not the tile's pixel content. Every
/// input tile lands in exactly one of the two sets; kept tiles preserve
/// their input order. An empty footprint keeps nothing.
pub fn partition_tiles(
    tiles: Vec<TileRecord>,
    footprint: &MultiPolygon<f64>,
) -> (Vec<TileRecord>, Vec<TileRecord>) {
    tiles
        .into_iter()
        .partition(|tile| footprint.intersects(&tile.bounds.to_polygon()))
}

/// Delete the backing files of discarded tiles. Irreversible.
///
/// A failed deletion is logged per tile and does not stop the remaining
/// deletions. Returns the number of files actually removed.
pub fn remove_tiles(discarded: &[TileRecord]) -> usize {
    let mut removed = 0;
    for tile in discarded {
        match fs::remove_file(&tile.path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("could not remove tile '{}': {}", tile.path.display(), e),
        }
    }
    removed
}

/// Write a flat path-list artifact: one path per line, no header, in the
/// order supplied. Written atomically via a temporary path. Used both for
/// the kept-tile set and for the batch driver's response-tile list.
pub fn write_tile_list<P: AsRef<Path>>(path: P, paths: &[PathBuf]) -> Result<()> {
    let path = path.as_ref();
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    let tmp = path.with_file_name(name);

    let write = |tmp: &Path| -> Result<()> {
        let mut file = fs::File::create(tmp)?;
        for p in paths {
            writeln!(file, "{}", p.display())?;
        }
        file.flush()?;
        Ok(())
    };
    match write(&tmp) {
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
