//! GeoTIFF raster I/O via the `tiff` crate.
//!
//! Geo-referencing is carried by the ModelPixelScale (33550) and
//! ModelTiepoint (33922) tags. Reads are strictly scoped: the file handle is
//! dropped on every exit path. Mask writes go to a temporary sibling path
//! and are renamed into place, so a failed write leaves no partial file.

use crate::error::{CanopyError, Result};
use crate::raster::{Grid, Raster};
use log::warn;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Read resolution and origin from the GeoTIFF tags of an open decoder.
///
/// Returns (res_x, res_y, origin_x, origin_y); missing tags fall back to a
/// unit resolution at (0, 0) with a warning, matching common viewer
/// behaviour for bare TIFFs.
fn extent_from_decoder<R: Read + Seek>(decoder: &mut Decoder<R>) -> (f64, f64, f64, f64) {
    let mut res_x = 1.0_f64;
    let mut res_y = 1.0_f64;
    let mut origin_x = 0.0_f64;
    let mut origin_y = 0.0_f64;
    let mut found_scale = false;
    let mut found_tiepoint = false;

    if let Ok(Some(scale_val)) = decoder.find_tag(Tag::ModelPixelScaleTag) {
        if let Ok(scale) = scale_val.into_f64_vec() {
            if scale.len() >= 2 {
                res_x = scale[0];
                res_y = scale[1];
                found_scale = true;
            }
        }
    }
    if let Ok(Some(tie_val)) = decoder.find_tag(Tag::ModelTiepointTag) {
        if let Ok(tie) = tie_val.into_f64_vec() {
            if tie.len() >= 6 {
                origin_x = tie[3];
                origin_y = tie[4];
                found_tiepoint = true;
            }
        }
    }

    if !found_scale {
        warn!("ModelPixelScale tag (33550) missing, defaulting to 1.0 map units per pixel");
    }
    if !found_tiepoint {
        warn!("ModelTiepoint tag (33922) missing, defaulting origin to (0, 0)");
    }

    (res_x, res_y, origin_x, origin_y)
}

/// Read only the grid (transform + shape) of a raster, without decoding
/// pixels. This is all tile selection needs to compute a bounding box.
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let (res_x, res_y, origin_x, origin_y) = extent_from_decoder(&mut decoder);
    Ok(Grid::new(
        height as usize,
        width as usize,
        res_x,
        res_y,
        origin_x,
        origin_y,
    ))
}

/// Read the first band of a raster as unsigned bytes.
///
/// Multi-band interleaved data takes band 0, as the canopy masks and
/// predicted class rasters are single-band by construction.
pub fn read_band_u8<P: AsRef<Path>>(path: P) -> Result<Raster<u8>> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let (res_x, res_y, origin_x, origin_y) = extent_from_decoder(&mut decoder);
    let grid = Grid::new(
        height as usize,
        width as usize,
        res_x,
        res_y,
        origin_x,
        origin_y,
    );

    let raw: Vec<u8> = match decoder.read_image()? {
        DecodingResult::U8(v) => v,
        _ => {
            return Err(CanopyError::UnsupportedPixelFormat {
                path: path.as_ref().to_path_buf(),
            })
        }
    };

    let total_pixels = grid.len();
    if total_pixels == 0 {
        return Ok(Raster::from_vec(grid, Vec::new()));
    }
    let n_bands = raw.len() / total_pixels;
    let data: Vec<u8> = if n_bands > 1 {
        (0..total_pixels).map(|px| raw[px * n_bands]).collect()
    } else {
        raw
    };
    Ok(Raster::from_vec(grid, data))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn encode_mask(path: &Path, mask: &Raster<u8>, nodata: u8) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image =
        encoder.new_image::<colortype::Gray8>(mask.grid.ncol as u32, mask.grid.nrow as u32)?;
    image.encoder().write_tag(
        Tag::ModelPixelScaleTag,
        &[mask.grid.res_x, mask.grid.res_y, 0.0][..],
    )?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, mask.grid.xmin, mask.grid.ymax, 0.0][..],
    )?;
    image
        .encoder()
        .write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
    image.write_data(&mask.data)?;
    Ok(())
}

/// Write a single-band byte mask sharing the grid it was built on.
///
/// Overwrite semantics: the data is encoded to `<path>.tmp` and renamed over
/// the destination, so the destination is either the previous file, the
/// complete new file, or absent.
pub fn write_mask<P: AsRef<Path>>(path: P, mask: &Raster<u8>, nodata: u8) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);
    match encode_mask(&tmp, mask, nodata) {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_mask(grid: Grid) -> Raster<u8> {
        let mut mask = Raster::filled(grid, 0u8);
        for r in 0..mask.grid.nrow {
            for c in 0..mask.grid.ncol {
                if (r + c) % 2 == 0 {
                    mask.set(r, c, 255);
                }
            }
        }
        mask
    }

    #[test]
    fn test_mask_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");
        let grid = Grid::new(5, 7, 0.25, 0.25, 2_533_000.0, 1_152_000.0);
        let mask = checker_mask(grid.clone());

        write_mask(&path, &mask, 0).unwrap();
        let back = read_band_u8(&path).unwrap();
        assert_eq!(back.grid, grid);
        assert_eq!(back.data, mask.data);
        // no leftover temporary file
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_read_grid_matches_written_transform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.tif");
        let grid = Grid::new(4, 4, 1.0, 1.0, 100.0, 200.0);
        write_mask(&path, &Raster::filled(grid.clone(), 0u8), 0).unwrap();
        assert_eq!(read_grid(&path).unwrap(), grid);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(read_grid("no/such/raster.tif").is_err());
        assert!(read_band_u8("no/such/raster.tif").is_err());
    }

    #[test]
    fn test_overwrite_replaces_previous_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.tif");
        let grid = Grid::unit(3, 3);
        write_mask(&path, &Raster::filled(grid.clone(), 255u8), 0).unwrap();
        write_mask(&path, &Raster::filled(grid, 0u8), 0).unwrap();
        let back = read_band_u8(&path).unwrap();
        assert!(back.data.iter().all(|&v| v == 0));
    }
}
