//! Vectorization of a raster valid-data mask into world-space polygons.
//!
//! The footprint of a reference raster is the union of the polygons covering
//! its non-zero mask cells. Tile selection tests against every polygon of
//! the multi-part footprint, so disconnected study areas are handled instead
//! of only the first extracted shape.

use crate::raster::Raster;
use geo::{LineString, MultiPolygon, Polygon};
use std::collections::HashMap;

/// Extract the valid-data footprint of `mask` (cells with non-zero value).
///
/// Each 4-connected component becomes one polygon; enclosed background
/// becomes an interior ring. Coordinates are world-space pixel corners, so
/// the polygons align exactly with the raster's cell boundaries.
pub fn valid_data_footprint(mask: &Raster<u8>) -> MultiPolygon<f64> {
    let labels = label_components(mask);
    let n_components = *labels.iter().max().unwrap_or(&0);

    let mut polygons = Vec::with_capacity(n_components as usize);
    for component in 1..=n_components {
        let rings = trace_component_rings(mask, &labels, component);
        if let Some(polygon) = rings_to_polygon(rings) {
            polygons.push(polygon);
        }
    }
    MultiPolygon(polygons)
}

/// 4-connected component labelling of non-zero cells (0 = background).
fn label_components(mask: &Raster<u8>) -> Vec<u32> {
    let nrow = mask.grid.nrow;
    let ncol = mask.grid.ncol;
    let mut labels = vec![0u32; nrow * ncol];
    let mut next_label = 0u32;
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let neighbors: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

    for r in 0..nrow {
        for c in 0..ncol {
            if mask.get(r, c) == 0 || labels[r * ncol + c] != 0 {
                continue;
            }
            next_label += 1;
            labels[r * ncol + c] = next_label;
            stack.push((r, c));
            while let Some((cr, cc)) = stack.pop() {
                for &(dr, dc) in &neighbors {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= nrow as isize || nc >= ncol as isize {
                        continue;
                    }
                    let idx = nr as usize * ncol + nc as usize;
                    if labels[idx] == 0 && mask.get(nr as usize, nc as usize) != 0 {
                        labels[idx] = next_label;
                        stack.push((nr as usize, nc as usize));
                    }
                }
            }
        }
    }
    labels
}

type Corner = (usize, usize); // (row, col) in pixel-corner coordinates

/// Collect the boundary rings of one labelled component, in world space.
///
/// Boundary edges are emitted per cell side facing a non-component cell,
/// oriented so the traversal runs clockwise in image coordinates, then
/// chained into closed rings. At corners where two rings touch, the edge
/// turning right relative to the incoming direction is preferred, which
/// keeps each ring simple.
fn trace_component_rings(mask: &Raster<u8>, labels: &[u32], component: u32) -> Vec<Vec<(f64, f64)>> {
    let nrow = mask.grid.nrow;
    let ncol = mask.grid.ncol;
    let in_component = |r: isize, c: isize| -> bool {
        r >= 0
            && c >= 0
            && (r as usize) < nrow
            && (c as usize) < ncol
            && labels[r as usize * ncol + c as usize] == component
    };

    // start corner -> list of end corners of unconsumed directed edges
    let mut edges: HashMap<Corner, Vec<Corner>> = HashMap::new();
    let mut n_edges = 0usize;
    for r in 0..nrow {
        for c in 0..ncol {
            if labels[r * ncol + c] != component {
                continue;
            }
            let (ri, ci) = (r as isize, c as isize);
            let sides: [(bool, Corner, Corner); 4] = [
                (!in_component(ri - 1, ci), (r, c), (r, c + 1)),
                (!in_component(ri, ci + 1), (r, c + 1), (r + 1, c + 1)),
                (!in_component(ri + 1, ci), (r + 1, c + 1), (r + 1, c)),
                (!in_component(ri, ci - 1), (r + 1, c), (r, c)),
            ];
            for (exposed, from, to) in sides {
                if exposed {
                    edges.entry(from).or_default().push(to);
                    n_edges += 1;
                }
            }
        }
    }

    let mut rings = Vec::new();
    while n_edges > 0 {
        // take any remaining edge as the ring start
        let (&start, _) = edges.iter().find(|(_, ends)| !ends.is_empty()).unwrap();
        let mut ring: Vec<Corner> = vec![start];
        let mut current = start;
        let mut incoming: Option<(isize, isize)> = None;

        loop {
            let ends = edges.get_mut(&current).unwrap();
            let pick = match incoming {
                None => 0,
                Some(dir) => {
                    // right turn, then straight, then left turn
                    let preference = [(dir.1, -dir.0), dir, (-dir.1, dir.0)];
                    preference
                        .iter()
                        .find_map(|want| {
                            ends.iter().position(|&e| {
                                (e.0 as isize - current.0 as isize,
                                 e.1 as isize - current.1 as isize) == *want
                            })
                        })
                        .unwrap_or(0)
                }
            };
            let next = ends.swap_remove(pick);
            n_edges -= 1;
            incoming = Some((
                next.0 as isize - current.0 as isize,
                next.1 as isize - current.1 as isize,
            ));
            ring.push(next);
            current = next;
            if current == start {
                break;
            }
        }

        rings.push(
            ring.iter()
                .map(|&(r, c)| mask.grid.corner_to_world(r, c))
                .collect(),
        );
    }
    rings
}

/// The ring with the largest absolute area is the exterior; the rest are
/// holes.
fn rings_to_polygon(mut rings: Vec<Vec<(f64, f64)>>) -> Option<Polygon<f64>> {
    if rings.is_empty() {
        return None;
    }
    let exterior_idx = rings
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            ring_area(a)
                .abs()
                .partial_cmp(&ring_area(b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)?;
    let exterior = rings.swap_remove(exterior_idx);
    let interiors = rings.into_iter().map(LineString::from).collect();
    Some(Polygon::new(LineString::from(exterior), interiors))
}

/// Signed area of a closed ring (shoelace formula).
fn ring_area(ring: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    for w in ring.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        area += x0 * y1 - x1 * y0;
    }
    area / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Grid;
    use geo::{coord, Area, Contains, Intersects, Rect};

    fn mask_from_rows(rows: &[&[u8]]) -> Raster<u8> {
        let nrow = rows.len();
        let ncol = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Raster::from_vec(Grid::unit(nrow, ncol), data)
    }

    #[test]
    fn test_empty_mask_empty_footprint() {
        let mask = mask_from_rows(&[&[0, 0], &[0, 0]]);
        let fp = valid_data_footprint(&mask);
        assert!(fp.0.is_empty());
    }

    #[test]
    fn test_full_mask_covers_grid() {
        let mask = mask_from_rows(&[&[1, 1], &[1, 1]]);
        let fp = valid_data_footprint(&mask);
        assert_eq!(fp.0.len(), 1);
        assert!((fp.unsigned_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_cell_polygon() {
        let mask = mask_from_rows(&[&[0, 0, 0], &[0, 9, 0], &[0, 0, 0]]);
        let fp = valid_data_footprint(&mask);
        assert_eq!(fp.0.len(), 1);
        assert!((fp.unsigned_area() - 1.0).abs() < 1e-9);
        // the centre cell is rows 1, cols 1 -> world x in [1,2], y in [1,2]
        assert!(fp.contains(&coord! { x: 1.5, y: 1.5 }));
    }

    #[test]
    fn test_multi_part_footprint_keeps_all_parts() {
        // two disconnected blobs: both must be part of the footprint
        let mask = mask_from_rows(&[
            &[1, 0, 0, 0],
            &[0, 0, 0, 0],
            &[0, 0, 0, 1],
        ]);
        let fp = valid_data_footprint(&mask);
        assert_eq!(fp.0.len(), 2);
        // a box around the second blob intersects the footprint even though
        // the blob is not the first extracted polygon
        let probe = Rect::new(coord! { x: 3.1, y: 0.1 }, coord! { x: 3.9, y: 0.9 });
        assert!(fp.intersects(&probe.to_polygon()));
    }

    #[test]
    fn test_hole_is_interior_ring() {
        let mask = mask_from_rows(&[
            &[1, 1, 1],
            &[1, 0, 1],
            &[1, 1, 1],
        ]);
        let fp = valid_data_footprint(&mask);
        assert_eq!(fp.0.len(), 1);
        assert_eq!(fp.0[0].interiors().len(), 1);
        assert!((fp.unsigned_area() - 8.0).abs() < 1e-9);
        assert!(!fp.contains(&coord! { x: 1.5, y: 1.5 }));
    }

    #[test]
    fn test_l_shape_area() {
        let mask = mask_from_rows(&[
            &[1, 0],
            &[1, 1],
        ]);
        let fp = valid_data_footprint(&mask);
        assert_eq!(fp.0.len(), 1);
        assert!((fp.unsigned_area() - 3.0).abs() < 1e-9);
    }
}
