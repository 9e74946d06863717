//! Grid partitioning of a puzzle screenshot into tile regions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default grid layout of a Quartiles board.
pub const DEFAULT_ROWS: u32 = 5;
pub const DEFAULT_COLS: u32 = 4;

/// A rectangular tile area in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detection confidence. The grid partition is deterministic, so this is always 1.0.
    pub confidence: f32,
}

impl TileRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }
}

/// Splits a `width` x `height` raster into a uniform `rows` x `cols` grid.
///
/// Returns exactly `rows * cols` regions in reading order, or nothing when
/// the raster or the grid is empty.
pub fn detect_regions(width: u32, height: u32, rows: u32, cols: u32) -> Vec<TileRegion> {
    if rows == 0 || cols == 0 || width == 0 || height == 0 {
        return Vec::new();
    }

    let cell_w = width as f64 / cols as f64;
    let cell_h = height as f64 / rows as f64;

    let mut regions = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        for col in 0..cols {
            regions.push(TileRegion::new(
                (col as f64 * cell_w).round() as u32,
                (row as f64 * cell_h).round() as u32,
                cell_w.round() as u32,
                cell_h.round() as u32,
            ));
        }
    }

    sort_reading_order(&mut regions, cell_h);
    regions
}

/// Orders regions row by row: regions whose `y` differs by at most half a
/// cell height share a row and are ordered by `x`.
pub fn sort_reading_order(regions: &mut [TileRegion], cell_height: f64) {
    let tolerance = cell_height / 2.0;
    regions.sort_by(|a, b| {
        let dy = a.y as f64 - b.y as f64;
        if dy.abs() <= tolerance {
            a.x.cmp(&b.x)
        } else if dy < 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    });
}
