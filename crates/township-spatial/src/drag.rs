//! Rectangle drags and farmland expansion rules.
//!
//! Roads and farmland are placed by dragging between two corners. Every cell
//! of the inclusive rectangle becomes a candidate; the caller filters
//! candidates individually and applies whatever survives as one batch.

use crate::{GridPosition, SpatialError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An inclusive axis-aligned rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub min: GridPosition,
    pub max: GridPosition,
}

impl GridRect {
    /// Build the rectangle spanned by two corners, in any order.
    pub fn new(a: GridPosition, b: GridPosition) -> Self {
        Self {
            min: GridPosition::new(a.x.min(b.x), a.y.min(b.y)),
            max: GridPosition::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    /// Grow the rectangle by `by` cells on every side, saturating at the
    /// edge of the i32 range.
    pub fn expanded(&self, by: i32) -> Self {
        Self {
            min: GridPosition::new(self.min.x.saturating_sub(by), self.min.y.saturating_sub(by)),
            max: GridPosition::new(self.max.x.saturating_add(by), self.max.y.saturating_add(by)),
        }
    }

    pub fn width(&self) -> u64 {
        u64::from(self.max.x.abs_diff(self.min.x)) + 1
    }

    pub fn height(&self) -> u64 {
        u64::from(self.max.y.abs_diff(self.min.y)) + 1
    }

    pub fn area(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    /// Cells in row-major order starting at `min`.
    pub fn cells(&self) -> impl Iterator<Item = GridPosition> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| GridPosition::new(x, y)))
    }
}

/// Upper bound on the cells a single drag may cover.
pub const MAX_DRAG_CELLS: u64 = 64 * 64;

/// Every single-cell tile between two drag corners, inclusive.
///
/// Both corners must be on the map and the rectangle may cover at most
/// [`MAX_DRAG_CELLS`] cells.
pub fn tiles_in_drag(
    start: GridPosition,
    end: GridPosition,
) -> Result<Vec<GridPosition>, SpatialError> {
    if let Some(off_map) = [start, end].into_iter().find(|c| !c.in_world()) {
        return Err(SpatialError::OutOfBounds(off_map));
    }
    let rect = GridRect::new(start, end);
    let cells = rect.area();
    if cells > MAX_DRAG_CELLS {
        return Err(SpatialError::DragTooLarge {
            cells,
            max: MAX_DRAG_CELLS,
        });
    }
    Ok(rect.cells().collect())
}

/// Whether a farmland tile may go at `tile` for a farm whose building covers
/// `farm_bounds` and which already owns `existing` tiles.
///
/// Placeable if inside the farm rectangle grown by one cell, or orthogonally
/// adjacent to one of the existing tiles.
pub fn is_farmland_adjacent(
    farm_bounds: GridRect,
    existing: &BTreeSet<GridPosition>,
    tile: GridPosition,
) -> bool {
    farm_bounds.expanded(1).contains(tile) || tile.neighbors_4().any(|n| existing.contains(&n))
}

/// Filter a drag batch down to the farmland tiles that can be placed.
///
/// Each candidate is judged on its own against the farm and the tiles it
/// already owns; tiles of the same batch never vouch for each other.
/// `is_free` reports whether a cell is unoccupied. Duplicates and tiles the
/// farm already owns are dropped, and the rest keep the candidates' order.
pub fn filter_farmland<F>(
    farm_bounds: GridRect,
    existing: &BTreeSet<GridPosition>,
    candidates: &[GridPosition],
    is_free: F,
) -> Vec<GridPosition>
where
    F: Fn(GridPosition) -> bool,
{
    let mut seen = BTreeSet::new();
    candidates
        .iter()
        .copied()
        .filter(|&c| seen.insert(c))
        .filter(|c| !existing.contains(c))
        .filter(|&c| is_free(c) && is_farmland_adjacent(farm_bounds, existing, c))
        .collect()
}
