//! Grid occupancy model for town placement.
//!
//! Provides a 2D grid-based spatial index that maps cells to occupants
//! (buildings, roads, farmland tiles), supporting multi-tile footprints with
//! rotation, rectangle drags for multi-placement, farmland adjacency rules,
//! and a cancellable placement (ghost) session.
//!
//! The index is generic over the occupant key so that the simulation crate
//! can decide what an occupant is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod drag;
pub mod placement;

pub use drag::{GridRect, MAX_DRAG_CELLS, filter_farmland, is_farmland_adjacent, tiles_in_drag};
pub use placement::{GhostCell, GhostPreview, PlacementMode, PlacementRequest, PlacementSession};

/// Largest coordinate magnitude on either axis. Cells beyond it are off the
/// map and can never be occupied.
pub const WORLD_EXTENT: i32 = 1 << 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A cell on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the cell lies on the map.
    pub fn in_world(&self) -> bool {
        let range = -WORLD_EXTENT..=WORLD_EXTENT;
        range.contains(&self.x) && range.contains(&self.y)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u64 {
        u64::from(self.x.abs_diff(other.x)) + u64::from(self.y.abs_diff(other.y))
    }

    /// The cell `dx` right and `dy` down, if it is representable.
    pub fn offset_by(&self, dx: i64, dy: i64) -> Option<GridPosition> {
        let x = i32::try_from(i64::from(self.x) + dx).ok()?;
        let y = i32::try_from(i64::from(self.y) + dy).ok()?;
        Some(GridPosition::new(x, y))
    }

    /// The orthogonal neighbours of this cell. Cells at the edge of the i32
    /// range have fewer than four.
    pub fn neighbors_4(&self) -> impl Iterator<Item = GridPosition> + '_ {
        Direction::all().into_iter().filter_map(move |dir| {
            let (dx, dy) = dir.offset();
            self.offset_by(i64::from(dx), i64::from(dy))
        })
    }
}

/// The footprint (size) of a building on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingFootprint {
    pub width: u32,
    pub height: u32,
}

impl BuildingFootprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 footprint (roads, farmland tiles).
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    /// Return a new footprint rotated by the given rotation.
    /// For 90/270 degrees, width and height are swapped.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Cw180 => *self,
            Rotation::Cw90 | Rotation::Cw270 => Self {
                width: self.height,
                height: self.width,
            },
        }
    }

    /// Number of cells covered.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether every cell of the footprint at `origin` is on the map.
    pub fn fits_at(&self, origin: GridPosition) -> bool {
        if !origin.in_world() || self.area() == 0 {
            return false;
        }
        origin
            .offset_by(i64::from(self.width) - 1, i64::from(self.height) - 1)
            .is_some_and(|corner| corner.in_world())
    }

    /// Iterate over all cells covered by this footprint at the given origin.
    /// Origin is the top-left corner. Cells past the i32 range are left out;
    /// check [`fits_at`](Self::fits_at) first.
    pub fn tiles(&self, origin: GridPosition) -> impl Iterator<Item = GridPosition> {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        (0..h).flat_map(move |dy| (0..w).filter_map(move |dx| origin.offset_by(dx, dy)))
    }

    /// The inclusive rectangle covered at the given origin, clamped to the
    /// i32 range.
    pub fn rect(&self, origin: GridPosition) -> GridRect {
        let far = |start: i32, len: u32| {
            let end = i64::from(start) + i64::from(len.max(1)) - 1;
            i32::try_from(end).unwrap_or(i32::MAX)
        };
        GridRect::new(
            origin,
            GridPosition::new(far(origin.x, self.width), far(origin.y, self.height)),
        )
    }
}

/// Rotation applied to a placed building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }

    /// The rotation in degrees (0, 90, 180 or 270).
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Parse a rotation from degrees. Only multiples of 90 are accepted;
    /// values outside 0..360 wrap.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// Errors from spatial operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("cell ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
    #[error("occupant is not placed on the grid")]
    NotPlaced,
    #[error("occupant is already placed on the grid")]
    AlreadyPlaced,
    #[error("cell ({}, {}) is off the map", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("drag covers {cells} cells, more than {max}")]
    DragTooLarge { cells: u64, max: u64 },
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// A spatial index mapping grid cells to occupants.
///
/// Maintains a bidirectional mapping:
/// - `tiles`: cell -> occupant
/// - `placements`: occupant -> (origin, rotation-adjusted footprint)
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    tiles: BTreeMap<GridPosition, K>,
    placements: BTreeMap<K, (GridPosition, BuildingFootprint)>,
}

impl<K> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
            placements: BTreeMap::new(),
        }
    }
}

impl<K: Copy + Ord> SpatialIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Placement --

    /// Place an occupant on the grid. `footprint` must already be
    /// rotation-adjusted. Origin is the top-left corner.
    pub fn place(
        &mut self,
        key: K,
        position: GridPosition,
        footprint: BuildingFootprint,
    ) -> Result<(), SpatialError> {
        if self.placements.contains_key(&key) {
            return Err(SpatialError::AlreadyPlaced);
        }
        if !footprint.fits_at(position) {
            return Err(SpatialError::OutOfBounds(position));
        }

        if let Some(tile) = footprint.tiles(position).find(|t| self.tiles.contains_key(t)) {
            return Err(SpatialError::Occupied(tile));
        }

        for tile in footprint.tiles(position) {
            self.tiles.insert(tile, key);
        }
        self.placements.insert(key, (position, footprint));

        Ok(())
    }

    /// Remove an occupant from the grid. Returns its origin position.
    pub fn remove(&mut self, key: K) -> Result<GridPosition, SpatialError> {
        let (position, footprint) = self.placements.remove(&key).ok_or(SpatialError::NotPlaced)?;
        for tile in footprint.tiles(position) {
            self.tiles.remove(&tile);
        }
        Ok(position)
    }

    /// Drop every occupant.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.placements.clear();
    }

    /// Check if a footprint can be placed at the given position.
    pub fn can_place(&self, position: GridPosition, footprint: BuildingFootprint) -> bool {
        footprint.fits_at(position)
            && footprint
                .tiles(position)
                .all(|tile| !self.tiles.contains_key(&tile))
    }

    // -- Point queries --

    /// The occupant covering a cell, if any.
    pub fn occupant_at(&self, pos: GridPosition) -> Option<K> {
        self.tiles.get(&pos).copied()
    }

    /// Check if a cell is occupied.
    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.tiles.contains_key(&pos)
    }

    /// Origin and footprint of a placed occupant.
    pub fn placement(&self, key: K) -> Option<(GridPosition, BuildingFootprint)> {
        self.placements.get(&key).copied()
    }

    // -- Area queries --

    /// Find all unique occupants within an inclusive rectangle.
    pub fn occupants_in_rect(&self, rect: GridRect) -> Vec<K> {
        let mut result: Vec<K> = Vec::new();
        for (&pos, &key) in self.tiles.range(rect.min..=rect.max) {
            if rect.contains(pos) && !result.contains(&key) {
                result.push(key);
            }
        }
        result
    }

    // -- Stats --

    /// Number of unique occupants placed on the grid.
    pub fn occupant_count(&self) -> usize {
        self.placements.len()
    }

    /// Total number of occupied cells.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
