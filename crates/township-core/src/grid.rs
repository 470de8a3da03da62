//! Cell occupancy for the town, derived from the game state.
//!
//! The index is not part of the save: it is rebuilt from buildings and
//! farmland tiles after every load.

use crate::building::Building;
use crate::error::GameError;
use crate::id::BuildingId;
use crate::state::GameState;
use township_spatial::{BuildingFootprint, GridPosition, SpatialIndex};
use tracing::warn;

/// What covers a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occupant {
    Building(BuildingId),
    /// A farmland tile of the given farm.
    Farmland(BuildingId, GridPosition),
}

#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    index: SpatialIndex<Occupant>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from every building and farmland tile in `state`.
    /// Overlapping entries in a corrupted save are logged and skipped.
    pub fn rebuild(state: &GameState) -> Self {
        let mut grid = Self::new();
        for (id, building) in &state.buildings {
            if let Err(err) = grid.insert_building(id, building) {
                warn!(building = ?id, %err, "skipping overlapping building");
            }
            for tile in &building.farmland {
                if let Err(err) = grid.insert_tile(id, tile.position) {
                    warn!(farm = ?id, %err, "skipping overlapping farmland");
                }
            }
        }
        grid
    }

    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.index.is_occupied(pos)
    }

    pub fn occupant_at(&self, pos: GridPosition) -> Option<Occupant> {
        self.index.occupant_at(pos)
    }

    /// `footprint` must already be rotation-adjusted.
    pub fn can_place(&self, origin: GridPosition, footprint: BuildingFootprint) -> bool {
        self.index.can_place(origin, footprint)
    }

    pub fn insert_building(&mut self, id: BuildingId, building: &Building) -> Result<(), GameError> {
        self.index
            .place(
                Occupant::Building(id),
                building.position,
                building.effective_footprint(),
            )
            .map_err(GameError::from)
    }

    pub fn insert_tile(&mut self, farm: BuildingId, pos: GridPosition) -> Result<(), GameError> {
        self.index
            .place(Occupant::Farmland(farm, pos), pos, BuildingFootprint::single())
            .map_err(GameError::from)
    }

    /// Free the building's cells and those of its farmland.
    pub fn remove_building(&mut self, id: BuildingId, building: &Building) {
        let _ = self.index.remove(Occupant::Building(id));
        for tile in &building.farmland {
            let _ = self.index.remove(Occupant::Farmland(id, tile.position));
        }
    }

    pub fn remove_tile(&mut self, farm: BuildingId, pos: GridPosition) {
        let _ = self.index.remove(Occupant::Farmland(farm, pos));
    }

    pub fn occupied_cells(&self) -> usize {
        self.index.tile_count()
    }
}
