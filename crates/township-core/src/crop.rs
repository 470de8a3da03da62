//! Crop growth on farmland tiles.
//!
//! A tile is empty, growing, or ready. Growth advances by a fixed step per
//! poll, so the same number of polls always yields the same progress.

use crate::catalog::Catalog;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::{FULL_PERCENT, Fixed64, Millis, percent_of_ceil};
use crate::id::{BuildingId, PlayerId};
use crate::resource::Resource;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use township_spatial::GridPosition;
use tracing::debug;

/// A plantable crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropKind {
    Wheat,
    Corn,
}

impl CropKind {
    pub const ALL: [CropKind; 2] = [CropKind::Wheat, CropKind::Corn];

    pub fn name(self) -> &'static str {
        match self {
            CropKind::Wheat => "wheat",
            CropKind::Corn => "corn",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Seed consumed when planting.
    pub fn seed(self) -> Resource {
        match self {
            CropKind::Wheat => Resource::WheatSeed,
            CropKind::Corn => Resource::CornSeed,
        }
    }

    /// Resource credited on harvest.
    pub fn produce(self) -> Resource {
        match self {
            CropKind::Wheat => Resource::Wheat,
            CropKind::Corn => Resource::Corn,
        }
    }
}

/// Growth of a tile over one poll, as a percentage step. Rounded up so a
/// 60 s crop polled every second is ready after exactly 60 polls.
pub fn growth_step(interval: Millis, growth_duration: Millis) -> Fixed64 {
    percent_of_ceil(interval, growth_duration)
}

/// Progress after one poll. Never decreases, never passes 100.
pub fn grow(progress: Fixed64, step: Fixed64) -> Fixed64 {
    progress.saturating_add(step).min(FULL_PERCENT)
}

// ---------------------------------------------------------------------------
// Poll: plan / apply
// ---------------------------------------------------------------------------

/// New progress for every tile that grew this poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowthBatch {
    pub updates: Vec<(BuildingId, GridPosition, Fixed64)>,
    /// Tiles that reached 100 this poll.
    pub ripened: Vec<(BuildingId, GridPosition, CropKind)>,
}

/// Decide how far every planted tile grows over `interval`.
pub fn plan(state: &GameState, catalog: &Catalog, interval: Millis) -> GrowthBatch {
    let mut batch = GrowthBatch::default();
    for (id, building) in &state.buildings {
        for tile in &building.farmland {
            let Some(crop) = tile.crop else { continue };
            if !tile.construction.is_active() || tile.progress >= FULL_PERCENT {
                continue;
            }
            let Some(def) = catalog.crop(crop) else { continue };
            let next = grow(tile.progress, growth_step(interval, def.growth_duration));
            batch.updates.push((id, tile.position, next));
            if next >= FULL_PERCENT {
                batch.ripened.push((id, tile.position, crop));
            }
        }
    }
    batch
}

pub fn apply(state: &mut GameState, batch: GrowthBatch, events: &mut Vec<GameEvent>) {
    for (id, pos, progress) in batch.updates {
        if let Some(tile) = state.buildings.get_mut(id).and_then(|b| b.tile_mut(pos)) {
            tile.progress = progress;
        }
    }
    for (farm, position, crop) in batch.ripened {
        events.push(GameEvent::CropReady {
            farm,
            position,
            crop,
        });
    }
}

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// Plant a crop on a finished, empty tile owned by `player`, consuming one
/// seed.
pub fn plant(
    state: &mut GameState,
    player: PlayerId,
    farm: BuildingId,
    position: GridPosition,
    crop: CropKind,
) -> Result<(), GameError> {
    let tile = state
        .building(farm)?
        .tile(position)
        .ok_or(GameError::UnknownTile(position))?;
    if tile.owner != Some(player) {
        return Err(GameError::NotOwner);
    }
    if !tile.construction.is_active() {
        return Err(GameError::UnderConstruction);
    }
    if tile.crop.is_some() {
        return Err(GameError::TileNotEmpty);
    }

    let seed = crop.seed();
    if !state.player_mut(player)?.inventory.try_remove(seed, 1) {
        return Err(GameError::InsufficientResource(seed));
    }

    if let Some(tile) = state.buildings.get_mut(farm).and_then(|b| b.tile_mut(position)) {
        tile.crop = Some(crop);
        tile.progress = Fixed64::ZERO;
    }
    debug!(?farm, x = position.x, y = position.y, crop = crop.name(), "planted");
    Ok(())
}

/// Harvest a ready tile. Returns the quantity credited to the tile owner.
pub fn harvest(
    state: &mut GameState,
    catalog: &Catalog,
    player: PlayerId,
    farm: BuildingId,
    position: GridPosition,
) -> Result<(Resource, u32), GameError> {
    let tile = state
        .building(farm)?
        .tile(position)
        .ok_or(GameError::UnknownTile(position))?;
    if tile.owner != Some(player) {
        return Err(GameError::NotOwner);
    }
    let crop = match tile.crop {
        Some(crop) if tile.is_ready() => crop,
        _ => return Err(GameError::CropNotReady),
    };
    let amount = catalog.crop(crop).map(|d| d.yield_quantity).unwrap_or(0);
    let produce = crop.produce();

    state.player_mut(player)?.inventory.add(produce, amount);
    if let Some(tile) = state.buildings.get_mut(farm).and_then(|b| b.tile_mut(position)) {
        tile.crop = None;
        tile.progress = Fixed64::ZERO;
    }
    debug!(?farm, x = position.x, y = position.y, amount, "harvested");
    Ok((produce, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheat_step_per_second() {
        // 1 s of a 60 s crop.
        let step = growth_step(1_000, 60_000);
        let expected = Fixed64::from_num(100) / Fixed64::from_num(60);
        assert!((step - expected).abs() < Fixed64::from_num(0.0001));
    }

    #[test]
    fn growth_clamps_at_full() {
        let almost = Fixed64::from_num(99.5);
        assert_eq!(grow(almost, Fixed64::from_num(2)), FULL_PERCENT);
        assert_eq!(grow(FULL_PERCENT, Fixed64::from_num(2)), FULL_PERCENT);
    }

    #[test]
    fn sixty_polls_ripen_wheat() {
        let step = growth_step(1_000, 60_000);
        let mut progress = Fixed64::ZERO;
        let mut previous = progress;
        for _ in 0..59 {
            progress = grow(progress, step);
            assert!(progress >= previous);
            previous = progress;
        }
        assert!(progress < FULL_PERCENT);
        progress = grow(progress, step);
        assert_eq!(progress, FULL_PERCENT);
    }

    #[test]
    fn seeds_and_produce() {
        assert_eq!(CropKind::Wheat.seed(), Resource::WheatSeed);
        assert_eq!(CropKind::Corn.produce(), Resource::Corn);
        assert_eq!(CropKind::from_name("corn"), Some(CropKind::Corn));
    }
}
