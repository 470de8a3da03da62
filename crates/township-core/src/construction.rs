//! Construction and demolition timers.
//!
//! Every building and farmland tile carries an absolute `eta` and the
//! `duration` it was started with. Progress is a pure function of the
//! current time, so it survives save/load as long as the eta does; the
//! stored `progress` is only a cache refreshed by the 1 Hz poll.
//!
//! The poll is split into [`plan`] (read-only, decides what finishes) and
//! [`apply`] (mutates the state in one go).

use crate::building::Building;
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::{FULL_PERCENT, Fixed64, Millis, percent_of};
use crate::grid::Occupancy;
use crate::id::{BuildingId, PlayerId};
use crate::ledger::TransactionKind;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use township_spatial::GridPosition;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Construction state
// ---------------------------------------------------------------------------

/// Which timed phase an entity is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Building,
    Active,
    Demolishing,
}

/// Timer state shared by buildings and farmland tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construction {
    pub phase: Phase,
    /// Absolute completion time of the current phase.
    pub eta: Millis,
    /// Length of the current phase as started.
    pub duration: Millis,
    /// Cached progress in percent, refreshed on every poll.
    pub progress: Fixed64,
}

impl Construction {
    /// Start building at `now`.
    pub fn started(now: Millis, duration: Millis) -> Self {
        let mut c = Self {
            phase: Phase::Building,
            eta: now.saturating_add(duration),
            duration,
            progress: Fixed64::ZERO,
        };
        c.progress = c.progress_at(now);
        c
    }

    /// An entity that is already standing.
    pub fn finished() -> Self {
        Self {
            phase: Phase::Active,
            eta: 0,
            duration: 0,
            progress: FULL_PERCENT,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_under_construction(&self) -> bool {
        self.phase == Phase::Building
    }

    pub fn is_demolishing(&self) -> bool {
        self.phase == Phase::Demolishing
    }

    /// Progress of the current phase at `now`, in percent.
    pub fn progress_at(&self, now: Millis) -> Fixed64 {
        match self.phase {
            Phase::Active => FULL_PERCENT,
            Phase::Building | Phase::Demolishing => progress_percent(now, self.eta, self.duration),
        }
    }

    /// True once the current timed phase has run its course.
    pub fn is_due(&self, now: Millis) -> bool {
        !self.is_active() && self.progress_at(now) >= FULL_PERCENT
    }

    fn begin_demolition(&mut self, now: Millis, duration: Millis) {
        self.phase = Phase::Demolishing;
        self.eta = now.saturating_add(duration);
        self.duration = duration;
        self.progress = self.progress_at(now);
    }
}

/// `clamp01((now - (eta - duration)) / duration) * 100`.
pub fn progress_percent(now: Millis, eta: Millis, duration: Millis) -> Fixed64 {
    let start = eta.saturating_sub(duration);
    percent_of(now.saturating_sub(start), duration)
}

/// Refund for demolishing something that cost `cost`.
pub fn refund_for(cost: u64, refund_percent: u32) -> u64 {
    (cost as u128 * refund_percent.min(100) as u128 / 100) as u64
}

// ---------------------------------------------------------------------------
// Starting demolition
// ---------------------------------------------------------------------------

/// Begin demolishing a building. Only the owner may demolish, and only an
/// active or still-building structure.
pub fn demolish_building(
    state: &mut GameState,
    catalog: &Catalog,
    player: PlayerId,
    building: BuildingId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let now = state.now;
    let b = state.building_mut(building)?;
    if !b.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    if b.construction.is_demolishing() {
        return Err(GameError::AlreadyDemolishing);
    }
    let duration = catalog.building(b.def).map(|d| d.demolish_duration).unwrap_or(0);
    b.construction.begin_demolition(now, duration);
    debug!(?building, duration, "demolition started");
    events.push(GameEvent::DemolitionStarted {
        building,
        tile: None,
        at: now,
    });
    Ok(())
}

/// Begin demolishing one farmland tile of a farm.
pub fn demolish_farmland(
    state: &mut GameState,
    catalog: &Catalog,
    player: PlayerId,
    farm: BuildingId,
    position: GridPosition,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let now = state.now;
    let duration = catalog.farmland().demolish_duration;
    let b = state.building_mut(farm)?;
    let tile = b.tile_mut(position).ok_or(GameError::UnknownTile(position))?;
    if tile.owner != Some(player) {
        return Err(GameError::NotOwner);
    }
    if tile.construction.is_demolishing() {
        return Err(GameError::AlreadyDemolishing);
    }
    tile.construction.begin_demolition(now, duration);
    events.push(GameEvent::DemolitionStarted {
        building: farm,
        tile: Some(position),
        at: now,
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Poll: plan / apply
// ---------------------------------------------------------------------------

/// What a construction poll decided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionBatch {
    pub now: Millis,
    /// Refreshed progress for everything still timed.
    pub progress: Vec<(BuildingId, Option<GridPosition>, Fixed64)>,
    pub completed_buildings: Vec<BuildingId>,
    pub completed_tiles: Vec<(BuildingId, GridPosition)>,
    pub demolished_buildings: Vec<BuildingId>,
    pub demolished_tiles: Vec<(BuildingId, GridPosition)>,
}

impl ConstructionBatch {
    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
            && self.completed_buildings.is_empty()
            && self.completed_tiles.is_empty()
            && self.demolished_buildings.is_empty()
            && self.demolished_tiles.is_empty()
    }
}

/// Inspect every timed entity at `now`.
pub fn plan(state: &GameState, now: Millis) -> ConstructionBatch {
    let mut batch = ConstructionBatch {
        now,
        ..Default::default()
    };

    for (id, building) in &state.buildings {
        let c = &building.construction;
        if !c.is_active() {
            batch.progress.push((id, None, c.progress_at(now)));
            if c.is_due(now) {
                match c.phase {
                    Phase::Building => batch.completed_buildings.push(id),
                    Phase::Demolishing => batch.demolished_buildings.push(id),
                    Phase::Active => {}
                }
            }
        }

        // Tiles of a farm that is going away leave with it.
        if batch.demolished_buildings.last() == Some(&id) {
            continue;
        }
        for tile in &building.farmland {
            let c = &tile.construction;
            if c.is_active() {
                continue;
            }
            batch.progress.push((id, Some(tile.position), c.progress_at(now)));
            if c.is_due(now) {
                match c.phase {
                    Phase::Building => batch.completed_tiles.push((id, tile.position)),
                    Phase::Demolishing => batch.demolished_tiles.push((id, tile.position)),
                    Phase::Active => {}
                }
            }
        }
    }

    batch
}

/// Apply a planned batch: cache progress, activate finished entities,
/// remove demolished ones and refund their owners.
pub fn apply(
    state: &mut GameState,
    grid: &mut Occupancy,
    config: &GameConfig,
    batch: ConstructionBatch,
    events: &mut Vec<GameEvent>,
) {
    let now = batch.now;

    for (id, tile, progress) in batch.progress {
        let Some(b) = state.buildings.get_mut(id) else {
            continue;
        };
        match tile {
            None => b.construction.progress = progress,
            Some(pos) => {
                if let Some(t) = b.tile_mut(pos) {
                    t.construction.progress = progress;
                }
            }
        }
    }

    for id in batch.completed_buildings {
        if let Some(b) = state.buildings.get_mut(id) {
            b.construction = Construction::finished();
            info!(building = ?id, name = %b.name, "construction completed");
            events.push(GameEvent::ConstructionCompleted {
                building: id,
                tile: None,
                at: now,
            });
        }
    }

    for (id, pos) in batch.completed_tiles {
        if let Some(t) = state.buildings.get_mut(id).and_then(|b| b.tile_mut(pos)) {
            t.construction = Construction::finished();
            events.push(GameEvent::ConstructionCompleted {
                building: id,
                tile: Some(pos),
                at: now,
            });
        }
    }

    for (id, pos) in batch.demolished_tiles {
        let Some(b) = state.buildings.get_mut(id) else {
            continue;
        };
        let Some(index) = b.farmland.iter().position(|t| t.position == pos) else {
            continue;
        };
        let tile = b.farmland.remove(index);
        grid.remove_tile(id, pos);
        if let Some(owner) = tile.owner {
            refund(state, owner, tile.cost, config, "Farmland demolished", now);
        }
        events.push(GameEvent::DemolitionCompleted {
            building: id,
            tile: Some(pos),
            at: now,
        });
    }

    for id in batch.demolished_buildings {
        let Some(b) = state.buildings.remove(id) else {
            continue;
        };
        grid.remove_building(id, &b);
        release_occupants(state, id, &b);
        state.processes.retain(|_, p| p.building != id);
        if let Some(owner) = b.owner {
            let description = format!("{} demolished", b.name);
            refund(state, owner, b.cost, config, &description, now);
        }
        // Tiles leaving with their farm are refunded as if demolished one by one.
        for tile in &b.farmland {
            if let Some(owner) = tile.owner {
                refund(state, owner, tile.cost, config, "Farmland demolished", now);
            }
        }
        info!(building = ?id, name = %b.name, tiles = b.farmland.len(), "demolition completed");
        events.push(GameEvent::DemolitionCompleted {
            building: id,
            tile: None,
            at: now,
        });
    }
}

fn refund(
    state: &mut GameState,
    owner: PlayerId,
    cost: u64,
    config: &GameConfig,
    description: &str,
    now: Millis,
) {
    let amount = refund_for(cost, config.demolish_refund_percent);
    if amount == 0 {
        return;
    }
    if let Some(p) = state.players.get_mut(owner) {
        p.credit(amount);
        state
            .ledger
            .record(owner, TransactionKind::Income, description, amount, now);
    }
}

/// Clear the job or home of everyone attached to a removed building.
fn release_occupants(state: &mut GameState, id: BuildingId, building: &Building) {
    for &employee in &building.employees {
        if let Some(p) = state.players.get_mut(employee) {
            if p.workplace == Some(id) {
                p.workplace = None;
                p.workplace_salary = 0;
            }
        }
    }
    for &resident in building.residents.iter().chain(building.renter.iter()) {
        if let Some(p) = state.players.get_mut(resident) {
            if p.home == Some(id) {
                p.home = None;
            }
        }
    }
}
