//! Timed conversions in mills and popcorn stands.
//!
//! Starting a process debits its input from the building stock at once.
//! The poll removes every process whose end time has passed and credits the
//! outputs, summed per building.

use crate::building::BuildingKind;
use crate::catalog::Catalog;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::{Fixed64, Millis, percent_of};
use crate::id::{BuildingId, PlayerId, ProcessId};
use crate::resource::Resource;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A running conversion. Mills and popcorn stands share this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionProcess {
    pub building: BuildingId,
    pub kind: BuildingKind,
    pub started_at: Millis,
    pub duration: Millis,
    pub input: Resource,
    pub input_consumed: u32,
    pub output: Resource,
    pub output_produced: u32,
}

impl ProductionProcess {
    pub fn ends_at(&self) -> Millis {
        self.started_at.saturating_add(self.duration)
    }

    pub fn is_done(&self, now: Millis) -> bool {
        now >= self.ends_at()
    }

    pub fn progress_at(&self, now: Millis) -> Fixed64 {
        percent_of(now.saturating_sub(self.started_at), self.duration)
    }

    pub fn remaining_at(&self, now: Millis) -> Millis {
        self.ends_at().saturating_sub(now)
    }
}

/// Start converting `quantity` units in a production building.
///
/// The stock must hold more input than the run consumes: a building never
/// runs its input down to zero, so 10 wheat pays for one mill unit but not
/// two.
pub fn start_process(
    state: &mut GameState,
    catalog: &Catalog,
    building_id: BuildingId,
    quantity: u32,
    events: &mut Vec<GameEvent>,
) -> Result<ProcessId, GameError> {
    let now = state.now;
    let building = state.building(building_id)?;
    let recipe = catalog
        .recipe_for(building.kind)
        .filter(|_| building.capabilities().has_stock)
        .ok_or(GameError::Unsupported)?;
    if !building.is_active() {
        return Err(GameError::UnderConstruction);
    }
    if quantity == 0 {
        return Err(GameError::InvalidAmount);
    }
    if building.employees.is_empty() {
        return Err(GameError::InsufficientEmployees);
    }
    let (input, per_unit_in) = recipe.input;
    let (output, per_unit_out) = recipe.output;
    let needed = quantity
        .checked_mul(per_unit_in)
        .ok_or(GameError::InsufficientInput)?;
    let kind = building.kind;

    let b = state.building_mut(building_id)?;
    if b.stock.quantity(input) <= needed || !b.stock.try_remove(input, needed) {
        return Err(GameError::InsufficientInput);
    }

    let process = ProductionProcess {
        building: building_id,
        kind,
        started_at: now,
        duration: recipe.unit_duration.saturating_mul(quantity as u64),
        input,
        input_consumed: needed,
        output,
        output_produced: quantity.saturating_mul(per_unit_out),
    };
    let duration = process.duration;
    let id = state.processes.insert(process);
    debug!(process = ?id, building = ?building_id, quantity, duration, "process started");
    events.push(GameEvent::ProcessStarted {
        process: id,
        building: building_id,
        quantity,
    });
    Ok(id)
}

// ---------------------------------------------------------------------------
// Poll: plan / apply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionBatch {
    pub finished: Vec<ProcessId>,
    /// Output per building and resource, summed over this poll.
    pub credits: BTreeMap<(BuildingId, Resource), u32>,
}

pub fn plan(state: &GameState, now: Millis) -> CompletionBatch {
    let mut batch = CompletionBatch::default();
    for (id, p) in &state.processes {
        if p.is_done(now) {
            batch.finished.push(id);
            let entry = batch.credits.entry((p.building, p.output)).or_insert(0);
            *entry = entry.saturating_add(p.output_produced);
        }
    }
    batch
}

pub fn apply(state: &mut GameState, batch: CompletionBatch, events: &mut Vec<GameEvent>) {
    for id in batch.finished {
        if let Some(p) = state.processes.remove(id) {
            events.push(GameEvent::ProcessCompleted {
                process: id,
                building: p.building,
                output: p.output,
                quantity: p.output_produced,
            });
        }
    }
    for ((building, resource), quantity) in batch.credits {
        if let Some(b) = state.buildings.get_mut(building) {
            b.stock.add(resource, quantity);
            info!(?building, %resource, quantity, "production completed");
        }
    }
}

// ---------------------------------------------------------------------------
// Stock transfers
// ---------------------------------------------------------------------------

/// Move the recipe input from the owner's inventory into the building.
pub fn deposit_stock(
    state: &mut GameState,
    catalog: &Catalog,
    player: PlayerId,
    building_id: BuildingId,
    resource: Resource,
    quantity: u32,
) -> Result<(), GameError> {
    if quantity == 0 {
        return Err(GameError::InvalidAmount);
    }
    let building = state.building(building_id)?;
    if !building.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    let accepts = catalog
        .recipe_for(building.kind)
        .is_some_and(|r| r.input.0 == resource);
    if !accepts {
        return Err(GameError::Unsupported);
    }
    if !state.player_mut(player)?.inventory.try_remove(resource, quantity) {
        return Err(GameError::InsufficientResource(resource));
    }
    state.building_mut(building_id)?.stock.add(resource, quantity);
    Ok(())
}

/// Move any held stock from the building to the owner's inventory.
pub fn withdraw_stock(
    state: &mut GameState,
    player: PlayerId,
    building_id: BuildingId,
    resource: Resource,
    quantity: u32,
) -> Result<(), GameError> {
    if quantity == 0 {
        return Err(GameError::InvalidAmount);
    }
    state.player(player)?;
    let building = state.building_mut(building_id)?;
    if !building.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    if !building.stock.try_remove(resource, quantity) {
        return Err(GameError::InsufficientResource(resource));
    }
    state.player_mut(player)?.inventory.add(resource, quantity);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{place_active, state_with_player};
    use township_spatial::{GridPosition, Rotation};

    fn mill_with(wheat: u32) -> (GameState, PlayerId, BuildingId) {
        let (mut state, p) = state_with_player(0);
        let mill = place_active(&mut state, p, "Malom", GridPosition::new(0, 0), Rotation::None);
        let worker = state.add_player("Worker", 0);
        state.buildings[mill].employees.push(worker);
        state.buildings[mill].stock.add(Resource::Wheat, wheat);
        (state, p, mill)
    }

    #[test]
    fn mill_rejects_more_than_stock() {
        let catalog = Catalog::standard();
        let (mut state, _, mill) = mill_with(10);
        let mut events = Vec::new();

        // 2 units need all 10 wheat, 3 units need 15.
        for quantity in [2, 3] {
            assert_eq!(
                start_process(&mut state, &catalog, mill, quantity, &mut events),
                Err(GameError::InsufficientInput)
            );
        }
        assert_eq!(state.buildings[mill].stock.quantity(Resource::Wheat), 10);
        assert!(state.processes.is_empty());
        assert!(events.is_empty());

        let id = start_process(&mut state, &catalog, mill, 1, &mut events).unwrap();
        assert_eq!(state.buildings[mill].stock.quantity(Resource::Wheat), 5);
        let p = &state.processes[id];
        assert_eq!(p.duration, 10_000);
        assert_eq!(p.output_produced, 3);

        // The remaining 5 is exactly one unit's worth.
        assert_eq!(
            start_process(&mut state, &catalog, mill, 1, &mut events),
            Err(GameError::InsufficientInput)
        );
    }

    #[test]
    fn one_spare_unit_of_input_is_enough() {
        let catalog = Catalog::standard();
        let (mut state, _, mill) = mill_with(11);
        start_process(&mut state, &catalog, mill, 2, &mut Vec::new()).unwrap();
        assert_eq!(state.buildings[mill].stock.quantity(Resource::Wheat), 1);
    }

    #[test]
    fn zero_quantity_and_no_employees() {
        let catalog = Catalog::standard();
        let (mut state, _, mill) = mill_with(10);
        let mut events = Vec::new();
        assert_eq!(
            start_process(&mut state, &catalog, mill, 0, &mut events),
            Err(GameError::InvalidAmount)
        );
        state.buildings[mill].employees.clear();
        assert_eq!(
            start_process(&mut state, &catalog, mill, 1, &mut events),
            Err(GameError::InsufficientEmployees)
        );
    }

    #[test]
    fn completion_sums_per_building() {
        let catalog = Catalog::standard();
        let (mut state, _, mill) = mill_with(11);
        let mut events = Vec::new();
        start_process(&mut state, &catalog, mill, 1, &mut events).unwrap();
        start_process(&mut state, &catalog, mill, 1, &mut events).unwrap();

        let early = plan(&state, 9_999);
        assert!(early.finished.is_empty());

        let batch = plan(&state, 10_000);
        assert_eq!(batch.finished.len(), 2);
        assert_eq!(batch.credits.get(&(mill, Resource::Flour)), Some(&6));
        apply(&mut state, batch, &mut events);
        assert!(state.processes.is_empty());
        assert_eq!(state.buildings[mill].stock.quantity(Resource::Flour), 6);
    }

    #[test]
    fn popcorn_stand_recipe() {
        let catalog = Catalog::standard();
        let (mut state, p) = state_with_player(0);
        let stand = place_active(&mut state, p, "Popcorn árus", GridPosition::new(0, 0), Rotation::None);
        state.buildings[stand].employees.push(p);
        state.buildings[stand].stock.add(Resource::Corn, 5);
        let mut events = Vec::new();

        let id = start_process(&mut state, &catalog, stand, 4, &mut events).unwrap();
        assert_eq!(state.processes[id].duration, 20_000);
        assert_eq!(state.processes[id].output_produced, 8);
        assert_eq!(state.processes[id].progress_at(10_000), Fixed64::from_num(50));
    }

    #[test]
    fn non_production_building_unsupported() {
        let catalog = Catalog::standard();
        let (mut state, p) = state_with_player(0);
        let house = place_active(&mut state, p, "Házikó", GridPosition::new(0, 0), Rotation::None);
        assert_eq!(
            start_process(&mut state, &catalog, house, 1, &mut Vec::new()),
            Err(GameError::Unsupported)
        );
    }

    #[test]
    fn deposit_only_recipe_input() {
        let catalog = Catalog::standard();
        let (mut state, owner, mill) = mill_with(0);
        state.players[owner].inventory.add(Resource::Wheat, 7);
        state.players[owner].inventory.add(Resource::Corn, 7);

        assert_eq!(
            deposit_stock(&mut state, &catalog, owner, mill, Resource::Corn, 1),
            Err(GameError::Unsupported)
        );
        deposit_stock(&mut state, &catalog, owner, mill, Resource::Wheat, 7).unwrap();
        assert_eq!(state.buildings[mill].stock.quantity(Resource::Wheat), 7);
        assert_eq!(state.players[owner].inventory.quantity(Resource::Wheat), 0);

        withdraw_stock(&mut state, owner, mill, Resource::Wheat, 2).unwrap();
        assert_eq!(state.players[owner].inventory.quantity(Resource::Wheat), 2);
        assert_eq!(
            withdraw_stock(&mut state, owner, mill, Resource::Flour, 1),
            Err(GameError::InsufficientResource(Resource::Flour))
        );
    }
}
