//! Jobs and homes: players joining employers and renting houses.

use crate::error::GameError;
use crate::event::GameEvent;
use crate::id::{BuildingId, PlayerId};
use crate::state::GameState;
use tracing::debug;

/// Hire `player` at an active employer with a free place.
pub fn apply_for_job(
    state: &mut GameState,
    player: PlayerId,
    building: BuildingId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let b = state.building(building)?;
    if !b.capabilities().employable {
        return Err(GameError::Unsupported);
    }
    if !b.is_active() {
        return Err(GameError::UnderConstruction);
    }
    if state.player(player)?.is_employed() {
        return Err(GameError::AlreadyEmployed);
    }
    if !b.has_vacancy() {
        return Err(GameError::CapacityFull);
    }
    let salary = b.terms.salary();

    state.building_mut(building)?.employees.push(player);
    let p = state.player_mut(player)?;
    p.workplace = Some(building);
    p.workplace_salary = salary;
    debug!(?player, ?building, salary, "hired");
    events.push(GameEvent::EmploymentChanged {
        player,
        workplace: Some(building),
    });
    Ok(())
}

pub fn quit_job(
    state: &mut GameState,
    player: PlayerId,
    building: BuildingId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    if state.player(player)?.workplace != Some(building) {
        return Err(GameError::NotEmployed);
    }
    if let Some(b) = state.buildings.get_mut(building) {
        b.employees.retain(|&e| e != player);
    }
    let p = state.player_mut(player)?;
    p.workplace = None;
    p.workplace_salary = 0;
    events.push(GameEvent::EmploymentChanged {
        player,
        workplace: None,
    });
    Ok(())
}

/// Become the tenant of an active, vacant house.
pub fn rent_house(
    state: &mut GameState,
    player: PlayerId,
    house: BuildingId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let b = state.building(house)?;
    if !b.capabilities().rentable {
        return Err(GameError::Unsupported);
    }
    if !b.is_active() {
        return Err(GameError::UnderConstruction);
    }
    if state.player(player)?.home.is_some() {
        return Err(GameError::AlreadyRenting);
    }
    if b.renter.is_some() || b.residents.len() as u32 >= b.capacity {
        return Err(GameError::CapacityFull);
    }

    let b = state.building_mut(house)?;
    b.renter = Some(player);
    b.residents.push(player);
    state.player_mut(player)?.home = Some(house);
    debug!(?player, ?house, "moved in");
    events.push(GameEvent::HomeChanged {
        player,
        home: Some(house),
    });
    Ok(())
}

pub fn move_out(
    state: &mut GameState,
    player: PlayerId,
    house: BuildingId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let b = state.building_mut(house)?;
    if b.renter != Some(player) {
        return Err(GameError::NotRenting);
    }
    b.renter = None;
    b.residents.retain(|&r| r != player);
    state.player_mut(player)?.home = None;
    events.push(GameEvent::HomeChanged { player, home: None });
    Ok(())
}
