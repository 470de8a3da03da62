//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so the helpers
//! are available in unit tests, and to other crates through the
//! `test-utils` feature.

use crate::bank::BankConfig;
use crate::building::{Building, FarmlandTile, Terms};
use crate::catalog::Catalog;
use crate::construction::Construction;
use crate::fixed::Fixed64;
use crate::game::Game;
use crate::id::{BuildingId, PlayerId};
use crate::resource::{Inventory, Resource};
use crate::state::GameState;
use township_spatial::{GridPosition, Rotation};

// ===========================================================================
// State fixtures
// ===========================================================================

/// An empty state with one player named "Player".
pub fn state_with_player(money: u64) -> (GameState, PlayerId) {
    let mut state = GameState::default();
    let player = state.add_player("Player", money);
    (state, player)
}

/// Insert a finished building of a standard definition without charging
/// anyone. Panics on an unknown name.
pub fn place_active(
    state: &mut GameState,
    owner: PlayerId,
    def_name: &str,
    position: GridPosition,
    rotation: Rotation,
) -> BuildingId {
    let catalog = Catalog::standard();
    let (def_id, def) = catalog
        .find(def_name)
        .unwrap_or_else(|e| panic!("test fixture: {e}"));
    state.buildings.insert(Building {
        def: def_id,
        kind: def.kind,
        name: def.name.clone(),
        position,
        footprint: def.footprint,
        rotation,
        capacity: def.capacity,
        owner: Some(owner),
        renter: None,
        residents: Vec::new(),
        employees: Vec::new(),
        terms: Terms::for_kind(def.kind, def.price),
        construction: Construction::finished(),
        cost: def.cost,
        stock: Inventory::new(),
        farmland: Vec::new(),
        bank: def.kind.capabilities().lends.then(BankConfig::default),
    })
}

/// A finished, empty farmland tile.
pub fn active_tile(owner: PlayerId, position: GridPosition) -> FarmlandTile {
    FarmlandTile {
        position,
        owner: Some(owner),
        crop: None,
        progress: Fixed64::ZERO,
        construction: Construction::finished(),
        cost: 20,
    }
}

/// Every resource a building in the standard catalog can ask for.
pub fn builder_materials(quantity: u32) -> Inventory {
    Inventory::from_counts([
        (Resource::Wood, quantity),
        (Resource::Brick, quantity),
        (Resource::Stone, quantity),
    ])
}

// ===========================================================================
// Game fixtures
// ===========================================================================

/// A default game with one player holding `money` and plenty of building
/// materials.
pub fn game_with_player(money: u64) -> (Game, PlayerId) {
    let mut game = Game::default();
    let player = game.add_player("Player");
    if let Some(p) = game.state_mut().players.get_mut(player) {
        p.money = money;
        p.inventory = builder_materials(1_000);
    }
    (game, player)
}

/// Poll the game every `step` milliseconds until `until`.
pub fn run_until(game: &mut Game, until: u64, step: u64) {
    let mut t = game.state().now;
    while t < until {
        t = (t + step).min(until);
        game.poll(t);
    }
}
