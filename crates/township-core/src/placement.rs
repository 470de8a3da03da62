//! Placing buildings, road drags and farmland drags.
//!
//! Single placements are all or nothing. Drag batches skip invalid cells
//! and fail only when no cell is valid or the player cannot pay for every
//! valid cell. Nothing is written until every check has passed.

use crate::building::{Building, FarmlandTile, Terms};
use crate::catalog::{BuildingDef, Catalog};
use crate::config::GameConfig;
use crate::construction::Construction;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::Fixed64;
use crate::grid::Occupancy;
use crate::id::{BuildingId, DefId, PlayerId};
use crate::ledger::TransactionKind;
use crate::resource::Resource;
use crate::state::GameState;
use std::collections::BTreeSet;
use township_spatial::{GridPosition, Rotation, filter_farmland, tiles_in_drag};
use tracing::debug;

/// Total money and materials for `count` copies of a definition.
fn batch_price(def: &BuildingDef, count: u64) -> (u64, Vec<(Resource, u32)>) {
    let money = def.cost.saturating_mul(count);
    let materials = def
        .materials
        .iter()
        .map(|&(r, q)| (r, q.saturating_mul(count.min(u32::MAX as u64) as u32)))
        .collect();
    (money, materials)
}

/// Check that `player` can pay `money` and `materials`.
fn check_affordable(
    state: &GameState,
    player: PlayerId,
    money: u64,
    materials: &[(Resource, u32)],
) -> Result<(), GameError> {
    let p = state.player(player)?;
    if !p.can_afford(money) {
        return Err(GameError::InsufficientFunds);
    }
    if let Some(missing) = p.inventory.first_shortfall(materials) {
        return Err(GameError::InsufficientResource(missing));
    }
    Ok(())
}

/// Take the price from a player already checked with [`check_affordable`].
fn charge(
    state: &mut GameState,
    player: PlayerId,
    money: u64,
    materials: &[(Resource, u32)],
    description: String,
) -> Result<(), GameError> {
    let now = state.now;
    let p = state.player_mut(player)?;
    p.debit(money)?;
    for &(resource, quantity) in materials {
        if !p.inventory.try_remove(resource, quantity) {
            return Err(GameError::InsufficientResource(resource));
        }
    }
    state
        .ledger
        .record(player, TransactionKind::Expense, description, money, now);
    Ok(())
}

fn new_building(
    def_id: DefId,
    def: &BuildingDef,
    config: &GameConfig,
    owner: PlayerId,
    origin: GridPosition,
    rotation: Rotation,
    now: u64,
) -> Building {
    let caps = def.kind.capabilities();
    Building {
        def: def_id,
        kind: def.kind,
        name: def.name.clone(),
        position: origin,
        footprint: def.footprint,
        rotation,
        capacity: def.capacity,
        owner: Some(owner),
        renter: None,
        residents: Vec::new(),
        employees: Vec::new(),
        terms: Terms::for_kind(def.kind, def.price),
        construction: Construction::started(now, def.build_duration),
        cost: def.cost,
        stock: Default::default(),
        farmland: Vec::new(),
        bank: caps.lends.then_some(config.player_bank),
    }
}

// ---------------------------------------------------------------------------
// Single placement
// ---------------------------------------------------------------------------

/// Place one building of the named definition with its top-left corner at
/// `origin`. Debits cost and materials once; the building starts under
/// construction.
#[allow(clippy::too_many_arguments)]
pub fn place_building(
    state: &mut GameState,
    grid: &mut Occupancy,
    catalog: &Catalog,
    config: &GameConfig,
    player: PlayerId,
    def_name: &str,
    origin: GridPosition,
    rotation: Rotation,
    events: &mut Vec<GameEvent>,
) -> Result<BuildingId, GameError> {
    let (def_id, def) = catalog.find(def_name)?;
    let footprint = def.footprint.rotated(rotation);
    if !footprint.fits_at(origin) {
        return Err(GameError::OutOfBounds(origin));
    }
    if let Some(taken) = footprint.tiles(origin).find(|&t| grid.is_occupied(t)) {
        return Err(GameError::CellOccupied(taken));
    }
    check_affordable(state, player, def.cost, &def.materials)?;

    charge(state, player, def.cost, &def.materials, format!("Built {}", def.name))?;
    let now = state.now;
    let building = new_building(def_id, def, config, player, origin, rotation, now);
    let id = state.buildings.insert(building);
    grid.insert_building(id, &state.buildings[id])?;

    debug!(building = ?id, name = %def.name, x = origin.x, y = origin.y, "building placed");
    events.push(GameEvent::BuildingPlaced {
        building: id,
        owner: player,
        at: now,
    });
    Ok(id)
}

// ---------------------------------------------------------------------------
// Drags
// ---------------------------------------------------------------------------

/// Place a drag-placed definition (roads) on every free cell of the
/// rectangle between `start` and `end`.
#[allow(clippy::too_many_arguments)]
pub fn place_drag(
    state: &mut GameState,
    grid: &mut Occupancy,
    catalog: &Catalog,
    config: &GameConfig,
    player: PlayerId,
    def_name: &str,
    start: GridPosition,
    end: GridPosition,
    events: &mut Vec<GameEvent>,
) -> Result<Vec<BuildingId>, GameError> {
    let (def_id, def) = catalog.find(def_name)?;
    if !def.kind.capabilities().drag_placed {
        return Err(GameError::Unsupported);
    }
    let footprint = def.footprint;
    let cells: Vec<GridPosition> = tiles_in_drag(start, end)?
        .into_iter()
        .filter(|&c| grid.can_place(c, footprint))
        .collect();
    if cells.is_empty() {
        return Err(GameError::NoValidTiles);
    }
    let (money, materials) = batch_price(def, cells.len() as u64);
    check_affordable(state, player, money, &materials)?;

    charge(
        state,
        player,
        money,
        &materials,
        format!("Built {} x{}", def.name, cells.len()),
    )?;
    let now = state.now;
    let mut placed = Vec::with_capacity(cells.len());
    for cell in cells {
        let building = new_building(def_id, def, config, player, cell, Rotation::None, now);
        let id = state.buildings.insert(building);
        grid.insert_building(id, &state.buildings[id])?;
        events.push(GameEvent::BuildingPlaced {
            building: id,
            owner: player,
            at: now,
        });
        placed.push(id);
    }
    debug!(count = placed.len(), name = %def.name, "drag placed");
    Ok(placed)
}

/// Add farmland tiles to `farm` on the rectangle between `start` and `end`.
///
/// Each cell must be free and lie in the farm's ring or next to a tile the
/// farm owned before this drag; other cells are skipped. A one-cell drag
/// reports why its cell was refused.
#[allow(clippy::too_many_arguments)]
pub fn place_farmland(
    state: &mut GameState,
    grid: &mut Occupancy,
    catalog: &Catalog,
    player: PlayerId,
    farm: BuildingId,
    start: GridPosition,
    end: GridPosition,
    events: &mut Vec<GameEvent>,
) -> Result<Vec<GridPosition>, GameError> {
    let building = state.building(farm)?;
    if !building.capabilities().has_farmland {
        return Err(GameError::Unsupported);
    }
    if !building.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    if building.construction.is_demolishing() {
        return Err(GameError::AlreadyDemolishing);
    }

    let existing: BTreeSet<GridPosition> = building.farmland.iter().map(|t| t.position).collect();
    let candidates = tiles_in_drag(start, end)?;
    let accepted = filter_farmland(building.bounds(), &existing, &candidates, |c| {
        !grid.is_occupied(c)
    });
    if accepted.is_empty() {
        return Err(match candidates.as_slice() {
            [only] if grid.is_occupied(*only) => GameError::CellOccupied(*only),
            [only] => GameError::NotAdjacent(*only),
            _ => GameError::NoValidTiles,
        });
    }

    let def = *catalog.farmland();
    let money = def.cost.saturating_mul(accepted.len() as u64);
    check_affordable(state, player, money, &[])?;
    charge(
        state,
        player,
        money,
        &[],
        format!("Farmland x{}", accepted.len()),
    )?;

    let now = state.now;
    for &position in &accepted {
        grid.insert_tile(farm, position)?;
    }
    let b = state.building_mut(farm)?;
    b.farmland.extend(accepted.iter().map(|&position| FarmlandTile {
        position,
        owner: Some(player),
        crop: None,
        progress: Fixed64::ZERO,
        construction: Construction::started(now, def.build_duration),
        cost: def.cost,
    }));

    debug!(?farm, count = accepted.len(), "farmland placed");
    events.push(GameEvent::FarmlandPlaced {
        farm,
        tiles: accepted.len() as u32,
        at: now,
    });
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{place_active, state_with_player};

    struct Town {
        state: GameState,
        grid: Occupancy,
        catalog: Catalog,
        config: GameConfig,
        player: PlayerId,
        events: Vec<GameEvent>,
    }

    fn town(money: u64) -> Town {
        let (state, player) = state_with_player(money);
        Town {
            grid: Occupancy::rebuild(&state),
            state,
            catalog: Catalog::standard(),
            config: GameConfig::default(),
            player,
            events: Vec::new(),
        }
    }

    impl Town {
        fn place(&mut self, name: &str, x: i32, y: i32) -> Result<BuildingId, GameError> {
            place_building(
                &mut self.state,
                &mut self.grid,
                &self.catalog,
                &self.config,
                self.player,
                name,
                GridPosition::new(x, y),
                Rotation::None,
                &mut self.events,
            )
        }

        fn roads(&mut self, a: (i32, i32), b: (i32, i32)) -> Result<Vec<BuildingId>, GameError> {
            place_drag(
                &mut self.state,
                &mut self.grid,
                &self.catalog,
                &self.config,
                self.player,
                "Út",
                GridPosition::new(a.0, a.1),
                GridPosition::new(b.0, b.1),
                &mut self.events,
            )
        }

        fn farmland(
            &mut self,
            farm: BuildingId,
            a: (i32, i32),
            b: (i32, i32),
        ) -> Result<Vec<GridPosition>, GameError> {
            place_farmland(
                &mut self.state,
                &mut self.grid,
                &self.catalog,
                self.player,
                farm,
                GridPosition::new(a.0, a.1),
                GridPosition::new(b.0, b.1),
                &mut self.events,
            )
        }

        fn money(&self) -> u64 {
            self.state.players[self.player].money
        }
    }

    #[test]
    fn house_debits_cost_once_and_starts_building() {
        let mut t = town(1_000);
        let id = t.place("Házikó", 0, 0).unwrap();
        assert_eq!(t.money(), 500);

        let b = &t.state.buildings[id];
        assert!(b.construction.is_under_construction());
        assert_eq!(b.terms, Terms::Rent(10));
        assert_eq!(b.construction.eta, 10_000);
        assert!(t.grid.is_occupied(GridPosition::new(1, 1)));
        assert_eq!(t.state.ledger.len(), 1);
    }

    #[test]
    fn occupied_single_placement_changes_nothing() {
        let mut t = town(5_000);
        t.place("Házikó", 0, 0).unwrap();
        let before = t.money();
        assert_eq!(
            t.place("Házikó", 1, 1),
            Err(GameError::CellOccupied(GridPosition::new(1, 1)))
        );
        assert_eq!(t.money(), before);
        assert_eq!(t.state.buildings.len(), 1);
    }

    #[test]
    fn missing_materials_rejected() {
        let mut t = town(5_000);
        assert_eq!(
            t.place("Családi ház", 0, 0),
            Err(GameError::InsufficientResource(Resource::Wood))
        );
        t.state.players[t.player].inventory.add(Resource::Wood, 20);
        t.state.players[t.player].inventory.add(Resource::Brick, 30);
        t.place("Családi ház", 0, 0).unwrap();
        assert!(t.state.players[t.player].inventory.is_empty());
        assert_eq!(t.money(), 3_800);
    }

    #[test]
    fn unknown_definition() {
        let mut t = town(5_000);
        assert_eq!(
            t.place("Vár", 0, 0),
            Err(GameError::UnknownDefinition("Vár".into()))
        );
    }

    #[test]
    fn road_drag_skips_occupied_cells() {
        let mut t = town(5_000);
        t.place("Házikó", 2, 0).unwrap();
        let money = t.money();
        let roads = t.roads((0, 0), (5, 0)).unwrap();
        // Cells 2 and 3 are under the house.
        assert_eq!(roads.len(), 4);
        assert_eq!(t.money(), money - 40);
    }

    #[test]
    fn road_drag_all_blocked() {
        let mut t = town(5_000);
        t.place("Házikó", 0, 0).unwrap();
        assert_eq!(t.roads((0, 0), (1, 1)), Err(GameError::NoValidTiles));
    }

    #[test]
    fn road_drag_needs_money_for_every_valid_cell() {
        let mut t = town(45);
        assert_eq!(t.roads((0, 0), (4, 0)), Err(GameError::InsufficientFunds));
        assert_eq!(t.money(), 45);
        assert!(t.state.buildings.is_empty());
    }

    #[test]
    fn non_drag_definition_rejected_for_drag() {
        let mut t = town(5_000);
        assert_eq!(
            place_drag(
                &mut t.state,
                &mut t.grid,
                &t.catalog,
                &t.config,
                t.player,
                "Házikó",
                GridPosition::new(0, 0),
                GridPosition::new(3, 3),
                &mut t.events,
            ),
            Err(GameError::Unsupported)
        );
    }

    #[test]
    fn farmland_reaches_one_cell_past_owned_tiles() {
        let mut t = town(5_000);
        let farm = place_active(&mut t.state, t.player, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);

        // Only (2,0) touches the ring; the rest of the row is out of reach.
        let placed = t.farmland(farm, (2, 0), (5, 0)).unwrap();
        assert_eq!(placed, vec![GridPosition::new(2, 0)]);
        assert_eq!(t.state.buildings[farm].farmland.len(), 1);
        assert!(!t.grid.is_occupied(GridPosition::new(3, 0)));
        assert_eq!(t.money(), 5_000 - 20);

        // The next drag may extend one cell past what is already owned.
        let placed = t.farmland(farm, (5, 0), (2, 0)).unwrap();
        assert_eq!(placed, vec![GridPosition::new(3, 0)]);
        assert_eq!(t.money(), 5_000 - 40);
    }

    #[test]
    fn farmland_fills_the_ring() {
        let mut t = town(5_000);
        let farm = place_active(&mut t.state, t.player, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);

        // A 6x6 drag around the 2x2 farm: the 12-cell ring is accepted,
        // the farm's own cells and the outer band are not.
        let placed = t.farmland(farm, (-2, -2), (3, 3)).unwrap();
        assert_eq!(placed.len(), 12);
        assert!(placed.iter().all(|c| (-1..=2).contains(&c.x) && (-1..=2).contains(&c.y)));
    }

    #[test]
    fn off_map_and_oversized_selections_rejected() {
        let mut t = town(5_000);
        let far = GridPosition::new(i32::MAX, 0);
        assert_eq!(t.place("Házikó", far.x, far.y), Err(GameError::OutOfBounds(far)));
        assert_eq!(t.roads((i32::MAX, 0), (i32::MAX, 0)), Err(GameError::OutOfBounds(far)));
        assert!(matches!(
            t.roads((0, 0), (1_000, 1_000)),
            Err(GameError::SelectionTooLarge { .. })
        ));

        let farm = place_active(&mut t.state, t.player, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);
        assert!(matches!(
            t.farmland(farm, (-500, -500), (500, 500)),
            Err(GameError::SelectionTooLarge { .. })
        ));
        assert_eq!(t.money(), 5_000);
        assert!(t.state.buildings[farm].farmland.is_empty());
    }

    #[test]
    fn farmland_single_cell_reasons() {
        let mut t = town(5_000);
        let farm = place_active(&mut t.state, t.player, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);

        assert_eq!(
            t.farmland(farm, (1, 1), (1, 1)),
            Err(GameError::CellOccupied(GridPosition::new(1, 1)))
        );
        assert_eq!(
            t.farmland(farm, (6, 6), (6, 6)),
            Err(GameError::NotAdjacent(GridPosition::new(6, 6)))
        );
        assert_eq!(t.farmland(farm, (6, 6), (8, 8)), Err(GameError::NoValidTiles));
    }

    #[test]
    fn farmland_requires_farm_owner() {
        let mut t = town(5_000);
        let other = t.state.add_player("Other", 5_000);
        let farm = place_active(&mut t.state, other, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);
        assert_eq!(t.farmland(farm, (2, 0), (2, 0)), Err(GameError::NotOwner));
    }

    #[test]
    fn farmland_unaffordable_batch() {
        let mut t = town(30);
        let farm = place_active(&mut t.state, t.player, "Farm", GridPosition::new(0, 0), Rotation::None);
        t.grid = Occupancy::rebuild(&t.state);
        assert_eq!(t.farmland(farm, (2, 0), (3, 0)), Err(GameError::InsufficientFunds));
        assert!(t.state.buildings[farm].farmland.is_empty());
        assert!(!t.grid.is_occupied(GridPosition::new(2, 0)));
    }
}
