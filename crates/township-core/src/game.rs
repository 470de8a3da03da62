//! The game facade: one object the host drives.
//!
//! [`Game`] owns the state, the frozen catalog, the configuration, the
//! scheduler, the occupancy index, the event bus and the placement session.
//!
//! # Poll pipeline
//!
//! Each fired task runs its engines as plan-then-apply:
//!
//! 1. **Queued actions** -- actions submitted with [`Game::submit`] run in
//!    submission order at the poll time.
//! 2. **Poll task** -- construction timers, crop growth, process
//!    completion.
//! 3. **Economic tick** -- rent and salary settlement.
//! 4. **Delivery** -- buffered events go to passive listeners.
//!
//! Hosts drive time with [`Game::poll`] (wall clock) or [`Game::advance`]
//! (virtual time, every boundary visited in order).

use crate::action::{Action, ActionQueue, Outcome};
use crate::bank::{self, BankConfig, LoanSource};
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::construction;
use crate::crop::{self, CropKind};
use crate::economy;
use crate::error::GameError;
use crate::event::{EventBus, GameEvent};
use crate::fixed::Millis;
use crate::grid::Occupancy;
use crate::id::{BuildingId, LoanId, OfferId, PlayerId, ProcessId};
use crate::market;
use crate::placement;
use crate::production;
use crate::resource::{Asset, Resource};
use crate::scheduler::{Scheduler, TaskKind};
use crate::serialize::{self, SaveStore};
use crate::state::GameState;
use crate::tenancy;
use std::collections::BTreeSet;
use township_spatial::{
    GhostCell, GhostPreview, GridPosition, PlacementMode, PlacementRequest, PlacementSession,
    Rotation, filter_farmland,
};
use tracing::{debug, info};

/// What a placement session places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementTool {
    /// A building definition, by display name.
    Building(String),
    /// Farmland tiles for a farm.
    Farmland(BuildingId),
}

/// What one poll or advance did.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Tasks run, with the game time each ran at.
    pub tasks: Vec<(Millis, TaskKind)>,
    /// Results of queued actions, in submission order.
    pub actions: Vec<Result<Outcome, GameError>>,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Game {
    state: GameState,
    catalog: Catalog,
    config: GameConfig,
    scheduler: Scheduler,
    grid: Occupancy,
    events: EventBus,
    queue: ActionQueue,
    placement: PlacementSession<PlacementTool>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(Catalog::standard(), GameConfig::default())
    }
}

impl Game {
    /// A new, empty town at time zero.
    pub fn new(catalog: Catalog, config: GameConfig) -> Self {
        let config = config.sanitized();
        let state = GameState::new(config.system_bank);
        Self::from_state(state, catalog, config)
    }

    /// Resume from a loaded state. The occupancy index is rebuilt and every
    /// periodic task restarts from the state's time.
    pub fn from_state(state: GameState, catalog: Catalog, config: GameConfig) -> Self {
        let config = config.sanitized();
        let mut scheduler = Scheduler::new(state.now);
        scheduler.register(TaskKind::Poll, config.poll_interval_ms);
        scheduler.register(TaskKind::EconomicTick, config.tick_interval_ms);
        Self {
            grid: Occupancy::rebuild(&state),
            events: EventBus::new(config.event_buffer_capacity),
            queue: ActionQueue::with_max_history(config.action_history),
            placement: PlacementSession::new(),
            state,
            catalog,
            config,
            scheduler,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct mutable access for hosts and fixtures. Call
    /// [`Game::rebuild_grid`] after moving buildings or tiles.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Occupancy {
        &self.grid
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register listeners or suppress kinds here.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn rebuild_grid(&mut self) {
        self.grid = Occupancy::rebuild(&self.state);
    }

    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.grid.is_occupied(pos)
    }

    /// Whole seconds until the next economic tick, rounded up.
    pub fn seconds_until_tick(&self) -> u64 {
        self.scheduler
            .time_until(TaskKind::EconomicTick)
            .map(|ms| ms.div_ceil(1_000))
            .unwrap_or(0)
    }

    pub fn add_player(&mut self, name: &str) -> PlayerId {
        let id = self.state.add_player(name, self.config.starting_money);
        debug!(player = ?id, name, money = self.config.starting_money, "player joined");
        id
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Wall-clock step: run queued actions, then every task due at `now`
    /// once. A late poll does not catch up on missed intervals.
    pub fn poll(&mut self, now: Millis) -> PollReport {
        let fired = self.scheduler.poll(now);
        self.state.now = self.scheduler.now();
        let at = self.state.now;
        let actions = self.run_queued();
        for &kind in &fired {
            self.run_task(kind);
        }
        self.events.deliver();
        PollReport {
            tasks: fired.into_iter().map(|kind| (at, kind)).collect(),
            actions,
        }
    }

    /// Virtual-time step: run queued actions now, then move `dt` forward
    /// running every task at each boundary it crosses.
    pub fn advance(&mut self, dt: Millis) -> PollReport {
        let actions = self.run_queued();
        let tasks = self.scheduler.advance(dt);
        for &(at, kind) in &tasks {
            self.state.now = at;
            self.run_task(kind);
        }
        self.state.now = self.scheduler.now();
        self.events.deliver();
        PollReport { tasks, actions }
    }

    fn run_task(&mut self, kind: TaskKind) {
        let now = self.state.now;
        let mut events = Vec::new();
        match kind {
            TaskKind::Poll => {
                let built = construction::plan(&self.state, now);
                if !built.is_empty() {
                    construction::apply(
                        &mut self.state,
                        &mut self.grid,
                        &self.config,
                        built,
                        &mut events,
                    );
                }
                let grown = crop::plan(&self.state, &self.catalog, self.config.poll_interval_ms);
                crop::apply(&mut self.state, grown, &mut events);
                let done = production::plan(&self.state, now);
                production::apply(&mut self.state, done, &mut events);
            }
            TaskKind::EconomicTick => {
                let settlement = economy::settle(&self.state);
                economy::apply(&mut self.state, settlement, &mut events);
            }
        }
        self.events.emit_all(events);
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Queue an action for the next poll boundary.
    pub fn submit(&mut self, action: Action) {
        self.queue.push(action);
    }

    fn run_queued(&mut self) -> Vec<Result<Outcome, GameError>> {
        let actions = self.queue.drain(self.state.now);
        actions.into_iter().map(|a| self.execute(a)).collect()
    }

    /// Run one action now.
    pub fn execute(&mut self, action: Action) -> Result<Outcome, GameError> {
        match action {
            Action::PlaceBuilding {
                player,
                def_name,
                origin,
                rotation,
            } => self
                .place_building(player, &def_name, origin, rotation)
                .map(Outcome::Building),
            Action::PlaceDrag {
                player,
                def_name,
                start,
                end,
            } => self
                .place_drag(player, &def_name, start, end)
                .map(Outcome::Buildings),
            Action::PlaceFarmland {
                player,
                farm,
                start,
                end,
            } => self
                .place_farmland(player, farm, start, end)
                .map(Outcome::Tiles),
            Action::Demolish { player, building } => {
                self.demolish(player, building).map(|()| Outcome::Done)
            }
            Action::DemolishFarmland {
                player,
                farm,
                position,
            } => self
                .demolish_farmland(player, farm, position)
                .map(|()| Outcome::Done),
            Action::Plant {
                player,
                farm,
                position,
                crop,
            } => self.plant(player, farm, position, crop).map(|()| Outcome::Done),
            Action::Harvest {
                player,
                farm,
                position,
            } => self
                .harvest(player, farm, position)
                .map(|(resource, quantity)| Outcome::Harvested { resource, quantity }),
            Action::StartProcess { building, quantity } => self
                .start_process(building, quantity)
                .map(Outcome::Process),
            Action::DepositStock {
                player,
                building,
                resource,
                quantity,
            } => self
                .deposit_stock(player, building, resource, quantity)
                .map(|()| Outcome::Done),
            Action::WithdrawStock {
                player,
                building,
                resource,
                quantity,
            } => self
                .withdraw_stock(player, building, resource, quantity)
                .map(|()| Outcome::Done),
            Action::ApplyForJob { player, building } => {
                self.apply_for_job(player, building).map(|()| Outcome::Done)
            }
            Action::QuitJob { player, building } => {
                self.quit_job(player, building).map(|()| Outcome::Done)
            }
            Action::RentHouse { player, house } => {
                self.rent_house(player, house).map(|()| Outcome::Done)
            }
            Action::MoveOut { player, house } => {
                self.move_out(player, house).map(|()| Outcome::Done)
            }
            Action::SetRent {
                player,
                building,
                rent,
            } => self.set_rent(player, building, rent).map(|()| Outcome::Done),
            Action::SetSalary {
                player,
                building,
                salary,
            } => self
                .set_salary(player, building, salary)
                .map(|()| Outcome::Done),
            Action::CreateOffer {
                seller,
                selling,
                selling_quantity,
                buying,
                buying_quantity,
            } => self
                .create_offer(seller, selling, selling_quantity, buying, buying_quantity)
                .map(Outcome::Offer),
            Action::AcceptOffer { buyer, offer } => {
                self.accept_offer(buyer, offer).map(|()| Outcome::Done)
            }
            Action::CancelOffer { player, offer } => {
                self.cancel_offer(player, offer).map(|()| Outcome::Done)
            }
            Action::TakeLoan {
                borrower,
                source,
                amount,
            } => self.take_loan(borrower, source, amount).map(Outcome::Loan),
            Action::RepayLoan {
                borrower,
                loan,
                amount,
            } => self.repay(borrower, loan, amount).map(Outcome::Remaining),
            Action::ConfigureBank {
                player,
                bank,
                terms,
            } => self
                .configure_bank(player, bank, terms)
                .map(|()| Outcome::Done),
        }
    }

    /// Buffer the events of a successful action; log a rejection.
    fn finish<T>(
        &mut self,
        action: &'static str,
        events: Vec<GameEvent>,
        result: Result<T, GameError>,
    ) -> Result<T, GameError> {
        match &result {
            Ok(_) => self.events.emit_all(events),
            Err(err) => debug!(action, %err, "action rejected"),
        }
        result
    }

    pub fn place_building(
        &mut self,
        player: PlayerId,
        def_name: &str,
        origin: GridPosition,
        rotation: Rotation,
    ) -> Result<BuildingId, GameError> {
        let mut events = Vec::new();
        let result = placement::place_building(
            &mut self.state,
            &mut self.grid,
            &self.catalog,
            &self.config,
            player,
            def_name,
            origin,
            rotation,
            &mut events,
        );
        self.finish("place_building", events, result)
    }

    pub fn place_drag(
        &mut self,
        player: PlayerId,
        def_name: &str,
        start: GridPosition,
        end: GridPosition,
    ) -> Result<Vec<BuildingId>, GameError> {
        let mut events = Vec::new();
        let result = placement::place_drag(
            &mut self.state,
            &mut self.grid,
            &self.catalog,
            &self.config,
            player,
            def_name,
            start,
            end,
            &mut events,
        );
        self.finish("place_drag", events, result)
    }

    pub fn place_farmland(
        &mut self,
        player: PlayerId,
        farm: BuildingId,
        start: GridPosition,
        end: GridPosition,
    ) -> Result<Vec<GridPosition>, GameError> {
        let mut events = Vec::new();
        let result = placement::place_farmland(
            &mut self.state,
            &mut self.grid,
            &self.catalog,
            player,
            farm,
            start,
            end,
            &mut events,
        );
        self.finish("place_farmland", events, result)
    }

    pub fn demolish(&mut self, player: PlayerId, building: BuildingId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result =
            construction::demolish_building(&mut self.state, &self.catalog, player, building, &mut events);
        self.finish("demolish", events, result)
    }

    pub fn demolish_farmland(
        &mut self,
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
    ) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = construction::demolish_farmland(
            &mut self.state,
            &self.catalog,
            player,
            farm,
            position,
            &mut events,
        );
        self.finish("demolish_farmland", events, result)
    }

    pub fn plant(
        &mut self,
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
        crop: CropKind,
    ) -> Result<(), GameError> {
        let result = crop::plant(&mut self.state, player, farm, position, crop);
        self.finish("plant", Vec::new(), result)
    }

    pub fn harvest(
        &mut self,
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
    ) -> Result<(Resource, u32), GameError> {
        let result = crop::harvest(&mut self.state, &self.catalog, player, farm, position);
        self.finish("harvest", Vec::new(), result)
    }

    pub fn start_process(
        &mut self,
        building: BuildingId,
        quantity: u32,
    ) -> Result<ProcessId, GameError> {
        let mut events = Vec::new();
        let result =
            production::start_process(&mut self.state, &self.catalog, building, quantity, &mut events);
        self.finish("start_process", events, result)
    }

    pub fn deposit_stock(
        &mut self,
        player: PlayerId,
        building: BuildingId,
        resource: Resource,
        quantity: u32,
    ) -> Result<(), GameError> {
        let result = production::deposit_stock(
            &mut self.state,
            &self.catalog,
            player,
            building,
            resource,
            quantity,
        );
        self.finish("deposit_stock", Vec::new(), result)
    }

    pub fn withdraw_stock(
        &mut self,
        player: PlayerId,
        building: BuildingId,
        resource: Resource,
        quantity: u32,
    ) -> Result<(), GameError> {
        let result = production::withdraw_stock(&mut self.state, player, building, resource, quantity);
        self.finish("withdraw_stock", Vec::new(), result)
    }

    pub fn apply_for_job(&mut self, player: PlayerId, building: BuildingId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = tenancy::apply_for_job(&mut self.state, player, building, &mut events);
        self.finish("apply_for_job", events, result)
    }

    pub fn quit_job(&mut self, player: PlayerId, building: BuildingId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = tenancy::quit_job(&mut self.state, player, building, &mut events);
        self.finish("quit_job", events, result)
    }

    pub fn rent_house(&mut self, player: PlayerId, house: BuildingId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = tenancy::rent_house(&mut self.state, player, house, &mut events);
        self.finish("rent_house", events, result)
    }

    pub fn move_out(&mut self, player: PlayerId, house: BuildingId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = tenancy::move_out(&mut self.state, player, house, &mut events);
        self.finish("move_out", events, result)
    }

    pub fn set_rent(&mut self, player: PlayerId, building: BuildingId, rent: u64) -> Result<(), GameError> {
        let result = economy::set_rent(&mut self.state, player, building, rent);
        self.finish("set_rent", Vec::new(), result)
    }

    pub fn set_salary(
        &mut self,
        player: PlayerId,
        building: BuildingId,
        salary: u64,
    ) -> Result<(), GameError> {
        let result = economy::set_salary(&mut self.state, player, building, salary);
        self.finish("set_salary", Vec::new(), result)
    }

    pub fn create_offer(
        &mut self,
        seller: PlayerId,
        selling: Asset,
        selling_quantity: u64,
        buying: Asset,
        buying_quantity: u64,
    ) -> Result<OfferId, GameError> {
        let mut events = Vec::new();
        let result = market::create_offer(
            &mut self.state,
            seller,
            selling,
            selling_quantity,
            buying,
            buying_quantity,
            &mut events,
        );
        self.finish("create_offer", events, result)
    }

    pub fn accept_offer(&mut self, buyer: PlayerId, offer: OfferId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = market::accept_offer(&mut self.state, offer, buyer, &mut events);
        self.finish("accept_offer", events, result)
    }

    pub fn cancel_offer(&mut self, player: PlayerId, offer: OfferId) -> Result<(), GameError> {
        let mut events = Vec::new();
        let result = market::cancel_offer(&mut self.state, offer, player, &mut events);
        self.finish("cancel_offer", events, result)
    }

    pub fn take_loan(
        &mut self,
        borrower: PlayerId,
        source: LoanSource,
        amount: u64,
    ) -> Result<LoanId, GameError> {
        let mut events = Vec::new();
        let result = bank::take_loan(&mut self.state, &self.config, borrower, source, amount, &mut events);
        self.finish("take_loan", events, result)
    }

    /// Returns the amount still owed.
    pub fn repay(&mut self, borrower: PlayerId, loan: LoanId, amount: u64) -> Result<u64, GameError> {
        let mut events = Vec::new();
        let result = bank::repay(&mut self.state, borrower, loan, amount, &mut events);
        self.finish("repay_loan", events, result)
    }

    pub fn configure_bank(
        &mut self,
        player: PlayerId,
        bank: BuildingId,
        terms: BankConfig,
    ) -> Result<(), GameError> {
        let result = bank::configure_bank(&mut self.state, player, bank, terms);
        self.finish("configure_bank", Vec::new(), result)
    }

    // -----------------------------------------------------------------------
    // Placement mode
    // -----------------------------------------------------------------------

    pub fn placement(&self) -> &PlacementSession<PlacementTool> {
        &self.placement
    }

    /// Enter placement mode for a building definition. Drag-placed
    /// definitions arm a drag; others get a rotatable ghost.
    pub fn select_building(&mut self, def_name: &str) -> Result<(), GameError> {
        let (_, def) = self.catalog.find(def_name)?;
        let tool = PlacementTool::Building(def.name.clone());
        if def.kind.capabilities().drag_placed {
            self.placement.select_drag(tool);
        } else {
            self.placement.select(tool, def.footprint);
        }
        Ok(())
    }

    /// Enter farmland drag mode for a farm.
    pub fn select_farmland(&mut self, farm: BuildingId) -> Result<(), GameError> {
        if !self.state.building(farm)?.capabilities().has_farmland {
            return Err(GameError::Unsupported);
        }
        self.placement.select_drag(PlacementTool::Farmland(farm));
        Ok(())
    }

    pub fn rotate_placement(&mut self) {
        self.placement.rotate();
    }

    pub fn hover(&mut self, pos: GridPosition) {
        self.placement.hover(pos);
    }

    /// Press at `pos`. Confirms a single placement for `player`; starts a
    /// drag otherwise.
    pub fn press(&mut self, player: PlayerId, pos: GridPosition) -> Option<Result<Outcome, GameError>> {
        let request = self.placement.press(pos)?;
        Some(self.confirm(player, request))
    }

    /// Release at `pos`, placing the dragged batch for `player`.
    pub fn release(&mut self, player: PlayerId, pos: GridPosition) -> Option<Result<Outcome, GameError>> {
        let request = self.placement.release(pos)?;
        Some(self.confirm(player, request))
    }

    /// Leave placement mode. Nothing is placed or charged.
    pub fn cancel_placement(&mut self) {
        self.placement.cancel();
    }

    fn confirm(
        &mut self,
        player: PlayerId,
        request: PlacementRequest<PlacementTool>,
    ) -> Result<Outcome, GameError> {
        let action = match request {
            PlacementRequest::Single {
                tool: PlacementTool::Building(def_name),
                origin,
                rotation,
            } => Action::PlaceBuilding {
                player,
                def_name,
                origin,
                rotation,
            },
            PlacementRequest::Drag {
                tool: PlacementTool::Building(def_name),
                start,
                end,
            } => Action::PlaceDrag {
                player,
                def_name,
                start,
                end,
            },
            PlacementRequest::Single {
                tool: PlacementTool::Farmland(farm),
                origin,
                ..
            } => Action::PlaceFarmland {
                player,
                farm,
                start: origin,
                end: origin,
            },
            PlacementRequest::Drag {
                tool: PlacementTool::Farmland(farm),
                start,
                end,
            } => Action::PlaceFarmland {
                player,
                farm,
                start,
                end,
            },
        };
        self.execute(action)
    }

    /// Cells the current placement would cover, each flagged valid when it
    /// is free and, for farmland, placeable for the farm as it stands.
    pub fn ghost(&self) -> GhostPreview {
        let preview = self.placement.ghost(|c| !self.grid.is_occupied(c));
        let farm = match self.placement.mode() {
            PlacementMode::DragArmed {
                tool: PlacementTool::Farmland(farm),
                ..
            }
            | PlacementMode::Dragging {
                tool: PlacementTool::Farmland(farm),
                ..
            } => *farm,
            _ => return preview,
        };
        let Some(building) = self.state.buildings.get(farm) else {
            return preview;
        };

        let existing: BTreeSet<GridPosition> = building.farmland.iter().map(|t| t.position).collect();
        let candidates: Vec<GridPosition> = preview.cells.iter().map(|c| c.position).collect();
        let accepted: BTreeSet<GridPosition> =
            filter_farmland(building.bounds(), &existing, &candidates, |c| {
                !self.grid.is_occupied(c)
            })
            .into_iter()
            .collect();
        GhostPreview {
            cells: candidates
                .into_iter()
                .map(|position| GhostCell {
                    position,
                    valid: accepted.contains(&position),
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save(&self, store: &mut dyn SaveStore) -> bool {
        store.save_game(&self.state)
    }

    /// Replace the state with the store's save, if it has one.
    pub fn load(&mut self, store: &dyn SaveStore) -> bool {
        match store.load_game() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    /// Swap in a state: rebuild the occupancy index and restart every
    /// periodic task from the state's time.
    pub fn restore(&mut self, state: GameState) {
        self.state = state;
        self.grid = Occupancy::rebuild(&self.state);
        self.scheduler.reset(self.state.now);
        self.placement.cancel();
        info!(
            now = self.state.now,
            players = self.state.players.len(),
            buildings = self.state.buildings.len(),
            "game restored"
        );
    }

    /// Desync-detection hash of the current state.
    pub fn state_hash(&self) -> u64 {
        serialize::state_hash(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::fixed::FULL_PERCENT;
    use crate::serialize::MemoryStore;
    use crate::test_utils::{game_with_player, run_until};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    #[test]
    fn house_finishes_after_its_build_time() {
        let (mut game, p) = game_with_player(1_000);
        let house = game.place_building(p, "Házikó", at(0, 0), Rotation::None).unwrap();
        assert_eq!(game.state().players[p].money, 500);
        assert!(game.state().buildings[house].construction.is_under_construction());

        run_until(&mut game, 9_000, 1_000);
        assert!(game.state().buildings[house].construction.is_under_construction());
        run_until(&mut game, 10_000, 1_000);
        let c = &game.state().buildings[house].construction;
        assert!(c.is_active());
        assert_eq!(c.progress, FULL_PERCENT);
    }

    #[test]
    fn tick_countdown_in_seconds() {
        let mut game = Game::default();
        assert_eq!(game.seconds_until_tick(), 30);
        game.poll(12_500);
        assert_eq!(game.seconds_until_tick(), 18);
        let report = game.poll(30_000);
        assert!(report.tasks.iter().any(|(_, k)| *k == TaskKind::EconomicTick));
        assert_eq!(game.seconds_until_tick(), 30);
    }

    #[test]
    fn advance_settles_each_tick() {
        let mut game = Game::default();
        let report = game.advance(90_000);
        let ticks = report
            .tasks
            .iter()
            .filter(|(_, k)| *k == TaskKind::EconomicTick)
            .count();
        assert_eq!(ticks, 3);
        assert_eq!(game.state().now, 90_000);
    }

    #[test]
    fn execute_maps_outcomes() {
        let (mut game, p) = game_with_player(5_000);
        let outcome = game
            .execute(Action::PlaceDrag {
                player: p,
                def_name: "Út".into(),
                start: at(0, 0),
                end: at(2, 0),
            })
            .unwrap();
        assert!(matches!(outcome, Outcome::Buildings(ref ids) if ids.len() == 3));

        let err = game.execute(Action::PlaceBuilding {
            player: p,
            def_name: "Házikó".into(),
            origin: at(1, 0),
            rotation: Rotation::None,
        });
        assert_eq!(err, Err(GameError::CellOccupied(at(1, 0))));
    }

    #[test]
    fn queued_actions_run_on_the_next_poll() {
        let (mut game, p) = game_with_player(1_000);
        game.submit(Action::TakeLoan {
            borrower: p,
            source: LoanSource::System,
            amount: 100,
        });
        assert_eq!(game.state().players[p].money, 1_000);
        let report = game.poll(500);
        assert!(matches!(report.actions[..], [Ok(Outcome::Loan(_))]));
        assert_eq!(game.state().players[p].money, 1_100);
        assert_eq!(game.queue().history().len(), 1);
    }

    #[test]
    fn listeners_see_events_after_the_poll() {
        let (mut game, p) = game_with_player(1_000);
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        game.events_mut().on_passive(
            EventKind::BuildingPlaced,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );
        game.place_building(p, "Házikó", at(0, 0), Rotation::None).unwrap();
        // Rejected actions emit nothing.
        let _ = game.place_building(p, "Házikó", at(0, 0), Rotation::None);
        assert_eq!(*seen.borrow(), 0);
        game.poll(1);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn ghost_and_cancel_leave_the_town_untouched() {
        let (mut game, p) = game_with_player(5_000);
        game.place_building(p, "Házikó", at(0, 0), Rotation::None).unwrap();
        game.select_building("Bolt").unwrap();
        game.hover(at(1, 1));
        let ghost = game.ghost();
        assert_eq!(ghost.cells.len(), 4);
        assert_eq!(ghost.valid_count(), 3);
        assert!(!ghost.all_valid());

        let money = game.state().players[p].money;
        game.cancel_placement();
        assert!(!game.placement().is_active());
        assert!(game.ghost().cells.is_empty());
        assert_eq!(game.state().players[p].money, money);
    }

    #[test]
    fn road_drag_through_the_session() {
        let (mut game, p) = game_with_player(5_000);
        game.select_building("Út").unwrap();
        assert!(game.press(p, at(0, 0)).is_none());
        game.hover(at(3, 0));
        assert_eq!(game.ghost().cells.len(), 4);
        let placed = game.release(p, at(3, 0)).unwrap().unwrap();
        assert!(matches!(placed, Outcome::Buildings(ref ids) if ids.len() == 4));
        // The tool stays armed for the next drag.
        assert!(game.placement().is_active());
    }

    #[test]
    fn farmland_ghost_marks_unreachable_cells() {
        let (mut game, p) = game_with_player(50_000);
        let farm = game.place_building(p, "Farm", at(0, 0), Rotation::None).unwrap();
        game.select_farmland(farm).unwrap();
        game.press(p, at(2, 0));
        game.hover(at(6, 0));
        let ghost = game.ghost();
        assert_eq!(ghost.cells.len(), 5);
        assert_eq!(ghost.valid_count(), 1);
        assert!(ghost.cells[0].valid);

        game.cancel_placement();
        game.select_farmland(farm).unwrap();
        game.press(p, at(8, 8));
        game.hover(at(9, 8));
        assert_eq!(game.ghost().valid_count(), 0);
    }

    #[test]
    fn restore_rebuilds_grid_and_clock() {
        let (mut game, p) = game_with_player(5_000);
        game.place_building(p, "Házikó", at(0, 0), Rotation::None).unwrap();
        game.poll(12_000);
        let mut store = MemoryStore::default();
        assert!(game.save(&mut store));

        let mut fresh = Game::default();
        assert!(fresh.load(&store));
        assert!(fresh.is_occupied(at(1, 1)));
        assert_eq!(fresh.state().now, 12_000);
        assert_eq!(fresh.seconds_until_tick(), 30);
        assert_eq!(fresh.state_hash(), game.state_hash());
    }

    #[test]
    fn load_from_empty_store_keeps_state() {
        let (mut game, p) = game_with_player(5_000);
        assert!(!game.load(&MemoryStore::default()));
        assert!(game.state().players.contains_key(p));
    }
}
