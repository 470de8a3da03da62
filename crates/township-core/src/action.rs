//! Typed player actions and the action queue.
//!
//! Every mutation a client (UI, script, network peer) can ask for is an
//! [`Action`]. [`crate::game::Game::execute`] applies one immediately; an
//! [`ActionQueue`] collects them between polls so a host can apply them in
//! submission order at a poll boundary and keep a bounded history for
//! debugging.

use crate::bank::{BankConfig, LoanSource};
use crate::crop::CropKind;
use crate::fixed::Millis;
use crate::id::{BuildingId, LoanId, OfferId, PlayerId, ProcessId};
use crate::resource::{Asset, Resource};
use serde::{Deserialize, Serialize};
use township_spatial::{GridPosition, Rotation};

// ---------------------------------------------------------------------------
// Action enum
// ---------------------------------------------------------------------------

/// A single request from a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Place one building with its top-left corner at `origin`.
    PlaceBuilding {
        player: PlayerId,
        def_name: String,
        origin: GridPosition,
        rotation: Rotation,
    },
    /// Drag-place single-cell buildings (roads) over a rectangle.
    PlaceDrag {
        player: PlayerId,
        def_name: String,
        start: GridPosition,
        end: GridPosition,
    },
    /// Drag farmland tiles for a farm.
    PlaceFarmland {
        player: PlayerId,
        farm: BuildingId,
        start: GridPosition,
        end: GridPosition,
    },
    Demolish {
        player: PlayerId,
        building: BuildingId,
    },
    DemolishFarmland {
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
    },
    Plant {
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
        crop: CropKind,
    },
    Harvest {
        player: PlayerId,
        farm: BuildingId,
        position: GridPosition,
    },
    StartProcess {
        building: BuildingId,
        quantity: u32,
    },
    DepositStock {
        player: PlayerId,
        building: BuildingId,
        resource: Resource,
        quantity: u32,
    },
    WithdrawStock {
        player: PlayerId,
        building: BuildingId,
        resource: Resource,
        quantity: u32,
    },
    ApplyForJob {
        player: PlayerId,
        building: BuildingId,
    },
    QuitJob {
        player: PlayerId,
        building: BuildingId,
    },
    RentHouse {
        player: PlayerId,
        house: BuildingId,
    },
    MoveOut {
        player: PlayerId,
        house: BuildingId,
    },
    SetRent {
        player: PlayerId,
        building: BuildingId,
        rent: u64,
    },
    SetSalary {
        player: PlayerId,
        building: BuildingId,
        salary: u64,
    },
    CreateOffer {
        seller: PlayerId,
        selling: Asset,
        selling_quantity: u64,
        buying: Asset,
        buying_quantity: u64,
    },
    AcceptOffer {
        buyer: PlayerId,
        offer: OfferId,
    },
    CancelOffer {
        player: PlayerId,
        offer: OfferId,
    },
    TakeLoan {
        borrower: PlayerId,
        source: LoanSource,
        amount: u64,
    },
    RepayLoan {
        borrower: PlayerId,
        loan: LoanId,
        amount: u64,
    },
    ConfigureBank {
        player: PlayerId,
        bank: BuildingId,
        terms: BankConfig,
    },
}

impl Action {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::PlaceBuilding { .. } => "place_building",
            Action::PlaceDrag { .. } => "place_drag",
            Action::PlaceFarmland { .. } => "place_farmland",
            Action::Demolish { .. } => "demolish",
            Action::DemolishFarmland { .. } => "demolish_farmland",
            Action::Plant { .. } => "plant",
            Action::Harvest { .. } => "harvest",
            Action::StartProcess { .. } => "start_process",
            Action::DepositStock { .. } => "deposit_stock",
            Action::WithdrawStock { .. } => "withdraw_stock",
            Action::ApplyForJob { .. } => "apply_for_job",
            Action::QuitJob { .. } => "quit_job",
            Action::RentHouse { .. } => "rent_house",
            Action::MoveOut { .. } => "move_out",
            Action::SetRent { .. } => "set_rent",
            Action::SetSalary { .. } => "set_salary",
            Action::CreateOffer { .. } => "create_offer",
            Action::AcceptOffer { .. } => "accept_offer",
            Action::CancelOffer { .. } => "cancel_offer",
            Action::TakeLoan { .. } => "take_loan",
            Action::RepayLoan { .. } => "repay_loan",
            Action::ConfigureBank { .. } => "configure_bank",
        }
    }

    /// The player on whose behalf the action runs, if any.
    pub fn actor(&self) -> Option<PlayerId> {
        match *self {
            Action::StartProcess { .. } => None,
            Action::PlaceBuilding { player, .. }
            | Action::PlaceDrag { player, .. }
            | Action::PlaceFarmland { player, .. }
            | Action::Demolish { player, .. }
            | Action::DemolishFarmland { player, .. }
            | Action::Plant { player, .. }
            | Action::Harvest { player, .. }
            | Action::DepositStock { player, .. }
            | Action::WithdrawStock { player, .. }
            | Action::ApplyForJob { player, .. }
            | Action::QuitJob { player, .. }
            | Action::RentHouse { player, .. }
            | Action::MoveOut { player, .. }
            | Action::SetRent { player, .. }
            | Action::SetSalary { player, .. }
            | Action::CancelOffer { player, .. }
            | Action::ConfigureBank { player, .. } => Some(player),
            Action::CreateOffer { seller, .. } => Some(seller),
            Action::AcceptOffer { buyer, .. } => Some(buyer),
            Action::TakeLoan { borrower, .. } | Action::RepayLoan { borrower, .. } => {
                Some(borrower)
            }
        }
    }
}

/// What a successful action produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The action changed state and has nothing to report.
    Done,
    Building(BuildingId),
    Buildings(Vec<BuildingId>),
    Tiles(Vec<GridPosition>),
    Harvested { resource: Resource, quantity: u32 },
    Process(ProcessId),
    Offer(OfferId),
    Loan(LoanId),
    /// Amount still owed after a repayment.
    Remaining(u64),
}

// ---------------------------------------------------------------------------
// ActionQueue
// ---------------------------------------------------------------------------

/// Actions waiting for the next poll boundary.
///
/// Keeps up to `max_history` drained actions, stamped with the game time
/// they were drained at.
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    pending: Vec<Action>,
    history: Vec<(Millis, Action)>,
    /// 0 = no history.
    max_history: usize,
}

impl ActionQueue {
    /// An empty queue with no history tracking.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, action: Action) {
        self.pending.push(action);
    }

    pub fn push_batch(&mut self, actions: impl IntoIterator<Item = Action>) {
        self.pending.extend(actions);
    }

    /// Take every pending action in submission order, recording them in
    /// the history at time `at`.
    pub fn drain(&mut self, at: Millis) -> Vec<Action> {
        let actions: Vec<Action> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            self.history
                .extend(actions.iter().cloned().map(|a| (at, a)));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        actions
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drained actions, oldest first.
    pub fn history(&self) -> &[(Millis, Action)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
