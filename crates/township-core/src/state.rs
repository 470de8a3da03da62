//! The full game snapshot.
//!
//! Engines take `&GameState` to plan and `&mut GameState` to apply. The UI
//! reads it directly; nothing here knows about time sources or the grid
//! index.

use crate::bank::{BankConfig, Loan};
use crate::building::Building;
use crate::error::GameError;
use crate::fixed::Millis;
use crate::id::{BuildingId, LoanId, OfferId, PlayerId, ProcessId};
use crate::ledger::Ledger;
use crate::market::MarketOffer;
use crate::player::Player;
use crate::production::ProductionProcess;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Game time of the last poll or action.
    pub now: Millis,
    pub players: SlotMap<PlayerId, Player>,
    pub buildings: SlotMap<BuildingId, Building>,
    pub processes: SlotMap<ProcessId, ProductionProcess>,
    pub offers: SlotMap<OfferId, MarketOffer>,
    pub loans: SlotMap<LoanId, Loan>,
    pub ledger: Ledger,
    pub system_bank: BankConfig,
}

impl GameState {
    pub fn new(system_bank: BankConfig) -> Self {
        Self {
            system_bank,
            ..Default::default()
        }
    }

    pub fn add_player(&mut self, name: impl Into<String>, money: u64) -> PlayerId {
        self.players.insert(Player::new(name, money))
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(id).ok_or(GameError::UnknownPlayer)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players.get_mut(id).ok_or(GameError::UnknownPlayer)
    }

    pub fn building(&self, id: BuildingId) -> Result<&Building, GameError> {
        self.buildings.get(id).ok_or(GameError::UnknownBuilding)
    }

    pub fn building_mut(&mut self, id: BuildingId) -> Result<&mut Building, GameError> {
        self.buildings.get_mut(id).ok_or(GameError::UnknownBuilding)
    }

    /// Sum of all player money.
    pub fn total_money(&self) -> u128 {
        self.players.values().map(|p| p.money as u128).sum()
    }

    /// Buildings owned by `player`.
    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = (BuildingId, &Building)> + '_ {
        self.buildings.iter().filter(move |(_, b)| b.owner == Some(player))
    }

    /// Running processes of one building.
    pub fn processes_of(&self, building: BuildingId) -> impl Iterator<Item = (ProcessId, &ProductionProcess)> + '_ {
        self.processes
            .iter()
            .filter(move |(_, p)| p.building == building)
    }

    /// Loans `player` has not yet paid back.
    pub fn open_loans_of(&self, player: PlayerId) -> impl Iterator<Item = (LoanId, &Loan)> + '_ {
        self.loans
            .iter()
            .filter(move |(_, l)| l.borrower == player && !l.is_settled())
    }
}
