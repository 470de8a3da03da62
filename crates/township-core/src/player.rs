use crate::error::GameError;
use crate::id::BuildingId;
use crate::resource::Inventory;
use serde::{Deserialize, Serialize};

/// A participant in the town economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Never negative.
    pub money: u64,
    pub inventory: Inventory,
    /// `None` means unemployed.
    pub workplace: Option<BuildingId>,
    /// Salary agreed when the job was taken.
    pub workplace_salary: u64,
    /// House this player rents, if any.
    #[serde(default)]
    pub home: Option<BuildingId>,
}

impl Player {
    pub fn new(name: impl Into<String>, money: u64) -> Self {
        Self {
            name: name.into(),
            money,
            inventory: Inventory::new(),
            workplace: None,
            workplace_salary: 0,
            home: None,
        }
    }

    pub fn is_employed(&self) -> bool {
        self.workplace.is_some()
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        self.money >= amount
    }

    pub fn credit(&mut self, amount: u64) {
        self.money = self.money.saturating_add(amount);
    }

    /// Take money, or change nothing and fail.
    pub fn debit(&mut self, amount: u64) -> Result<(), GameError> {
        self.money = self
            .money
            .checked_sub(amount)
            .ok_or(GameError::InsufficientFunds)?;
        Ok(())
    }
}
