//! Rent and salary settlement on the economic tick.
//!
//! [`settle`] reads the state and produces a [`TickSettlement`]: one money
//! delta per player plus the transactions to record. [`apply`] writes it in
//! one batch and clamps every balance at zero.

use crate::building::Terms;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::Millis;
use crate::id::{BuildingId, PlayerId};
use crate::ledger::TransactionKind;
use crate::state::GameState;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A transaction waiting to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub player: PlayerId,
    pub kind: TransactionKind,
    pub description: String,
    pub amount: u64,
}

/// Everything one economic tick changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSettlement {
    pub at: Millis,
    /// Net money change per player.
    pub deltas: BTreeMap<PlayerId, i128>,
    pub transactions: Vec<PendingTransaction>,
    pub rent_paid: u64,
    pub salaries_paid: u64,
    /// Houses whose tenant could not cover the rent.
    pub skipped: Vec<(BuildingId, PlayerId)>,
}

impl TickSettlement {
    fn add(&mut self, player: PlayerId, delta: i128) {
        *self.deltas.entry(player).or_insert(0) += delta;
    }

    fn record(&mut self, player: PlayerId, kind: TransactionKind, description: String, amount: u64) {
        self.transactions.push(PendingTransaction {
            player,
            kind,
            description,
            amount,
        });
    }
}

/// Compute rent and salary movements against the balances at tick start.
pub fn settle(state: &GameState) -> TickSettlement {
    let mut s = TickSettlement {
        at: state.now,
        ..Default::default()
    };

    for (id, building) in &state.buildings {
        if !building.is_active() {
            continue;
        }
        match building.terms {
            Terms::Rent(rent) if rent > 0 => {
                let (Some(tenant), Some(owner)) = (building.renter, building.owner) else {
                    continue;
                };
                if tenant == owner {
                    continue;
                }
                let Some(funds) = state.players.get(tenant).map(|p| p.money) else {
                    continue;
                };
                if !state.players.contains_key(owner) {
                    continue;
                }
                if funds < rent {
                    debug!(house = ?id, ?tenant, rent, funds, "rent skipped");
                    s.skipped.push((id, tenant));
                    continue;
                }
                s.add(tenant, -(rent as i128));
                s.add(owner, rent as i128);
                s.record(
                    tenant,
                    TransactionKind::Expense,
                    format!("Rent: {}", building.name),
                    rent,
                );
                s.record(
                    owner,
                    TransactionKind::Income,
                    format!("Rent income: {}", building.name),
                    rent,
                );
                s.rent_paid += rent;
            }
            Terms::Salary(salary) if salary > 0 => {
                for &employee in &building.employees {
                    if !state.players.contains_key(employee) {
                        continue;
                    }
                    s.add(employee, salary as i128);
                    s.record(
                        employee,
                        TransactionKind::Income,
                        format!("Salary: {}", building.name),
                        salary,
                    );
                    s.salaries_paid += salary;
                }
            }
            _ => {}
        }
    }
    s
}

/// Apply a settlement in one batch. Balances never go below zero.
pub fn apply(state: &mut GameState, settlement: TickSettlement, events: &mut Vec<GameEvent>) {
    for (&player, &delta) in &settlement.deltas {
        if let Some(p) = state.players.get_mut(player) {
            let next = (p.money as i128 + delta).clamp(0, u64::MAX as i128);
            p.money = next as u64;
        }
    }
    for t in settlement.transactions {
        state
            .ledger
            .record(t.player, t.kind, t.description, t.amount, settlement.at);
    }
    for &(house, tenant) in &settlement.skipped {
        events.push(GameEvent::RentSkipped { house, tenant });
    }

    info!(
        at = settlement.at,
        rent = settlement.rent_paid,
        salaries = settlement.salaries_paid,
        skipped = settlement.skipped.len(),
        "economic tick settled"
    );
    events.push(GameEvent::TickSettled {
        at: settlement.at,
        rent_paid: settlement.rent_paid,
        salaries_paid: settlement.salaries_paid,
        rents_skipped: settlement.skipped.len() as u32,
    });
}

// ---------------------------------------------------------------------------
// Owner actions
// ---------------------------------------------------------------------------

pub fn set_rent(
    state: &mut GameState,
    player: PlayerId,
    building: BuildingId,
    rent: u64,
) -> Result<(), GameError> {
    let b = state.building_mut(building)?;
    if !b.capabilities().rentable {
        return Err(GameError::Unsupported);
    }
    if !b.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    if rent == 0 {
        return Err(GameError::InvalidAmount);
    }
    b.terms = Terms::Rent(rent);
    Ok(())
}

/// Change the salary of an employer. Current employees get the new salary.
pub fn set_salary(
    state: &mut GameState,
    player: PlayerId,
    building: BuildingId,
    salary: u64,
) -> Result<(), GameError> {
    let b = state.building_mut(building)?;
    if !b.capabilities().employable {
        return Err(GameError::Unsupported);
    }
    if !b.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    if salary == 0 {
        return Err(GameError::InvalidAmount);
    }
    b.terms = Terms::Salary(salary);
    let employees = b.employees.clone();
    for e in employees {
        if let Some(p) = state.players.get_mut(e) {
            p.workplace_salary = salary;
        }
    }
    Ok(())
}
