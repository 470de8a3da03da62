//! Loans from the system bank or from player-owned bank buildings.

use crate::building::BuildingKind;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::fixed::Millis;
use crate::id::{BuildingId, LoanId, PlayerId};
use crate::ledger::TransactionKind;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Interest in basis points: 1250 is 12.5 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct InterestRate(pub u32);

impl InterestRate {
    pub const fn from_percent(percent: u32) -> Self {
        Self(percent.saturating_mul(100))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    /// Interest owed on `principal`, floored.
    pub fn interest_on(self, principal: u64) -> u64 {
        (principal as u128 * self.0 as u128 / 10_000).min(u64::MAX as u128) as u64
    }
}

impl fmt::Display for InterestRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Lending terms of the system bank or a bank building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    pub interest: InterestRate,
    pub max_loan: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            interest: InterestRate::from_percent(10),
            max_loan: 5_000,
        }
    }
}

/// Who receives repayments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lender {
    System,
    Player(PlayerId),
}

/// Where a loan request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanSource {
    System,
    Bank(BuildingId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub borrower: PlayerId,
    pub lender: Lender,
    pub source: LoanSource,
    pub interest: InterestRate,
    pub principal: u64,
    pub total_repayment: u64,
    pub remaining: u64,
    pub issued_at: Millis,
    pub due: Millis,
}

impl Loan {
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }

    pub fn is_overdue(&self, now: Millis) -> bool {
        !self.is_settled() && now > self.due
    }
}

/// `floor(principal * (1 + rate / 100))`.
pub fn total_repayment(principal: u64, interest: InterestRate) -> u64 {
    principal.saturating_add(interest.interest_on(principal))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

pub fn take_loan(
    state: &mut GameState,
    config: &GameConfig,
    borrower: PlayerId,
    source: LoanSource,
    amount: u64,
    events: &mut Vec<GameEvent>,
) -> Result<LoanId, GameError> {
    if amount == 0 {
        return Err(GameError::InvalidAmount);
    }
    state.player(borrower)?;
    let now = state.now;

    let (lender, terms, lender_name) = match source {
        LoanSource::System => (Lender::System, state.system_bank, "Bank".to_string()),
        LoanSource::Bank(id) => {
            let bank = state.building(id)?;
            if bank.kind != BuildingKind::Bank {
                return Err(GameError::Unsupported);
            }
            if !bank.is_active() {
                return Err(GameError::UnderConstruction);
            }
            let owner = bank.owner.ok_or(GameError::Unsupported)?;
            if owner == borrower {
                return Err(GameError::SelfLending);
            }
            let terms = bank.bank.ok_or(GameError::Unsupported)?;
            (Lender::Player(owner), terms, bank.name.clone())
        }
    };

    if amount > terms.max_loan {
        return Err(GameError::LoanLimitExceeded {
            max: terms.max_loan,
        });
    }

    if let Lender::Player(owner) = lender {
        let borrower_name = state.player(borrower)?.name.clone();
        state.player_mut(owner)?.debit(amount)?;
        state.ledger.record(
            owner,
            TransactionKind::Expense,
            format!("Loan to {borrower_name}"),
            amount,
            now,
        );
    }
    state.player_mut(borrower)?.credit(amount);
    state.ledger.record(
        borrower,
        TransactionKind::Income,
        format!("Loan from {lender_name}"),
        amount,
        now,
    );

    let total = total_repayment(amount, terms.interest);
    let loan = state.loans.insert(Loan {
        borrower,
        lender,
        source,
        interest: terms.interest,
        principal: amount,
        total_repayment: total,
        remaining: total,
        issued_at: now,
        due: now.saturating_add(config.loan_term_ms),
    });
    debug!(?loan, ?borrower, amount, total, "loan issued");
    events.push(GameEvent::LoanIssued {
        loan,
        borrower,
        amount,
    });
    Ok(loan)
}

/// Pay back up to `amount`. Returns what is still owed.
pub fn repay(
    state: &mut GameState,
    borrower: PlayerId,
    loan_id: LoanId,
    amount: u64,
    events: &mut Vec<GameEvent>,
) -> Result<u64, GameError> {
    if amount == 0 {
        return Err(GameError::InvalidAmount);
    }
    let now = state.now;
    let loan = state.loans.get(loan_id).ok_or(GameError::UnknownLoan)?;
    if loan.borrower != borrower {
        return Err(GameError::NotOwner);
    }
    if loan.is_settled() {
        return Err(GameError::InvalidAmount);
    }
    let pay = amount.min(loan.remaining);
    let lender = loan.lender;

    state.player_mut(borrower)?.debit(pay)?;
    state
        .ledger
        .record(borrower, TransactionKind::Expense, "Loan repayment", pay, now);
    if let Lender::Player(owner) = lender {
        if let Some(p) = state.players.get_mut(owner) {
            p.credit(pay);
            state
                .ledger
                .record(owner, TransactionKind::Income, "Loan repayment received", pay, now);
        }
    }

    let Some(loan) = state.loans.get_mut(loan_id) else {
        return Err(GameError::UnknownLoan);
    };
    loan.remaining -= pay;
    let remaining = loan.remaining;
    if remaining == 0 {
        debug!(loan = ?loan_id, "loan settled");
        events.push(GameEvent::LoanSettled { loan: loan_id });
    }
    Ok(remaining)
}

/// Change the lending terms of a bank building. Owner only.
pub fn configure_bank(
    state: &mut GameState,
    player: PlayerId,
    bank: BuildingId,
    terms: BankConfig,
) -> Result<(), GameError> {
    let b = state.building_mut(bank)?;
    if b.kind != BuildingKind::Bank {
        return Err(GameError::Unsupported);
    }
    if !b.is_owned_by(player) {
        return Err(GameError::NotOwner);
    }
    b.bank = Some(terms);
    debug!(?bank, interest = %terms.interest, max_loan = terms.max_loan, "bank configured");
    Ok(())
}
