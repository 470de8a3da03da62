//! Append-only transaction log.

use crate::fixed::Millis;
use crate::id::{PlayerId, TransactionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// One money movement as seen by one player. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub player: PlayerId,
    pub kind: TransactionKind,
    pub description: String,
    /// Always positive.
    pub amount: u64,
    pub timestamp: Millis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<Transaction>,
    next_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction. Zero amounts are not recorded.
    pub fn record(
        &mut self,
        player: PlayerId,
        kind: TransactionKind,
        description: impl Into<String>,
        amount: u64,
        timestamp: Millis,
    ) -> Option<TransactionId> {
        if amount == 0 {
            return None;
        }
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Transaction {
            id,
            player,
            kind,
            description: description.into(),
            amount,
            timestamp,
        });
        Some(id)
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn for_player(&self, player: PlayerId) -> impl Iterator<Item = &Transaction> + '_ {
        self.entries.iter().filter(move |t| t.player == player)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn ids_are_sequential_and_zero_skipped() {
        let mut players = SlotMap::<PlayerId, ()>::with_key();
        let p = players.insert(());
        let mut ledger = Ledger::new();

        assert_eq!(
            ledger.record(p, TransactionKind::Income, "Salary", 10, 0),
            Some(TransactionId(0))
        );
        assert_eq!(ledger.record(p, TransactionKind::Expense, "Nothing", 0, 0), None);
        assert_eq!(
            ledger.record(p, TransactionKind::Expense, "Rent", 5, 1),
            Some(TransactionId(1))
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn filter_by_player() {
        let mut players = SlotMap::<PlayerId, ()>::with_key();
        let a = players.insert(());
        let b = players.insert(());
        let mut ledger = Ledger::new();
        ledger.record(a, TransactionKind::Income, "x", 1, 0);
        ledger.record(b, TransactionKind::Income, "y", 2, 0);
        ledger.record(a, TransactionKind::Expense, "z", 3, 0);

        let amounts: Vec<u64> = ledger.for_player(a).map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1, 3]);
    }
}
