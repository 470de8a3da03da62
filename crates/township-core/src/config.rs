use crate::bank::{BankConfig, InterestRate};
use crate::fixed::Millis;
use serde::{Deserialize, Serialize};

/// Tunables for one game. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Interval of the rent and salary settlement.
    pub tick_interval_ms: Millis,
    /// Cadence of crop growth, construction and process completion.
    pub poll_interval_ms: Millis,
    pub starting_money: u64,
    /// Share of the original cost returned on demolition.
    pub demolish_refund_percent: u32,
    /// Time from issue until a loan is due.
    pub loan_term_ms: Millis,
    pub system_bank: BankConfig,
    /// Terms a new bank building starts with.
    pub player_bank: BankConfig,
    /// Capacity of each per-kind event ring buffer.
    pub event_buffer_capacity: usize,
    /// Actions kept in the action history.
    pub action_history: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30_000,
            poll_interval_ms: 1_000,
            starting_money: 1_000,
            demolish_refund_percent: 50,
            loan_term_ms: 7 * 24 * 60 * 60 * 1_000,
            system_bank: BankConfig {
                interest: InterestRate::from_percent(10),
                max_loan: 10_000,
            },
            player_bank: BankConfig {
                interest: InterestRate::from_percent(5),
                max_loan: 2_000,
            },
            event_buffer_capacity: 256,
            action_history: 64,
        }
    }
}

impl GameConfig {
    /// Fix values that would stall the scheduler.
    pub fn sanitized(mut self) -> Self {
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self.demolish_refund_percent = self.demolish_refund_percent.min(100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GameConfig::default();
        assert_eq!(c.tick_interval_ms, 30_000);
        assert_eq!(c.poll_interval_ms, 1_000);
        assert_eq!(c.demolish_refund_percent, 50);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: GameConfig = serde_json::from_str(r#"{"starting_money": 250}"#).unwrap();
        assert_eq!(c.starting_money, 250);
        assert_eq!(c.tick_interval_ms, 30_000);
    }

    #[test]
    fn sanitized_clamps() {
        let c = GameConfig {
            tick_interval_ms: 0,
            demolish_refund_percent: 300,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(c.tick_interval_ms, 1);
        assert_eq!(c.demolish_refund_percent, 100);
    }
}
