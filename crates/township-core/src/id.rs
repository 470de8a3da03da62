use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a player.
    pub struct PlayerId;

    /// Identifies a placed building (roads included).
    pub struct BuildingId;

    /// Identifies a running production process.
    pub struct ProcessId;

    /// Identifies an open marketplace offer.
    pub struct OfferId;

    /// Identifies a loan, settled or outstanding.
    pub struct LoanId;
}

/// Identifies a building definition in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefId(pub u32);

/// Identifies an entry in the transaction log. Assigned sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);
