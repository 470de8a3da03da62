//! Saving and restoring game state.
//!
//! Two formats:
//!
//! - The save blob: plain JSON of [`GameState`], no schema version check.
//!   Hosts reach it through the [`SaveStore`] collaborator.
//! - Snapshots: `bitcode` with a versioned header, for fast in-memory
//!   copies and peer comparison. [`state_hash`] gives a cheap desync check.

use crate::fixed::Millis;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a town snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x544F_574E;

/// Current snapshot format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// JSON save blob
// ---------------------------------------------------------------------------

pub fn save_json(state: &GameState) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(state)?)
}

pub fn load_json(blob: &str) -> Result<GameState, DeserializeError> {
    Ok(serde_json::from_str(blob)?)
}

/// Where the host keeps the save blob.
pub trait SaveStore {
    /// Persist `state`. Returns false if it could not be written.
    fn save_game(&mut self, state: &GameState) -> bool;
    /// The last saved state, or `None` if there is none or it is unreadable.
    fn load_game(&self) -> Option<GameState>;
}

/// Keeps the blob in memory. Handy for tests and quick-save slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl SaveStore for MemoryStore {
    fn save_game(&mut self, state: &GameState) -> bool {
        match save_json(state) {
            Ok(blob) => {
                self.blob = Some(blob);
                true
            }
            Err(err) => {
                warn!(%err, "save failed");
                false
            }
        }
    }

    fn load_game(&self) -> Option<GameState> {
        let blob = self.blob.as_deref()?;
        load_json(blob)
            .map_err(|err| warn!(%err, "stored save is unreadable"))
            .ok()
    }
}

/// Writes the blob to a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SaveStore for JsonFileStore {
    fn save_game(&mut self, state: &GameState) -> bool {
        let blob = match save_json(state) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(%err, "save failed");
                return false;
            }
        };
        match std::fs::write(&self.path, blob) {
            Ok(()) => {
                debug!(path = %self.path.display(), "game saved");
                true
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not write save");
                false
            }
        }
    }

    fn load_game(&self) -> Option<GameState> {
        let blob = match std::fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not read save");
                return None;
            }
        };
        match load_json(&blob) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "save is unreadable");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Binary snapshots
// ---------------------------------------------------------------------------

/// Header stored in front of every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Game time the snapshot was taken at.
    pub at: Millis,
}

impl SnapshotHeader {
    pub fn new(at: Millis) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            at,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct GameSnapshot {
    header: SnapshotHeader,
    state: GameState,
}

pub fn take_snapshot(state: &GameState) -> Result<Vec<u8>, SerializeError> {
    let snapshot = GameSnapshot {
        header: SnapshotHeader::new(state.now),
        state: state.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode a snapshot, checking its header before handing back the state.
pub fn restore_snapshot(data: &[u8]) -> Result<GameState, DeserializeError> {
    let snapshot: GameSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.state)
}

/// Read the header without validating it. bitcode cannot decode a prefix,
/// so the whole snapshot is decoded.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: GameSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic hash for desync detection.
///
/// FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of everything that affects future play: time, balances,
/// inventories, buildings, tiles, processes, offers and loans.
pub fn state_hash(state: &GameState) -> u64 {
    let mut h = StateHash::new();
    h.write_u64(state.now);

    for (_, p) in &state.players {
        h.write(p.name.as_bytes());
        h.write_u64(p.money);
        for (resource, quantity) in p.inventory.iter() {
            h.write_u32(resource as u32);
            h.write_u32(quantity);
        }
        h.write_u64(p.workplace_salary);
    }

    for (_, b) in &state.buildings {
        h.write(b.name.as_bytes());
        h.write_i32(b.position.x);
        h.write_i32(b.position.y);
        h.write_u64(b.construction.eta);
        h.write(&b.construction.progress.to_bits().to_le_bytes());
        h.write_u64(b.terms.rent());
        h.write_u64(b.terms.salary());
        h.write_u32(b.employees.len() as u32);
        h.write_u32(b.residents.len() as u32);
        for (resource, quantity) in b.stock.iter() {
            h.write_u32(resource as u32);
            h.write_u32(quantity);
        }
        for tile in &b.farmland {
            h.write_i32(tile.position.x);
            h.write_i32(tile.position.y);
            h.write_u32(tile.crop.map_or(0, |c| c as u32 + 1));
            h.write(&tile.progress.to_bits().to_le_bytes());
        }
    }

    for (_, p) in &state.processes {
        h.write_u64(p.ends_at());
        h.write_u32(p.output_produced);
    }
    for (_, o) in &state.offers {
        h.write_u64(o.selling_quantity);
        h.write_u64(o.buying_quantity);
    }
    for (_, l) in &state.loans {
        h.write_u64(l.remaining);
        h.write_u64(l.due);
    }
    h.write_u64(state.ledger.len() as u64);
    h.finish()
}
