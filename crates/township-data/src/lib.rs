//! Load a town's catalog and game configuration from data files.
//!
//! A data directory holds up to four files, each in RON, TOML or JSON:
//! `buildings` (required), `crops`, `recipes` and `config`. Missing optional
//! files fall back to the stock definitions.

pub mod loader;
pub mod schema;

pub use loader::{load_game_data, DataLoadError, GameData};
