//! Township Core -- the economic simulation of a town-building game.
//!
//! Players place buildings on a grid, farm, hire and rent, run a small
//! mill and popcorn production chain, barter on a marketplace and take
//! loans. This crate owns the rules; rendering and input live elsewhere.
//!
//! # Engines
//!
//! Each timed system is a pair of free functions over [`state::GameState`]:
//! `plan(&state, ..)` reads the snapshot and returns a batch, and
//! `apply(&mut state, batch, ..)` writes it in one go.
//!
//! - [`construction`] -- build and demolish timers, refunds.
//! - [`crop`] -- per-tile crop growth, planting and harvest.
//! - [`production`] -- timed conversions in mills and popcorn stands.
//! - [`economy`] -- rent and salary settlement on the economic tick.
//!
//! Player actions ([`placement`], [`tenancy`], [`market`], [`bank`], ...)
//! validate everything before writing, so a rejected action changes
//! nothing.
//!
//! # Key Types
//!
//! - [`game::Game`] -- facade owning state, catalog, scheduler, events and
//!   the occupancy grid.
//! - [`scheduler::Scheduler`] -- virtual clock with periodic tasks.
//! - [`catalog::Catalog`] -- immutable building, crop and recipe
//!   definitions, frozen at startup.
//! - [`action::Action`] -- every player request as a value.
//! - [`event::EventBus`] -- typed game events in per-kind ring buffers.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point for progress percentages.
//! - [`serialize`] -- JSON save blob and versioned bitcode snapshots.

pub mod action;
pub mod bank;
pub mod building;
pub mod catalog;
pub mod config;
pub mod construction;
pub mod crop;
pub mod economy;
pub mod error;
pub mod event;
pub mod fixed;
pub mod game;
pub mod grid;
pub mod id;
pub mod ledger;
pub mod market;
pub mod placement;
pub mod player;
pub mod production;
pub mod resource;
pub mod scheduler;
pub mod serialize;
pub mod state;
pub mod tenancy;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
