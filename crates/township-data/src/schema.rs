//! Serde data file structs for town content.
//!
//! These mirror the catalog definitions but refer to kinds, resources and
//! crops by their snake_case names. The loader resolves the names into
//! engine types.

use serde::Deserialize;

// ===========================================================================
// Buildings
// ===========================================================================

/// A building definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    /// Display name, unique across the file.
    pub name: String,
    /// Building kind, e.g. `"house"` or `"popcorn_stand"`.
    pub kind: String,
    #[serde(default = "default_footprint")]
    pub footprint: FootprintData,
    #[serde(default)]
    pub cost: u64,
    /// `(resource, quantity)` pairs consumed on placement.
    #[serde(default)]
    pub materials: Vec<(String, u32)>,
    #[serde(default)]
    pub capacity: u32,
    /// Default rent or salary.
    #[serde(default)]
    pub price: u64,
    /// Milliseconds.
    #[serde(default)]
    pub build_time: u64,
    /// Milliseconds; half the build time when absent.
    #[serde(default)]
    pub demolish_time: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

fn default_footprint() -> FootprintData {
    FootprintData {
        width: 1,
        height: 1,
    }
}

// ===========================================================================
// Crops and recipes
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CropData {
    /// Crop name, `"wheat"` or `"corn"`.
    pub name: String,
    pub growth_time: u64,
    #[serde(default = "default_yield")]
    pub yield_quantity: u32,
}

fn default_yield() -> u32 {
    1
}

/// A conversion run by a production building kind.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub building: String,
    pub input: (String, u32),
    pub output: (String, u32),
    /// Milliseconds per unit.
    pub unit_time: u64,
}

/// Cost and timing of a farmland tile.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FarmlandData {
    pub cost: u64,
    pub build_time: u64,
    #[serde(default)]
    pub demolish_time: Option<u64>,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// Wrapper for a list of buildings in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlBuildings {
    pub buildings: Vec<BuildingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlCrops {
    pub crops: Vec<CropData>,
}

// ===========================================================================
// Tests
// ===========================================================================
