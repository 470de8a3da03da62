//! Buildings, their kinds and capabilities, and farmland tiles.

use crate::bank::BankConfig;
use crate::construction::Construction;
use crate::crop::CropKind;
use crate::fixed::Fixed64;
use crate::id::{DefId, PlayerId};
use crate::resource::Inventory;
use serde::{Deserialize, Serialize};
use township_spatial::{BuildingFootprint, GridPosition, GridRect, Rotation};

// ---------------------------------------------------------------------------
// Kinds and capabilities
// ---------------------------------------------------------------------------

/// Every kind of building a player can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    Office,
    Forestry,
    Farm,
    Road,
    Shop,
    Mill,
    PopcornStand,
    Bank,
}

/// What a building kind can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Can be rented by one tenant; pays rent on the economic tick.
    pub rentable: bool,
    /// Hires employees; pays salaries on the economic tick.
    pub employable: bool,
    /// Holds a stock inventory and runs production processes.
    pub has_stock: bool,
    /// Owns farmland tiles.
    pub has_farmland: bool,
    /// Issues loans from a per-building bank config.
    pub lends: bool,
    /// Placed by dragging a rectangle of single cells.
    pub drag_placed: bool,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 9] = [
        BuildingKind::House,
        BuildingKind::Office,
        BuildingKind::Forestry,
        BuildingKind::Farm,
        BuildingKind::Road,
        BuildingKind::Shop,
        BuildingKind::Mill,
        BuildingKind::PopcornStand,
        BuildingKind::Bank,
    ];

    pub fn capabilities(self) -> Capabilities {
        let base = Capabilities::default();
        match self {
            BuildingKind::House => Capabilities {
                rentable: true,
                ..base
            },
            BuildingKind::Office | BuildingKind::Forestry | BuildingKind::Shop => Capabilities {
                employable: true,
                ..base
            },
            BuildingKind::Farm => Capabilities {
                employable: true,
                has_farmland: true,
                ..base
            },
            BuildingKind::Road => Capabilities {
                drag_placed: true,
                ..base
            },
            BuildingKind::Mill | BuildingKind::PopcornStand => Capabilities {
                employable: true,
                has_stock: true,
                ..base
            },
            BuildingKind::Bank => Capabilities {
                employable: true,
                lends: true,
                ..base
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuildingKind::House => "house",
            BuildingKind::Office => "office",
            BuildingKind::Forestry => "forestry",
            BuildingKind::Farm => "farm",
            BuildingKind::Road => "road",
            BuildingKind::Shop => "shop",
            BuildingKind::Mill => "mill",
            BuildingKind::PopcornStand => "popcorn_stand",
            BuildingKind::Bank => "bank",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

// ---------------------------------------------------------------------------
// Economic terms
// ---------------------------------------------------------------------------

/// Rent for rentable buildings, salary for employers. Never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terms {
    #[default]
    None,
    Rent(u64),
    Salary(u64),
}

impl Terms {
    /// Default terms for a kind, given the catalog's price.
    pub fn for_kind(kind: BuildingKind, price: u64) -> Self {
        let caps = kind.capabilities();
        if caps.rentable {
            Terms::Rent(price)
        } else if caps.employable {
            Terms::Salary(price)
        } else {
            Terms::None
        }
    }

    pub fn rent(&self) -> u64 {
        match self {
            Terms::Rent(r) => *r,
            _ => 0,
        }
    }

    pub fn salary(&self) -> u64 {
        match self {
            Terms::Salary(s) => *s,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Farmland
// ---------------------------------------------------------------------------

/// One cell of farmland belonging to a farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmlandTile {
    pub position: GridPosition,
    pub owner: Option<PlayerId>,
    pub crop: Option<CropKind>,
    /// Growth in percent, `0..=100`.
    pub progress: Fixed64,
    pub construction: Construction,
    /// Price paid for this tile, the base for the demolition refund.
    pub cost: u64,
}

impl FarmlandTile {
    pub fn is_ready(&self) -> bool {
        self.crop.is_some() && self.progress >= crate::fixed::FULL_PERCENT
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A placed building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub def: DefId,
    pub kind: BuildingKind,
    /// Display name from the catalog ("Házikó", "Malom", ...).
    pub name: String,
    pub position: GridPosition,
    /// Unrotated footprint from the catalog.
    pub footprint: BuildingFootprint,
    pub rotation: Rotation,
    pub capacity: u32,
    pub owner: Option<PlayerId>,
    pub renter: Option<PlayerId>,
    pub residents: Vec<PlayerId>,
    pub employees: Vec<PlayerId>,
    pub terms: Terms,
    pub construction: Construction,
    /// Money paid at placement, the base for the demolition refund.
    pub cost: u64,
    /// Production stock for mills and popcorn stands.
    #[serde(default)]
    pub stock: Inventory,
    /// Farmland tiles of a farm, in placement order.
    #[serde(default)]
    pub farmland: Vec<FarmlandTile>,
    #[serde(default)]
    pub bank: Option<BankConfig>,
}

impl Building {
    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Footprint after rotation, as it sits on the grid.
    pub fn effective_footprint(&self) -> BuildingFootprint {
        self.footprint.rotated(self.rotation)
    }

    pub fn bounds(&self) -> GridRect {
        self.effective_footprint().rect(self.position)
    }

    pub fn is_active(&self) -> bool {
        self.construction.is_active()
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    pub fn has_vacancy(&self) -> bool {
        (self.employees.len() as u32) < self.capacity
    }

    pub fn tile(&self, position: GridPosition) -> Option<&FarmlandTile> {
        self.farmland.iter().find(|t| t.position == position)
    }

    pub fn tile_mut(&mut self, position: GridPosition) -> Option<&mut FarmlandTile> {
        self.farmland.iter_mut().find(|t| t.position == position)
    }
}
