//! Resources, inventories, and tradeable assets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A kind of countable good held by players and buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Brick,
    Stone,
    WheatSeed,
    CornSeed,
    Wheat,
    Corn,
    Flour,
    Popcorn,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Stone,
        Resource::WheatSeed,
        Resource::CornSeed,
        Resource::Wheat,
        Resource::Corn,
        Resource::Flour,
        Resource::Popcorn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Brick => "brick",
            Resource::Stone => "stone",
            Resource::WheatSeed => "wheat_seed",
            Resource::CornSeed => "corn_seed",
            Resource::Wheat => "wheat",
            Resource::Corn => "corn",
            Resource::Flour => "flour",
            Resource::Popcorn => "popcorn",
        }
    }

    /// Look up a resource by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counts of resources. Missing entries are zero; zero entries are pruned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    counts: BTreeMap<Resource, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from `(resource, count)` pairs. Duplicates add up.
    pub fn from_counts(counts: impl IntoIterator<Item = (Resource, u32)>) -> Self {
        let mut inv = Self::new();
        for (resource, count) in counts {
            inv.add(resource, count);
        }
        inv
    }

    pub fn quantity(&self, resource: Resource) -> u32 {
        self.counts.get(&resource).copied().unwrap_or(0)
    }

    pub fn has(&self, resource: Resource, quantity: u32) -> bool {
        self.quantity(resource) >= quantity
    }

    /// Add items. Saturates at `u32::MAX`.
    pub fn add(&mut self, resource: Resource, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let entry = self.counts.entry(resource).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Remove exactly `quantity` items. Removes nothing and returns false when
    /// the inventory holds fewer.
    #[must_use = "false means nothing was removed"]
    pub fn try_remove(&mut self, resource: Resource, quantity: u32) -> bool {
        let held = self.quantity(resource);
        if held < quantity {
            return false;
        }
        if held == quantity {
            self.counts.remove(&resource);
        } else {
            self.counts.insert(resource, held - quantity);
        }
        true
    }

    /// True when every `(resource, count)` requirement is covered.
    pub fn covers(&self, requirements: &[(Resource, u32)]) -> bool {
        let mut needed: BTreeMap<Resource, u64> = BTreeMap::new();
        for &(resource, count) in requirements {
            *needed.entry(resource).or_insert(0) += count as u64;
        }
        needed
            .into_iter()
            .all(|(resource, count)| self.quantity(resource) as u64 >= count)
    }

    /// First requirement this inventory cannot cover, if any.
    pub fn first_shortfall(&self, requirements: &[(Resource, u32)]) -> Option<Resource> {
        requirements
            .iter()
            .find(|&&(resource, count)| !self.has(resource, count))
            .map(|&(resource, _)| resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        self.counts.iter().map(|(&r, &c)| (r, c))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Either side of a marketplace trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Money,
    Resource(Resource),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Money => f.write_str("money"),
            Asset::Resource(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resource_is_zero() {
        let inv = Inventory::new();
        assert_eq!(inv.quantity(Resource::Wood), 0);
        assert!(inv.has(Resource::Wood, 0));
        assert!(!inv.has(Resource::Wood, 1));
    }

    #[test]
    fn try_remove_is_all_or_nothing() {
        let mut inv = Inventory::from_counts([(Resource::Wheat, 10)]);
        assert!(!inv.try_remove(Resource::Wheat, 11));
        assert_eq!(inv.quantity(Resource::Wheat), 10);
        assert!(inv.try_remove(Resource::Wheat, 4));
        assert_eq!(inv.quantity(Resource::Wheat), 6);
        assert!(inv.try_remove(Resource::Wheat, 6));
        assert!(inv.is_empty());
    }

    #[test]
    fn covers_sums_duplicate_requirements() {
        let inv = Inventory::from_counts([(Resource::Wood, 5)]);
        assert!(inv.covers(&[(Resource::Wood, 5)]));
        assert!(!inv.covers(&[(Resource::Wood, 3), (Resource::Wood, 3)]));
        assert_eq!(
            inv.first_shortfall(&[(Resource::Wood, 1), (Resource::Brick, 1)]),
            Some(Resource::Brick)
        );
    }

    #[test]
    fn resource_names_round_trip() {
        for r in Resource::ALL {
            assert_eq!(Resource::from_name(r.name()), Some(r));
        }
        assert_eq!(Resource::from_name("gold"), None);
    }

    #[test]
    fn inventory_json_shape() {
        let inv = Inventory::from_counts([(Resource::CornSeed, 2)]);
        let json = serde_json::to_string(&inv).unwrap();
        assert_eq!(json, r#"{"counts":{"corn_seed":2}}"#);
    }
}
