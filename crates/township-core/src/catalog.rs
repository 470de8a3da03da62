use crate::building::BuildingKind;
use crate::crop::CropKind;
use crate::error::GameError;
use crate::fixed::Millis;
use crate::id::DefId;
use crate::resource::Resource;
use std::collections::{HashMap, HashSet};
use township_spatial::BuildingFootprint;

/// A placeable building type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingDef {
    /// Display name, also the lookup key ("Házikó").
    pub name: String,
    pub kind: BuildingKind,
    pub footprint: BuildingFootprint,
    /// Money paid on placement.
    pub cost: u64,
    /// Resources consumed on placement.
    pub materials: Vec<(Resource, u32)>,
    /// Residents for houses, employees otherwise.
    pub capacity: u32,
    /// Default rent or salary, depending on kind.
    pub price: u64,
    pub build_duration: Millis,
    pub demolish_duration: Millis,
}

impl BuildingDef {
    pub fn new(name: &str, kind: BuildingKind, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            footprint: BuildingFootprint::new(width, height),
            cost: 0,
            materials: Vec::new(),
            capacity: 0,
            price: 0,
            build_duration: 0,
            demolish_duration: 0,
        }
    }

    pub fn cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }

    pub fn material(mut self, resource: Resource, quantity: u32) -> Self {
        self.materials.push((resource, quantity));
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// Build time; demolition takes half of it.
    pub fn build_time(mut self, duration: Millis) -> Self {
        self.build_duration = duration;
        self.demolish_duration = duration / 2;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropDef {
    pub kind: CropKind,
    pub growth_duration: Millis,
    /// Produce credited per harvested tile.
    pub yield_quantity: u32,
}

/// Conversion run by a production building: `input` per unit in, `output`
/// per unit out, `unit_duration` per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeDef {
    pub building: BuildingKind,
    pub input: (Resource, u32),
    pub output: (Resource, u32),
    pub unit_duration: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmlandDef {
    pub cost: u64,
    pub build_duration: Millis,
    pub demolish_duration: Millis,
}

impl Default for FarmlandDef {
    fn default() -> Self {
        Self {
            cost: 20,
            build_duration: 3_000,
            demolish_duration: 1_500,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects definitions, then validates and freezes them into a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    buildings: Vec<BuildingDef>,
    crops: Vec<CropDef>,
    recipes: Vec<RecipeDef>,
    farmland: FarmlandDef,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_building(&mut self, def: BuildingDef) -> DefId {
        let id = DefId(self.buildings.len() as u32);
        self.buildings.push(def);
        id
    }

    pub fn register_crop(&mut self, def: CropDef) {
        self.crops.retain(|c| c.kind != def.kind);
        self.crops.push(def);
    }

    pub fn register_recipe(&mut self, def: RecipeDef) {
        self.recipes.retain(|r| r.building != def.building);
        self.recipes.push(def);
    }

    pub fn set_farmland(&mut self, def: FarmlandDef) {
        self.farmland = def;
    }

    /// Edit a registered building by name.
    pub fn mutate_building<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut BuildingDef),
    {
        let def = self
            .buildings
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(def);
        Ok(())
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut seen = HashSet::with_capacity(self.buildings.len());
        for def in &self.buildings {
            if def.footprint.area() == 0 {
                return Err(CatalogError::EmptyFootprint(def.name.clone()));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(CatalogError::DuplicateName(def.name.clone()));
            }
        }
        for kind in CropKind::ALL {
            if !self.crops.iter().any(|c| c.kind == kind) {
                return Err(CatalogError::MissingCrop(kind));
            }
        }
        for recipe in &self.recipes {
            if !recipe.building.capabilities().has_stock {
                return Err(CatalogError::RecipeWithoutStock(recipe.building));
            }
            if recipe.input.1 == 0 || recipe.output.1 == 0 {
                return Err(CatalogError::EmptyRecipe(recipe.building));
            }
        }

        Ok(self.freeze())
    }

    fn freeze(self) -> Catalog {
        let by_name = self
            .buildings
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), DefId(i as u32)))
            .collect();
        Catalog {
            buildings: self.buildings,
            by_name,
            crops: self.crops,
            recipes: self.recipes,
            farmland: self.farmland,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate building name: {0}")]
    DuplicateName(String),
    #[error("building '{0}' has an empty footprint")]
    EmptyFootprint(String),
    #[error("no definition for crop {0:?}")]
    MissingCrop(CropKind),
    #[error("{0:?} has no stock to run a recipe")]
    RecipeWithoutStock(BuildingKind),
    #[error("recipe for {0:?} has a zero quantity")]
    EmptyRecipe(BuildingKind),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable definitions. Frozen after [`CatalogBuilder::build`].
#[derive(Debug, Clone)]
pub struct Catalog {
    buildings: Vec<BuildingDef>,
    by_name: HashMap<String, DefId>,
    crops: Vec<CropDef>,
    recipes: Vec<RecipeDef>,
    farmland: FarmlandDef,
}

impl Catalog {
    /// The stock town: houses, workplaces, farm, road, mill, popcorn stand
    /// and bank, with wheat and corn.
    pub fn standard() -> Self {
        let mut b = CatalogBuilder::new();
        for def in standard_buildings() {
            b.register_building(def);
        }
        b.register_crop(CropDef {
            kind: CropKind::Wheat,
            growth_duration: 60_000,
            yield_quantity: 3,
        });
        b.register_crop(CropDef {
            kind: CropKind::Corn,
            growth_duration: 90_000,
            yield_quantity: 2,
        });
        b.register_recipe(RecipeDef {
            building: BuildingKind::Mill,
            input: (Resource::Wheat, 5),
            output: (Resource::Flour, 3),
            unit_duration: 10_000,
        });
        b.register_recipe(RecipeDef {
            building: BuildingKind::PopcornStand,
            input: (Resource::Corn, 1),
            output: (Resource::Popcorn, 2),
            unit_duration: 5_000,
        });
        b.set_farmland(FarmlandDef::default());

        // Fixed definitions above satisfy every build check.
        b.freeze()
    }

    pub fn building(&self, id: DefId) -> Option<&BuildingDef> {
        self.buildings.get(id.0 as usize)
    }

    pub fn building_id(&self, name: &str) -> Option<DefId> {
        self.by_name.get(name).copied()
    }

    /// Look up a definition by display name.
    pub fn find(&self, name: &str) -> Result<(DefId, &BuildingDef), GameError> {
        self.building_id(name)
            .and_then(|id| self.building(id).map(|def| (id, def)))
            .ok_or_else(|| GameError::UnknownDefinition(name.to_string()))
    }

    pub fn buildings(&self) -> impl Iterator<Item = (DefId, &BuildingDef)> + '_ {
        self.buildings
            .iter()
            .enumerate()
            .map(|(i, def)| (DefId(i as u32), def))
    }

    pub fn crop(&self, kind: CropKind) -> Option<&CropDef> {
        self.crops.iter().find(|c| c.kind == kind)
    }

    pub fn recipe_for(&self, kind: BuildingKind) -> Option<&RecipeDef> {
        self.recipes.iter().find(|r| r.building == kind)
    }

    pub fn farmland(&self) -> &FarmlandDef {
        &self.farmland
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_buildings() -> Vec<BuildingDef> {
    use BuildingKind::*;
    use Resource::*;
    vec![
        BuildingDef::new("Házikó", House, 2, 2)
            .cost(500)
            .capacity(2)
            .price(10)
            .build_time(10_000),
        BuildingDef::new("Családi ház", House, 3, 2)
            .cost(1_200)
            .material(Wood, 20)
            .material(Brick, 30)
            .capacity(4)
            .price(25)
            .build_time(20_000),
        BuildingDef::new("Iroda", Office, 3, 3)
            .cost(2_000)
            .material(Brick, 40)
            .material(Stone, 20)
            .capacity(5)
            .price(15)
            .build_time(30_000),
        BuildingDef::new("Erdészet", Forestry, 2, 2)
            .cost(800)
            .material(Wood, 10)
            .capacity(3)
            .price(10)
            .build_time(15_000),
        BuildingDef::new("Farm", Farm, 2, 2)
            .cost(1_000)
            .material(Wood, 20)
            .capacity(3)
            .price(10)
            .build_time(15_000),
        BuildingDef::new("Út", Road, 1, 1).cost(10).build_time(2_000),
        BuildingDef::new("Bolt", Shop, 2, 2)
            .cost(1_500)
            .material(Wood, 20)
            .material(Brick, 20)
            .capacity(2)
            .price(12)
            .build_time(20_000),
        BuildingDef::new("Malom", Mill, 2, 2)
            .cost(1_800)
            .material(Wood, 30)
            .material(Stone, 30)
            .capacity(2)
            .price(12)
            .build_time(25_000),
        BuildingDef::new("Popcorn árus", PopcornStand, 1, 1)
            .cost(600)
            .material(Wood, 10)
            .capacity(1)
            .price(8)
            .build_time(10_000),
        BuildingDef::new("Bank", Bank, 3, 2)
            .cost(5_000)
            .material(Brick, 50)
            .material(Stone, 50)
            .capacity(3)
            .price(20)
            .build_time(40_000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        b.register_building(BuildingDef::new("Hut", BuildingKind::House, 1, 1).cost(5));
        for kind in CropKind::ALL {
            b.register_crop(CropDef {
                kind,
                growth_duration: 1_000,
                yield_quantity: 1,
            });
        }
        b
    }

    #[test]
    fn standard_catalog_has_every_kind() {
        let catalog = Catalog::standard();
        for kind in BuildingKind::ALL {
            assert!(
                catalog.buildings().any(|(_, d)| d.kind == kind),
                "missing {kind:?}"
            );
        }
        assert_eq!(catalog.building_count(), 10);
    }

    #[test]
    fn buildings_without_crops_are_refused() {
        let mut b = CatalogBuilder::new();
        for def in standard_buildings() {
            b.register_building(def);
        }
        assert!(matches!(b.build(), Err(CatalogError::MissingCrop(_))));
    }

    #[test]
    fn house_definition() {
        let catalog = Catalog::standard();
        let (_, house) = catalog.find("Házikó").unwrap();
        assert_eq!(house.cost, 500);
        assert!(house.materials.is_empty());
        assert_eq!(house.footprint, BuildingFootprint::new(2, 2));
        assert_eq!(house.demolish_duration, house.build_duration / 2);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let catalog = Catalog::standard();
        assert_eq!(
            catalog.find("Kastély").unwrap_err(),
            GameError::UnknownDefinition("Kastély".into())
        );
    }

    #[test]
    fn recipes_and_crops() {
        let catalog = Catalog::standard();
        let mill = catalog.recipe_for(BuildingKind::Mill).unwrap();
        assert_eq!(mill.input, (Resource::Wheat, 5));
        assert_eq!(mill.output, (Resource::Flour, 3));
        assert!(catalog.recipe_for(BuildingKind::House).is_none());
        assert_eq!(catalog.crop(CropKind::Corn).unwrap().growth_duration, 90_000);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = minimal_builder();
        b.register_building(BuildingDef::new("Hut", BuildingKind::Road, 1, 1));
        assert_eq!(
            b.build().unwrap_err(),
            CatalogError::DuplicateName("Hut".into())
        );
    }

    #[test]
    fn recipe_needs_stock_building() {
        let mut b = minimal_builder();
        b.register_recipe(RecipeDef {
            building: BuildingKind::Office,
            input: (Resource::Wood, 1),
            output: (Resource::Brick, 1),
            unit_duration: 1,
        });
        assert_eq!(
            b.build().unwrap_err(),
            CatalogError::RecipeWithoutStock(BuildingKind::Office)
        );
    }

    #[test]
    fn mutate_building_by_name() {
        let mut b = minimal_builder();
        b.mutate_building("Hut", |d| d.cost = 99).unwrap();
        assert!(b.mutate_building("Palace", |_| {}).is_err());
        let catalog = b.build().unwrap();
        assert_eq!(catalog.find("Hut").unwrap().1.cost, 99);
    }
}
