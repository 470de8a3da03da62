//! Loading pipeline: finds data files, deserializes them, resolves names and
//! builds the catalog.
//!
//! Provides format detection (RON/JSON/TOML), file discovery and
//! deserialization helpers, plus [`load_game_data`] on top of them.

use crate::schema::{BuildingData, CropData, FarmlandData, RecipeData};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use township_core::building::BuildingKind;
use township_core::catalog::{
    BuildingDef, Catalog, CatalogBuilder, CatalogError, CropDef, FarmlandDef, RecipeDef,
};
use township_core::config::GameConfig;
use township_core::crop::CropKind;
use township_core::resource::Resource;
use tracing::{debug, info};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A kind, resource or crop name could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions failed catalog validation.
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without
/// extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml` and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = &found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at
/// `toml_key` from the top-level table. RON and JSON hold a bare list.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
        Format::Ron | Format::Json => deserialize_file(path),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

fn unresolved(file: &Path, name: &str, expected_kind: &'static str) -> DataLoadError {
    DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    }
}

pub fn resolve_kind(name: &str, file: &Path) -> Result<BuildingKind, DataLoadError> {
    BuildingKind::from_name(name).ok_or_else(|| unresolved(file, name, "building kind"))
}

pub fn resolve_resource(name: &str, file: &Path) -> Result<Resource, DataLoadError> {
    Resource::from_name(name).ok_or_else(|| unresolved(file, name, "resource"))
}

pub fn resolve_crop(name: &str, file: &Path) -> Result<CropKind, DataLoadError> {
    CropKind::from_name(name).ok_or_else(|| unresolved(file, name, "crop"))
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn resolve_building(data: &BuildingData, file: &Path) -> Result<BuildingDef, DataLoadError> {
    let kind = resolve_kind(&data.kind, file)?;
    let mut def = BuildingDef::new(&data.name, kind, data.footprint.width, data.footprint.height)
        .cost(data.cost)
        .capacity(data.capacity)
        .price(data.price)
        .build_time(data.build_time);
    for (name, quantity) in &data.materials {
        def = def.material(resolve_resource(name, file)?, *quantity);
    }
    if let Some(demolish) = data.demolish_time {
        def.demolish_duration = demolish;
    }
    Ok(def)
}

fn resolve_recipe(data: &RecipeData, file: &Path) -> Result<RecipeDef, DataLoadError> {
    Ok(RecipeDef {
        building: resolve_kind(&data.building, file)?,
        input: (resolve_resource(&data.input.0, file)?, data.input.1),
        output: (resolve_resource(&data.output.0, file)?, data.output.1),
        unit_duration: data.unit_time,
    })
}

fn resolve_farmland(data: FarmlandData) -> FarmlandDef {
    FarmlandDef {
        cost: data.cost,
        build_duration: data.build_time,
        demolish_duration: data.demolish_time.unwrap_or(data.build_time / 2),
    }
}

// ===========================================================================
// Entry point
// ===========================================================================

/// Everything a game needs from a data directory.
#[derive(Debug, Clone)]
pub struct GameData {
    pub catalog: Catalog,
    pub config: GameConfig,
}

/// Load the catalog and configuration from `dir`.
///
/// `buildings` is required. `crops`, `recipes` and `farmland` replace the
/// stock definitions when present; `config` overrides [`GameConfig`]
/// defaults field by field.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let stock = Catalog::standard();
    let mut builder = CatalogBuilder::new();

    // Buildings.
    let path = require_data_file(dir, "buildings")?;
    let buildings: Vec<BuildingData> = deserialize_list(&path, "buildings")?;
    let mut names: HashMap<String, ()> = HashMap::with_capacity(buildings.len());
    for data in &buildings {
        check_duplicate(&names, &data.name, &path)?;
        names.insert(data.name.clone(), ());
        builder.register_building(resolve_building(data, &path)?);
    }

    // Crops.
    match find_data_file(dir, "crops")? {
        Some(path) => {
            let crops: Vec<CropData> = deserialize_list(&path, "crops")?;
            for data in &crops {
                builder.register_crop(CropDef {
                    kind: resolve_crop(&data.name, &path)?,
                    growth_duration: data.growth_time,
                    yield_quantity: data.yield_quantity,
                });
            }
        }
        None => {
            for kind in CropKind::ALL {
                if let Some(def) = stock.crop(kind) {
                    builder.register_crop(*def);
                }
            }
        }
    }

    // Recipes.
    match find_data_file(dir, "recipes")? {
        Some(path) => {
            let recipes: Vec<RecipeData> = deserialize_list(&path, "recipes")?;
            for data in &recipes {
                builder.register_recipe(resolve_recipe(data, &path)?);
            }
        }
        None => {
            for kind in BuildingKind::ALL {
                if let Some(def) = stock.recipe_for(kind) {
                    builder.register_recipe(*def);
                }
            }
        }
    }

    // Farmland.
    if let Some(path) = find_data_file(dir, "farmland")? {
        let data: FarmlandData = deserialize_file(&path)?;
        builder.set_farmland(resolve_farmland(data));
    }

    // Config.
    let config = match find_data_file(dir, "config")? {
        Some(path) => {
            debug!(file = %path.display(), "reading game config");
            deserialize_file::<GameConfig>(&path)?.sanitized()
        }
        None => GameConfig::default(),
    };

    let catalog = builder.build()?;
    info!(
        dir = %dir.display(),
        buildings = catalog.building_count(),
        "loaded game data"
    );
    Ok(GameData { catalog, config })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "township_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const BUILDINGS_RON: &str = r#"[
        (
            name: "Házikó",
            kind: "house",
            footprint: (width: 2, height: 2),
            cost: 500,
            capacity: 2,
            price: 10,
            build_time: 10000,
        ),
        (
            name: "Malom",
            kind: "mill",
            footprint: (width: 2, height: 2),
            cost: 1800,
            materials: [("wood", 30), ("stone", 30)],
            capacity: 2,
            price: 12,
            build_time: 25000,
            demolish_time: Some(4000),
        ),
    ]"#;

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        let result = detect_format(Path::new("buildings.yaml"));
        assert!(matches!(result, Err(DataLoadError::UnsupportedFormat { .. })));
    }

    #[test]
    fn detect_format_no_extension() {
        assert!(detect_format(Path::new("buildings")).is_err());
    }

    // -----------------------------------------------------------------------
    // find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_single_match() {
        let dir = make_test_dir("find_single");
        fs::write(dir.join("crops.toml"), "").unwrap();
        let found = find_data_file(&dir, "crops").unwrap();
        assert_eq!(found, Some(dir.join("crops.toml")));
        cleanup(&dir);
    }

    #[test]
    fn find_data_file_none() {
        let dir = make_test_dir("find_none");
        assert_eq!(find_data_file(&dir, "crops").unwrap(), None);
        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("crops.ron"), "").unwrap();
        fs::write(dir.join("crops.json"), "").unwrap();
        let result = find_data_file(&dir, "crops");
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));
        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        match require_data_file(&dir, "buildings") {
            Err(DataLoadError::MissingRequired { file, .. }) => assert_eq!(file, "buildings"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("toml_missing_key");
        let path = dir.join("crops.toml");
        fs::write(&path, "[[plants]]\nname = \"wheat\"\ngrowth_time = 1\n").unwrap();
        let result: Result<Vec<CropData>, _> = deserialize_list(&path, "crops");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_json() {
        let dir = make_test_dir("json_list");
        let path = dir.join("crops.json");
        fs::write(
            &path,
            r#"[{"name": "wheat", "growth_time": 1000}, {"name": "corn", "growth_time": 2000}]"#,
        )
        .unwrap();
        let crops: Vec<CropData> = deserialize_list(&path, "crops").unwrap();
        assert_eq!(crops.len(), 2);
        assert_eq!(crops[1].growth_time, 2_000);
        cleanup(&dir);
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        let dir = make_test_dir("bad_ron");
        let path = dir.join("buildings.ron");
        fs::write(&path, "[ (name: ").unwrap();
        let result: Result<Vec<BuildingData>, _> = deserialize_list(&path, "buildings");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_game_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_buildings_only_uses_stock_crops_and_recipes() {
        let dir = make_test_dir("buildings_only");
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.catalog.building_count(), 2);
        let (_, mill) = data.catalog.find("Malom").unwrap();
        assert_eq!(mill.kind, BuildingKind::Mill);
        assert_eq!(mill.materials, vec![(Resource::Wood, 30), (Resource::Stone, 30)]);
        assert_eq!(mill.build_duration, 25_000);
        assert_eq!(mill.demolish_duration, 4_000);
        let (_, house) = data.catalog.find("Házikó").unwrap();
        assert_eq!(house.demolish_duration, 5_000);

        let wheat = data.catalog.crop(CropKind::Wheat).unwrap();
        assert_eq!(wheat.growth_duration, 60_000);
        assert!(data.catalog.recipe_for(BuildingKind::Mill).is_some());
        assert_eq!(data.config, GameConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn load_toml_crops_recipes_and_config() {
        let dir = make_test_dir("toml_full");
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(
            dir.join("crops.toml"),
            r#"
                [[crops]]
                name = "wheat"
                growth_time = 30000
                yield_quantity = 4

                [[crops]]
                name = "corn"
                growth_time = 45000
            "#,
        )
        .unwrap();
        fs::write(
            dir.join("recipes.toml"),
            r#"
                [[recipes]]
                building = "mill"
                input = ["wheat", 2]
                output = ["flour", 1]
                unit_time = 8000
            "#,
        )
        .unwrap();
        fs::write(
            dir.join("config.toml"),
            "tick_interval_ms = 10000\nstarting_money = 250\n",
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        let wheat = data.catalog.crop(CropKind::Wheat).unwrap();
        assert_eq!(wheat.growth_duration, 30_000);
        assert_eq!(wheat.yield_quantity, 4);
        let recipe = data.catalog.recipe_for(BuildingKind::Mill).unwrap();
        assert_eq!(recipe.input, (Resource::Wheat, 2));
        assert_eq!(recipe.unit_duration, 8_000);
        assert!(data.catalog.recipe_for(BuildingKind::PopcornStand).is_none());
        assert_eq!(data.config.tick_interval_ms, 10_000);
        assert_eq!(data.config.starting_money, 250);
        assert_eq!(data.config.poll_interval_ms, 1_000);
        cleanup(&dir);
    }

    #[test]
    fn load_json_farmland() {
        let dir = make_test_dir("json_farmland");
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(dir.join("farmland.json"), r#"{"cost": 35, "build_time": 6000}"#).unwrap();

        let data = load_game_data(&dir).unwrap();
        let farmland = data.catalog.farmland();
        assert_eq!(farmland.cost, 35);
        assert_eq!(farmland.build_duration, 6_000);
        assert_eq!(farmland.demolish_duration, 3_000);
        cleanup(&dir);
    }

    #[test]
    fn config_is_sanitized() {
        let dir = make_test_dir("config_sanitized");
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(
            dir.join("config.json"),
            r#"{"tick_interval_ms": 0, "demolish_refund_percent": 300}"#,
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config.tick_interval_ms, 1);
        assert_eq!(data.config.demolish_refund_percent, 100);
        cleanup(&dir);
    }

    #[test]
    fn unknown_kind_is_unresolved() {
        let dir = make_test_dir("unknown_kind");
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "Vár", kind: "castle")]"#,
        )
        .unwrap();
        match load_game_data(&dir) {
            Err(DataLoadError::UnresolvedRef {
                name,
                expected_kind,
                ..
            }) => {
                assert_eq!(name, "castle");
                assert_eq!(expected_kind, "building kind");
            }
            other => panic!("expected UnresolvedRef, got {other:?}"),
        }
        cleanup(&dir);
    }

    #[test]
    fn unknown_material_is_unresolved() {
        let dir = make_test_dir("unknown_material");
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "Kunyhó", kind: "house", materials: [("gold", 1)])]"#,
        )
        .unwrap();
        let result = load_game_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "resource", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_building_names_are_refused() {
        let dir = make_test_dir("duplicate");
        fs::write(
            dir.join("buildings.ron"),
            r#"[(name: "Út", kind: "road"), (name: "Út", kind: "road")]"#,
        )
        .unwrap();
        let result = load_game_data(&dir);
        assert!(matches!(result, Err(DataLoadError::DuplicateName { .. })));
        cleanup(&dir);
    }

    #[test]
    fn missing_crop_fails_catalog_validation() {
        let dir = make_test_dir("missing_crop");
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(dir.join("crops.json"), r#"[{"name": "wheat", "growth_time": 1000}]"#)
            .unwrap();
        let result = load_game_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::Catalog(CatalogError::MissingCrop(CropKind::Corn)))
        ));
        cleanup(&dir);
    }

    #[test]
    fn missing_buildings_file() {
        let dir = make_test_dir("no_buildings");
        let result = load_game_data(&dir);
        assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));
        cleanup(&dir);
    }
}
