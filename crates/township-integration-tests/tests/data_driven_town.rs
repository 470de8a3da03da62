//! A town whose catalog and config come from data files on disk.

use std::fs;
use std::path::{Path, PathBuf};
use township_core::catalog::Catalog;
use township_core::error::GameError;
use township_core::game::Game;
use township_core::resource::Resource;
use township_data::{load_game_data, DataLoadError};
use township_spatial::{GridPosition, Rotation};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "township_town_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

const BUILDINGS_TOML: &str = r#"
[[buildings]]
name = "Kunyhó"
kind = "house"
footprint = { width = 1, height = 1 }
cost = 100
capacity = 1
price = 5
build_time = 2000

[[buildings]]
name = "Pékség"
kind = "mill"
footprint = { width = 2, height = 1 }
cost = 300
materials = [["wood", 5]]
capacity = 1
price = 4
build_time = 4000
"#;

#[test]
fn loaded_catalog_drives_a_game() {
    let dir = make_test_dir("drives_game");
    fs::write(dir.join("buildings.toml"), BUILDINGS_TOML).unwrap();
    fs::write(
        dir.join("config.json"),
        r#"{"tick_interval_ms": 5000, "starting_money": 400}"#,
    )
    .unwrap();

    let data = load_game_data(&dir).unwrap();
    let mut game = Game::new(data.catalog, data.config);
    let p = game.add_player("Builder");
    assert_eq!(game.state().players[p].money, 400);
    assert_eq!(game.seconds_until_tick(), 5);

    assert_eq!(
        game.place_building(p, "Házikó", GridPosition::new(0, 0), Rotation::None),
        Err(GameError::UnknownDefinition("Házikó".into()))
    );
    assert_eq!(
        game.place_building(p, "Pékség", GridPosition::new(0, 0), Rotation::None),
        Err(GameError::InsufficientResource(Resource::Wood))
    );

    let hut = game
        .place_building(p, "Kunyhó", GridPosition::new(0, 0), Rotation::None)
        .unwrap();
    game.advance(2_000);
    assert!(game.state().buildings[hut].is_active());

    // Stock recipes still apply to the loaded mill kind.
    assert!(game.catalog().recipe_for(township_core::building::BuildingKind::Mill).is_some());
    cleanup(&dir);
}

#[test]
fn loaded_stock_matches_the_builtin_catalog() {
    let dir = make_test_dir("stock_copy");
    let stock = Catalog::standard();
    let mut ron = String::from("[\n");
    for (_, def) in stock.buildings() {
        let materials: Vec<String> = def
            .materials
            .iter()
            .map(|(r, q)| format!("(\"{}\", {q})", r.name()))
            .collect();
        ron.push_str(&format!(
            "(name: \"{}\", kind: \"{}\", footprint: (width: {}, height: {}), cost: {}, \
             materials: [{}], capacity: {}, price: {}, build_time: {}),\n",
            def.name,
            def.kind.name(),
            def.footprint.width,
            def.footprint.height,
            def.cost,
            materials.join(", "),
            def.capacity,
            def.price,
            def.build_duration,
        ));
    }
    ron.push(']');
    fs::write(dir.join("buildings.ron"), ron).unwrap();

    let data = load_game_data(&dir).unwrap();
    assert_eq!(data.catalog.building_count(), stock.building_count());
    for (_, def) in stock.buildings() {
        let (_, loaded) = data.catalog.find(&def.name).unwrap();
        assert_eq!(loaded, def);
    }
    cleanup(&dir);
}

#[test]
fn conflicting_files_are_reported() {
    let dir = make_test_dir("conflict");
    fs::write(dir.join("buildings.toml"), BUILDINGS_TOML).unwrap();
    fs::write(dir.join("buildings.json"), "[]").unwrap();
    assert!(matches!(
        load_game_data(&dir),
        Err(DataLoadError::ConflictingFormats { .. })
    ));
    cleanup(&dir);
}
