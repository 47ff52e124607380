use std::path::PathBuf;
use std::sync::Once;

use bevy::prelude::App;
use mapgen_core::{build_mapgen_app, MapDimensions, MapgenSeed};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_mapgen_tunables.json");

        debug_assert!(
            config_path.exists(),
            "missing test mapgen tunables at {}",
            config_path.display()
        );

        std::env::set_var("MAPGEN_TUNABLES_PATH", &config_path);
    });
}

/// App sized for tests, generated once.
pub fn generated_app(seed: u64, width: u32, height: u32) -> App {
    ensure_test_config();
    let mut app = build_mapgen_app();
    app.insert_resource(MapgenSeed(seed))
        .insert_resource(MapDimensions { width, height });
    app.update();
    app
}
