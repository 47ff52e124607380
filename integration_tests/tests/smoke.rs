mod common;

use mapgen_core::{
    CorridorMetadata, GenerationReport, StartAssignment, StoryTags, TerrainQuery, TileGrid,
    TunablesMetadata, WorldFields,
};

#[test]
fn app_generates_on_first_update() {
    let app = common::generated_app(1, 64, 40);

    let grid = app.world.resource::<TileGrid>();
    assert_eq!(grid.width(), 64);
    assert_eq!(grid.height(), 40);
    assert!(grid.land_count() > 0);

    assert!(app.world.contains_resource::<WorldFields>());
    assert!(app.world.contains_resource::<StoryTags>());
    assert!(app.world.contains_resource::<CorridorMetadata>());
    assert!(app.world.contains_resource::<StartAssignment>());

    let report = app.world.resource::<GenerationReport>();
    assert_eq!(report.seed, 1);
    assert!(report.fields_enabled);
}

#[test]
fn fixture_tunables_are_picked_up() {
    let app = common::generated_app(2, 48, 30);
    let metadata = app.world.resource::<TunablesMetadata>();
    let path = metadata.path().expect("fixture path recorded");
    assert!(path.ends_with("test_mapgen_tunables.json"));
}

#[test]
fn rainfall_stays_in_range() {
    let app = common::generated_app(5, 64, 40);
    let grid = app.world.resource::<TileGrid>();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let r = grid.rainfall(x, y);
            assert!((0..=200).contains(&r), "rainfall {r} at ({x}, {y})");
        }
    }
}

#[test]
fn report_serializes_to_json() -> anyhow::Result<()> {
    #[derive(serde::Deserialize)]
    struct ReportView {
        seed: u64,
        width: u32,
        placed: usize,
        failed: usize,
    }

    let app = common::generated_app(8, 48, 30);
    let report = app.world.resource::<GenerationReport>();
    let json = serde_json::to_string(report)?;
    let view: ReportView = serde_json::from_str(&json)?;
    assert_eq!(view.seed, 8);
    assert_eq!(view.width, 48);
    assert_eq!(view.placed + view.failed, 6);
    Ok(())
}
