use mapgen_core::{
    grid::land_within, run_generation, DefaultTerrain, GeneratedMap, MapDimensions,
    MapgenTunables, PlayerRosterResource, StartBiasCatalog, TerrainQuery,
};

fn generate(seed: u64, tunables: &MapgenTunables) -> GeneratedMap {
    let catalog = StartBiasCatalog::builtin();
    let roster = PlayerRosterResource::sample(&catalog, 6, true);
    run_generation(
        seed,
        MapDimensions {
            width: 84,
            height: 54,
        },
        tunables,
        &catalog,
        &roster.0,
        &DefaultTerrain,
    )
}

/// Islands raise land and navigable rivers flood it after tagging; with both
/// off the final grid still matches the terrain every tag was placed on.
fn stable_terrain_tunables() -> MapgenTunables {
    let mut tunables = MapgenTunables::default();
    tunables.toggles.islands = false;
    tunables.terrain.navigable_river_accum = u32::MAX;
    tunables
}

#[test]
fn tags_hold_their_terrain_domain() {
    let tunables = stable_terrain_tunables();
    let min_dist = tunables.story.hotspot.min_dist_from_land;
    for seed in [3u64, 14, 27, 58] {
        let map = generate(seed, &tunables);
        let grid = &map.grid;
        let tags = &map.tags;
        assert!(!tags.is_empty(), "seed {seed}: nothing tagged");
        assert_eq!(map.report.rivers.navigable, 0);

        for p in &tags.hotspot {
            assert!(grid.is_water(p.x, p.y), "seed {seed}: hotspot {p:?} on land");
            assert!(
                !land_within(grid, p.x, p.y, min_dist),
                "seed {seed}: hotspot {p:?} within {min_dist} of land"
            );
        }
        for p in tags.rift_line.iter().chain(&tags.rift_shoulder) {
            assert!(!grid.is_water(p.x, p.y), "seed {seed}: rift tile {p:?} in water");
        }
        for p in &tags.corridor_land_open {
            assert!(!grid.is_water(p.x, p.y), "seed {seed}: land corridor {p:?} in water");
        }
        for p in &tags.corridor_sea_lane {
            assert!(grid.is_water(p.x, p.y), "seed {seed}: sea lane {p:?} on land");
        }
    }
}

#[test]
fn every_tagged_tile_is_inside_the_grid() {
    let tunables = MapgenTunables::default();
    for seed in [3u64, 14] {
        let map = generate(seed, &tunables);
        for (name, set) in map.tags.named() {
            for p in set {
                assert!(
                    p.x < map.grid.width() && p.y < map.grid.height(),
                    "seed {seed}: {name} tile {p:?} outside the grid"
                );
            }
        }
        for p in &map.tags.corridor_sea_lane {
            assert!(map.grid.is_water(p.x, p.y), "seed {seed}: sea lane {p:?} on land");
        }
    }
}
