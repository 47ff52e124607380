use bevy::prelude::*;
use mapgen_core::{
    generate_map,
    placement::PlayerGroup,
    terrain::RiverSummary,
    Biome, MapDimensions, MapgenSeed, MapgenTunables, MapgenTunablesHandle, NoiseService,
    PlayerInfo, PlayerRosterResource, Region, StartAssignment, StartBiasCatalogHandle,
    TerrainMutation, TerrainQuery, TerrainStrategy, TerrainStrategyResource, TileGrid,
};

const WIDTH: u32 = 40;
const HEIGHT: u32 = 20;

/// Two rectangular continents split at the middle column.
struct TwoBlocks;

impl TerrainStrategy<TileGrid> for TwoBlocks {
    fn shape_landmass(
        &self,
        host: &mut TileGrid,
        _noise: &mut dyn NoiseService,
        _cfg: &mapgen_core::config::TerrainTunables,
    ) -> [Region; 2] {
        let mid = host.width() / 2;
        for (continent, (west, east)) in [(3, mid - 4), (mid + 2, host.width() - 4)]
            .into_iter()
            .enumerate()
        {
            for y in 3..host.height() - 3 {
                for x in west..=east {
                    host.set_land(x, y, 120);
                    host.set_continent(x, y, Some(continent as u32));
                }
            }
        }
        [
            Region::new(0, 0, mid - 1, host.height() - 1).with_continent(0),
            Region::new(mid, 0, host.width() - 1, host.height() - 1).with_continent(1),
        ]
    }

    fn shape_terrain(
        &self,
        _host: &mut TileGrid,
        _noise: &mut dyn NoiseService,
        _cfg: &mapgen_core::config::TerrainTunables,
    ) {
    }

    fn model_rivers(
        &self,
        _host: &mut TileGrid,
        _cfg: &mapgen_core::config::TerrainTunables,
    ) -> RiverSummary {
        RiverSummary::default()
    }

    fn baseline_rainfall(
        &self,
        host: &mut TileGrid,
        _noise: &mut dyn NoiseService,
        _cfg: &mapgen_core::config::TerrainTunables,
    ) {
        for y in 0..host.height() {
            for x in 0..host.width() {
                if !host.is_water(x, y) {
                    host.set_rainfall(x, y, 100);
                }
            }
        }
    }

    fn designate_biomes(&self, host: &mut TileGrid) {
        for y in 0..host.height() {
            for x in 0..host.width() {
                if !host.is_water(x, y) {
                    host.set_biome(x, y, Biome::Grassland);
                }
            }
        }
    }
}

fn build_app() -> App {
    let roster = vec![
        PlayerInfo::human(0, "rome", "augustus"),
        PlayerInfo::human(1, "greece", "himiko"),
        PlayerInfo::ai(2, "maya", "pachacuti"),
        PlayerInfo::ai(3, "egypt", "hatshepsut"),
    ];
    let mut app = App::new();
    app.insert_resource(MapgenSeed(12))
        .insert_resource(MapDimensions {
            width: WIDTH,
            height: HEIGHT,
        })
        .insert_resource(MapgenTunablesHandle::new(MapgenTunables::builtin()))
        .insert_resource(StartBiasCatalogHandle::default())
        .insert_resource(PlayerRosterResource(roster))
        .insert_resource(TerrainStrategyResource(Box::new(TwoBlocks)))
        .add_plugins(MinimalPlugins)
        .add_systems(Update, generate_map);
    app
}

#[test]
fn host_strategy_shapes_the_map() {
    let mut app = build_app();
    app.update();

    let grid = app.world.resource::<TileGrid>();
    assert_eq!(grid.width(), WIDTH);
    assert!(!grid.is_water(5, 10));
    assert!(grid.is_water(WIDTH / 2, 10));
    assert_eq!(grid.biome(5, 10), Biome::Grassland);
    assert!(app.world.contains_resource::<TerrainStrategyResource>());
}

#[test]
fn humans_share_the_homeland_continent() {
    let mut app = build_app();
    app.update();

    let grid = app.world.resource::<TileGrid>();
    let starts = app.world.resource::<StartAssignment>();
    assert_eq!(starts.placements.len(), 4);
    assert!(starts.failures.is_empty());

    for human in [0, 1] {
        let placement = starts.placements[&human];
        assert_eq!(placement.group, PlayerGroup::Homeland);
        assert_eq!(grid.continent(placement.tile.x, placement.tile.y), Some(0));
    }
    for ai in [2, 3] {
        let placement = starts.placements[&ai];
        assert_eq!(placement.group, PlayerGroup::Distant);
        assert_eq!(grid.continent(placement.tile.x, placement.tile.y), Some(1));
    }
}
