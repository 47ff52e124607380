//! End-to-end generation over bevy resources.

use std::sync::Arc;

use bevy::prelude::*;
use serde::Serialize;

use crate::{
    climate::{apply_climate_swatch, ClimateRefiner, ClimateSummary, SwatchSummary},
    config::{load_tunables_from_env, MapgenTunables, MapgenTunablesHandle},
    corridors::{tag_strategic_corridors, CorridorStage, CorridorSummary},
    fields::WorldFields,
    islands::{seed_islands, IslandSummary},
    noise::ValueNoise,
    placement::{assign_start_positions, PlayerInfo, StartAssignment},
    rng::ChaChaMapRng,
    start_bias::{load_start_biases_from_env, StartBiasCatalog, StartBiasCatalogHandle},
    story::{
        tag_continental_margins, tag_hotspot_trails, tag_orogeny_belts, tag_rift_valleys,
        HotspotSummary, MarginSummary, OrogenySummary, RiftSummary,
    },
    tags::{CorridorMetadata, StoryTags},
    terrain::{DefaultTerrain, RiverSummary, TerrainStrategy},
    tile_grid::TileGrid,
};

/// Seed for the whole generation. Changing it triggers a regeneration on the
/// next app update.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapgenSeed(pub u64);

impl Default for MapgenSeed {
    fn default() -> Self {
        Self(0x5eed)
    }
}

impl MapgenSeed {
    pub fn from_phrase(phrase: &str) -> Self {
        Self(crate::rng::fnv1a_64(phrase.as_bytes()))
    }
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for MapDimensions {
    fn default() -> Self {
        Self {
            width: 84,
            height: 54,
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct PlayerRosterResource(pub Vec<PlayerInfo>);

impl PlayerRosterResource {
    /// `count` AI players cycling through the catalog's civilizations and leaders.
    /// Player 0 is human when `with_human` is set.
    pub fn sample(catalog: &StartBiasCatalog, count: u32, with_human: bool) -> Self {
        let civs = catalog.civilizations.len().max(1);
        let leaders = catalog.leaders.len().max(1);
        let id_at = |table: &[crate::start_bias::BiasProfile], i: usize| {
            table.get(i).map(|p| p.id.clone()).unwrap_or_default()
        };
        let players = (0..count)
            .map(|id| {
                let civ = id_at(&catalog.civilizations, id as usize % civs);
                let leader = id_at(&catalog.leaders, id as usize % leaders);
                if with_human && id == 0 {
                    PlayerInfo::human(id, civ, leader)
                } else {
                    PlayerInfo::ai(id, civ, leader)
                }
            })
            .collect();
        Self(players)
    }
}

/// Host terrain stages used by [`generate_map`]; [`DefaultTerrain`] when absent.
#[derive(Resource)]
pub struct TerrainStrategyResource(pub Box<dyn TerrainStrategy<TileGrid>>);

impl Default for TerrainStrategyResource {
    fn default() -> Self {
        Self(Box::new(DefaultTerrain))
    }
}

/// What each stage did during the last generation.
#[derive(Resource, Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub fields_enabled: bool,
    pub hotspots: HotspotSummary,
    pub rifts: RiftSummary,
    pub orogeny: OrogenySummary,
    pub margins: MarginSummary,
    pub corridors: CorridorSummary,
    pub islands: IslandSummary,
    pub swatch: Option<SwatchSummary>,
    pub rivers: RiverSummary,
    pub climate: ClimateSummary,
    pub land_tiles: usize,
    pub tag_counts: Vec<(&'static str, usize)>,
    pub placed: usize,
    pub failed: usize,
}

/// Everything one generation produces.
pub struct GeneratedMap {
    pub grid: TileGrid,
    pub fields: WorldFields,
    pub tags: StoryTags,
    pub corridors: CorridorMetadata,
    pub starts: StartAssignment,
    pub report: GenerationReport,
}

/// Run every stage on a fresh ocean grid. Stage order: landmass, fields,
/// hotspots, rifts, relief, orogeny, margins, pre-island corridors, islands,
/// baseline rainfall, swatch, rivers, river corridors, climate refinement,
/// biomes, start positions.
pub fn run_generation(
    seed: u64,
    dims: MapDimensions,
    tunables: &MapgenTunables,
    catalog: &StartBiasCatalog,
    roster: &[PlayerInfo],
    strategy: &dyn TerrainStrategy<TileGrid>,
) -> GeneratedMap {
    let toggles = &tunables.toggles;
    let story = &tunables.story;
    let dir = &tunables.world_model.directionality;
    let terrain = &tunables.terrain;

    let mut rng = ChaChaMapRng::seed_from_u64(seed);
    let mut noise = ValueNoise::new(seed);
    let mut grid = TileGrid::new(dims.width, dims.height);
    let mut fields = WorldFields::new();
    let mut tags = StoryTags::new();
    let mut corridors = CorridorMetadata::default();
    let mut report = GenerationReport {
        seed,
        width: dims.width,
        height: dims.height,
        ..GenerationReport::default()
    };

    tracing::info!(
        target: "mapgen::pipeline",
        seed,
        width = dims.width,
        height = dims.height,
        players = roster.len(),
        "pipeline.started"
    );

    let landmasses = strategy.shape_landmass(&mut grid, &mut noise, terrain);
    report.fields_enabled = fields.init(&grid, &mut rng, &tunables.world_model);

    if toggles.hotspots {
        report.hotspots = tag_hotspot_trails(&grid, &mut rng, &story.hotspot, &mut tags);
    }
    if toggles.rifts {
        report.rifts = tag_rift_valleys(&grid, &mut rng, &fields, &story.rift, dir, &mut tags);
    }

    strategy.shape_terrain(&mut grid, &mut noise, terrain);
    if toggles.orogeny {
        report.orogeny = tag_orogeny_belts(&grid, &fields, &story.orogeny, &mut tags);
    }
    if toggles.margins {
        report.margins = tag_continental_margins(&grid, &mut rng, &story.margins, &mut tags);
    }
    if toggles.corridors {
        report.corridors = tag_strategic_corridors(
            CorridorStage::PreIslands,
            &grid,
            &mut rng,
            &tunables.corridors,
            dir,
            &mut tags,
            &mut corridors,
        );
    }
    if toggles.islands {
        report.islands = seed_islands(
            &mut grid,
            &mut rng,
            &mut noise,
            &tunables.islands,
            &story.hotspot,
            tunables.corridors.sea.avoid_radius,
            &mut tags,
        );
    }

    strategy.baseline_rainfall(&mut grid, &mut noise, terrain);
    if toggles.swatches {
        report.swatch = apply_climate_swatch(&mut grid, &mut rng, &story.swatches, dir, &tags);
    }
    report.rivers = strategy.model_rivers(&mut grid, terrain);
    if toggles.corridors {
        let rivers = tag_strategic_corridors(
            CorridorStage::PostRivers,
            &grid,
            &mut rng,
            &tunables.corridors,
            dir,
            &mut tags,
            &mut corridors,
        );
        report.corridors.merge(rivers);
    }

    report.climate = ClimateRefiner::new(tunables, &fields, &tags).refine(&mut grid);
    strategy.designate_biomes(&mut grid);

    let starts = assign_start_positions(
        &grid,
        roster,
        catalog,
        landmasses,
        &tunables.placement,
        &mut rng,
    );

    report.land_tiles = grid.land_count();
    report.tag_counts = tags.counts();
    report.placed = starts.placements.len();
    report.failed = starts.failures.len();
    tracing::info!(
        target: "mapgen::pipeline",
        seed,
        land = report.land_tiles,
        rng_draws = rng.draws(),
        placed = report.placed,
        failed = report.failed,
        "pipeline.completed"
    );

    GeneratedMap {
        grid,
        fields,
        tags,
        corridors,
        starts,
        report,
    }
}

/// Exclusive system: read the generation inputs from `world`, run every stage
/// and store the results back as resources.
pub fn generate_map(world: &mut World) {
    let seed = world.get_resource::<MapgenSeed>().copied().unwrap_or_default();
    let dims = world
        .get_resource::<MapDimensions>()
        .copied()
        .unwrap_or_default();
    let tunables = world
        .get_resource::<MapgenTunablesHandle>()
        .map(MapgenTunablesHandle::get)
        .unwrap_or_else(MapgenTunables::builtin);
    let catalog: Arc<StartBiasCatalog> = world
        .get_resource::<StartBiasCatalogHandle>()
        .map(StartBiasCatalogHandle::get)
        .unwrap_or_else(StartBiasCatalog::builtin);
    let roster = world
        .get_resource::<PlayerRosterResource>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let strategy = world
        .remove_resource::<TerrainStrategyResource>()
        .unwrap_or_default();

    let map = run_generation(
        seed.0,
        dims,
        &tunables,
        &catalog,
        &roster,
        strategy.0.as_ref(),
    );

    world.insert_resource(strategy);
    world.insert_resource(map.grid);
    world.insert_resource(map.fields);
    world.insert_resource(map.tags);
    world.insert_resource(map.corridors);
    world.insert_resource(map.starts);
    world.insert_resource(map.report);
}

/// Construct a Bevy [`App`] that generates a map on its first update and
/// again whenever [`MapgenSeed`] changes.
pub fn build_mapgen_app() -> App {
    let mut app = App::new();

    let (tunables, metadata) = load_tunables_from_env();
    let catalog = load_start_biases_from_env();
    let roster = PlayerRosterResource::sample(&catalog, 6, true);

    app.insert_resource(MapgenSeed::default())
        .insert_resource(MapDimensions::default())
        .insert_resource(MapgenTunablesHandle::new(tunables))
        .insert_resource(metadata)
        .insert_resource(StartBiasCatalogHandle::new(catalog))
        .insert_resource(roster)
        .insert_resource(TerrainStrategyResource::default())
        .add_plugins(MinimalPlugins)
        .add_systems(Update, generate_map.run_if(resource_changed::<MapgenSeed>));

    app
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MapDimensions {
        MapDimensions {
            width: 48,
            height: 32,
        }
    }

    #[test]
    fn sample_roster_cycles_the_catalog() {
        let catalog = StartBiasCatalog::builtin();
        let roster = PlayerRosterResource::sample(&catalog, 10, true);
        assert_eq!(roster.0.len(), 10);
        assert!(roster.0[0].human);
        assert!(roster.0[1..].iter().all(|p| !p.human));
        assert_eq!(roster.0[0].civilization, catalog.civilizations[0].id);
        let civs = catalog.civilizations.len();
        assert_eq!(roster.0[civs].civilization, roster.0[0].civilization);
    }

    #[test]
    fn seed_phrases_are_stable() {
        assert_eq!(MapgenSeed::from_phrase("pangaea"), MapgenSeed::from_phrase("pangaea"));
        assert_ne!(MapgenSeed::from_phrase("pangaea"), MapgenSeed::from_phrase("archipelago"));
    }

    #[test]
    fn disabled_toggles_leave_story_tags_empty() {
        let mut tunables = MapgenTunables::default();
        tunables.toggles.hotspots = false;
        tunables.toggles.rifts = false;
        tunables.toggles.orogeny = false;
        tunables.toggles.margins = false;
        tunables.toggles.corridors = false;
        tunables.toggles.islands = false;
        tunables.toggles.swatches = false;
        let map = run_generation(
            3,
            small(),
            &tunables,
            &StartBiasCatalog::default(),
            &[],
            &DefaultTerrain,
        );
        assert!(map.tags.is_empty());
        assert!(map.report.swatch.is_none());
        assert!(map.starts.placements.is_empty());
        assert!(map.report.land_tiles > 0);
    }

    #[test]
    fn report_matches_outputs() {
        let catalog = StartBiasCatalog::builtin();
        let roster = PlayerRosterResource::sample(&catalog, 4, false);
        let map = run_generation(
            11,
            small(),
            &MapgenTunables::default(),
            &catalog,
            &roster.0,
            &DefaultTerrain,
        );
        assert_eq!(map.report.placed, map.starts.placements.len());
        assert_eq!(map.report.failed, map.starts.failures.len());
        assert_eq!(map.report.placed + map.report.failed, 4);
        assert_eq!(map.report.land_tiles, map.grid.land_count());
        for (name, count) in map.tags.counts() {
            let reported = map
                .report
                .tag_counts
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, c)| *c);
            assert_eq!(reported, Some(count));
        }
    }
}
