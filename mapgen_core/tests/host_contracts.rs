//! Every stage degrades to an empty result on a host without usable accessors.

use mapgen_core::{
    climate::apply_climate_swatch,
    config::MapgenTunables,
    corridors::{tag_strategic_corridors, CorridorStage},
    islands::seed_islands,
    story::{tag_continental_margins, tag_hotspot_trails, tag_orogeny_belts, tag_rift_valleys},
    assign_start_positions, Biome, ClimateRefiner, CorridorMetadata, FeatureClass, FeatureId,
    FeaturePlacement, PlayerInfo, Region, ResourceId, ScriptedRng, StartBiasCatalog, StoryTags,
    Terrain, TerrainMutation, TerrainQuery, TileGrid, ValueNoise, WorldFields,
};

/// Wraps a real grid but reports itself unavailable, as a partially loaded
/// engine would.
struct OfflineHost {
    inner: TileGrid,
    writes: usize,
}

impl TerrainQuery for OfflineHost {
    fn width(&self) -> u32 {
        self.inner.width()
    }
    fn height(&self) -> u32 {
        self.inner.height()
    }
    fn is_water(&self, x: u32, y: u32) -> bool {
        self.inner.is_water(x, y)
    }
    fn is_mountain(&self, x: u32, y: u32) -> bool {
        self.inner.is_mountain(x, y)
    }
    fn is_lake(&self, x: u32, y: u32) -> bool {
        self.inner.is_lake(x, y)
    }
    fn is_river(&self, x: u32, y: u32) -> bool {
        self.inner.is_river(x, y)
    }
    fn is_natural_wonder(&self, x: u32, y: u32) -> bool {
        self.inner.is_natural_wonder(x, y)
    }
    fn elevation(&self, x: u32, y: u32) -> i32 {
        self.inner.elevation(x, y)
    }
    fn rainfall(&self, x: u32, y: u32) -> i32 {
        self.inner.rainfall(x, y)
    }
    fn latitude(&self, x: u32, y: u32) -> f32 {
        self.inner.latitude(x, y)
    }
    fn biome(&self, x: u32, y: u32) -> Biome {
        self.inner.biome(x, y)
    }
    fn terrain(&self, x: u32, y: u32) -> Terrain {
        self.inner.terrain(x, y)
    }
    fn feature(&self, x: u32, y: u32) -> Option<FeatureId> {
        self.inner.feature(x, y)
    }
    fn feature_class(&self, x: u32, y: u32) -> Option<FeatureClass> {
        self.inner.feature_class(x, y)
    }
    fn resource(&self, x: u32, y: u32) -> Option<ResourceId> {
        self.inner.resource(x, y)
    }
    fn continent(&self, x: u32, y: u32) -> Option<u32> {
        self.inner.continent(x, y)
    }
    fn fertility(&self, x: u32, y: u32) -> i32 {
        self.inner.fertility(x, y)
    }
    fn is_available(&self) -> bool {
        false
    }
}

impl TerrainMutation for OfflineHost {
    fn set_terrain(&mut self, _x: u32, _y: u32, _terrain: Terrain) {
        self.writes += 1;
    }
    fn set_biome(&mut self, _x: u32, _y: u32, _biome: Biome) {
        self.writes += 1;
    }
    fn set_feature(&mut self, _x: u32, _y: u32, _placement: FeaturePlacement) {
        self.writes += 1;
    }
    fn set_rainfall(&mut self, _x: u32, _y: u32, _value: i32) {
        self.writes += 1;
    }
    fn set_elevation(&mut self, _x: u32, _y: u32, _value: i32) {
        self.writes += 1;
    }
}

fn offline() -> OfflineHost {
    let mut inner = TileGrid::new(32, 24);
    inner.fill_land(6, 6, 25, 17, 300);
    OfflineHost { inner, writes: 0 }
}

#[test]
fn stages_are_no_ops_without_a_host() {
    let tunables = MapgenTunables::default();
    let mut host = offline();
    let mut rng = ScriptedRng::new(vec![1; 64]);
    let mut noise = ValueNoise::new(1);
    let mut fields = WorldFields::new();
    let mut tags = StoryTags::new();
    let mut meta = CorridorMetadata::default();
    let dir = &tunables.world_model.directionality;

    assert!(!fields.init(&host, &mut rng, &tunables.world_model));
    assert!(!fields.is_enabled());

    tag_hotspot_trails(&host, &mut rng, &tunables.story.hotspot, &mut tags);
    tag_rift_valleys(&host, &mut rng, &fields, &tunables.story.rift, dir, &mut tags);
    tag_orogeny_belts(&host, &fields, &tunables.story.orogeny, &mut tags);
    tag_continental_margins(&host, &mut rng, &tunables.story.margins, &mut tags);
    tag_strategic_corridors(
        CorridorStage::PreIslands,
        &host,
        &mut rng,
        &tunables.corridors,
        dir,
        &mut tags,
        &mut meta,
    );
    seed_islands(
        &mut host,
        &mut rng,
        &mut noise,
        &tunables.islands,
        &tunables.story.hotspot,
        2,
        &mut tags,
    );
    assert!(tags.is_empty());
    assert!(meta.kind.is_empty());

    assert!(apply_climate_swatch(&mut host, &mut rng, &tunables.story.swatches, dir, &tags).is_none());
    let climate = ClimateRefiner::new(&tunables, &fields, &tags).refine(&mut host);
    assert_eq!(climate, Default::default());
    assert_eq!(host.writes, 0);

    let players = vec![PlayerInfo::ai(0, "rome", "augustus")];
    let starts = assign_start_positions(
        &host,
        &players,
        &StartBiasCatalog::default(),
        [Region::new(0, 0, 15, 23), Region::new(16, 0, 31, 23)],
        &tunables.placement,
        &mut rng,
    );
    assert!(starts.placements.is_empty());
    assert_eq!(rng.consumed(), 0);
}
