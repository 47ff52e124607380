use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_MAPGEN_TUNABLES: &str = include_str!("data/mapgen_tunables.json");

/// Every knob the generator reads. Missing keys fall back to the defaults below,
/// so a partial JSON override only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct MapgenTunables {
    pub toggles: StoryToggles,
    pub world_model: WorldModelTunables,
    pub story: StoryTunables,
    pub corridors: CorridorTunables,
    pub islands: IslandTunables,
    pub microclimate: MicroclimateTunables,
    pub climate: ClimateTunables,
    pub placement: PlacementTunables,
    pub terrain: TerrainTunables,
}

impl MapgenTunables {
    pub fn builtin() -> Arc<Self> {
        Self::from_json_str(BUILTIN_MAPGEN_TUNABLES)
            .map(Arc::new)
            .expect("builtin mapgen tunables should parse")
    }

    pub fn from_json_str(input: &str) -> Result<Self, TunablesError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, TunablesError> {
        let contents = fs::read_to_string(path).map_err(|source| TunablesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[derive(Debug, Error)]
pub enum TunablesError {
    #[error("failed to parse mapgen tunables: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read mapgen tunables from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoryToggles {
    pub hotspots: bool,
    pub rifts: bool,
    pub orogeny: bool,
    pub margins: bool,
    pub swatches: bool,
    pub corridors: bool,
    pub islands: bool,
}

impl Default for StoryToggles {
    fn default() -> Self {
        Self {
            hotspots: true,
            rifts: true,
            orogeny: true,
            margins: true,
            swatches: true,
            corridors: true,
            islands: true,
        }
    }
}

// --- world model -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldModelTunables {
    pub enabled: bool,
    pub plates: PlateTunables,
    pub wind: WindTunables,
    pub pressure: PressureTunables,
    pub directionality: DirectionalityTunables,
}

impl Default for WorldModelTunables {
    fn default() -> Self {
        Self {
            enabled: true,
            plates: PlateTunables::default(),
            wind: WindTunables::default(),
            pressure: PressureTunables::default(),
            directionality: DirectionalityTunables::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlateTunables {
    pub count: u32,
    pub axis_angles: Vec<f32>,
    /// 0..1 share of boundary rolls that come out convergent.
    pub convergence_mix: f32,
    pub seed_jitter: u32,
    /// Boundary closeness a tile needs before it gets a boundary type.
    pub boundary_threshold: u8,
}

impl Default for PlateTunables {
    fn default() -> Self {
        Self {
            count: 8,
            axis_angles: vec![0.0, 30.0, -20.0],
            convergence_mix: 0.5,
            seed_jitter: 2,
            boundary_threshold: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindTunables {
    pub jet_streaks: u32,
    pub jet_strength: f32,
    pub variance: f32,
}

impl Default for WindTunables {
    fn default() -> Self {
        Self {
            jet_streaks: 3,
            jet_strength: 1.0,
            variance: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PressureTunables {
    pub bumps: u32,
    pub amplitude: f32,
    /// Gaussian sigma as a fraction of `min(width, height)`.
    pub scale: f32,
}

impl Default for PressureTunables {
    fn default() -> Self {
        Self {
            bumps: 4,
            amplitude: 0.6,
            scale: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct DirectionalityTunables {
    /// 0..1 master dial; 0 disables every directional bias.
    pub cohesion: f32,
    pub primary_axes: PrimaryAxes,
    pub interplay: Interplay,
    pub hemispheres: Hemispheres,
    pub variability: Variability,
}

impl DirectionalityTunables {
    pub fn cohesion(&self) -> f32 {
        self.cohesion.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct PrimaryAxes {
    pub plate_axis_deg: f32,
    pub wind_bias_deg: f32,
    pub current_bias_deg: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Interplay {
    pub winds_follow_plates: f32,
    pub currents_follow_winds: f32,
    pub rifts_follow_plates: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Hemispheres {
    pub southern_flip: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Variability {
    pub angle_jitter_deg: u32,
    pub magnitude_variance: f32,
}

impl Default for Variability {
    fn default() -> Self {
        Self {
            angle_jitter_deg: 0,
            magnitude_variance: 0.35,
        }
    }
}

// --- narrative motifs --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct StoryTunables {
    pub hotspot: HotspotTunables,
    pub rift: RiftTunables,
    pub orogeny: OrogenyTunables,
    pub margins: MarginTunables,
    pub swatches: SwatchTunables,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HotspotTunables {
    pub max_trails: u32,
    pub steps: u32,
    pub step_len: u32,
    pub min_dist_from_land: u32,
    pub min_trail_separation: u32,
    pub paradise_bias: u32,
    pub volcanic_bias: u32,
    /// Percent chance a volcanic centre surfaces as land.
    pub volcanic_peak_chance: u32,
}

impl Default for HotspotTunables {
    fn default() -> Self {
        Self {
            max_trails: 12,
            steps: 15,
            step_len: 2,
            min_dist_from_land: 5,
            min_trail_separation: 12,
            paradise_bias: 2,
            volcanic_bias: 1,
            volcanic_peak_chance: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiftTunables {
    pub max_rifts_per_map: u32,
    pub line_steps: u32,
    pub step_len: u32,
    pub shoulder_width: u32,
    pub max_latitude: f32,
    pub max_elevation: i32,
    /// Follow divergent plate boundaries when plate fields are available.
    pub use_plate_fields: bool,
}

impl Default for RiftTunables {
    fn default() -> Self {
        Self {
            max_rifts_per_map: 3,
            line_steps: 18,
            step_len: 2,
            shoulder_width: 1,
            max_latitude: 70.0,
            max_elevation: 500,
            use_plate_fields: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrogenyTunables {
    pub belt_min_length: u32,
    pub radius: u32,
    pub high_elevation: i32,
    pub windward_boost: i32,
    pub lee_dryness_amplifier: f32,
}

impl Default for OrogenyTunables {
    fn default() -> Self {
        Self {
            belt_min_length: 30,
            radius: 2,
            high_elevation: 500,
            windward_boost: 5,
            lee_dryness_amplifier: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarginTunables {
    pub active_fraction: f32,
    pub passive_fraction: f32,
    pub min_segment_length: u32,
}

impl Default for MarginTunables {
    fn default() -> Self {
        Self {
            active_fraction: 0.25,
            passive_fraction: 0.25,
            min_segment_length: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwatchTunables {
    /// Band half-widths grow by `1 + width_mul_sqrt * (size_scale - 1)`.
    pub width_mul_sqrt: f32,
    pub macro_desert_belt: SwatchKindTunables,
    pub equatorial_rainbelt: SwatchKindTunables,
    pub rainforest_archipelago: SwatchKindTunables,
    pub mountain_forests: SwatchKindTunables,
    pub great_plains: SwatchKindTunables,
}

impl Default for SwatchTunables {
    fn default() -> Self {
        Self {
            width_mul_sqrt: 0.3,
            macro_desert_belt: SwatchKindTunables {
                weight: 8,
                latitude_center_deg: 20.0,
                half_width_deg: 12.0,
                delta: 28,
                ..SwatchKindTunables::default()
            },
            equatorial_rainbelt: SwatchKindTunables {
                weight: 3,
                latitude_center_deg: 0.0,
                half_width_deg: 10.0,
                delta: 24,
                ..SwatchKindTunables::default()
            },
            rainforest_archipelago: SwatchKindTunables {
                weight: 7,
                delta: 18,
                ..SwatchKindTunables::default()
            },
            mountain_forests: SwatchKindTunables {
                weight: 2,
                delta: 6,
                lee_penalty: 2,
                ..SwatchKindTunables::default()
            },
            great_plains: SwatchKindTunables {
                weight: 5,
                latitude_center_deg: 45.0,
                half_width_deg: 8.0,
                delta: 12,
                lowland_max_elevation: 300,
                ..SwatchKindTunables::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwatchKindTunables {
    pub weight: u32,
    pub latitude_center_deg: f32,
    pub half_width_deg: f32,
    /// Rainfall magnitude; the sign is implied by the swatch kind.
    pub delta: i32,
    pub lee_penalty: i32,
    pub lowland_max_elevation: i32,
}

impl Default for SwatchKindTunables {
    fn default() -> Self {
        Self {
            weight: 0,
            latitude_center_deg: 0.0,
            half_width_deg: 10.0,
            delta: 0,
            lee_penalty: 0,
            lowland_max_elevation: 300,
        }
    }
}

// --- corridors ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct CorridorTunables {
    pub sea: SeaLaneTunables,
    pub island_hop: IslandHopTunables,
    pub land: LandCorridorTunables,
    pub river: RiverChainTunables,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeaLaneTunables {
    pub max_lanes: u32,
    pub min_length_frac: f32,
    pub scan_stride: u32,
    /// Island seeding keeps this far from lane tiles.
    pub avoid_radius: u32,
    pub prefer_diagonals: bool,
    pub lane_spacing: u32,
    pub min_channel_width: u32,
}

impl Default for SeaLaneTunables {
    fn default() -> Self {
        Self {
            max_lanes: 3,
            min_length_frac: 0.7,
            scan_stride: 6,
            avoid_radius: 2,
            prefer_diagonals: false,
            lane_spacing: 6,
            min_channel_width: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IslandHopTunables {
    pub use_hotspots: bool,
    pub max_arcs: u32,
}

impl Default for IslandHopTunables {
    fn default() -> Self {
        Self {
            use_hotspots: true,
            max_arcs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandCorridorTunables {
    pub use_rift_shoulders: bool,
    pub max_corridors: u32,
    pub min_run_length: u32,
    /// Minimum row distance between chosen corridors.
    pub spacing: u32,
}

impl Default for LandCorridorTunables {
    fn default() -> Self {
        Self {
            use_rift_shoulders: true,
            max_corridors: 2,
            min_run_length: 24,
            spacing: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiverChainTunables {
    pub max_chains: u32,
    pub max_steps: u32,
    pub prefer_lowland_below: i32,
    pub coast_seed_radius: u32,
    pub min_tiles: u32,
    pub must_end_near_coast: bool,
}

impl Default for RiverChainTunables {
    fn default() -> Self {
        Self {
            max_chains: 2,
            max_steps: 80,
            prefer_lowland_below: 300,
            coast_seed_radius: 2,
            min_tiles: 0,
            must_end_near_coast: false,
        }
    }
}

// --- islands -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IslandTunables {
    pub fractal_frequency: f32,
    /// Fractal percentile a tile must exceed to seed a regular island.
    pub fractal_threshold_percent: f32,
    pub min_dist_from_land_radius: u32,
    pub base_island_den_near_active: u32,
    pub base_island_den_else: u32,
    pub hotspot_seed_denom: u32,
    pub cluster_max: u32,
}

impl Default for IslandTunables {
    fn default() -> Self {
        Self {
            fractal_frequency: 8.0,
            fractal_threshold_percent: 90.0,
            min_dist_from_land_radius: 2,
            base_island_den_near_active: 5,
            base_island_den_else: 7,
            hotspot_seed_denom: 2,
            cluster_max: 3,
        }
    }
}

// --- climate -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct MicroclimateTunables {
    pub rainfall: MicroclimateRainfall,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MicroclimateRainfall {
    pub rift_boost: i32,
    pub rift_radius: u32,
    pub paradise_delta: i32,
    pub volcanic_delta: i32,
    pub hotspot_radius: u32,
}

impl Default for MicroclimateRainfall {
    fn default() -> Self {
        Self {
            rift_boost: 8,
            rift_radius: 2,
            paradise_delta: 6,
            volcanic_delta: 8,
            hotspot_radius: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClimateTunables {
    pub coastal_max_radius: u32,
    pub coastal_step_bonus: i32,
    pub coastal_lowland_elevation: i32,
    pub coastal_lowland_bonus: i32,
    pub shadow_upwind_steps: u32,
    pub shadow_barrier_elevation: i32,
    pub shadow_base: i32,
    pub shadow_per_step: i32,
    pub river_low_elevation: i32,
    pub river_low_bonus: i32,
    pub river_high_bonus: i32,
    pub basin_radius: u32,
    pub basin_margin: i32,
    pub basin_max_elevation: i32,
    pub basin_bonus: i32,
    pub rift_elevation_base: i32,
    pub rift_elevation_step: i32,
    pub lee_base: i32,
}

impl Default for ClimateTunables {
    fn default() -> Self {
        Self {
            coastal_max_radius: 4,
            coastal_step_bonus: 4,
            coastal_lowland_elevation: 150,
            coastal_lowland_bonus: 2,
            shadow_upwind_steps: 4,
            shadow_barrier_elevation: 500,
            shadow_base: 8,
            shadow_per_step: 6,
            river_low_elevation: 250,
            river_low_bonus: 14,
            river_high_bonus: 10,
            basin_radius: 2,
            basin_margin: 20,
            basin_max_elevation: 200,
            basin_bonus: 6,
            rift_elevation_base: 200,
            rift_elevation_step: 150,
            lee_base: 8,
        }
    }
}

// --- placement ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// Humans pinned to the designated homeland group when it can hold them.
    #[default]
    PrimaryHemisphere,
    /// Everyone shuffled together, then sliced by capacity.
    EvenSplit,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementTunables {
    pub required_buffer: u32,
    pub desired_buffer: u32,
    pub bias_radius: u32,
    pub partition: PartitionPolicy,
    /// Player caps for the west and east landmasses. Derived from the roster when absent.
    pub landmass_capacities: Option<[u32; 2]>,
}

impl Default for PlacementTunables {
    fn default() -> Self {
        Self {
            required_buffer: 6,
            desired_buffer: 12,
            bias_radius: 3,
            partition: PartitionPolicy::PrimaryHemisphere,
            landmass_capacities: None,
        }
    }
}

// --- default terrain strategy ------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainTunables {
    pub land_frequency: f32,
    /// Share of the map (percent) that ends up under water.
    pub water_percent: f32,
    pub ocean_columns: u32,
    pub polar_rows: u32,
    pub max_elevation: i32,
    pub mountain_percent: f32,
    pub river_min_accum: u32,
    pub navigable_river_accum: u32,
}

impl Default for TerrainTunables {
    fn default() -> Self {
        Self {
            land_frequency: 3.0,
            water_percent: 60.0,
            ocean_columns: 4,
            polar_rows: 2,
            max_elevation: 1200,
            mountain_percent: 93.0,
            river_min_accum: 8,
            navigable_river_accum: 40,
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct MapgenTunablesHandle(Arc<MapgenTunables>);

impl MapgenTunablesHandle {
    pub fn new(tunables: Arc<MapgenTunables>) -> Self {
        Self(tunables)
    }

    pub fn get(&self) -> Arc<MapgenTunables> {
        self.0.clone()
    }
}

#[derive(Resource, Debug, Clone)]
pub struct TunablesMetadata {
    path: Option<PathBuf>,
}

impl TunablesMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Load tunables from `MAPGEN_TUNABLES_PATH`, falling back to the embedded defaults.
pub fn load_tunables_from_env() -> (Arc<MapgenTunables>, TunablesMetadata) {
    if let Some(path) = env::var("MAPGEN_TUNABLES_PATH").ok().map(PathBuf::from) {
        match MapgenTunables::from_file(&path) {
            Ok(tunables) => {
                tracing::info!(
                    target: "mapgen::config",
                    path = %path.display(),
                    "tunables.loaded=file"
                );
                return (Arc::new(tunables), TunablesMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "mapgen::config",
                    path = %path.display(),
                    error = %err,
                    "tunables.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "mapgen::config", "tunables.loaded=builtin");
    (MapgenTunables::builtin(), TunablesMetadata::new(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tunables_parse() {
        let tunables = MapgenTunables::builtin();
        assert!(tunables.world_model.enabled);
        assert!(tunables.world_model.plates.count >= 2);
        assert!(tunables.placement.desired_buffer > tunables.placement.required_buffer);
    }

    #[test]
    fn builtin_tunables_match_defaults() {
        assert_eq!(*MapgenTunables::builtin(), MapgenTunables::default());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let tunables = MapgenTunables::from_json_str(
            r#"{ "story": { "hotspot": { "max_trails": 3 } }, "placement": { "partition": "even_split" } }"#,
        )
        .unwrap();
        assert_eq!(tunables.story.hotspot.max_trails, 3);
        assert_eq!(tunables.story.hotspot.steps, 15);
        assert_eq!(tunables.story.rift.max_rifts_per_map, 3);
        assert_eq!(tunables.placement.partition, PartitionPolicy::EvenSplit);
        assert_eq!(tunables.story.swatches.macro_desert_belt.weight, 8);
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let err = MapgenTunables::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TunablesError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = MapgenTunables::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        match err {
            TunablesError::Read { path, .. } => {
                assert!(path.ends_with("here.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
