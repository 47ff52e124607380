//! Procedural map generation for tile-based strategy maps.
//!
//! Generation runs against host grid traits ([`TerrainQuery`],
//! [`TerrainMutation`]) and a labelled random stream ([`MapRng`]). The
//! in-memory [`TileGrid`] plus [`DefaultTerrain`] make a complete host; a game
//! engine plugs in its own. [`build_mapgen_app`] wires everything into a bevy
//! [`App`](bevy::prelude::App) that regenerates whenever [`MapgenSeed`] changes.

pub mod climate;
pub mod config;
pub mod corridors;
pub mod fields;
pub mod grid;
pub mod islands;
pub mod noise;
mod pipeline;
pub mod placement;
pub mod rng;
pub mod start_bias;
pub mod story;
pub mod tags;
pub mod terrain;
mod tile_grid;

pub use climate::{ClimateRefiner, ClimateSummary, SwatchKind};
pub use config::{
    load_tunables_from_env, MapgenTunables, MapgenTunablesHandle, PartitionPolicy,
    TunablesError, TunablesMetadata,
};
pub use fields::{BoundaryType, WorldFields};
pub use grid::{
    Biome, FeatureClass, FeatureId, FeaturePlacement, ResourceId, Terrain, TerrainHost,
    TerrainMutation, TerrainQuery,
};
pub use noise::{NoiseService, ValueNoise};
pub use pipeline::{
    build_mapgen_app, generate_map, run_generation, GeneratedMap, GenerationReport, MapDimensions,
    MapgenSeed, PlayerRosterResource, TerrainStrategyResource,
};
pub use placement::{
    assign_start_positions, PlayerInfo, PlayerRoster, Region, StartAssignment,
};
pub use rng::{ChaChaMapRng, MapRng, ScriptedRng};
pub use start_bias::{
    load_start_biases_from_env, BiasCatalogError, BiasDatabase, BiasProfile, StartBiasCatalog,
    StartBiasCatalogHandle,
};
pub use tags::{CorridorKind, CorridorMetadata, CorridorStyle, StoryTags};
pub use terrain::{DefaultTerrain, TerrainStrategy};
pub use tile_grid::{GridError, TileFlags, TileGrid, HILL_ELEVATION, MOUNTAIN_ELEVATION};
