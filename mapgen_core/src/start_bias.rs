use std::{
    collections::HashSet,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

use crate::grid::{Biome, FeatureClass, ResourceId, Terrain};

pub const BUILTIN_START_BIASES: &str = include_str!("data/start_biases.json");

/// Affinity lookup keyed by civilization or leader id.
pub trait BiasDatabase {
    fn civilization(&self, id: &str) -> Option<&BiasProfile>;
    fn leader(&self, id: &str) -> Option<&BiasProfile>;

    /// Profiles that apply to a player: the civilization entry, then the leader entry.
    fn profiles_for<'a>(&'a self, civ: &str, leader: &str) -> Vec<&'a BiasProfile> {
        self.civilization(civ)
            .into_iter()
            .chain(self.leader(leader))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BiomeBias {
    pub biome: Biome,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TerrainBias {
    pub terrain: Terrain,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FeatureClassBias {
    pub class: FeatureClass,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ResourceBias {
    pub resource: ResourceId,
    pub score: i32,
}

/// One civilization's or leader's start preferences. Scalar entries are zero
/// when the table has nothing for that category.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BiasProfile {
    pub id: String,
    pub biomes: Vec<BiomeBias>,
    pub terrains: Vec<TerrainBias>,
    pub feature_classes: Vec<FeatureClassBias>,
    pub resources: Vec<ResourceBias>,
    pub river: i32,
    pub natural_wonder: i32,
    pub lake: i32,
    pub coast: i32,
}

impl BiasProfile {
    pub fn navigable_river(&self) -> i32 {
        self.terrains
            .iter()
            .filter(|entry| entry.terrain == Terrain::NavigableRiver)
            .map(|entry| entry.score)
            .sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartBiasCatalog {
    pub version: u32,
    pub civilizations: Vec<BiasProfile>,
    pub leaders: Vec<BiasProfile>,
}

impl StartBiasCatalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_START_BIASES)
                .expect("builtin start bias catalog should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, BiasCatalogError> {
        let mut catalog: StartBiasCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, BiasCatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| BiasCatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn validate(&mut self) -> Result<(), BiasCatalogError> {
        for table in [&mut self.civilizations, &mut self.leaders] {
            let mut seen = HashSet::new();
            for profile in table.iter_mut() {
                profile.id.make_ascii_lowercase();
                if !seen.insert(profile.id.clone()) {
                    return Err(BiasCatalogError::DuplicateEntry(profile.id.clone()));
                }
            }
        }
        Ok(())
    }
}

impl BiasDatabase for StartBiasCatalog {
    fn civilization(&self, id: &str) -> Option<&BiasProfile> {
        self.civilizations
            .iter()
            .find(|profile| profile.id.eq_ignore_ascii_case(id))
    }

    fn leader(&self, id: &str) -> Option<&BiasProfile> {
        self.leaders
            .iter()
            .find(|profile| profile.id.eq_ignore_ascii_case(id))
    }
}

#[derive(Debug, Error)]
pub enum BiasCatalogError {
    #[error("failed to parse start bias catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read start bias catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("duplicate start bias entry {0}")]
    DuplicateEntry(String),
}

#[derive(Resource, Debug, Clone)]
pub struct StartBiasCatalogHandle(Arc<StartBiasCatalog>);

impl StartBiasCatalogHandle {
    pub fn new(catalog: Arc<StartBiasCatalog>) -> Self {
        Self(catalog)
    }

    pub fn get(&self) -> Arc<StartBiasCatalog> {
        self.0.clone()
    }
}

impl Default for StartBiasCatalogHandle {
    fn default() -> Self {
        Self::new(StartBiasCatalog::builtin())
    }
}

/// Load the catalog from `START_BIASES_PATH`, falling back to the embedded table.
pub fn load_start_biases_from_env() -> Arc<StartBiasCatalog> {
    if let Some(path) = env::var("START_BIASES_PATH").ok().map(PathBuf::from) {
        match StartBiasCatalog::from_file(&path) {
            Ok(catalog) => {
                tracing::info!(
                    target: "mapgen::config",
                    path = %path.display(),
                    civilizations = catalog.civilizations.len(),
                    leaders = catalog.leaders.len(),
                    "start_biases.loaded=file"
                );
                return Arc::new(catalog);
            }
            Err(err) => {
                tracing::warn!(
                    target: "mapgen::config",
                    path = %path.display(),
                    error = %err,
                    "start_biases.load_failed"
                );
            }
        }
    }
    StartBiasCatalog::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = StartBiasCatalog::builtin();
        assert!(!catalog.civilizations.is_empty());
        assert!(!catalog.leaders.is_empty());
    }

    #[test]
    fn lookups_ignore_case() {
        let catalog = StartBiasCatalog::from_json_str(
            r#"{
                "civilizations": [
                    { "id": "Egypt", "terrains": [{ "terrain": "navigable_river", "score": 5 }] }
                ],
                "leaders": [
                    { "id": "hatshepsut", "biomes": [{ "biome": "desert", "score": 2 }], "coast": 3 }
                ]
            }"#,
        )
        .unwrap();
        let civ = catalog.civilization("EGYPT").unwrap();
        assert_eq!(civ.navigable_river(), 5);
        let profiles = catalog.profiles_for("egypt", "Hatshepsut");
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].coast, 3);
        assert!(catalog.profiles_for("rome", "nobody").is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = StartBiasCatalog::from_json_str(
            r#"{ "civilizations": [ { "id": "rome" }, { "id": "ROME" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, BiasCatalogError::DuplicateEntry(id) if id == "rome"));
    }

    #[test]
    fn same_id_may_appear_as_civ_and_leader() {
        let catalog = StartBiasCatalog::from_json_str(
            r#"{ "civilizations": [ { "id": "maya" } ], "leaders": [ { "id": "maya" } ] }"#,
        )
        .unwrap();
        assert_eq!(catalog.profiles_for("maya", "maya").len(), 2);
    }

    #[test]
    fn unknown_biome_reports_parse_error() {
        let err = StartBiasCatalog::from_json_str(
            r#"{ "civilizations": [ { "id": "x", "biomes": [{ "biome": "lava", "score": 1 }] } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, BiasCatalogError::Parse(_)));
    }
}
