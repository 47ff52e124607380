use bevy::prelude::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{
    Biome, FeatureClass, FeatureId, FeaturePlacement, ResourceId, Terrain, TerrainMutation,
    TerrainQuery,
};

/// Elevation at or above which [`TileGrid::from_elevation`] raises mountains.
pub const MOUNTAIN_ELEVATION: i32 = 800;
/// Elevation at or above which [`TileGrid::from_elevation`] raises hills.
pub const HILL_ELEVATION: i32 = 450;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TileFlags: u8 {
        const WATER = 1 << 0;
        const LAKE = 1 << 1;
        const RIVER = 1 << 2;
        const NATURAL_WONDER = 1 << 3;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid data has {actual} tiles, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("grid dimensions must be non-zero")]
    EmptyGrid,
}

/// In-memory host map used by the default pipeline and by tests.
#[derive(Resource, Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    top_latitude: f32,
    bottom_latitude: f32,
    terrain: Vec<Terrain>,
    biome: Vec<Biome>,
    elevation: Vec<i32>,
    rainfall: Vec<i32>,
    flags: Vec<TileFlags>,
    features: Vec<Option<FeaturePlacement>>,
    resources: Vec<Option<ResourceId>>,
    continents: Vec<Option<u32>>,
    fertility: Vec<Option<i32>>,
}

impl TileGrid {
    /// An all-ocean grid spanning latitudes 80N to 80S.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            top_latitude: 80.0,
            bottom_latitude: -80.0,
            terrain: vec![Terrain::Ocean; len],
            biome: vec![Biome::Marine; len],
            elevation: vec![0; len],
            rainfall: vec![0; len],
            flags: vec![TileFlags::WATER; len],
            features: vec![None; len],
            resources: vec![None; len],
            continents: vec![None; len],
            fertility: vec![None; len],
        }
    }

    /// Build from a row-major elevation buffer. Tiles below `sea_level` become
    /// ocean; land is banded into flat, hill and mountain terrain.
    pub fn from_elevation(
        width: u32,
        height: u32,
        elevation: Vec<i32>,
        sea_level: i32,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        let expected = (width * height) as usize;
        if elevation.len() != expected {
            return Err(GridError::DimensionMismatch {
                expected,
                actual: elevation.len(),
            });
        }
        let mut grid = Self::new(width, height);
        for (i, &e) in elevation.iter().enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            if e < sea_level {
                grid.elevation[i] = e;
            } else {
                grid.set_land(x, y, e);
            }
        }
        Ok(grid)
    }

    pub fn with_latitude_range(mut self, top: f32, bottom: f32) -> Self {
        self.top_latitude = top;
        self.bottom_latitude = bottom;
        self
    }

    #[inline]
    fn idx(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y * self.width + x) as usize
    }

    /// Turn a tile into land, picking terrain from its elevation.
    pub fn set_land(&mut self, x: u32, y: u32, elevation: i32) {
        let i = self.idx(x, y);
        self.elevation[i] = elevation;
        self.terrain[i] = if elevation >= MOUNTAIN_ELEVATION {
            Terrain::Mountain
        } else if elevation >= HILL_ELEVATION {
            Terrain::Hill
        } else {
            Terrain::Flat
        };
        self.flags[i].remove(TileFlags::WATER | TileFlags::LAKE);
        if self.biome[i] == Biome::Marine {
            self.biome[i] = Biome::Plains;
        }
    }

    pub fn set_water(&mut self, x: u32, y: u32) {
        let i = self.idx(x, y);
        self.terrain[i] = Terrain::Ocean;
        self.biome[i] = Biome::Marine;
        self.flags[i].insert(TileFlags::WATER);
        self.flags[i].remove(TileFlags::LAKE | TileFlags::RIVER);
    }

    pub fn set_lake(&mut self, x: u32, y: u32) {
        self.set_water(x, y);
        let i = self.idx(x, y);
        self.terrain[i] = Terrain::Coast;
        self.flags[i].insert(TileFlags::LAKE);
    }

    /// Fill an inclusive rectangle with land of a fixed elevation.
    pub fn fill_land(&mut self, west: u32, south: u32, east: u32, north: u32, elevation: i32) {
        for y in south..=north.min(self.height.saturating_sub(1)) {
            for x in west..=east.min(self.width.saturating_sub(1)) {
                self.set_land(x, y, elevation);
            }
        }
    }

    pub fn set_river(&mut self, x: u32, y: u32, river: bool) {
        let i = self.idx(x, y);
        self.flags[i].set(TileFlags::RIVER, river);
    }

    pub fn set_navigable_river(&mut self, x: u32, y: u32) {
        let i = self.idx(x, y);
        self.terrain[i] = Terrain::NavigableRiver;
        self.flags[i].insert(TileFlags::WATER | TileFlags::RIVER);
        self.flags[i].remove(TileFlags::LAKE);
    }

    pub fn set_natural_wonder(&mut self, x: u32, y: u32, wonder: bool) {
        let i = self.idx(x, y);
        self.flags[i].set(TileFlags::NATURAL_WONDER, wonder);
    }

    pub fn set_resource(&mut self, x: u32, y: u32, resource: Option<ResourceId>) {
        let i = self.idx(x, y);
        self.resources[i] = resource;
    }

    pub fn set_continent(&mut self, x: u32, y: u32, continent: Option<u32>) {
        let i = self.idx(x, y);
        self.continents[i] = continent;
    }

    /// Pin the fertility of a tile instead of deriving it from biome and water.
    pub fn set_fertility(&mut self, x: u32, y: u32, fertility: i32) {
        let i = self.idx(x, y);
        self.fertility[i] = Some(fertility);
    }

    pub fn flags(&self, x: u32, y: u32) -> TileFlags {
        self.flags[self.idx(x, y)]
    }

    pub fn land_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| !f.contains(TileFlags::WATER))
            .count()
    }

    pub fn rainfall_values(&self) -> &[i32] {
        &self.rainfall
    }

    fn derived_fertility(&self, x: u32, y: u32) -> i32 {
        if self.is_water(x, y) || self.is_mountain(x, y) {
            return 0;
        }
        let mut score = match self.biome(x, y) {
            Biome::Grassland => 12,
            Biome::Plains => 10,
            Biome::Tropical => 9,
            Biome::Tundra => 4,
            Biome::Desert => 3,
            Biome::Marine => 0,
        };
        if self.river_adjacent(x, y, 1) {
            score += 4;
        }
        if self.is_coastal_land(x, y) {
            score += 3;
        }
        if self.terrain(x, y) == Terrain::Hill {
            score += 1;
        }
        score
    }
}

impl TerrainQuery for TileGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_water(&self, x: u32, y: u32) -> bool {
        self.flags[self.idx(x, y)].contains(TileFlags::WATER)
    }

    fn is_mountain(&self, x: u32, y: u32) -> bool {
        self.terrain[self.idx(x, y)] == Terrain::Mountain
    }

    fn is_lake(&self, x: u32, y: u32) -> bool {
        self.flags[self.idx(x, y)].contains(TileFlags::LAKE)
    }

    fn is_river(&self, x: u32, y: u32) -> bool {
        self.flags[self.idx(x, y)].contains(TileFlags::RIVER)
    }

    fn is_natural_wonder(&self, x: u32, y: u32) -> bool {
        self.flags[self.idx(x, y)].contains(TileFlags::NATURAL_WONDER)
    }

    fn elevation(&self, x: u32, y: u32) -> i32 {
        self.elevation[self.idx(x, y)]
    }

    fn rainfall(&self, x: u32, y: u32) -> i32 {
        self.rainfall[self.idx(x, y)]
    }

    fn latitude(&self, _x: u32, y: u32) -> f32 {
        let t = (y as f32 + 0.5) / self.height.max(1) as f32;
        self.top_latitude - t * (self.top_latitude - self.bottom_latitude)
    }

    fn biome(&self, x: u32, y: u32) -> Biome {
        self.biome[self.idx(x, y)]
    }

    fn terrain(&self, x: u32, y: u32) -> Terrain {
        self.terrain[self.idx(x, y)]
    }

    fn feature(&self, x: u32, y: u32) -> Option<FeatureId> {
        self.features[self.idx(x, y)].map(|p| p.feature)
    }

    fn feature_class(&self, x: u32, y: u32) -> Option<FeatureClass> {
        self.features[self.idx(x, y)].and_then(|p| p.class)
    }

    fn resource(&self, x: u32, y: u32) -> Option<ResourceId> {
        self.resources[self.idx(x, y)]
    }

    fn continent(&self, x: u32, y: u32) -> Option<u32> {
        self.continents[self.idx(x, y)]
    }

    fn fertility(&self, x: u32, y: u32) -> i32 {
        self.fertility[self.idx(x, y)].unwrap_or_else(|| self.derived_fertility(x, y))
    }
}

impl TerrainMutation for TileGrid {
    fn set_terrain(&mut self, x: u32, y: u32, terrain: Terrain) {
        let i = self.idx(x, y);
        self.terrain[i] = terrain;
        if terrain.is_water() {
            self.flags[i].insert(TileFlags::WATER);
            self.biome[i] = Biome::Marine;
        } else {
            self.flags[i].remove(TileFlags::WATER | TileFlags::LAKE);
            if self.biome[i] == Biome::Marine {
                self.biome[i] = Biome::Plains;
            }
        }
    }

    fn set_biome(&mut self, x: u32, y: u32, biome: Biome) {
        let i = self.idx(x, y);
        self.biome[i] = biome;
    }

    fn set_feature(&mut self, x: u32, y: u32, placement: FeaturePlacement) {
        let i = self.idx(x, y);
        self.features[i] = Some(placement);
    }

    fn set_rainfall(&mut self, x: u32, y: u32, value: i32) {
        let i = self.idx(x, y);
        self.rainfall[i] = value;
    }

    fn set_elevation(&mut self, x: u32, y: u32, value: i32) {
        let i = self.idx(x, y);
        self.elevation[i] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_elevation_rejects_mismatched_buffers() {
        let err = TileGrid::from_elevation(4, 4, vec![0; 10], 0).unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: 16,
                actual: 10
            }
        );
        assert_eq!(
            TileGrid::from_elevation(0, 4, Vec::new(), 0).unwrap_err(),
            GridError::EmptyGrid
        );
    }

    #[test]
    fn elevation_bands_pick_terrain() {
        let grid = TileGrid::from_elevation(3, 1, vec![-50, 500, 900], 0).unwrap();
        assert!(grid.is_water(0, 0));
        assert_eq!(grid.terrain(1, 0), Terrain::Hill);
        assert!(grid.is_mountain(2, 0));
        assert_eq!(grid.land_count(), 2);
    }

    #[test]
    fn latitude_runs_north_to_south() {
        let grid = TileGrid::new(1, 10);
        assert!(grid.latitude(0, 0) > 70.0);
        assert!(grid.latitude(0, 9) < -70.0);
        assert!(grid.latitude(0, 4).abs() < 10.0);
    }

    #[test]
    fn coastal_land_ignores_lakes() {
        let mut grid = TileGrid::new(5, 5);
        grid.fill_land(0, 0, 4, 4, 100);
        grid.set_lake(2, 2);
        assert!(!grid.is_coastal_land(1, 1));
        grid.set_water(4, 4);
        assert!(grid.is_coastal_land(3, 3));
    }

    #[test]
    fn derived_fertility_rewards_rivers() {
        let mut grid = TileGrid::new(5, 5);
        grid.fill_land(0, 0, 4, 4, 100);
        let base = grid.fertility(2, 2);
        grid.set_river(3, 2, true);
        assert_eq!(grid.fertility(2, 2), base + 4);
        grid.set_fertility(2, 2, -1);
        assert_eq!(grid.fertility(2, 2), -1);
    }
}
