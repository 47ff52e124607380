//! Host-facing grid contracts.
//!
//! Generation never owns terrain storage. Every stage reads the map through
//! [`TerrainQuery`] and writes through [`TerrainMutation`]; the in-memory
//! [`crate::TileGrid`] is one implementation, a game engine adapter is another.

use bevy::prelude::UVec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Marine,
    Tundra,
    Grassland,
    Plains,
    Tropical,
    Desert,
}

impl Biome {
    pub const ALL: [Biome; 6] = [
        Biome::Marine,
        Biome::Tundra,
        Biome::Grassland,
        Biome::Plains,
        Biome::Tropical,
        Biome::Desert,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Ocean,
    Coast,
    Flat,
    Hill,
    Mountain,
    NavigableRiver,
}

impl Terrain {
    pub fn is_water(self) -> bool {
        matches!(
            self,
            Terrain::Ocean | Terrain::Coast | Terrain::NavigableRiver
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureClass {
    Vegetated,
    Wet,
    Floodplain,
    Reef,
    Volcano,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u16);

/// Feature write request. `direction` and `elevation` are host hints (-1 / 0 when unused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturePlacement {
    pub feature: FeatureId,
    pub class: Option<FeatureClass>,
    pub direction: i8,
    pub elevation: i32,
}

impl FeaturePlacement {
    pub fn new(feature: FeatureId) -> Self {
        Self {
            feature,
            class: None,
            direction: -1,
            elevation: 0,
        }
    }
}

/// Read side of the host map.
///
/// All coordinates passed in are expected to be in bounds; callers check with
/// [`TerrainQuery::in_bounds`] before converting offsets.
pub trait TerrainQuery {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn is_water(&self, x: u32, y: u32) -> bool;
    fn is_mountain(&self, x: u32, y: u32) -> bool;
    fn is_lake(&self, x: u32, y: u32) -> bool;
    fn is_river(&self, x: u32, y: u32) -> bool;
    fn is_natural_wonder(&self, x: u32, y: u32) -> bool;

    fn elevation(&self, x: u32, y: u32) -> i32;
    fn rainfall(&self, x: u32, y: u32) -> i32;
    /// Signed degrees, positive north.
    fn latitude(&self, x: u32, y: u32) -> f32;

    fn biome(&self, x: u32, y: u32) -> Biome;
    fn terrain(&self, x: u32, y: u32) -> Terrain;
    fn feature(&self, x: u32, y: u32) -> Option<FeatureId>;
    fn feature_class(&self, x: u32, y: u32) -> Option<FeatureClass>;
    fn resource(&self, x: u32, y: u32) -> Option<ResourceId>;
    fn continent(&self, x: u32, y: u32) -> Option<u32>;
    /// Host start-position suitability; `<= 0` means unsuitable.
    fn fertility(&self, x: u32, y: u32) -> i32;

    /// Whether the host reported usable grid accessors. Adapters over partial
    /// engines override this; generation degrades to a no-op when false.
    fn is_available(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    fn dims(&self) -> UVec2 {
        UVec2::new(self.width(), self.height())
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    fn is_navigable_river(&self, x: u32, y: u32) -> bool {
        self.terrain(x, y) == Terrain::NavigableRiver
    }

    /// Any river tile within Chebyshev `radius`, the tile itself included.
    fn river_adjacent(&self, x: u32, y: u32, radius: u32) -> bool {
        let r = radius as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if self.in_bounds(nx, ny) && self.is_river(nx as u32, ny as u32) {
                    return true;
                }
            }
        }
        false
    }

    /// Land touching non-lake water in its 8-neighbourhood.
    fn is_coastal_land(&self, x: u32, y: u32) -> bool {
        if self.is_water(x, y) {
            return false;
        }
        neighbor_dirs().iter().any(|&(dx, dy)| {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            self.in_bounds(nx, ny)
                && self.is_water(nx as u32, ny as u32)
                && !self.is_lake(nx as u32, ny as u32)
        })
    }
}

/// Write side of the host map.
pub trait TerrainMutation {
    fn set_terrain(&mut self, x: u32, y: u32, terrain: Terrain);
    fn set_biome(&mut self, x: u32, y: u32, biome: Biome);
    fn set_feature(&mut self, x: u32, y: u32, placement: FeaturePlacement);
    fn set_rainfall(&mut self, x: u32, y: u32, value: i32);
    fn set_elevation(&mut self, x: u32, y: u32, value: i32);
}

pub trait TerrainHost: TerrainQuery + TerrainMutation {}

impl<T: TerrainQuery + TerrainMutation> TerrainHost for T {}

/// 8-neighbourhood in heading order: E, SE, S, SW, W, NW, N, NE.
///
/// Walkers rotate by stepping the index, so the order is part of the contract.
pub fn neighbor_dirs() -> &'static [(i32, i32)] {
    &[
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ]
}

#[inline]
pub fn chebyshev(a: UVec2, b: UVec2) -> u32 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

#[inline]
pub fn manhattan(a: UVec2, b: UVec2) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Map-area scale factor used by every size-aware pass: `sqrt(area / 10_000)`
/// clamped to `[0.6, 2.0]`.
pub fn size_scale(query: &(impl TerrainQuery + ?Sized)) -> f32 {
    let area = (query.width() as f32 * query.height() as f32).max(1.0);
    (area / 10_000.0).sqrt().clamp(0.6, 2.0)
}

/// True if any land tile lies within Chebyshev `radius` (centre excluded).
pub fn land_within(query: &(impl TerrainQuery + ?Sized), x: u32, y: u32, radius: u32) -> bool {
    let r = radius as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if query.in_bounds(nx, ny) && !query.is_water(nx as u32, ny as u32) {
                return true;
            }
        }
    }
    false
}
