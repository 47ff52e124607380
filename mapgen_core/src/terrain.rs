//! Host-side terrain stages the generator calls between its own passes.
//!
//! A [`TerrainStrategy`] owns everything the narrative and climate stages
//! treat as given: landmass shape, relief, rivers, baseline rainfall and
//! biomes. [`DefaultTerrain`] drives the in-memory [`TileGrid`].

use std::{cmp::Reverse, f32::consts::SQRT_2};

use serde::Serialize;

use crate::{
    climate::clamp_rainfall,
    config::TerrainTunables,
    grid::{neighbor_dirs, Biome, TerrainHost, TerrainMutation, TerrainQuery},
    noise::NoiseService,
    placement::Region,
    tile_grid::{TileGrid, MOUNTAIN_ELEVATION},
};

pub const LANDMASS_FRACTAL: &str = "landmass";
pub const RELIEF_FRACTAL: &str = "relief";
pub const RAINFALL_FRACTAL: &str = "rainfall";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiverSummary {
    pub river_tiles: u32,
    pub navigable: u32,
    pub longest_accumulation: u32,
}

/// Terrain stages supplied by the host. Methods run in declaration order,
/// interleaved with the tagging passes.
pub trait TerrainStrategy<H: TerrainHost + ?Sized>: Send + Sync {
    /// Land and water. Returns the west and east landmass rectangles.
    fn shape_landmass(
        &self,
        host: &mut H,
        noise: &mut dyn NoiseService,
        cfg: &TerrainTunables,
    ) -> [Region; 2];

    /// Hills and mountains on existing land.
    fn shape_terrain(&self, host: &mut H, noise: &mut dyn NoiseService, cfg: &TerrainTunables);

    fn model_rivers(&self, host: &mut H, cfg: &TerrainTunables) -> RiverSummary;

    fn baseline_rainfall(&self, host: &mut H, noise: &mut dyn NoiseService, cfg: &TerrainTunables);

    fn designate_biomes(&self, host: &mut H);
}

/// Noise-shaped two-continent world on a [`TileGrid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTerrain;

impl DefaultTerrain {
    fn forced_ocean(width: u32, height: u32, x: u32, y: u32, cfg: &TerrainTunables) -> bool {
        let edge = cfg.ocean_columns;
        let half_gap = edge / 2;
        let mid = width / 2;
        x < edge
            || x + edge >= width
            || y < cfg.polar_rows
            || y + cfg.polar_rows >= height
            || (x + half_gap >= mid && x < mid + half_gap)
    }
}

impl TerrainStrategy<TileGrid> for DefaultTerrain {
    fn shape_landmass(
        &self,
        host: &mut TileGrid,
        noise: &mut dyn NoiseService,
        cfg: &TerrainTunables,
    ) -> [Region; 2] {
        let width = host.width();
        let height = host.height();
        noise.create_fractal(LANDMASS_FRACTAL, width, height, cfg.land_frequency);
        let threshold = noise.height_at_percentile(LANDMASS_FRACTAL, cfg.water_percent);
        let span = (1.0 - threshold).max(f32::EPSILON);
        let mid = width / 2;

        let mut land = 0u32;
        for y in 0..height {
            for x in 0..width {
                let v = noise.height(LANDMASS_FRACTAL, x, y);
                if v < threshold || Self::forced_ocean(width, height, x, y, cfg) {
                    host.set_water(x, y);
                    host.set_elevation(x, y, ((v - threshold) * 400.0).round().min(0.0) as i32);
                    continue;
                }
                // land rises to a third of max; relief adds the rest
                let elevation = ((v - threshold) / span * cfg.max_elevation as f32 / 3.0) as i32;
                host.set_land(x, y, elevation.max(1));
                host.set_continent(x, y, Some(u32::from(x >= mid)));
                land += 1;
            }
        }
        tracing::info!(
            target: "mapgen::terrain",
            land,
            threshold,
            "terrain.landmass.shaped"
        );

        let last_x = width.saturating_sub(1);
        let last_y = height.saturating_sub(1);
        [
            Region::new(0, 0, mid.saturating_sub(1), last_y).with_continent(0),
            Region::new(mid, 0, last_x, last_y).with_continent(1),
        ]
    }

    fn shape_terrain(&self, host: &mut TileGrid, noise: &mut dyn NoiseService, cfg: &TerrainTunables) {
        let width = host.width();
        let height = host.height();
        noise.create_fractal(RELIEF_FRACTAL, width, height, cfg.land_frequency * 3.0);
        let peaks = noise.height_at_percentile(RELIEF_FRACTAL, cfg.mountain_percent);

        let mut mountains = 0u32;
        for y in 0..height {
            for x in 0..width {
                if host.is_water(x, y) {
                    continue;
                }
                let relief = noise.height(RELIEF_FRACTAL, x, y);
                let mut elevation =
                    host.elevation(x, y) + (relief * cfg.max_elevation as f32 * 0.5) as i32;
                if relief >= peaks {
                    elevation = elevation.max(MOUNTAIN_ELEVATION);
                    mountains += 1;
                }
                host.set_land(x, y, elevation.min(cfg.max_elevation));
            }
        }
        tracing::info!(target: "mapgen::terrain", mountains, "terrain.relief.shaped");
    }

    /// Steepest-descent drainage. Every land tile sends its flow to the lowest
    /// strictly lower neighbour; accumulation above the thresholds marks rivers.
    fn model_rivers(&self, host: &mut TileGrid, cfg: &TerrainTunables) -> RiverSummary {
        let width = host.width();
        let height = host.height();
        let len = (width * height) as usize;
        let mut downstream: Vec<Option<usize>> = vec![None; len];
        let mut order = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if host.is_water(x, y) {
                    continue;
                }
                let idx = (y * width + x) as usize;
                let here = host.elevation(x, y);
                let mut best: Option<(usize, f32)> = None;
                for &(dx, dy) in neighbor_dirs() {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if !host.in_bounds(nx, ny) {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    let drop = (here - host.elevation(nx, ny)) as f32;
                    if drop <= 0.0 && !host.is_water(nx, ny) {
                        continue;
                    }
                    let step = if dx == 0 || dy == 0 { 1.0 } else { SQRT_2 };
                    let slope = drop.max(0.0) / step;
                    if best.map_or(true, |(_, top)| slope > top) {
                        best = Some(((ny * width + nx) as usize, slope));
                    }
                }
                downstream[idx] = best.map(|(i, _)| i);
                order.push((here, idx));
            }
        }
        order.sort_by_key(|&(elevation, idx)| (Reverse(elevation), idx));

        let mut accumulation = vec![0u32; len];
        for &(_, idx) in &order {
            accumulation[idx] += 1;
            if let Some(next) = downstream[idx] {
                accumulation[next] += accumulation[idx];
            }
        }

        let mut summary = RiverSummary::default();
        for &(_, idx) in &order {
            let acc = accumulation[idx];
            if acc < cfg.river_min_accum.max(1) {
                continue;
            }
            let x = idx as u32 % width;
            let y = idx as u32 / width;
            if host.is_mountain(x, y) {
                continue;
            }
            summary.longest_accumulation = summary.longest_accumulation.max(acc);
            if acc >= cfg.navigable_river_accum.max(1) {
                host.set_navigable_river(x, y);
                summary.navigable += 1;
            } else {
                host.set_river(x, y, true);
            }
            summary.river_tiles += 1;
        }
        tracing::info!(
            target: "mapgen::terrain",
            rivers = summary.river_tiles,
            navigable = summary.navigable,
            longest = summary.longest_accumulation,
            "terrain.rivers.modelled"
        );
        summary
    }

    fn baseline_rainfall(&self, host: &mut TileGrid, noise: &mut dyn NoiseService, cfg: &TerrainTunables) {
        let width = host.width();
        let height = host.height();
        noise.create_fractal(RAINFALL_FRACTAL, width, height, cfg.land_frequency * 2.0);
        for y in 0..height {
            for x in 0..width {
                if host.is_water(x, y) {
                    continue;
                }
                let jitter = (noise.height(RAINFALL_FRACTAL, x, y) - 0.5) * 40.0;
                let value = latitude_rainfall(host.latitude(x, y)) + jitter.round() as i32;
                host.set_rainfall(x, y, clamp_rainfall(value));
            }
        }
    }

    fn designate_biomes(&self, host: &mut TileGrid) {
        let mut counts = [0u32; Biome::ALL.len()];
        for y in 0..host.height() {
            for x in 0..host.width() {
                if host.is_water(x, y) {
                    continue;
                }
                let biome = biome_for(host.latitude(x, y), host.rainfall(x, y));
                host.set_biome(x, y, biome);
                counts[biome.index()] += 1;
            }
        }
        tracing::info!(
            target: "mapgen::terrain",
            tundra = counts[Biome::Tundra.index()],
            grassland = counts[Biome::Grassland.index()],
            plains = counts[Biome::Plains.index()],
            tropical = counts[Biome::Tropical.index()],
            desert = counts[Biome::Desert.index()],
            "terrain.biomes.designated"
        );
    }
}

/// Banded baseline: wet equator, dry subtropics, wet mid-latitudes, dry poles.
pub fn latitude_rainfall(latitude: f32) -> i32 {
    match latitude.abs() {
        l if l < 10.0 => 150,
        l if l < 25.0 => 110,
        l if l < 35.0 => 50,
        l if l < 55.0 => 100,
        l if l < 70.0 => 60,
        _ => 30,
    }
}

pub fn biome_for(latitude: f32, rainfall: i32) -> Biome {
    let lat = latitude.abs();
    if lat >= 60.0 {
        Biome::Tundra
    } else if rainfall < 50 {
        Biome::Desert
    } else if lat < 25.0 && rainfall >= 120 {
        Biome::Tropical
    } else if rainfall >= 90 {
        Biome::Grassland
    } else {
        Biome::Plains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Terrain, noise::ValueNoise};

    #[test]
    fn landmass_leaves_borders_and_seam_as_ocean() {
        let mut grid = TileGrid::new(48, 24);
        let mut noise = ValueNoise::new(9);
        let cfg = TerrainTunables {
            water_percent: 10.0,
            ..TerrainTunables::default()
        };
        let [west, east] = DefaultTerrain.shape_landmass(&mut grid, &mut noise, &cfg);
        assert_eq!(west.east + 1, east.west);
        assert_eq!(east.east, 47);
        for y in 0..24 {
            assert!(grid.is_water(0, y));
            assert!(grid.is_water(47, y));
            assert!(grid.is_water(24, y));
        }
        for x in 0..48 {
            assert!(grid.is_water(x, 0));
            assert!(grid.is_water(x, 23));
        }
        assert!(grid.land_count() > 0);
        for y in 0..24 {
            for x in 0..48 {
                if !grid.is_water(x, y) {
                    assert_eq!(grid.continent(x, y), Some(u32::from(x >= 24)));
                }
            }
        }
    }

    #[test]
    fn rivers_drain_downhill_into_the_sea() {
        // a ramp falling west into a one-column sea
        let mut grid = TileGrid::new(12, 3);
        for x in 1..12 {
            for y in 0..3 {
                grid.set_land(x, y, x as i32 * 20);
            }
        }
        let cfg = TerrainTunables {
            river_min_accum: 3,
            navigable_river_accum: 100,
            ..TerrainTunables::default()
        };
        let summary = DefaultTerrain.model_rivers(&mut grid, &cfg);
        assert!(summary.river_tiles > 0);
        assert_eq!(summary.navigable, 0);
        assert!(grid.is_river(1, 1));
        assert!(!grid.is_river(11, 1));
    }

    #[test]
    fn heavy_flow_becomes_navigable_water() {
        let mut grid = TileGrid::new(12, 1);
        for x in 1..12 {
            grid.set_land(x, 0, x as i32 * 20);
        }
        let cfg = TerrainTunables {
            river_min_accum: 2,
            navigable_river_accum: 10,
            ..TerrainTunables::default()
        };
        let summary = DefaultTerrain.model_rivers(&mut grid, &cfg);
        assert_eq!(summary.longest_accumulation, 11);
        assert_eq!(summary.navigable, 2);
        assert_eq!(grid.terrain(1, 0), Terrain::NavigableRiver);
        assert!(grid.is_navigable_river(2, 0));
        assert!(grid.is_river(3, 0));
        assert!(!grid.is_water(3, 0));
    }

    #[test]
    fn biomes_follow_latitude_and_rain() {
        assert_eq!(biome_for(70.0, 200), Biome::Tundra);
        assert_eq!(biome_for(-30.0, 20), Biome::Desert);
        assert_eq!(biome_for(5.0, 150), Biome::Tropical);
        assert_eq!(biome_for(45.0, 100), Biome::Grassland);
        assert_eq!(biome_for(45.0, 60), Biome::Plains);
        assert!(latitude_rainfall(0.0) > latitude_rainfall(30.0));
        assert!(latitude_rainfall(-45.0) > latitude_rainfall(80.0));
    }

    #[test]
    fn baseline_rainfall_skips_water_and_stays_in_range() {
        let mut grid = TileGrid::new(16, 16);
        grid.fill_land(2, 2, 13, 13, 100);
        let mut noise = ValueNoise::new(4);
        DefaultTerrain.baseline_rainfall(&mut grid, &mut noise, &TerrainTunables::default());
        assert_eq!(grid.rainfall(0, 0), 0);
        for y in 2..14 {
            for x in 2..14 {
                let r = grid.rainfall(x, y);
                assert!((0..=200).contains(&r));
                assert!(r > 0);
            }
        }
    }
}
