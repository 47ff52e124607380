//! Offshore island seeding and hotspot island classification.

use bevy::prelude::UVec2;
use serde::Serialize;

use crate::{
    config::{HotspotTunables, IslandTunables},
    grid::{land_within, Terrain, TerrainHost},
    noise::NoiseService,
    rng::MapRng,
    tags::StoryTags,
};

pub const ISLAND_FRACTAL: &str = "islands";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IslandSummary {
    pub islands: u32,
    pub paradise: u32,
    pub volcanic: u32,
    pub peaks: u32,
}

/// Seed small islands in open water away from land and sea lanes.
///
/// Regular islands need a high fractal value; tiles on a hotspot trail get an
/// extra chance and are classified as paradise or volcanic. Only volcanic
/// peaks surface as land, every other island tile becomes shallow coast.
pub fn seed_islands(
    host: &mut (impl TerrainHost + ?Sized),
    rng: &mut impl MapRng,
    noise: &mut impl NoiseService,
    cfg: &IslandTunables,
    hotspot: &HotspotTunables,
    lane_avoid_radius: u32,
    tags: &mut StoryTags,
) -> IslandSummary {
    let mut summary = IslandSummary::default();
    if !host.is_available() {
        tracing::warn!(target: "mapgen::story", "story.islands.unavailable");
        return summary;
    }
    let width = host.width();
    let height = host.height();
    noise.create_fractal(ISLAND_FRACTAL, width, height, cfg.fractal_frequency);
    let threshold = noise.height_at_percentile(ISLAND_FRACTAL, cfg.fractal_threshold_percent);
    let peak_chance = hotspot.volcanic_peak_chance.min(100);
    let cluster_max = cfg.cluster_max.max(1);

    let lane_nearby = |x: u32, y: u32| {
        let r = lane_avoid_radius as i32;
        r > 0
            && !tags.corridor_sea_lane.is_empty()
            && (-r..=r).any(|dy| {
                (-r..=r).any(|dx| {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    nx >= 0
                        && ny >= 0
                        && tags
                            .corridor_sea_lane
                            .contains(&UVec2::new(nx as u32, ny as u32))
                })
            })
    };

    let mut seeded: Vec<(UVec2, Option<bool>)> = Vec::new();
    for y in 2..height.saturating_sub(2) {
        for x in 2..width.saturating_sub(2) {
            if !host.is_water(x, y)
                || land_within(host, x, y, cfg.min_dist_from_land_radius)
                || lane_nearby(x, y)
            {
                continue;
            }

            let tile = UVec2::new(x, y);
            let v = noise.height(ISLAND_FRACTAL, x, y);
            let is_hotspot = tags.hotspot.contains(&tile);
            let mut near_active = false;
            let mut near_passive = false;
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = UVec2::new((x as i32 + dx) as u32, (y as i32 + dy) as u32);
                    near_active |= tags.active_margin.contains(&n);
                    near_passive |= tags.passive_shelf.contains(&n);
                }
            }

            let den = if near_active {
                cfg.base_island_den_near_active
            } else {
                cfg.base_island_den_else
            };
            let base_allowed = v > threshold && rng.next_int(den, "Island Seed") == 0;
            let hotspot_allowed = is_hotspot
                && rng.next_int(cfg.hotspot_seed_denom.max(1), "Hotspot Island Seed") == 0;
            if !(base_allowed || hotspot_allowed) {
                continue;
            }

            let mut centre = Terrain::Coast;
            let mut paradise = None;
            if is_hotspot {
                let p_weight = hotspot.paradise_bias + u32::from(near_passive);
                let bucket = (p_weight + hotspot.volcanic_bias).max(1);
                let is_paradise = rng.next_int(bucket, "HotspotKind") < p_weight;
                if !is_paradise && rng.next_int(100, "HotspotPeak") < peak_chance {
                    centre = Terrain::Flat;
                    summary.peaks += 1;
                }
                paradise = Some(is_paradise);
            }
            host.set_terrain(x, y, centre);
            seeded.push((tile, paradise));
            summary.islands += 1;

            let count = 1 + rng.next_int(cluster_max, "Island Size");
            for _ in 0..count {
                let dx = rng.next_int(3, "dx") as i32 - 1;
                let dy = rng.next_int(3, "dy") as i32 - 1;
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx <= 0 || ny <= 0 || nx >= width as i32 - 1 || ny >= height as i32 - 1 {
                    continue;
                }
                if host.is_water(nx as u32, ny as u32) {
                    host.set_terrain(nx as u32, ny as u32, Terrain::Coast);
                }
            }
        }
    }

    for (tile, paradise) in seeded {
        match paradise {
            Some(true) => {
                tags.hotspot_paradise.insert(tile);
                summary.paradise += 1;
            }
            Some(false) => {
                tags.hotspot_volcanic.insert(tile);
                summary.volcanic += 1;
            }
            None => {}
        }
    }

    tracing::info!(
        target: "mapgen::story",
        islands = summary.islands,
        paradise = summary.paradise,
        volcanic = summary.volcanic,
        peaks = summary.peaks,
        "story.islands.seeded"
    );
    summary
}
