//! Rainfall overlays: the per-map climate swatch and the six refinement passes.
//!
//! Every pass is a full sweep over land tiles that reads the host rainfall,
//! adjusts it and writes it back clamped to `[RAINFALL_MIN, RAINFALL_MAX]`.
//! Passes run in a fixed order and each one sees what the previous wrote.

use bevy::prelude::UVec2;
use serde::Serialize;

use crate::{
    config::{
        ClimateTunables, DirectionalityTunables, MapgenTunables, MicroclimateRainfall,
        OrogenyTunables, SwatchKindTunables, SwatchTunables,
    },
    fields::{zonal_wind_dx, WorldFields},
    grid::{size_scale, TerrainHost, TerrainQuery},
    rng::MapRng,
    tags::{near, StoryTags},
};

pub const RAINFALL_MIN: i32 = 0;
pub const RAINFALL_MAX: i32 = 200;

#[inline]
pub fn clamp_rainfall(value: i32) -> i32 {
    value.clamp(RAINFALL_MIN, RAINFALL_MAX)
}

/// Write `value` clamped; returns whether the stored rainfall changed.
fn store(host: &mut (impl TerrainHost + ?Sized), x: u32, y: u32, before: i32, value: i32) -> bool {
    let value = clamp_rainfall(value);
    if value != before {
        host.set_rainfall(x, y, value);
    }
    value != before
}

// --- swatches ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwatchKind {
    MacroDesertBelt,
    EquatorialRainbelt,
    RainforestArchipelago,
    MountainForests,
    GreatPlains,
}

impl SwatchKind {
    pub const ALL: [SwatchKind; 5] = [
        SwatchKind::MacroDesertBelt,
        SwatchKind::EquatorialRainbelt,
        SwatchKind::RainforestArchipelago,
        SwatchKind::MountainForests,
        SwatchKind::GreatPlains,
    ];

    fn tunables(self, cfg: &SwatchTunables) -> &SwatchKindTunables {
        match self {
            SwatchKind::MacroDesertBelt => &cfg.macro_desert_belt,
            SwatchKind::EquatorialRainbelt => &cfg.equatorial_rainbelt,
            SwatchKind::RainforestArchipelago => &cfg.rainforest_archipelago,
            SwatchKind::MountainForests => &cfg.mountain_forests,
            SwatchKind::GreatPlains => &cfg.great_plains,
        }
    }

    /// Weight multiplier from the directionality dial: zonal winds favour the
    /// latitude bands, a strong plate axis favours mountain forests.
    fn directional_weight(self, dir: &DirectionalityTunables) -> f32 {
        let cohesion = dir.cohesion();
        if cohesion <= 0.0 {
            return 1.0;
        }
        let zonal = dir.primary_axes.wind_bias_deg.to_radians().cos().abs();
        let plate = dir.primary_axes.plate_axis_deg.to_radians().cos().abs();
        match self {
            SwatchKind::MacroDesertBelt => 1.0 + 0.4 * cohesion * zonal,
            SwatchKind::EquatorialRainbelt => 1.0 + 0.25 * cohesion * zonal,
            SwatchKind::MountainForests => 1.0 + 0.2 * cohesion * plate,
            SwatchKind::GreatPlains => 1.0 + 0.2 * cohesion * zonal,
            SwatchKind::RainforestArchipelago => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwatchSummary {
    pub kind: SwatchKind,
    pub tiles: u32,
}

/// Weighted pick of the map's single macro swatch. All-zero weights fall back
/// to the first kind.
pub fn choose_swatch(
    rng: &mut impl MapRng,
    cfg: &SwatchTunables,
    dir: &DirectionalityTunables,
) -> SwatchKind {
    let weights: Vec<(SwatchKind, u32)> = SwatchKind::ALL
        .iter()
        .map(|&kind| {
            let w = kind.tunables(cfg).weight as f32 * kind.directional_weight(dir);
            (kind, w.round().max(0.0) as u32)
        })
        .collect();
    let total: u32 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.next_int(total.max(1), "SwatchType");
    for &(kind, w) in &weights {
        if roll < w {
            return kind;
        }
        roll -= w;
    }
    SwatchKind::ALL[0]
}

#[inline]
fn falloff(distance: f32, radius: f32) -> f32 {
    (1.0 - distance / radius.max(1.0)).max(0.0)
}

/// Pick a swatch and apply it to land as a clamped rainfall overlay with a
/// linear latitude falloff.
pub fn apply_climate_swatch(
    host: &mut (impl TerrainHost + ?Sized),
    rng: &mut impl MapRng,
    cfg: &SwatchTunables,
    dir: &DirectionalityTunables,
    tags: &StoryTags,
) -> Option<SwatchSummary> {
    if !host.is_available() {
        tracing::warn!(target: "mapgen::climate", "climate.swatch.unavailable");
        return None;
    }
    let kind = choose_swatch(rng, cfg, dir);
    let t = kind.tunables(cfg);
    let width_mul = 1.0 + cfg.width_mul_sqrt * (size_scale(host) - 1.0);
    let band_half_width = |floor: f32| (t.half_width_deg * width_mul).round().max(floor);

    let mut tiles = 0;
    for y in 0..host.height() {
        for x in 0..host.width() {
            if host.is_water(x, y) {
                continue;
            }
            let lat = host.latitude(x, y).abs();
            let elev = host.elevation(x, y);
            let delta = match kind {
                SwatchKind::MacroDesertBelt => {
                    let f = falloff((lat - t.latitude_center_deg).abs(), band_half_width(4.0));
                    (f > 0.0).then(|| {
                        let lowland = if elev < 250 { 4 } else { 0 };
                        -(((t.delta + lowland) as f32 * f).round() as i32)
                    })
                }
                SwatchKind::EquatorialRainbelt => {
                    let f = falloff((lat - t.latitude_center_deg).abs(), band_half_width(4.0));
                    (f > 0.0).then(|| {
                        let coast = if host.is_coastal_land(x, y) { 6 } else { 0 };
                        ((t.delta + coast) as f32 * f).round() as i32
                    })
                }
                SwatchKind::RainforestArchipelago => {
                    let tropics = if lat < 23.0 {
                        1.0
                    } else if lat < 30.0 {
                        0.5
                    } else {
                        0.0
                    };
                    (tropics > 0.0 && host.is_coastal_land(x, y))
                        .then(|| (t.delta as f32 * tropics).round() as i32)
                }
                SwatchKind::MountainForests => {
                    let tile = UVec2::new(x, y);
                    if tags.windward.contains(&tile) {
                        Some(t.delta + if elev < 300 { 2 } else { 0 })
                    } else if tags.lee.contains(&tile) {
                        Some(-t.lee_penalty)
                    } else {
                        None
                    }
                }
                SwatchKind::GreatPlains => {
                    let f = falloff((lat - t.latitude_center_deg).abs(), band_half_width(6.0));
                    (f > 0.0 && elev <= t.lowland_max_elevation)
                        .then(|| -((t.delta as f32 * f).round() as i32))
                }
            };
            if let Some(delta) = delta {
                let before = host.rainfall(x, y);
                store(host, x, y, before, before + delta);
                tiles += 1;
            }
        }
    }

    tracing::info!(target: "mapgen::climate", kind = ?kind, tiles, "climate.swatch.applied");
    Some(SwatchSummary { kind, tiles })
}

// --- refinement --------------------------------------------------------------

/// Tiles whose rainfall changed, per pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClimateSummary {
    pub coastal: u32,
    pub shadowed: u32,
    pub river_basin: u32,
    pub rift: u32,
    pub orogeny: u32,
    pub hotspot: u32,
}

/// Everything the refinement passes read besides the host.
pub struct ClimateRefiner<'a> {
    pub climate: &'a ClimateTunables,
    pub rainfall: &'a MicroclimateRainfall,
    pub orogeny: &'a OrogenyTunables,
    pub directionality: &'a DirectionalityTunables,
    pub fields: &'a WorldFields,
    pub tags: &'a StoryTags,
    /// Pass E only runs when orogeny tagging was enabled for this generation.
    pub orogeny_enabled: bool,
}

impl<'a> ClimateRefiner<'a> {
    pub fn new(tunables: &'a MapgenTunables, fields: &'a WorldFields, tags: &'a StoryTags) -> Self {
        Self {
            climate: &tunables.climate,
            rainfall: &tunables.microclimate.rainfall,
            orogeny: &tunables.story.orogeny,
            directionality: &tunables.world_model.directionality,
            fields,
            tags,
            orogeny_enabled: tunables.toggles.orogeny,
        }
    }

    /// Run passes A through F in order.
    pub fn refine(&self, host: &mut (impl TerrainHost + ?Sized)) -> ClimateSummary {
        if !host.is_available() {
            tracing::warn!(target: "mapgen::climate", "climate.refine.unavailable");
            return ClimateSummary::default();
        }
        let summary = ClimateSummary {
            coastal: self.coastal_humidity(host),
            shadowed: self.orographic_shadow(host),
            river_basin: self.river_basin_humidity(host),
            rift: self.rift_humidity(host),
            orogeny: self.orogeny_amplification(host),
            hotspot: self.hotspot_microclimate(host),
        };
        tracing::info!(
            target: "mapgen::climate",
            coastal = summary.coastal,
            shadowed = summary.shadowed,
            river_basin = summary.river_basin,
            rift = summary.rift,
            orogeny = summary.orogeny,
            hotspot = summary.hotspot,
            "climate.refined"
        );
        summary
    }

    /// Visit every land tile with its current rainfall; the closure returns the
    /// new unclamped value.
    fn sweep<H: TerrainHost + ?Sized>(
        host: &mut H,
        mut adjust: impl FnMut(&H, u32, u32, i32) -> i32,
    ) -> u32 {
        let mut changed = 0;
        for y in 0..host.height() {
            for x in 0..host.width() {
                if host.is_water(x, y) {
                    continue;
                }
                let before = host.rainfall(x, y);
                let after = adjust(&*host, x, y, before);
                if store(host, x, y, before, after) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Pass A: humidity decaying with distance to the nearest water (lakes
    /// included), plus a flat bonus on very low ground.
    pub fn coastal_humidity(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let cfg = self.climate;
        let max_r = cfg.coastal_max_radius;
        let changed = Self::sweep(host, |q, x, y, rf| {
            match distance_to_water(q, x, y, max_r) {
                Some(dist) => {
                    let mut bonus = (max_r - dist) as i32 * cfg.coastal_step_bonus;
                    if q.elevation(x, y) < cfg.coastal_lowland_elevation {
                        bonus += cfg.coastal_lowland_bonus;
                    }
                    rf + bonus
                }
                None => rf,
            }
        });
        tracing::debug!(target: "mapgen::climate", changed, "climate.pass.coastal");
        changed
    }

    /// Pass B: scan upwind for the first barrier and dry the tile; the closer
    /// the barrier, the larger the reduction.
    pub fn orographic_shadow(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let cfg = self.climate;
        let dir = self.directionality;
        let extra = (dir.cohesion() * dir.interplay.winds_follow_plates.clamp(0.0, 1.0)).round();
        let steps = (cfg.shadow_upwind_steps as i32 + extra as i32).max(1) as u32;
        let fields = self.fields;
        let changed = Self::sweep(host, |q, x, y, rf| {
            match upwind_barrier(q, fields, x, y, steps, cfg.shadow_barrier_elevation) {
                Some(step) => {
                    rf - (cfg.shadow_base + (steps + 1 - step) as i32 * cfg.shadow_per_step)
                }
                None => rf,
            }
        });
        tracing::debug!(target: "mapgen::climate", changed, steps, "climate.pass.shadow");
        changed
    }

    /// Pass C: river adjacency bonus (larger in lowlands) and a small bonus for
    /// enclosed low basins.
    pub fn river_basin_humidity(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let cfg = self.climate;
        let changed = Self::sweep(host, |q, x, y, mut rf| {
            let elev = q.elevation(x, y);
            if q.river_adjacent(x, y, 1) {
                rf += if elev < cfg.river_low_elevation {
                    cfg.river_low_bonus
                } else {
                    cfg.river_high_bonus
                };
            }
            if elev < cfg.basin_max_elevation
                && is_closed_basin(q, x, y, cfg.basin_radius, elev + cfg.basin_margin)
            {
                rf += cfg.basin_bonus;
            }
            rf
        });
        tracing::debug!(target: "mapgen::climate", changed, "climate.pass.river_basin");
        changed
    }

    /// Pass D: rift valleys hold moisture, less so the higher the tile sits.
    pub fn rift_humidity(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let rain = self.rainfall;
        let cfg = self.climate;
        let rift_line = &self.tags.rift_line;
        if rift_line.is_empty() || rain.rift_radius == 0 || rain.rift_boost == 0 {
            return 0;
        }
        let step = cfg.rift_elevation_step.max(1);
        let changed = Self::sweep(host, |q, x, y, rf| {
            if !near(rift_line, x, y, rain.rift_radius) {
                return rf;
            }
            let penalty = (q.elevation(x, y) - cfg.rift_elevation_base)
                .div_euclid(step)
                .max(0);
            rf + (rain.rift_boost - penalty).max(0)
        });
        tracing::debug!(target: "mapgen::climate", changed, "climate.pass.rift");
        changed
    }

    /// Pass E: wetter windward flanks, amplified drying on lee flanks.
    pub fn orogeny_amplification(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let tags = self.tags;
        if !self.orogeny_enabled || (tags.windward.is_empty() && tags.lee.is_empty()) {
            return 0;
        }
        let base = self.climate.lee_base;
        let extra = ((base as f32 * (self.orogeny.lee_dryness_amplifier - 1.0)).round() as i32).max(0);
        let lee_drop = base + extra;
        let boost = self.orogeny.windward_boost;
        let changed = Self::sweep(host, |_, x, y, mut rf| {
            let tile = UVec2::new(x, y);
            if tags.windward.contains(&tile) {
                rf = clamp_rainfall(rf + boost);
            }
            if tags.lee.contains(&tile) {
                rf = clamp_rainfall(rf - lee_drop);
            }
            rf
        });
        tracing::debug!(target: "mapgen::climate", changed, lee_drop, "climate.pass.orogeny");
        changed
    }

    /// Pass F: hotspot islands. Paradise and volcanic deltas add when a tile is
    /// near both.
    pub fn hotspot_microclimate(&self, host: &mut (impl TerrainHost + ?Sized)) -> u32 {
        let tags = self.tags;
        let rain = self.rainfall;
        if tags.hotspot_paradise.is_empty() && tags.hotspot_volcanic.is_empty() {
            return 0;
        }
        let radius = rain.hotspot_radius;
        let changed = Self::sweep(host, |_, x, y, mut rf| {
            if near(&tags.hotspot_paradise, x, y, radius) {
                rf += rain.paradise_delta;
            }
            if near(&tags.hotspot_volcanic, x, y, radius) {
                rf += rain.volcanic_delta;
            }
            rf
        });
        tracing::debug!(target: "mapgen::climate", changed, "climate.pass.hotspot");
        changed
    }
}

/// Chebyshev ring of the nearest water tile within `max_r`.
fn distance_to_water(q: &(impl TerrainQuery + ?Sized), x: u32, y: u32, max_r: u32) -> Option<u32> {
    (1..=max_r).find(|&r| {
        let r = r as i32;
        (-r..=r).any(|dy| {
            (-r..=r).any(|dx| {
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                (dx.abs() == r || dy.abs() == r)
                    && q.in_bounds(nx, ny)
                    && q.is_water(nx as u32, ny as u32)
            })
        })
    })
}

/// Step index (1-based) of the first high tile met walking upwind, if any
/// within `steps`. Field winds steer the walk tile by tile when available.
fn upwind_barrier(
    q: &(impl TerrainQuery + ?Sized),
    fields: &WorldFields,
    x: u32,
    y: u32,
    steps: u32,
    barrier_elevation: i32,
) -> Option<u32> {
    let (mut cx, mut cy) = (x, y);
    for s in 1..=steps {
        let (dx, dy) = fields
            .dominant_wind_step(cx, cy)
            .unwrap_or_else(|| (zonal_wind_dx(q.latitude(cx, cy)), 0));
        let (nx, ny) = (cx as i32 - dx, cy as i32 - dy);
        if !q.in_bounds(nx, ny) {
            return None;
        }
        let (nx, ny) = (nx as u32, ny as u32);
        if !q.is_water(nx, ny) && (q.is_mountain(nx, ny) || q.elevation(nx, ny) >= barrier_elevation) {
            return Some(s);
        }
        cx = nx;
        cy = ny;
    }
    None
}

/// No neighbour within `radius` sits below `floor`.
fn is_closed_basin(q: &(impl TerrainQuery + ?Sized), x: u32, y: u32, radius: u32, floor: i32) -> bool {
    let r = radius as i32;
    (-r..=r).all(|dy| {
        (-r..=r).all(|dx| {
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            (dx == 0 && dy == 0)
                || !q.in_bounds(nx, ny)
                || q.elevation(nx as u32, ny as u32) >= floor
        })
    })
}
