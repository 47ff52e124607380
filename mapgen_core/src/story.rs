//! Narrative motif tagging: hotspot trails, rift valleys, orogeny belts and
//! continental margins.
//!
//! Every pass only adds tiles that satisfy its own domain predicate (trails on
//! open water, rifts and flanks on land, margins on coastal land). Seeding loops
//! are bounded by fixed attempt caps so a hostile map can never stall generation.

use bevy::prelude::UVec2;
use serde::Serialize;

use crate::{
    config::{
        DirectionalityTunables, HotspotTunables, MarginTunables, OrogenyTunables, RiftTunables,
    },
    fields::{zonal_wind_dx, BoundaryType, WorldFields},
    grid::{land_within, manhattan, neighbor_dirs, size_scale, TerrainQuery},
    rng::MapRng,
    tags::{StoryTags, TagSet},
};

/// Seeding attempts a hotspot pass may spend before giving up.
pub const HOTSPOT_SEED_ATTEMPTS: u32 = 200;
/// Seeding attempts the random-march rift pass may spend before giving up.
pub const RIFT_SEED_ATTEMPTS: u32 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HotspotSummary {
    pub trails: u32,
    pub points: u32,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiftSummary {
    pub rifts: u32,
    pub line_tiles: u32,
    pub shoulder_tiles: u32,
    pub field_driven: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrogenySummary {
    pub belts: u32,
    pub windward: u32,
    pub lee: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarginSummary {
    pub active: u32,
    pub passive: u32,
    pub target_active: u32,
    pub target_passive: u32,
    pub min_segment: u32,
}

#[inline]
fn scaled(base: u32, offset: f32, slope: f32, scale: f32) -> u32 {
    (base as f32 * (offset + slope * scale)).round() as u32
}

// --- hotspots ----------------------------------------------------------------

/// March open-ocean polylines from isolated seeds, tagging every visited water
/// tile that keeps its distance from land.
pub fn tag_hotspot_trails(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &HotspotTunables,
    tags: &mut StoryTags,
) -> HotspotSummary {
    let mut summary = HotspotSummary::default();
    if !query.is_available() {
        tracing::warn!(target: "mapgen::story", "story.hotspots.unavailable");
        return summary;
    }

    let s = size_scale(query);
    let max_trails = scaled(cfg.max_trails, 0.9, 0.6, s).max(1);
    let steps = scaled(cfg.steps, 0.9, 0.4, s);
    let step_len = cfg.step_len.max(1) as i32;
    let dirs = neighbor_dirs();

    while summary.trails < max_trails && summary.attempts < HOTSPOT_SEED_ATTEMPTS {
        summary.attempts += 1;
        let sx = rng.next_int(query.width(), "HotspotSeedX");
        let sy = rng.next_int(query.height(), "HotspotSeedY");
        if !query.is_water(sx, sy) || land_within(query, sx, sy, cfg.min_dist_from_land) {
            continue;
        }
        let seed = UVec2::new(sx, sy);
        if tags
            .hotspot
            .iter()
            .any(|p| manhattan(*p, seed) < cfg.min_trail_separation)
        {
            continue;
        }

        let mut heading = rng.next_int(dirs.len() as u32, "HotspotDir") as usize;
        let (mut x, mut y) = (sx as i32, sy as i32);
        let mut tagged = 0u32;
        for _ in 0..steps {
            let (dx, dy) = dirs[heading];
            x += dx * step_len;
            y += dy * step_len;
            if !query.in_bounds(x, y) {
                break;
            }
            let (ux, uy) = (x as u32, y as u32);
            if !query.is_water(ux, uy) || land_within(query, ux, uy, cfg.min_dist_from_land) {
                continue;
            }
            if tags.hotspot.insert(UVec2::new(ux, uy)) {
                summary.points += 1;
            }
            tagged += 1;

            if rng.next_int(5, "HotspotBend") == 0 {
                let turn = rng.next_int(3, "HotspotTurn") as usize;
                heading = (heading + turn + dirs.len() - 1) % dirs.len();
            }
        }

        if tagged > 0 {
            summary.trails += 1;
            tracing::debug!(target: "mapgen::story", x = sx, y = sy, tagged, "story.hotspots.trail");
        }
    }

    tracing::info!(
        target: "mapgen::story",
        trails = summary.trails,
        points = summary.points,
        attempts = summary.attempts,
        "story.hotspots.tagged"
    );
    summary
}

// --- rifts -------------------------------------------------------------------

struct RiftShape {
    max_rifts: u32,
    line_steps: u32,
    step_len: i32,
    shoulder_width: u32,
}

impl RiftShape {
    fn new(query: &(impl TerrainQuery + ?Sized), cfg: &RiftTunables) -> Self {
        let s = size_scale(query);
        Self {
            max_rifts: scaled(cfg.max_rifts_per_map, 0.8, 0.6, s).max(1),
            line_steps: scaled(cfg.line_steps, 0.9, 0.4, s),
            step_len: cfg.step_len.max(1) as i32,
            shoulder_width: cfg.shoulder_width + u32::from(s > 1.5),
        }
    }
}

/// Tag land tiles perpendicular to the heading on both sides of `(x, y)`.
fn tag_shoulders(
    query: &(impl TerrainQuery + ?Sized),
    shoulders: &mut TagSet,
    (x, y): (i32, i32),
    (dx, dy): (i32, i32),
    width: u32,
) -> u32 {
    let mut added = 0;
    for off in 1..=width as i32 {
        for (px, py) in [(x - dy * off, y + dx * off), (x + dy * off, y - dx * off)] {
            if query.in_bounds(px, py)
                && !query.is_water(px as u32, py as u32)
                && shoulders.insert(UVec2::new(px as u32, py as u32))
            {
                added += 1;
            }
        }
    }
    added
}

/// Rift valleys along divergent plate boundaries when plate fields are
/// available, otherwise random inland marches.
pub fn tag_rift_valleys(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    fields: &WorldFields,
    cfg: &RiftTunables,
    dir: &DirectionalityTunables,
    tags: &mut StoryTags,
) -> RiftSummary {
    if !query.is_available() {
        tracing::warn!(target: "mapgen::story", "story.rifts.unavailable");
        return RiftSummary::default();
    }
    let shape = RiftShape::new(query, cfg);

    if cfg.use_plate_fields && fields.is_enabled() {
        if let Some(summary) = field_rifts(query, fields, cfg, dir, &shape, tags) {
            log_rifts(&summary);
            return summary;
        }
        tracing::debug!(target: "mapgen::story", "story.rifts.no_field_seeds");
    }

    let summary = marched_rifts(query, rng, cfg, &shape, tags);
    log_rifts(&summary);
    summary
}

fn log_rifts(summary: &RiftSummary) {
    tracing::info!(
        target: "mapgen::story",
        rifts = summary.rifts,
        line_tiles = summary.line_tiles,
        shoulder_tiles = summary.shoulder_tiles,
        field_driven = summary.field_driven,
        "story.rifts.tagged"
    );
}

fn marched_rifts(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &RiftTunables,
    shape: &RiftShape,
    tags: &mut StoryTags,
) -> RiftSummary {
    const NORTH_SOUTH: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 1), (-1, -1)];
    const EAST_WEST: [(i32, i32); 4] = [(1, 0), (-1, 0), (1, 1), (-1, -1)];

    let mut summary = RiftSummary::default();
    let mut tries = 0;
    while summary.rifts < shape.max_rifts && tries < RIFT_SEED_ATTEMPTS {
        tries += 1;
        let sx = rng.next_int(query.width(), "RiftSeedX");
        let sy = rng.next_int(query.height(), "RiftSeedY");
        if query.is_water(sx, sy)
            || query.latitude(sx, sy).abs() > cfg.max_latitude
            || query.elevation(sx, sy) > cfg.max_elevation
        {
            continue;
        }

        let family = if rng.next_int(2, "RiftAxis") == 0 {
            &NORTH_SOUTH
        } else {
            &EAST_WEST
        };
        let (mut dx, mut dy) = family[rng.next_int(4, "RiftDir") as usize];
        let (mut x, mut y) = (sx as i32, sy as i32);
        let mut placed = false;

        for _ in 0..shape.line_steps {
            x += dx * shape.step_len;
            y += dy * shape.step_len;
            if !query.in_bounds(x, y) {
                break;
            }
            if query.is_water(x as u32, y as u32) {
                continue;
            }
            if tags.rift_line.insert(UVec2::new(x as u32, y as u32)) {
                summary.line_tiles += 1;
            }
            placed = true;
            summary.shoulder_tiles += tag_shoulders(
                query,
                &mut tags.rift_shoulder,
                (x, y),
                (dx, dy),
                shape.shoulder_width,
            );

            if rng.next_int(6, "RiftBend") == 0 {
                (dx, dy) = family[rng.next_int(4, "RiftDir") as usize];
            }
        }

        if placed {
            summary.rifts += 1;
            tracing::debug!(target: "mapgen::story", x = sx, y = sy, "story.rifts.marched");
        }
    }
    summary
}

/// Walks ridges of rift potential. Returns `None` when no divergent land peak
/// qualifies so the caller can fall back to marching.
fn field_rifts(
    query: &(impl TerrainQuery + ?Sized),
    fields: &WorldFields,
    cfg: &RiftTunables,
    dir: &DirectionalityTunables,
    shape: &RiftShape,
    tags: &mut StoryTags,
) -> Option<RiftSummary> {
    let potential = fields.rift_potential()?;
    let boundary = fields.boundary_type()?;
    let closeness = fields.boundary_closeness()?;
    let width = query.width();
    let height = query.height();
    let idx = |x: i32, y: i32| (y as u32 * width + x as u32) as usize;
    let too_polar = |y: i32| query.latitude(0, y as u32).abs() > cfg.max_latitude;

    let mut seeds: Vec<(i32, i32, u8)> = Vec::new();
    let mut threshold: u8 = 192;
    for _ in 0..6 {
        seeds.clear();
        for y in 1..height.saturating_sub(1) as i32 {
            if too_polar(y) {
                continue;
            }
            for x in 1..width.saturating_sub(1) as i32 {
                if query.is_water(x as u32, y as u32) {
                    continue;
                }
                let i = idx(x, y);
                if boundary[i] != BoundaryType::Divergent
                    || closeness[i] <= 32
                    || potential[i] < threshold
                {
                    continue;
                }
                let v = potential[i];
                let is_peak = neighbor_dirs()
                    .iter()
                    .all(|&(dx, dy)| potential[idx(x + dx, y + dy)] <= v);
                if is_peak {
                    seeds.push((x, y, v));
                }
            }
        }
        if seeds.len() as u32 >= shape.max_rifts * 2 || threshold <= 112 {
            break;
        }
        threshold -= 16;
    }
    if seeds.is_empty() {
        return None;
    }
    seeds.sort_by(|a, b| b.2.cmp(&a.2));

    let min_sep = if size_scale(query) > 1.5 { 18 } else { 14 };
    let mut chosen: Vec<(i32, i32)> = Vec::new();
    for &(x, y, _) in &seeds {
        if chosen.len() as u32 >= shape.max_rifts {
            break;
        }
        if chosen
            .iter()
            .all(|&(cx, cy)| (cx - x).abs() + (cy - y).abs() >= min_sep)
        {
            chosen.push((x, y));
        }
    }

    let follow = dir.interplay.rifts_follow_plates.clamp(0.0, 1.0) * dir.cohesion();
    let axis = (dir.primary_axes.plate_axis_deg.trunc()).to_radians();
    let (ax, ay) = (axis.cos(), axis.sin());
    let heading_bias = |tx: i32, ty: i32| -> i32 {
        if follow <= 0.0 {
            return 0;
        }
        let len = ((tx * tx + ty * ty) as f32).sqrt().max(1.0);
        let dot = ax * tx as f32 / len + ay * ty as f32 / len;
        (10.0 * follow * dot).round() as i32
    };

    let mut summary = RiftSummary {
        field_driven: true,
        ..RiftSummary::default()
    };
    for &(sx, sy) in &chosen {
        let (mut x, mut y) = (sx, sy);

        // Start toward the strongest neighbouring potential.
        let mut heading = (1, 0);
        let mut best = -1i32;
        for &(dx, dy) in neighbor_dirs() {
            let (nx, ny) = (x + dx, y + dy);
            if !query.in_bounds(nx, ny) || query.is_water(nx as u32, ny as u32) {
                continue;
            }
            let p = potential[idx(nx, ny)] as i32;
            if p > best {
                best = p;
                heading = (dx, dy);
            }
        }

        let mut placed = false;
        for _ in 0..shape.line_steps {
            if !query.in_bounds(x, y) || query.is_water(x as u32, y as u32) || too_polar(y) {
                break;
            }
            if tags.rift_line.insert(UVec2::new(x as u32, y as u32)) {
                summary.line_tiles += 1;
            }
            placed = true;
            summary.shoulder_tiles += tag_shoulders(
                query,
                &mut tags.rift_shoulder,
                (x, y),
                heading,
                shape.shoulder_width,
            );

            let mut best_score = -1i32;
            let mut next = None;
            for &(tx, ty) in neighbor_dirs() {
                let (cx, cy) = (x + tx * shape.step_len, y + ty * shape.step_len);
                if !query.in_bounds(cx, cy) || query.is_water(cx as u32, cy as u32) {
                    continue;
                }
                let align = if (tx, ty) == heading {
                    16
                } else if (tx, ty) == (-heading.0, -heading.1) {
                    -12
                } else {
                    0
                };
                let score = potential[idx(cx, cy)] as i32 + align + heading_bias(tx, ty);
                if score > best_score {
                    best_score = score;
                    next = Some(((tx, ty), (cx, cy)));
                }
            }

            let Some((step, (nx, ny))) = next else {
                break;
            };
            let ni = idx(nx, ny);
            if boundary[ni] != BoundaryType::Divergent || closeness[ni] <= 16 || potential[ni] < 64
            {
                break;
            }
            x = nx;
            y = ny;
            heading = step;
        }

        if placed {
            summary.rifts += 1;
            tracing::debug!(target: "mapgen::story", x = sx, y = sy, "story.rifts.ridge");
        }
        if summary.rifts >= shape.max_rifts {
            break;
        }
    }
    Some(summary)
}

// --- orogeny -----------------------------------------------------------------

/// Mountain belts and their windward and lee flanks.
///
/// A belt tile is high (mountain or above `high_elevation`) with at least two
/// high neighbours. Belts below the size-scaled minimum are discarded whole.
pub fn tag_orogeny_belts(
    query: &(impl TerrainQuery + ?Sized),
    fields: &WorldFields,
    cfg: &OrogenyTunables,
    tags: &mut StoryTags,
) -> OrogenySummary {
    tags.orogeny_belt.clear();
    tags.windward.clear();
    tags.lee.clear();
    if !query.is_available() {
        tracing::warn!(target: "mapgen::story", "story.orogeny.unavailable");
        return OrogenySummary::default();
    }

    let s = size_scale(query);
    let radius = cfg.radius as i32 + i32::from(s > 1.5);
    let min_len = scaled(cfg.belt_min_length, 0.9, 0.4, s).max(10);

    let is_high = |x: i32, y: i32| {
        query.in_bounds(x, y)
            && (query.is_mountain(x as u32, y as u32)
                || query.elevation(x as u32, y as u32) >= cfg.high_elevation)
    };

    for y in 0..query.height() as i32 {
        for x in 0..query.width() as i32 {
            if !is_high(x, y) {
                continue;
            }
            let high_neighbours = neighbor_dirs()
                .iter()
                .filter(|&&(dx, dy)| is_high(x + dx, y + dy))
                .count();
            if high_neighbours >= 2 {
                tags.orogeny_belt.insert(UVec2::new(x as u32, y as u32));
            }
        }
    }

    if (tags.orogeny_belt.len() as u32) < min_len {
        tracing::debug!(
            target: "mapgen::story",
            belts = tags.orogeny_belt.len(),
            min_len,
            "story.orogeny.rejected"
        );
        tags.orogeny_belt.clear();
        return OrogenySummary::default();
    }

    let StoryTags {
        orogeny_belt,
        windward,
        lee,
        ..
    } = tags;
    for belt in orogeny_belt.iter() {
        let (dx, dy) = fields
            .dominant_wind_step(belt.x, belt.y)
            .unwrap_or_else(|| (zonal_wind_dx(query.latitude(belt.x, belt.y)), 0));
        for r in 1..=radius {
            let (wx, wy) = (belt.x as i32 - dx * r, belt.y as i32 - dy * r);
            if query.in_bounds(wx, wy) && !query.is_water(wx as u32, wy as u32) {
                windward.insert(UVec2::new(wx as u32, wy as u32));
            }
            let (lx, ly) = (belt.x as i32 + dx * r, belt.y as i32 + dy * r);
            if query.in_bounds(lx, ly) && !query.is_water(lx as u32, ly as u32) {
                lee.insert(UVec2::new(lx as u32, ly as u32));
            }
        }
    }

    let summary = OrogenySummary {
        belts: orogeny_belt.len() as u32,
        windward: windward.len() as u32,
        lee: lee.len() as u32,
    };
    tracing::info!(
        target: "mapgen::story",
        belts = summary.belts,
        windward = summary.windward,
        lee = summary.lee,
        "story.orogeny.tagged"
    );
    summary
}

// --- continental margins -----------------------------------------------------

/// Split long coastal row segments into active margins and passive shelves,
/// each capped at a share of all coastal land.
pub fn tag_continental_margins(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &MarginTunables,
    tags: &mut StoryTags,
) -> MarginSummary {
    if !query.is_available() {
        tracing::warn!(target: "mapgen::story", "story.margins.unavailable");
        return MarginSummary::default();
    }
    let width = query.width();
    let height = query.height();
    let s = size_scale(query);
    let active_frac = (cfg.active_fraction + 0.05 * (s - 1.0)).min(0.35);
    let passive_frac = (cfg.passive_fraction + 0.05 * (s - 1.0)).min(0.35);
    let min_segment = scaled(cfg.min_segment_length, 0.9, 0.4, s).max(10);

    let mut total_coast = 0u32;
    for y in 0..height {
        for x in 0..width {
            if query.is_coastal_land(x, y) {
                total_coast += 1;
            }
        }
    }

    let mut summary = MarginSummary {
        target_active: (total_coast as f32 * active_frac).max(0.0).floor() as u32,
        target_passive: (total_coast as f32 * passive_frac).max(0.0).floor() as u32,
        min_segment,
        ..MarginSummary::default()
    };

    let mut prefer_active = true;
    for y in 1..height.saturating_sub(1) {
        let end_x = width.saturating_sub(1);
        let mut x = 1;
        while x < end_x {
            while x < end_x && !query.is_coastal_land(x, y) {
                x += 1;
            }
            if x >= end_x {
                break;
            }
            let start = x;
            while x < end_x && query.is_coastal_land(x, y) {
                x += 1;
            }
            if x - start < min_segment {
                continue;
            }

            let roll = rng.next_int(100, "MarginSelect");
            let pick_active = if prefer_active { roll < 60 } else { roll < 40 };
            if pick_active && summary.active < summary.target_active {
                summary.active += mark_segment(
                    &mut tags.active_margin,
                    y,
                    start..x,
                    summary.target_active - summary.active,
                );
            } else if summary.passive < summary.target_passive {
                summary.passive += mark_segment(
                    &mut tags.passive_shelf,
                    y,
                    start..x,
                    summary.target_passive - summary.passive,
                );
            }
            prefer_active = !prefer_active;
        }
    }

    tracing::info!(
        target: "mapgen::story",
        active = summary.active,
        passive = summary.passive,
        target_active = summary.target_active,
        target_passive = summary.target_passive,
        min_segment,
        "story.margins.tagged"
    );
    summary
}

fn mark_segment(set: &mut TagSet, y: u32, xs: std::ops::Range<u32>, budget: u32) -> u32 {
    let mut marked = 0;
    for x in xs {
        if marked >= budget {
            break;
        }
        if set.insert(UVec2::new(x, y)) {
            marked += 1;
        }
    }
    marked
}
