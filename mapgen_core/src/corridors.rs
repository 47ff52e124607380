//! Strategic corridors: sea lanes, island-hop arcs, open land runs and river chains.
//!
//! Tagging runs in two stages. Sea lanes, island hops and land corridors are
//! tagged before islands are seeded so islands can keep lanes clear; river
//! chains need modelled rivers and run afterwards.

use bevy::prelude::UVec2;
use serde::Serialize;

use crate::{
    config::{
        CorridorTunables, DirectionalityTunables, IslandHopTunables, LandCorridorTunables,
        RiverChainTunables, SeaLaneTunables,
    },
    grid::{land_within, TerrainQuery},
    rng::MapRng,
    tags::{self, CorridorKind, CorridorMetadata, CorridorStyle, StoryTags},
};

/// Seed attempts the river-chain pass may spend.
pub const RIVER_CHAIN_ATTEMPTS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorridorStage {
    PreIslands,
    PostRivers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorridorSummary {
    pub sea_lanes: u32,
    pub island_hops: u32,
    pub land_corridors: u32,
    pub river_chains: u32,
    pub backfilled: u32,
}

impl CorridorSummary {
    pub fn merge(&mut self, other: CorridorSummary) {
        self.sea_lanes += other.sea_lanes;
        self.island_hops += other.island_hops;
        self.land_corridors += other.land_corridors;
        self.river_chains += other.river_chains;
        self.backfilled += other.backfilled;
    }
}

pub fn tag_strategic_corridors(
    stage: CorridorStage,
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &CorridorTunables,
    dir: &DirectionalityTunables,
    tags: &mut StoryTags,
    meta: &mut CorridorMetadata,
) -> CorridorSummary {
    let mut summary = CorridorSummary::default();
    if !query.is_available() {
        tracing::warn!(target: "mapgen::corridors", ?stage, "corridors.unavailable");
        return summary;
    }

    match stage {
        CorridorStage::PreIslands => {
            summary.sea_lanes = tag_sea_lanes(query, &cfg.sea, dir, tags, meta);
            summary.island_hops = tag_island_hops(query, rng, &cfg.island_hop, tags, meta);
            summary.land_corridors = tag_land_corridors(query, &cfg.land, dir, tags, meta);
        }
        CorridorStage::PostRivers => {
            summary.river_chains = tag_river_chains(query, rng, &cfg.river, tags, meta);
        }
    }
    summary.backfilled = meta.backfill(tags, query) as u32;

    tracing::info!(
        target: "mapgen::corridors",
        ?stage,
        sea_lanes = summary.sea_lanes,
        island_hops = summary.island_hops,
        land_corridors = summary.land_corridors,
        river_chains = summary.river_chains,
        backfilled = summary.backfilled,
        "corridors.tagged"
    );
    summary
}

// --- sea lanes ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LaneAxis {
    Column,
    Row,
    /// Anti-diagonal `x + y = k`, running north-east to south-west.
    DiagonalSum,
    /// Diagonal `x - y = d`, running north-west to south-east.
    DiagonalDiff,
}

impl LaneAxis {
    fn perpendicular(self) -> (i32, i32) {
        match self {
            LaneAxis::Column => (1, 0),
            LaneAxis::Row => (0, 1),
            LaneAxis::DiagonalSum => (1, 1),
            LaneAxis::DiagonalDiff => (1, -1),
        }
    }

    fn direction(self) -> (f32, f32) {
        let h = std::f32::consts::FRAC_1_SQRT_2;
        match self {
            LaneAxis::Column => (0.0, 1.0),
            LaneAxis::Row => (1.0, 0.0),
            LaneAxis::DiagonalSum => (h, -h),
            LaneAxis::DiagonalDiff => (h, h),
        }
    }

    fn width_weight(self) -> i32 {
        match self {
            LaneAxis::Column | LaneAxis::Row => 3,
            LaneAxis::DiagonalSum | LaneAxis::DiagonalDiff => 2,
        }
    }
}

#[derive(Debug, Clone)]
struct LaneCandidate {
    axis: LaneAxis,
    index: i32,
    tiles: Vec<UVec2>,
    score: i32,
}

/// Tiles of one scan line, in walk order.
fn scan_line(width: i32, height: i32, axis: LaneAxis, index: i32) -> Vec<UVec2> {
    let point = |x: i32, y: i32| UVec2::new(x as u32, y as u32);
    match axis {
        LaneAxis::Column => (0..height).map(|y| point(index, y)).collect(),
        LaneAxis::Row => (0..width).map(|x| point(x, index)).collect(),
        LaneAxis::DiagonalSum => {
            let xs = (index - (height - 1)).max(0);
            let xe = (width - 1).min(index);
            (xs..=xe).map(|x| point(x, index - x)).collect()
        }
        LaneAxis::DiagonalDiff => {
            let ys = (-index).max(0);
            let ye = (height - 1).min(width - 1 - index);
            (ys..=ye).map(|y| point(index + y, y)).collect()
        }
    }
}

/// Longest contiguous water run along `line`.
fn longest_water_run<'a>(query: &(impl TerrainQuery + ?Sized), line: &'a [UVec2]) -> &'a [UVec2] {
    let mut best = 0..0;
    let mut start = 0;
    let mut len = 0;
    for (i, p) in line.iter().enumerate() {
        if query.is_water(p.x, p.y) {
            if len == 0 {
                start = i;
            }
            len += 1;
            if len > best.len() {
                best = start..i + 1;
            }
        } else {
            len = 0;
        }
    }
    &line[best]
}

fn has_perpendicular_width(
    query: &(impl TerrainQuery + ?Sized),
    tile: UVec2,
    axis: LaneAxis,
    min_width: u32,
) -> bool {
    let r = (min_width as i32 - 1) / 2;
    if !query.is_water(tile.x, tile.y) {
        return false;
    }
    let (px, py) = axis.perpendicular();
    (-r..=r).all(|t| {
        let nx = tile.x as i32 + px * t;
        let ny = tile.y as i32 + py * t;
        query.in_bounds(nx, ny) && query.is_water(nx as u32, ny as u32)
    })
}

/// Score bonus for lanes parallel to the prevailing wind and current axes.
struct LaneBias {
    cohesion: f32,
    wind: (f32, f32),
    current: (f32, f32),
    current_weight: f32,
}

impl LaneBias {
    fn new(dir: &DirectionalityTunables) -> Self {
        let cohesion = dir.cohesion();
        let plate = dir.primary_axes.plate_axis_deg.trunc();
        let winds_follow = dir.interplay.winds_follow_plates.clamp(0.0, 1.0) * cohesion;
        let currents_follow = dir.interplay.currents_follow_winds.clamp(0.0, 1.0) * cohesion;
        let wind_deg = dir.primary_axes.wind_bias_deg.trunc() + (plate * winds_follow).round();
        let current_deg =
            dir.primary_axes.current_bias_deg.trunc() + (plate * winds_follow * 0.5).round();
        let unit = |deg: f32| (deg.to_radians().cos(), deg.to_radians().sin());
        Self {
            cohesion,
            wind: unit(wind_deg),
            current: unit(current_deg),
            current_weight: 0.8 + 0.6 * currents_follow,
        }
    }

    fn score(&self, axis: LaneAxis) -> i32 {
        if self.cohesion <= 0.0 {
            return 0;
        }
        let (lx, ly) = axis.direction();
        let dot_wind = (self.wind.0 * lx + self.wind.1 * ly).abs();
        let dot_current = (self.current.0 * lx + self.current.1 * ly).abs();
        let align = (dot_wind + dot_current * self.current_weight) / (1.0 + self.current_weight);
        (align * 25.0 * self.cohesion).round() as i32
    }
}

fn lane_candidate(
    query: &(impl TerrainQuery + ?Sized),
    cfg: &SeaLaneTunables,
    bias: &LaneBias,
    axis: LaneAxis,
    index: i32,
    min_frac: f32,
) -> Option<LaneCandidate> {
    let line = scan_line(query.width() as i32, query.height() as i32, axis, index);
    let axis_len = line.len();
    let run = longest_water_run(query, &line);
    let min_len = (axis_len as f32 * min_frac).floor() as usize;
    if run.is_empty() || run.len() < min_len {
        return None;
    }

    let required = cfg.min_channel_width.max(1);
    let step = (run.len() / 10).max(1);
    let wide = run
        .iter()
        .step_by(step)
        .all(|&tile| has_perpendicular_width(query, tile, axis, required));
    let min_width = if wide { required } else { 1 };
    let coverage = run.len() as f32 / axis_len as f32;
    let score = run.len() as i32
        + axis.width_weight() * min_width as i32
        + (coverage * 10.0).round() as i32
        + bias.score(axis);

    Some(LaneCandidate {
        axis,
        index,
        tiles: run.to_vec(),
        score,
    })
}

fn tag_sea_lanes(
    query: &(impl TerrainQuery + ?Sized),
    cfg: &SeaLaneTunables,
    dir: &DirectionalityTunables,
    tags: &mut StoryTags,
    meta: &mut CorridorMetadata,
) -> u32 {
    let width = query.width() as i32;
    let height = query.height() as i32;
    let stride = cfg.scan_stride.max(2) as usize;
    let min_frac = cfg.min_length_frac.clamp(0.4, 1.0);
    let bias = LaneBias::new(dir);

    let mut candidates: Vec<LaneCandidate> = Vec::new();
    let mut scan = |axis: LaneAxis, indices: &mut dyn Iterator<Item = i32>| {
        for index in indices {
            if let Some(candidate) = lane_candidate(query, cfg, &bias, axis, index, min_frac) {
                candidates.push(candidate);
            }
        }
    };
    scan(LaneAxis::Column, &mut (1..width - 1).step_by(stride));
    scan(LaneAxis::Row, &mut (1..height - 1).step_by(stride));
    if cfg.prefer_diagonals {
        scan(
            LaneAxis::DiagonalSum,
            &mut (0..=width + height - 2).step_by(stride),
        );
        scan(
            LaneAxis::DiagonalDiff,
            &mut (-(height - 1)..=width - 1).step_by(stride),
        );
    }

    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    let spacing = cfg.lane_spacing as i32;
    let mut chosen: Vec<(LaneAxis, i32)> = Vec::new();
    for candidate in candidates {
        if chosen.len() as u32 >= cfg.max_lanes {
            break;
        }
        let crowded = chosen
            .iter()
            .any(|&(axis, index)| axis == candidate.axis && (index - candidate.index).abs() < spacing);
        if crowded {
            continue;
        }
        chosen.push((candidate.axis, candidate.index));

        for &tile in &candidate.tiles {
            tags.corridor_sea_lane.insert(tile);
            let style = if land_within(query, tile.x, tile.y, 2) {
                CorridorStyle::Coastal
            } else {
                CorridorStyle::Ocean
            };
            meta.record(tile, CorridorKind::Sea, style);
        }
        tracing::debug!(
            target: "mapgen::corridors",
            axis = ?candidate.axis,
            index = candidate.index,
            len = candidate.tiles.len(),
            score = candidate.score,
            "corridors.sea_lane"
        );
    }
    chosen.len() as u32
}

// --- island hops -------------------------------------------------------------

fn tag_island_hops(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &IslandHopTunables,
    tags: &mut StoryTags,
    meta: &mut CorridorMetadata,
) -> u32 {
    if !cfg.use_hotspots || cfg.max_arcs == 0 || tags.hotspot.is_empty() {
        return 0;
    }
    let keys = tags::sorted(&tags.hotspot);
    let mut picked = vec![false; keys.len()];
    let mut arcs = 0;
    let mut attempts = 0;
    while arcs < cfg.max_arcs && attempts < 100 && attempts < keys.len() * 2 {
        attempts += 1;
        let i = rng.next_int(keys.len() as u32, "IslandHopPick") as usize;
        if picked[i] {
            continue;
        }
        picked[i] = true;
        arcs += 1;

        let seed = keys[i];
        for dy in -1..=1 {
            for dx in -1..=1 {
                let nx = seed.x as i32 + dx;
                let ny = seed.y as i32 + dy;
                if !query.in_bounds(nx, ny) || !query.is_water(nx as u32, ny as u32) {
                    continue;
                }
                let tile = UVec2::new(nx as u32, ny as u32);
                tags.corridor_island_hop.insert(tile);
                meta.record(tile, CorridorKind::IslandHop, CorridorStyle::Archipelago);
            }
        }
    }
    arcs
}

// --- land corridors ----------------------------------------------------------

struct RunContext {
    avg_elevation: i32,
    avg_rainfall: i32,
    relief: f32,
    latitude: f32,
}

fn run_context(query: &(impl TerrainQuery + ?Sized), y: u32, xs: std::ops::Range<u32>) -> RunContext {
    let width = query.width();
    let height = query.height();
    let (mut elev, mut rain, mut samples, mut relief_hits) = (0i64, 0i64, 0u32, 0u32);
    for x in xs {
        if query.is_water(x, y) {
            continue;
        }
        let e = query.elevation(x, y);
        elev += e as i64;
        rain += query.rainfall(x, y) as i64;
        samples += 1;
        let around = [
            query.elevation(x, y.saturating_sub(1)),
            query.elevation(x, (y + 1).min(height - 1)),
            query.elevation(x.saturating_sub(1), y),
            query.elevation((x + 1).min(width - 1), y),
        ];
        if around.iter().map(|n| (e - n).abs()).max().unwrap_or(0) >= 60 {
            relief_hits += 1;
        }
    }
    let avg = |total: i64| {
        if samples == 0 {
            0
        } else {
            (total as f64 / samples as f64).round() as i32
        }
    };
    RunContext {
        avg_elevation: avg(elev),
        avg_rainfall: avg(rain),
        relief: if samples == 0 {
            0.0
        } else {
            relief_hits as f32 / samples as f32
        },
        latitude: query.latitude(0, y).abs(),
    }
}

fn land_style(ctx: &RunContext, dir: &DirectionalityTunables) -> CorridorStyle {
    let RunContext {
        avg_elevation: elev,
        avg_rainfall: rain,
        relief,
        latitude: lat,
    } = *ctx;

    let mut style = if relief > 0.35 && rain < 95 {
        CorridorStyle::Canyon
    } else if elev > 650 && relief < 0.2 {
        CorridorStyle::Plateau
    } else if elev > 550 && relief < 0.35 {
        CorridorStyle::FlatMtn
    } else if rain < 85 && lat < 35.0 {
        CorridorStyle::DesertBelt
    } else if rain > 115 {
        CorridorStyle::GrasslandBelt
    } else {
        CorridorStyle::PlainsBelt
    };

    let cohesion = dir.cohesion();
    if cohesion <= 0.0 {
        return style;
    }
    // Corridors run along rows, so alignment is the |cos| of each axis.
    let align_plate = dir.primary_axes.plate_axis_deg.trunc().to_radians().cos().abs();
    let align_wind = dir.primary_axes.wind_bias_deg.trunc().to_radians().cos().abs();
    let hi = 0.75 * cohesion + 0.1;
    let mid = 0.5 * cohesion + 0.1;

    if align_plate >= hi {
        if elev > 650 && relief < 0.28 {
            style = CorridorStyle::Plateau;
        } else if relief > 0.3 && rain < 100 {
            style = CorridorStyle::Canyon;
        } else if elev > 560 && relief < 0.35 {
            style = CorridorStyle::FlatMtn;
        }
    } else if align_plate >= mid && elev > 600 && relief < 0.25 {
        style = CorridorStyle::Plateau;
    }

    if align_wind >= hi {
        if rain > 110 || (lat < 25.0 && rain > 100) {
            style = CorridorStyle::GrasslandBelt;
        } else if rain < 90 && lat < 35.0 {
            style = CorridorStyle::DesertBelt;
        }
    } else if align_wind >= mid && rain > 120 {
        style = CorridorStyle::GrasslandBelt;
    }
    style
}

fn tag_land_corridors(
    query: &(impl TerrainQuery + ?Sized),
    cfg: &LandCorridorTunables,
    dir: &DirectionalityTunables,
    tags: &mut StoryTags,
    meta: &mut CorridorMetadata,
) -> u32 {
    if !cfg.use_rift_shoulders || cfg.max_corridors == 0 || tags.rift_shoulder.is_empty() {
        return 0;
    }
    let width = query.width();
    let height = query.height();
    let min_run = cfg.min_run_length.max(12);
    let spacing = cfg.spacing;
    let is_shoulder = |x: u32, y: u32| tags.rift_shoulder.contains(&UVec2::new(x, y));

    let mut runs: Vec<(u32, std::ops::Range<u32>, CorridorStyle)> = Vec::new();
    let mut used_rows: Vec<u32> = Vec::new();
    'rows: for y in 1..height.saturating_sub(1) {
        let end_x = width.saturating_sub(1);
        let mut x = 1;
        while x < end_x {
            if runs.len() as u32 >= cfg.max_corridors {
                break 'rows;
            }
            while x < end_x && !is_shoulder(x, y) {
                x += 1;
            }
            if x >= end_x {
                break;
            }
            let start = x;
            while x < end_x && is_shoulder(x, y) {
                x += 1;
            }
            if x - start < min_run || used_rows.iter().any(|&row| row.abs_diff(y) < spacing) {
                continue;
            }
            let style = land_style(&run_context(query, y, start..x), dir);
            runs.push((y, start..x, style));
            used_rows.push(y);
        }
    }

    for (y, xs, style) in &runs {
        for x in xs.clone() {
            if query.is_water(x, *y) {
                continue;
            }
            let tile = UVec2::new(x, *y);
            tags.corridor_land_open.insert(tile);
            meta.record(tile, CorridorKind::Land, *style);
        }
        tracing::debug!(
            target: "mapgen::corridors",
            y,
            start = xs.start,
            len = xs.len(),
            style = ?style,
            "corridors.land"
        );
    }
    runs.len() as u32
}

// --- river chains ------------------------------------------------------------

fn tag_river_chains(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    cfg: &RiverChainTunables,
    tags: &mut StoryTags,
    meta: &mut CorridorMetadata,
) -> u32 {
    if cfg.max_chains == 0 {
        return 0;
    }
    let max_steps = cfg.max_steps.max(20);
    let lowland = cfg.prefer_lowland_below.max(0);
    let seed_radius = cfg.coast_seed_radius.max(1);

    let mut chains = 0;
    let mut tries = 0;
    while chains < cfg.max_chains && tries < RIVER_CHAIN_ATTEMPTS {
        tries += 1;
        let sx = rng.next_int(query.width(), "RiverChainSX");
        let sy = rng.next_int(query.height(), "RiverChainSY");
        if !query.is_coastal_land(sx, sy) || !query.river_adjacent(sx, sy, seed_radius) {
            continue;
        }

        let (mut x, mut y) = (sx, sy);
        let mut path: Vec<UVec2> = Vec::new();
        for _ in 0..max_steps {
            if !query.is_water(x, y) && query.river_adjacent(x, y, 1) {
                path.push(UVec2::new(x, y));
            }

            let mut best = (x, y, query.elevation(x, y));
            let mut improved = false;
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if !query.in_bounds(nx, ny) {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    if query.is_water(nx, ny) || !query.river_adjacent(nx, ny, 1) {
                        continue;
                    }
                    let e = query.elevation(nx, ny);
                    let prefer = e <= best.2 || (e < lowland && best.2 >= lowland);
                    if prefer && (!improved || rng.next_int(3, "RiverChainTie") == 0) {
                        best = (nx, ny, e);
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
            (x, y) = (best.0, best.1);
        }

        let end_ok = !cfg.must_end_near_coast || query.is_coastal_land(x, y);
        if path.len() as u32 >= cfg.min_tiles && end_ok {
            for &tile in &path {
                tags.corridor_river_chain.insert(tile);
                meta.record(tile, CorridorKind::River, CorridorStyle::RiverChain);
            }
            chains += 1;
            tracing::debug!(
                target: "mapgen::corridors",
                x = sx,
                y = sy,
                tiles = path.len(),
                "corridors.river_chain"
            );
        }
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::TerrainMutation,
        rng::ScriptedRng,
        TileGrid,
    };

    fn two_continents() -> TileGrid {
        let mut grid = TileGrid::new(60, 40);
        grid.fill_land(4, 4, 20, 35, 200);
        grid.fill_land(40, 4, 55, 35, 200);
        grid
    }

    #[test]
    fn sea_lanes_only_cover_water() {
        let grid = two_continents();
        let mut tags = StoryTags::new();
        let mut meta = CorridorMetadata::default();
        let lanes = tag_sea_lanes(
            &grid,
            &SeaLaneTunables::default(),
            &DirectionalityTunables::default(),
            &mut tags,
            &mut meta,
        );
        assert!(lanes >= 1);
        assert!(lanes <= 3);
        for p in &tags.corridor_sea_lane {
            assert!(grid.is_water(p.x, p.y));
            assert_eq!(meta.kind_at(*p), Some(CorridorKind::Sea));
        }
    }

    #[test]
    fn lane_spacing_separates_parallel_lanes() {
        let grid = TileGrid::new(40, 40);
        let cfg = SeaLaneTunables {
            max_lanes: 10,
            scan_stride: 2,
            lane_spacing: 5,
            ..SeaLaneTunables::default()
        };
        let mut tags = StoryTags::new();
        let mut meta = CorridorMetadata::default();
        tag_sea_lanes(
            &grid,
            &cfg,
            &DirectionalityTunables::default(),
            &mut tags,
            &mut meta,
        );
        let mut columns: Vec<u32> = tags
            .corridor_sea_lane
            .iter()
            .filter(|p| p.y == 0)
            .map(|p| p.x)
            .collect();
        columns.sort_unstable();
        for pair in columns.windows(2) {
            assert!(pair[1] - pair[0] >= 5, "{columns:?}");
        }
    }

    #[test]
    fn island_hops_surround_hotspots_with_water() {
        let grid = two_continents();
        let mut tags = StoryTags::new();
        tags.hotspot.insert(UVec2::new(30, 10));
        tags.hotspot.insert(UVec2::new(30, 30));
        let mut meta = CorridorMetadata::default();
        let mut rng = ScriptedRng::new(vec![0, 0, 1]);
        let arcs = tag_island_hops(
            &grid,
            &mut rng,
            &IslandHopTunables::default(),
            &mut tags,
            &mut meta,
        );
        assert_eq!(arcs, 2);
        assert_eq!(tags.corridor_island_hop.len(), 18);
        assert_eq!(
            meta.style_at(UVec2::new(29, 9)),
            Some(CorridorStyle::Archipelago)
        );
    }

    #[test]
    fn land_corridors_follow_long_shoulder_runs() {
        let mut grid = TileGrid::new(60, 20);
        grid.fill_land(0, 0, 59, 19, 200);
        let mut tags = StoryTags::new();
        for x in 5..40 {
            tags.rift_shoulder.insert(UVec2::new(x, 10));
        }
        for x in 5..10 {
            tags.rift_shoulder.insert(UVec2::new(x, 12));
        }
        let mut meta = CorridorMetadata::default();
        let corridors = tag_land_corridors(
            &grid,
            &LandCorridorTunables::default(),
            &DirectionalityTunables::default(),
            &mut tags,
            &mut meta,
        );
        assert_eq!(corridors, 1);
        assert_eq!(tags.corridor_land_open.len(), 35);
        assert!(tags.corridor_land_open.iter().all(|p| p.y == 10));
        assert_eq!(meta.kind_at(UVec2::new(5, 10)), Some(CorridorKind::Land));
    }

    #[test]
    fn canyon_style_needs_relief_and_dryness() {
        let ctx = RunContext {
            avg_elevation: 300,
            avg_rainfall: 80,
            relief: 0.5,
            latitude: 40.0,
        };
        assert_eq!(
            land_style(&ctx, &DirectionalityTunables::default()),
            CorridorStyle::Canyon
        );
        let wet = RunContext {
            avg_rainfall: 130,
            relief: 0.0,
            ..ctx
        };
        assert_eq!(
            land_style(&wet, &DirectionalityTunables::default()),
            CorridorStyle::GrasslandBelt
        );
    }

    /// Land from x = 0 to 34 with a river along row 10 that climbs towards
    /// the east coast, so a chain seeded on the coast walks west downhill.
    fn river_valley() -> TileGrid {
        let mut grid = TileGrid::new(40, 20);
        grid.fill_land(0, 0, 34, 19, 300);
        for x in 5..35 {
            grid.set_river(x, 10, true);
            grid.set_elevation(x, 10, 100 + (x as i32) * 5);
        }
        grid
    }

    fn chain_cfg(min_tiles: u32, must_end_near_coast: bool) -> RiverChainTunables {
        RiverChainTunables {
            max_chains: 1,
            min_tiles,
            must_end_near_coast,
            ..RiverChainTunables::default()
        }
    }

    #[test]
    fn river_chains_walk_river_adjacent_land() {
        let grid = river_valley();
        let mut tags = StoryTags::new();
        let mut meta = CorridorMetadata::default();
        let mut rng = ScriptedRng::new(vec![34, 10]);
        let chains = tag_river_chains(&grid, &mut rng, &chain_cfg(30, false), &mut tags, &mut meta);
        assert_eq!(chains, 1);
        assert_eq!(tags.corridor_river_chain.len(), 30);
        for p in &tags.corridor_river_chain {
            assert!(!grid.is_water(p.x, p.y));
            assert!(grid.river_adjacent(p.x, p.y, 1));
            assert_eq!(meta.kind.get(p), Some(&CorridorKind::River));
        }
        assert!(tags.corridor_river_chain.contains(&UVec2::new(34, 10)));
        assert!(tags.corridor_river_chain.contains(&UVec2::new(5, 10)));
    }

    #[test]
    fn river_chains_ending_inland_are_dropped_when_coast_required() {
        let grid = river_valley();
        let mut tags = StoryTags::new();
        let mut meta = CorridorMetadata::default();
        let mut rng = ScriptedRng::new(vec![34, 10]);
        let chains = tag_river_chains(&grid, &mut rng, &chain_cfg(0, true), &mut tags, &mut meta);
        assert_eq!(chains, 0);
        assert!(tags.corridor_river_chain.is_empty());
        assert!(meta.kind.is_empty());
        assert_eq!(rng.consumed() as u32, RIVER_CHAIN_ATTEMPTS * 2);
    }

    #[test]
    fn river_chains_shorter_than_min_tiles_are_dropped() {
        let grid = river_valley();
        let mut tags = StoryTags::new();
        let mut meta = CorridorMetadata::default();
        let mut rng = ScriptedRng::new(vec![34, 10]);
        let chains = tag_river_chains(&grid, &mut rng, &chain_cfg(31, false), &mut tags, &mut meta);
        assert_eq!(chains, 0);
        assert!(tags.corridor_river_chain.is_empty());
        assert!(meta.kind.is_empty());
    }
}
