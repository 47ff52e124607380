//! Physical field model: tectonic plates, mantle pressure, winds and ocean currents.
//!
//! Fields are computed once per generation by [`WorldFields::init`] and are
//! read-only afterwards. An uninitialised model reports every getter as `None`,
//! and consumers treat that as "fields disabled".

use bevy::prelude::*;
use serde::Serialize;

use crate::{
    config::{DirectionalityTunables, WorldModelTunables},
    grid::TerrainQuery,
    rng::MapRng,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum BoundaryType {
    #[default]
    None = 0,
    Convergent = 1,
    Divergent = 2,
    Transform = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateSeed {
    pub position: UVec2,
    /// Unit movement vector.
    pub movement: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
struct FieldGrids {
    seeds: Vec<PlateSeed>,
    plate_id: Vec<u16>,
    boundary_closeness: Vec<u8>,
    boundary_type: Vec<BoundaryType>,
    tectonic_stress: Vec<u8>,
    uplift_potential: Vec<u8>,
    rift_potential: Vec<u8>,
    shield_stability: Vec<u8>,
    wind_u: Vec<i8>,
    wind_v: Vec<i8>,
    current_u: Vec<i8>,
    current_v: Vec<i8>,
    pressure: Vec<u8>,
}

impl FieldGrids {
    fn allocate(len: usize) -> Self {
        Self {
            seeds: Vec::new(),
            plate_id: vec![0; len],
            boundary_closeness: vec![0; len],
            boundary_type: vec![BoundaryType::None; len],
            tectonic_stress: vec![0; len],
            uplift_potential: vec![0; len],
            rift_potential: vec![0; len],
            shield_stability: vec![0; len],
            wind_u: vec![0; len],
            wind_v: vec![0; len],
            current_u: vec![0; len],
            current_v: vec![0; len],
            pressure: vec![0; len],
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct WorldFields {
    width: u32,
    height: u32,
    grids: Option<FieldGrids>,
}

impl WorldFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and populate every field. Returns whether the model is
    /// initialised afterwards; a second call before [`WorldFields::reset`]
    /// changes nothing and draws no random numbers.
    pub fn init(
        &mut self,
        query: &(impl TerrainQuery + ?Sized),
        rng: &mut impl MapRng,
        tunables: &WorldModelTunables,
    ) -> bool {
        if self.grids.is_some() {
            return true;
        }
        if !tunables.enabled {
            tracing::debug!(target: "mapgen::fields", "fields.init.disabled");
            return false;
        }
        if !query.is_available() {
            tracing::warn!(
                target: "mapgen::fields",
                width = query.width(),
                height = query.height(),
                "fields.init.unavailable"
            );
            return false;
        }

        let width = query.width();
        let height = query.height();
        let mut grids = FieldGrids::allocate((width * height) as usize);
        compute_plates(query, rng, tunables, &mut grids);
        compute_pressure(width, height, rng, tunables, &mut grids);
        compute_winds(query, rng, tunables, &mut grids);
        compute_currents(query, rng, &tunables.directionality, &mut grids);

        let boundary_tiles = grids
            .boundary_type
            .iter()
            .filter(|t| **t != BoundaryType::None)
            .count();
        tracing::info!(
            target: "mapgen::fields",
            width,
            height,
            plates = grids.seeds.len(),
            boundary_tiles,
            "fields.initialized"
        );

        self.width = width;
        self.height = height;
        self.grids = Some(grids);
        true
    }

    /// Drop every buffer; the next [`WorldFields::init`] recomputes from scratch.
    pub fn reset(&mut self) {
        self.grids = None;
        self.width = 0;
        self.height = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.grids.is_some()
    }

    pub fn dims(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    pub fn plate_seeds(&self) -> Option<&[PlateSeed]> {
        self.grids.as_ref().map(|g| g.seeds.as_slice())
    }

    pub fn plate_id(&self) -> Option<&[u16]> {
        self.grids.as_ref().map(|g| g.plate_id.as_slice())
    }

    pub fn boundary_closeness(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.boundary_closeness.as_slice())
    }

    pub fn boundary_type(&self) -> Option<&[BoundaryType]> {
        self.grids.as_ref().map(|g| g.boundary_type.as_slice())
    }

    pub fn tectonic_stress(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.tectonic_stress.as_slice())
    }

    pub fn uplift_potential(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.uplift_potential.as_slice())
    }

    pub fn rift_potential(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.rift_potential.as_slice())
    }

    pub fn shield_stability(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.shield_stability.as_slice())
    }

    pub fn wind_u(&self) -> Option<&[i8]> {
        self.grids.as_ref().map(|g| g.wind_u.as_slice())
    }

    pub fn wind_v(&self) -> Option<&[i8]> {
        self.grids.as_ref().map(|g| g.wind_v.as_slice())
    }

    pub fn current_u(&self) -> Option<&[i8]> {
        self.grids.as_ref().map(|g| g.current_u.as_slice())
    }

    pub fn current_v(&self) -> Option<&[i8]> {
        self.grids.as_ref().map(|g| g.current_v.as_slice())
    }

    pub fn pressure(&self) -> Option<&[u8]> {
        self.grids.as_ref().map(|g| g.pressure.as_slice())
    }

    pub fn wind_at(&self, x: u32, y: u32) -> Option<(i8, i8)> {
        let grids = self.grids.as_ref()?;
        let i = self.index(x, y)?;
        Some((grids.wind_u[i], grids.wind_v[i]))
    }

    /// Unit step along the dominant wind axis at a tile, pointing downwind.
    /// `None` when uninitialised or calm.
    pub fn dominant_wind_step(&self, x: u32, y: u32) -> Option<(i32, i32)> {
        let (u, v) = self.wind_at(x, y)?;
        let (u, v) = (u as i32, v as i32);
        if u == 0 && v == 0 {
            None
        } else if u.abs() >= v.abs() {
            Some((u.signum(), 0))
        } else {
            Some((0, v.signum()))
        }
    }
}

/// Direction (along x) the prevailing zonal wind blows toward at a latitude:
/// easterlies below 30 and from 60 degrees, westerlies between.
pub fn zonal_wind_dx(latitude: f32) -> i32 {
    let lat = latitude.abs();
    if !(30.0..60.0).contains(&lat) {
        -1
    } else {
        1
    }
}

fn signed_jitter(rng: &mut impl MapRng, span: u32, label: &str) -> i32 {
    if span == 0 {
        return 0;
    }
    rng.next_int(span * 2 + 1, label) as i32 - span as i32
}

#[inline]
fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn to_component(value: i32) -> i8 {
    value.clamp(-127, 127) as i8
}

fn compute_plates(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    tunables: &WorldModelTunables,
    grids: &mut FieldGrids,
) {
    let width = query.width();
    let height = query.height();
    let plates = &tunables.plates;
    let dir = &tunables.directionality;
    let cohesion = dir.cohesion();

    let count = plates.count.max(2);
    let rows = ((count as f32).sqrt().floor() as u32).max(1);
    let cols = count.div_ceil(rows).max(1);
    let cell_w = (width / cols).max(1);
    let cell_h = (height / rows).max(1);
    let angles: &[f32] = if plates.axis_angles.is_empty() {
        &[0.0]
    } else {
        &plates.axis_angles
    };

    let mut seeds = Vec::with_capacity(count as usize);
    'lattice: for ry in 0..rows {
        for cx in 0..cols {
            if seeds.len() >= count as usize {
                break 'lattice;
            }
            let base_x = (cx * cell_w + cell_w / 2).min(width - 1) as i32;
            let base_y = (ry * cell_h + cell_h / 2).min(height - 1) as i32;
            let jx = signed_jitter(rng, plates.seed_jitter, "PlateJX");
            let jy = signed_jitter(rng, plates.seed_jitter, "PlateJY");
            let sx = (base_x + jx).clamp(0, width as i32 - 1) as u32;
            let sy = (base_y + jy).clamp(0, height as i32 - 1) as u32;

            let base_deg = angles[rng.next_int(angles.len() as u32, "PlateAng") as usize];
            let jitter = signed_jitter(rng, dir.variability.angle_jitter_deg, "PlateDirJit") as f32
                * dir.variability.magnitude_variance;
            let angle = base_deg * (1.0 - cohesion)
                + dir.primary_axes.plate_axis_deg * cohesion
                + jitter;
            let rad = angle.to_radians();
            seeds.push(PlateSeed {
                position: UVec2::new(sx, sy),
                movement: Vec2::new(rad.cos(), rad.sin()),
            });
        }
    }

    let conv_bias = (plates.convergence_mix.clamp(0.0, 1.0) * 100.0).round() as u32;
    let convergent_below = conv_bias.saturating_sub(5);
    let divergent_below = (conv_bias + 35).min(100);

    let w = width as usize;
    for y in 0..height {
        for x in 0..width {
            let mut best = (i64::MAX, 0usize);
            let mut second: Option<i64> = None;
            for (p, seed) in seeds.iter().enumerate() {
                let dx = x as i64 - seed.position.x as i64;
                let dy = y as i64 - seed.position.y as i64;
                let d2 = dx * dx + dy * dy;
                if d2 < best.0 {
                    if best.0 != i64::MAX {
                        second = Some(best.0);
                    }
                    best = (d2, p);
                } else if second.map_or(true, |s| d2 < s) {
                    second = Some(d2);
                }
            }

            let i = y as usize * w + x as usize;
            grids.plate_id[i] = best.1 as u16;

            let closeness = match second {
                Some(snd) => {
                    let gap = (snd - best.0).max(1) as f64;
                    let c = 1.0 - (gap / (gap + best.0 as f64 + 1.0)).min(1.0);
                    to_byte(c.powf(0.65) as f32)
                }
                None => 0,
            };
            grids.boundary_closeness[i] = closeness;

            let boundary = if second.is_some() && closeness > plates.boundary_threshold {
                let roll = rng.next_int(100, "PlateBT");
                if roll < convergent_below {
                    BoundaryType::Convergent
                } else if roll < divergent_below {
                    BoundaryType::Divergent
                } else {
                    BoundaryType::Transform
                }
            } else {
                BoundaryType::None
            };
            grids.boundary_type[i] = boundary;

            grids.tectonic_stress[i] = closeness;
            grids.uplift_potential[i] = if boundary == BoundaryType::Convergent {
                closeness
            } else {
                closeness >> 2
            };
            grids.rift_potential[i] = if boundary == BoundaryType::Divergent {
                closeness
            } else {
                closeness >> 2
            };
            grids.shield_stability[i] = 255 - closeness;
        }
    }
    grids.seeds = seeds;
}

fn compute_pressure(
    width: u32,
    height: u32,
    rng: &mut impl MapRng,
    tunables: &WorldModelTunables,
    grids: &mut FieldGrids,
) {
    let cfg = &tunables.pressure;
    let bumps = cfg.bumps.max(1);
    let amplitude = cfg.amplitude.max(0.1);
    let scale = cfg.scale.max(0.1);
    let sigma = ((width.min(height) as f32 * scale).floor() as i32).max(4);
    let inv_2s2 = 1.0 / (2.0 * (sigma * sigma) as f32);

    let centers: Vec<(i32, i32, f32)> = (0..bumps)
        .map(|_| {
            let cx = rng.next_int(width, "PressCX") as i32;
            let cy = rng.next_int(height, "PressCY") as i32;
            let a = amplitude * (0.75 + rng.next_int(50, "PressA") as f32 / 100.0);
            (cx, cy, a)
        })
        .collect();

    let w = width as usize;
    let mut acc = vec![0.0f32; grids.pressure.len()];
    let mut max_val = 1e-6f32;
    for &(cx, cy, a) in &centers {
        let y_min = (cy - sigma * 2).max(0);
        let y_max = (cy + sigma * 2).min(height as i32 - 1);
        let x_min = (cx - sigma * 2).max(0);
        let x_max = (cx + sigma * 2).min(width as i32 - 1);
        for y in y_min..=y_max {
            let dy = (y - cy) as f32;
            for x in x_min..=x_max {
                let dx = (x - cx) as f32;
                let i = y as usize * w + x as usize;
                acc[i] += a * (-(dx * dx + dy * dy) * inv_2s2).exp();
                max_val = max_val.max(acc[i]);
            }
        }
    }

    for (out, value) in grids.pressure.iter_mut().zip(acc) {
        *out = to_byte(value / max_val);
    }
}

/// Global directional offset `(du, dv)` for one tile, shared by winds and currents.
fn directional_bias(
    rng: &mut impl MapRng,
    dir: &DirectionalityTunables,
    bias_deg: f32,
    magnitude: f32,
    southern: bool,
    label: &str,
) -> (i32, i32) {
    let cohesion = dir.cohesion();
    let mut deg = bias_deg;
    if dir.hemispheres.southern_flip && southern {
        deg = -deg;
    }
    let jitter = signed_jitter(rng, dir.variability.angle_jitter_deg, label) as f32;
    let rad = (deg + jitter).to_radians();
    let mag = (magnitude * cohesion).round();
    (
        (mag * rad.cos()).round() as i32,
        (mag * rad.sin()).round() as i32,
    )
}

fn compute_winds(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    tunables: &WorldModelTunables,
    grids: &mut FieldGrids,
) {
    let width = query.width();
    let height = query.height();
    let wind = &tunables.wind;
    let dir = &tunables.directionality;
    let streaks = wind.jet_streaks;
    let jet_strength = wind.jet_strength.max(0.0);
    let variance = wind.variance.max(0.0);

    let streak_lats: Vec<f32> = (0..streaks)
        .map(|s| {
            let base = 30.0 + s as f32 * (30.0 / streaks.saturating_sub(1).max(1) as f32);
            let jitter = rng.next_int(12, "JetJit") as f32 - 6.0;
            (base + jitter).clamp(15.0, 75.0)
        })
        .collect();

    let bias_deg = dir.primary_axes.wind_bias_deg
        + dir.primary_axes.plate_axis_deg
            * dir.interplay.winds_follow_plates.clamp(0.0, 1.0)
            * dir.cohesion();

    let w = width as usize;
    for y in 0..height {
        let raw_lat = query.latitude(0, y);
        let lat = raw_lat.abs();
        let mut u: i32 = if !(30.0..60.0).contains(&lat) { -80 } else { 80 };
        let v: i32 = 0;

        for &streak in &streak_lats {
            let f = (1.0 - (lat - streak).abs() / 12.0).max(0.0);
            if f > 0.0 {
                let boost = (32.0 * jet_strength * f).round() as i32;
                u += if lat < streak { boost } else { -boost };
            }
        }

        let var_u = ((rng.next_int(21, "WindUVar") as f32 - 10.0) * variance).round() as i32;
        let var_v = ((rng.next_int(11, "WindVVar") as f32 - 5.0) * variance).round() as i32;

        for x in 0..width {
            let (bu, bv) = directional_bias(rng, dir, bias_deg, 30.0, raw_lat < 0.0, "WindDirJit");
            let i = y as usize * w + x as usize;
            grids.wind_u[i] = to_component(u + var_u + bu);
            grids.wind_v[i] = to_component(v + var_v + bv);
        }
    }
}

fn compute_currents(
    query: &(impl TerrainQuery + ?Sized),
    rng: &mut impl MapRng,
    dir: &DirectionalityTunables,
    grids: &mut FieldGrids,
) {
    let width = query.width();
    let height = query.height();
    let cohesion = dir.cohesion();
    let winds_factor = dir.interplay.currents_follow_winds.clamp(0.0, 1.0) * cohesion;
    let bias_deg = dir.primary_axes.current_bias_deg
        + dir.interplay.winds_follow_plates * dir.primary_axes.plate_axis_deg * cohesion * 0.5;

    let w = width as usize;
    for y in 0..height {
        let raw_lat = query.latitude(0, y);
        let lat = raw_lat.abs();
        let base_u = if lat < 12.0 {
            -50
        } else if (45.0..60.0).contains(&lat) {
            20
        } else if lat >= 60.0 {
            -15
        } else {
            0
        };

        let centre = y as usize * w + w / 2;
        let (wu, wv) = (grids.wind_u[centre] as f32, grids.wind_v[centre] as f32);

        for x in 0..width {
            let i = y as usize * w + x as usize;
            if !query.is_water(x, y) {
                grids.current_u[i] = 0;
                grids.current_v[i] = 0;
                continue;
            }
            let mut cu = base_u + (wu * winds_factor).round() as i32;
            let mut cv = (wv * winds_factor).round() as i32;
            let (bu, bv) =
                directional_bias(rng, dir, bias_deg, 25.0, raw_lat < 0.0, "CurrentDirJit");
            cu += bu;
            cv += bv;
            grids.current_u[i] = to_component(cu);
            grids.current_v[i] = to_component(cv);
        }
    }
}
