//! Start-region scoring and player start assignment.
//!
//! A generation runs Partition, Score, Greedy-Assign and Fallback-Retry in that
//! order. Regions are matched to players greedily (highest total bias first),
//! then a start tile is picked inside each region. A player that cannot be
//! placed anywhere ends up in [`StartAssignment::failures`]; nothing here
//! returns an error.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::{PartitionPolicy, PlacementTunables},
    grid::{chebyshev, Biome, Terrain, TerrainQuery},
    rng::MapRng,
    start_bias::{BiasDatabase, BiasProfile},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u32,
    pub human: bool,
    pub civilization: String,
    pub leader: String,
}

impl PlayerInfo {
    pub fn human(id: u32, civilization: impl Into<String>, leader: impl Into<String>) -> Self {
        Self {
            id,
            human: true,
            civilization: civilization.into(),
            leader: leader.into(),
        }
    }

    pub fn ai(id: u32, civilization: impl Into<String>, leader: impl Into<String>) -> Self {
        Self {
            human: false,
            ..Self::human(id, civilization, leader)
        }
    }
}

/// Alive major players, in a stable order.
pub trait PlayerRoster {
    fn alive_majors(&self) -> Vec<PlayerInfo>;
}

impl PlayerRoster for [PlayerInfo] {
    fn alive_majors(&self) -> Vec<PlayerInfo> {
        self.to_vec()
    }
}

impl PlayerRoster for Vec<PlayerInfo> {
    fn alive_majors(&self) -> Vec<PlayerInfo> {
        self.clone()
    }
}

/// Inclusive tile rectangle; `south` is the smaller row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub west: u32,
    pub south: u32,
    pub east: u32,
    pub north: u32,
    pub continent: Option<u32>,
}

impl Region {
    pub fn new(west: u32, south: u32, east: u32, north: u32) -> Self {
        Self {
            west,
            south,
            east,
            north,
            continent: None,
        }
    }

    pub fn with_continent(mut self, continent: u32) -> Self {
        self.continent = Some(continent);
        self
    }

    pub fn contains(&self, tile: UVec2) -> bool {
        (self.west..=self.east).contains(&tile.x) && (self.south..=self.north).contains(&tile.y)
    }

    /// Row-major tiles clipped to the grid.
    pub fn tiles(&self, query: &(impl TerrainQuery + ?Sized)) -> impl Iterator<Item = UVec2> {
        let east = self.east.min(query.width().saturating_sub(1));
        let north = self.north.min(query.height().saturating_sub(1));
        let west = self.west;
        (self.south..=north).flat_map(move |y| (west..=east).map(move |x| UVec2::new(x, y)))
    }
}

// --- partition ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerGroup {
    Homeland,
    Distant,
}

/// Roster indices split into the two landmass groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub homeland: Vec<usize>,
    pub distant: Vec<usize>,
    /// The homeland group sits on the east landmass.
    pub homeland_is_east: bool,
    pub humans_pinned: bool,
}

fn shuffle(items: &mut [usize], rng: &mut impl MapRng) {
    let mut current = items.len();
    while current != 0 {
        let pick = rng.next_int(current as u32, "Array Shuffle") as usize;
        current -= 1;
        items.swap(current, pick);
    }
}

/// Split the roster into homeland and distant groups.
///
/// `capacities` are the west and east player caps. When more humans exist than
/// the larger side holds, both caps are rebalanced to an even split. The
/// homeland side is picked from the caps as given, before any rebalancing;
/// ties go to the west landmass.
pub fn partition_players(
    players: &[PlayerInfo],
    capacities: [u32; 2],
    policy: PartitionPolicy,
    rng: &mut impl MapRng,
) -> Partition {
    let [mut west, mut east] = capacities;
    let max_majors = (west + east) as usize;
    let considered = players.len().min(max_majors);
    let humans = players[..considered].iter().filter(|p| p.human).count() as u32;

    let homeland_is_east = east > west;
    if humans > west.max(east) {
        west = (west + east) / 2;
        east = max_majors as u32 - west;
    }
    let pinned = policy == PartitionPolicy::PrimaryHemisphere
        && humans <= if homeland_is_east { east } else { west };
    let homelands = match (pinned, homeland_is_east) {
        (true, true) => east,
        (true, false) => west,
        (false, _) => (west + east) / 2,
    } as usize;

    let mut homeland = Vec::new();
    let mut distant = Vec::new();
    if pinned {
        homeland.extend((0..considered).filter(|&i| players[i].human));
        for i in (0..considered).filter(|&i| !players[i].human) {
            if homeland.len() < homelands {
                homeland.push(i);
            } else {
                distant.push(i);
            }
        }
        shuffle(&mut homeland, rng);
        shuffle(&mut distant, rng);
    } else {
        let mut pool: Vec<usize> = (0..considered).collect();
        shuffle(&mut pool, rng);
        for i in pool {
            if homeland.len() < homelands {
                homeland.push(i);
            } else {
                distant.push(i);
            }
        }
    }

    Partition {
        homeland,
        distant,
        homeland_is_east,
        humans_pinned: pinned,
    }
}

// --- scoring -----------------------------------------------------------------

/// Region-level affinity of one player, summed over civilization and leader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerBiasVector {
    pub biomes: [i32; Biome::ALL.len()],
    pub navigable_river: i32,
    pub natural_wonder: i32,
}

impl PlayerBiasVector {
    pub fn from_profiles(profiles: &[&BiasProfile]) -> Self {
        let mut bias = Self::default();
        for profile in profiles {
            for entry in &profile.biomes {
                bias.biomes[entry.biome.index()] += entry.score;
            }
            bias.navigable_river += profile.navigable_river();
            bias.natural_wonder += profile.natural_wonder;
        }
        bias
    }

    pub fn total(&self) -> i32 {
        self.biomes.iter().sum::<i32>() + self.navigable_river + self.natural_wonder
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionCounts {
    pub biomes: [u32; Biome::ALL.len()],
    pub navigable_river: u32,
    pub natural_wonder: u32,
}

/// One pass over the region rectangle.
pub fn count_region(query: &(impl TerrainQuery + ?Sized), region: &Region) -> RegionCounts {
    let mut counts = RegionCounts::default();
    for tile in region.tiles(query) {
        counts.biomes[query.biome(tile.x, tile.y).index()] += 1;
        if query.is_navigable_river(tile.x, tile.y) {
            counts.navigable_river += 1;
        }
        if query.is_natural_wonder(tile.x, tile.y) {
            counts.natural_wonder += 1;
        }
    }
    counts
}

pub fn region_score(bias: &PlayerBiasVector, counts: &RegionCounts) -> i64 {
    let biomes: i64 = bias
        .biomes
        .iter()
        .zip(counts.biomes.iter())
        .map(|(&b, &c)| b as i64 * c as i64)
        .sum();
    biomes
        + bias.navigable_river as i64 * counts.navigable_river as i64
        + bias.natural_wonder as i64 * counts.natural_wonder as i64
}

/// Player-by-region score matrix.
pub fn score_matrix(biases: &[PlayerBiasVector], counts: &[RegionCounts]) -> Vec<Vec<i64>> {
    biases
        .iter()
        .map(|bias| counts.iter().map(|c| region_score(bias, c)).collect())
        .collect()
}

/// Greedy region match. Players go in descending total bias (ties keep roster
/// order); each takes the unclaimed region with the strictly highest score,
/// the first one winning ties. Returns the region index per player.
pub fn assign_regions(biases: &[PlayerBiasVector], counts: &[RegionCounts]) -> Vec<Option<usize>> {
    let matrix = score_matrix(biases, counts);
    let mut order: Vec<usize> = (0..biases.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(biases[i].total()));

    let mut claimed = vec![false; counts.len()];
    let mut assigned = vec![None; biases.len()];
    for player in order {
        let mut best: Option<(usize, i64)> = None;
        for (region, &score) in matrix[player].iter().enumerate() {
            if claimed[region] {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((region, score));
            }
        }
        if let Some((region, _)) = best {
            claimed[region] = true;
            assigned[player] = Some(region);
        }
    }
    assigned
}

// --- tile selection ----------------------------------------------------------

/// Spacing multiplier for a candidate `distance` tiles from the closest start:
/// zero below `required`, ramping up to one at `desired`.
pub fn buffer_factor(distance: u32, required: u32, desired: u32) -> f32 {
    if desired <= required {
        return 1.0;
    }
    if distance < required {
        0.0
    } else if distance < desired {
        (distance - required + 1) as f32 / (desired - required + 1) as f32
    } else {
        1.0
    }
}

/// Direct terrain affinity of a single tile for a player.
pub fn tile_bias(
    query: &(impl TerrainQuery + ?Sized),
    tile: UVec2,
    profiles: &[&BiasProfile],
    radius: u32,
) -> f32 {
    let r = radius as i32;
    let mut score = 0.0;
    for profile in profiles {
        if profile.coast != 0 && query.is_coastal_land(tile.x, tile.y) {
            score += profile.coast as f32;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                let (nx, ny) = (tile.x as i32 + dx, tile.y as i32 + dy);
                if !query.in_bounds(nx, ny) {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let decay = 1.0 / chebyshev(tile, UVec2::new(nx, ny)).max(1) as f32;

                let biome = query.biome(nx, ny);
                for entry in profile.biomes.iter().filter(|e| e.biome == biome) {
                    score += entry.score as f32 * decay;
                }
                let terrain = query.terrain(nx, ny);
                for entry in profile.terrains.iter().filter(|e| e.terrain == terrain) {
                    score += entry.score as f32 * decay;
                }
                if profile.river != 0 && query.is_river(nx, ny) {
                    score += profile.river as f32 * decay;
                }
                if let Some(class) = query.feature_class(nx, ny) {
                    for entry in profile.feature_classes.iter().filter(|e| e.class == class) {
                        score += entry.score as f32 * decay;
                    }
                }
                if let Some(resource) = query.resource(nx, ny) {
                    for entry in profile.resources.iter().filter(|e| e.resource == resource) {
                        score += entry.score as f32;
                    }
                }
                if profile.lake != 0 && query.is_lake(nx, ny) {
                    score += profile.lake as f32;
                }
                if profile.natural_wonder != 0 && query.is_natural_wonder(nx, ny) {
                    score += profile.natural_wonder as f32;
                }
            }
        }
    }
    score
}

/// Inputs shared by every tile pick in one generation.
pub struct StartPicker<'a, Q: TerrainQuery + ?Sized> {
    pub query: &'a Q,
    pub required_buffer: u32,
    pub desired_buffer: u32,
    pub bias_radius: u32,
}

impl<'a, Q: TerrainQuery + ?Sized> StartPicker<'a, Q> {
    pub fn new(query: &'a Q, cfg: &PlacementTunables) -> Self {
        Self {
            query,
            required_buffer: cfg.required_buffer,
            desired_buffer: cfg.desired_buffer,
            bias_radius: cfg.bias_radius,
        }
    }

    /// Host suitability: land, not mountain, on the region's continent when it
    /// names one. `None` for tiles that can never host a start.
    fn base_score(&self, tile: UVec2, continent: Option<u32>) -> Option<f32> {
        let q = self.query;
        if q.is_water(tile.x, tile.y) || q.terrain(tile.x, tile.y) == Terrain::Mountain {
            return None;
        }
        if continent.is_some() && q.continent(tile.x, tile.y) != continent {
            return None;
        }
        Some(q.fertility(tile.x, tile.y) as f32)
    }

    /// Final score of a candidate, or `None` when it cannot host this start.
    pub fn score_tile(
        &self,
        tile: UVec2,
        continent: Option<u32>,
        profiles: &[&BiasProfile],
        ignore_bias: bool,
        placed: &[UVec2],
    ) -> Option<f32> {
        if placed.contains(&tile) {
            return None;
        }
        let mut score = self.base_score(tile, continent)?;
        if score <= 0.0 {
            return Some(score);
        }
        if !ignore_bias {
            score += tile_bias(self.query, tile, profiles, self.bias_radius);
        }
        if let Some(closest) = placed.iter().map(|&p| chebyshev(tile, p)).min() {
            score *= buffer_factor(closest, self.required_buffer, self.desired_buffer);
        }
        Some(score)
    }

    /// Best tile in `region`: strictly highest positive score, first found on ties.
    pub fn pick(
        &self,
        region: &Region,
        profiles: &[&BiasProfile],
        ignore_bias: bool,
        placed: &[UVec2],
    ) -> Option<UVec2> {
        let mut best: Option<(UVec2, f32)> = None;
        for tile in region.tiles(self.query) {
            let Some(score) = self.score_tile(tile, region.continent, profiles, ignore_bias, placed)
            else {
                continue;
            };
            if score > best.map_or(0.0, |(_, top)| top) {
                best = Some((tile, score));
            }
        }
        best.map(|(tile, _)| tile)
    }
}

// --- assignment --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub tile: UVec2,
    pub group: PlayerGroup,
    pub region: usize,
    /// Picked outside the region the greedy match gave the player.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacementFailure {
    pub player: u32,
    pub group: PlayerGroup,
}

/// Outcome of one assignment run, keyed by player id.
#[derive(Resource, Debug, Clone, Default, Serialize)]
pub struct StartAssignment {
    pub placements: BTreeMap<u32, Placement>,
    pub failures: Vec<PlacementFailure>,
}

impl StartAssignment {
    pub fn tile_of(&self, player: u32) -> Option<UVec2> {
        self.placements.get(&player).map(|p| p.tile)
    }

    pub fn placed_tiles(&self) -> Vec<UVec2> {
        self.placements.values().map(|p| p.tile).collect()
    }
}

/// Place one group's players into its regions, extending `assignment`.
pub fn assign_group(
    picker: &StartPicker<'_, impl TerrainQuery + ?Sized>,
    players: &[PlayerInfo],
    members: &[usize],
    regions: &[Region],
    db: &(impl BiasDatabase + ?Sized),
    group: PlayerGroup,
    assignment: &mut StartAssignment,
) {
    let profiles: Vec<Vec<&BiasProfile>> = members
        .iter()
        .map(|&i| db.profiles_for(&players[i].civilization, &players[i].leader))
        .collect();
    let biases: Vec<PlayerBiasVector> = profiles
        .iter()
        .map(|p| PlayerBiasVector::from_profiles(p))
        .collect();
    let counts: Vec<RegionCounts> = regions
        .iter()
        .map(|region| count_region(picker.query, region))
        .collect();
    let matched = assign_regions(&biases, &counts);

    // Region order decides pick order, as the host's start sectors do.
    let mut queue: Vec<(usize, Option<usize>)> = matched
        .iter()
        .enumerate()
        .filter_map(|(slot, region)| region.map(|r| (slot, Some(r))))
        .collect();
    queue.sort_by_key(|&(_, region)| region);
    queue.extend(
        matched
            .iter()
            .enumerate()
            .filter(|(_, region)| region.is_none())
            .map(|(slot, _)| (slot, None)),
    );

    for (slot, region) in queue {
        let player = &players[members[slot]];
        let player_profiles = &profiles[slot];
        let placed = assignment.placed_tiles();

        let primary = region.and_then(|r| {
            picker
                .pick(&regions[r], player_profiles, false, &placed)
                .map(|tile| (tile, r, false))
        });
        let chosen = primary.or_else(|| {
            regions.iter().enumerate().find_map(|(r, candidate)| {
                picker
                    .pick(candidate, player_profiles, false, &placed)
                    .map(|tile| (tile, r, true))
            })
        });

        match chosen {
            Some((tile, region, fallback)) => {
                tracing::debug!(
                    target: "mapgen::placement",
                    player = player.id,
                    x = tile.x,
                    y = tile.y,
                    region,
                    fallback,
                    "placement.assigned"
                );
                assignment.placements.insert(
                    player.id,
                    Placement {
                        tile,
                        group,
                        region,
                        fallback,
                    },
                );
            }
            None => {
                tracing::warn!(
                    target: "mapgen::placement",
                    player = player.id,
                    group = ?group,
                    regions = regions.len(),
                    "placement.failed"
                );
                assignment.failures.push(PlacementFailure {
                    player: player.id,
                    group,
                });
            }
        }
    }
}

/// Divide `rect` into `count` vertical strips holding roughly equal land.
/// Narrow rectangles yield one strip per column.
pub fn split_regions(rect: Region, count: usize, query: &(impl TerrainQuery + ?Sized)) -> Vec<Region> {
    let east = rect.east.min(query.width().saturating_sub(1));
    let north = rect.north.min(query.height().saturating_sub(1));
    if count == 0 || rect.west > east || rect.south > north {
        return Vec::new();
    }
    let columns: Vec<u64> = (rect.west..=east)
        .map(|x| {
            (rect.south..=north)
                .filter(|&y| !query.is_water(x, y))
                .count() as u64
        })
        .collect();
    let strips = count.min(columns.len());
    let total: u64 = columns.iter().sum();

    let mut ends = Vec::with_capacity(strips);
    let mut running = 0;
    for (i, &land) in columns.iter().enumerate() {
        let built = ends.len() + 1;
        if built == strips {
            break;
        }
        running += land;
        let target = total * built as u64 / strips as u64;
        let columns_left = columns.len() - (i + 1);
        if running >= target || columns_left == strips - built {
            ends.push(i + 1);
        }
    }
    ends.push(columns.len());

    let mut start = 0;
    ends.into_iter()
        .map(|end| {
            let region = Region {
                west: rect.west + start as u32,
                south: rect.south,
                east: rect.west + end as u32 - 1,
                north,
                continent: rect.continent,
            };
            start = end;
            region
        })
        .collect()
}

/// Full Partition, Score, Greedy-Assign and Fallback-Retry run over the west
/// and east landmass rectangles.
pub fn assign_start_positions(
    query: &(impl TerrainQuery + ?Sized),
    roster: &(impl PlayerRoster + ?Sized),
    db: &(impl BiasDatabase + ?Sized),
    landmasses: [Region; 2],
    cfg: &PlacementTunables,
    rng: &mut impl MapRng,
) -> StartAssignment {
    let mut assignment = StartAssignment::default();
    if !query.is_available() {
        tracing::warn!(target: "mapgen::placement", "placement.unavailable");
        return assignment;
    }
    let players = roster.alive_majors();
    if players.is_empty() {
        return assignment;
    }
    let capacities = cfg.landmass_capacities.unwrap_or_else(|| {
        let n = players.len() as u32;
        [n - n / 2, n / 2]
    });
    let partition = partition_players(&players, capacities, cfg.partition, rng);
    let [west, east] = landmasses;
    let (home_rect, distant_rect) = if partition.homeland_is_east {
        (east, west)
    } else {
        (west, east)
    };
    let homeland_regions = split_regions(home_rect, partition.homeland.len(), query);
    let distant_regions = split_regions(distant_rect, partition.distant.len(), query);

    let picker = StartPicker::new(query, cfg);
    assign_group(
        &picker,
        &players,
        &partition.homeland,
        &homeland_regions,
        db,
        PlayerGroup::Homeland,
        &mut assignment,
    );
    assign_group(
        &picker,
        &players,
        &partition.distant,
        &distant_regions,
        db,
        PlayerGroup::Distant,
        &mut assignment,
    );

    let unconsidered = players.len() - partition.homeland.len() - partition.distant.len();
    tracing::info!(
        target: "mapgen::placement",
        players = players.len(),
        placed = assignment.placements.len(),
        failed = assignment.failures.len(),
        unconsidered,
        homeland_is_east = partition.homeland_is_east,
        humans_pinned = partition.humans_pinned,
        "placement.completed"
    );
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::TerrainMutation,
        rng::{ChaChaMapRng, ScriptedRng},
        start_bias::StartBiasCatalog,
        TileGrid,
    };

    fn grass_bias(score: i32) -> PlayerBiasVector {
        let mut bias = PlayerBiasVector::default();
        bias.biomes[Biome::Grassland.index()] = score;
        bias
    }

    #[test]
    fn strongest_bias_claims_richest_region() {
        let mut grid = TileGrid::new(10, 5);
        grid.fill_land(0, 0, 9, 4, 100);
        for x in 0..5 {
            grid.set_biome(x, 2, Biome::Grassland);
        }
        grid.set_biome(7, 2, Biome::Grassland);
        let regions = [Region::new(0, 0, 4, 4), Region::new(5, 0, 9, 4)];
        let counts: Vec<RegionCounts> = regions.iter().map(|r| count_region(&grid, r)).collect();
        assert_eq!(counts[0].biomes[Biome::Grassland.index()], 5);
        assert_eq!(counts[1].biomes[Biome::Grassland.index()], 1);

        // B is listed first but A's larger total puts A first in line.
        let b = grass_bias(1);
        let a = grass_bias(10);
        assert_eq!(assign_regions(&[b, a], &counts), vec![Some(1), Some(0)]);
        assert_eq!(score_matrix(&[a], &counts), vec![vec![50, 10]]);
    }

    #[test]
    fn ties_keep_roster_order_and_first_region() {
        let counts = vec![RegionCounts::default(); 2];
        let biases = [grass_bias(3), grass_bias(3)];
        assert_eq!(assign_regions(&biases, &counts), vec![Some(0), Some(1)]);
    }

    #[test]
    fn surplus_players_get_no_region() {
        let counts = vec![RegionCounts::default()];
        let biases = [grass_bias(1), grass_bias(5)];
        assert_eq!(assign_regions(&biases, &counts), vec![None, Some(0)]);
    }

    #[test]
    fn buffer_factor_zeroes_then_ramps() {
        assert_eq!(buffer_factor(0, 6, 12), 0.0);
        assert_eq!(buffer_factor(5, 6, 12), 0.0);
        let mut last = 0.0;
        for d in 6..=14 {
            let f = buffer_factor(d, 6, 12);
            assert!(f >= last);
            assert!(f > 0.0 && f <= 1.0);
            last = f;
        }
        assert_eq!(buffer_factor(12, 6, 12), 1.0);
        assert_eq!(buffer_factor(3, 6, 6), 1.0);
    }

    #[test]
    fn tile_bias_decays_with_distance() {
        let mut grid = TileGrid::new(9, 9);
        grid.fill_land(0, 0, 8, 8, 100);
        grid.set_biome(5, 4, Biome::Desert);
        grid.set_river(4, 7, true);
        let profile = BiasProfile {
            biomes: vec![crate::start_bias::BiomeBias {
                biome: Biome::Desert,
                score: 6,
            }],
            river: 9,
            ..BiasProfile::default()
        };
        let score = tile_bias(&grid, UVec2::new(4, 4), &[&profile], 3);
        assert!((score - (6.0 + 3.0)).abs() < 1e-4);
        assert_eq!(tile_bias(&grid, UVec2::new(0, 0), &[&profile], 3), 0.0);
    }

    #[test]
    fn pick_prefers_fertile_tiles_and_skips_taken_ones() {
        let mut grid = TileGrid::new(6, 6);
        grid.fill_land(0, 0, 5, 5, 100);
        grid.set_fertility(2, 2, 50);
        grid.set_fertility(3, 3, 40);
        let cfg = PlacementTunables {
            required_buffer: 0,
            desired_buffer: 0,
            ..PlacementTunables::default()
        };
        let picker = StartPicker::new(&grid, &cfg);
        let region = Region::new(0, 0, 5, 5);
        assert_eq!(picker.pick(&region, &[], true, &[]), Some(UVec2::new(2, 2)));
        assert_eq!(
            picker.pick(&region, &[], true, &[UVec2::new(2, 2)]),
            Some(UVec2::new(3, 3))
        );
    }

    #[test]
    fn nearby_starts_are_suppressed() {
        let mut grid = TileGrid::new(20, 3);
        grid.fill_land(0, 0, 19, 2, 100);
        let cfg = PlacementTunables {
            required_buffer: 6,
            desired_buffer: 12,
            ..PlacementTunables::default()
        };
        let picker = StartPicker::new(&grid, &cfg);
        let placed = [UVec2::new(0, 1)];
        assert_eq!(picker.score_tile(UVec2::new(0, 1), None, &[], true, &placed), None);
        for x in 1..6 {
            assert_eq!(
                picker.score_tile(UVec2::new(x, 1), None, &[], true, &placed),
                Some(0.0)
            );
        }
        let near = picker
            .score_tile(UVec2::new(7, 1), None, &[], true, &placed)
            .unwrap();
        let far = picker
            .score_tile(UVec2::new(13, 1), None, &[], true, &placed)
            .unwrap();
        assert!(near > 0.0 && near < far);
    }

    #[test]
    fn continent_filter_rejects_other_landmasses() {
        let mut grid = TileGrid::new(4, 1);
        grid.fill_land(0, 0, 3, 0, 100);
        grid.set_continent(0, 0, Some(1));
        grid.set_continent(3, 0, Some(2));
        let cfg = PlacementTunables::default();
        let picker = StartPicker::new(&grid, &cfg);
        let region = Region::new(0, 0, 3, 0).with_continent(2);
        assert_eq!(picker.pick(&region, &[], true, &[]), Some(UVec2::new(3, 0)));
    }

    #[test]
    fn primary_hemisphere_pins_humans() {
        let players = vec![
            PlayerInfo::ai(0, "rome", "augustus"),
            PlayerInfo::human(1, "egypt", "hatshepsut"),
            PlayerInfo::ai(2, "maya", "pachacuti"),
            PlayerInfo::human(3, "greece", "himiko"),
        ];
        let partition = partition_players(
            &players,
            [2, 2],
            PartitionPolicy::PrimaryHemisphere,
            &mut ChaChaMapRng::seed_from_u64(3),
        );
        assert!(partition.humans_pinned);
        assert!(!partition.homeland_is_east);
        let mut homeland = partition.homeland.clone();
        homeland.sort_unstable();
        assert_eq!(homeland, vec![1, 3]);
        assert_eq!(partition.distant.len(), 2);
    }

    #[test]
    fn humans_overflowing_a_side_rebalance_evenly() {
        let players: Vec<PlayerInfo> = (0..4)
            .map(|id| PlayerInfo::human(id, "rome", "augustus"))
            .chain([PlayerInfo::ai(4, "maya", "pachacuti")])
            .collect();
        let partition = partition_players(
            &players,
            [3, 2],
            PartitionPolicy::PrimaryHemisphere,
            &mut ScriptedRng::new(vec![0; 8]),
        );
        // 4 humans > 3: caps become 2 / 3, too small to pin every human
        assert!(!partition.humans_pinned);
        assert_eq!(partition.homeland.len(), 2);
        assert_eq!(partition.distant.len(), 3);
    }

    #[test]
    fn rebalanced_caps_keep_the_configured_homeland_side() {
        let players: Vec<PlayerInfo> = (0..4)
            .map(|id| PlayerInfo::human(id, "rome", "augustus"))
            .chain([PlayerInfo::ai(4, "maya", "pachacuti")])
            .collect();
        let rng = || ScriptedRng::new(vec![0; 8]);
        // west leads before the 2 / 3 rebalance, so the homeland stays west
        let west_led = partition_players(&players, [3, 2], PartitionPolicy::PrimaryHemisphere, &mut rng());
        assert!(!west_led.homeland_is_east);
        let east_led = partition_players(&players, [2, 3], PartitionPolicy::PrimaryHemisphere, &mut rng());
        assert!(east_led.homeland_is_east);
        assert_eq!(west_led.homeland.len(), east_led.homeland.len());
    }

    #[test]
    fn even_split_slices_a_shuffled_pool() {
        let players: Vec<PlayerInfo> = (0..5)
            .map(|id| PlayerInfo::ai(id, "rome", "augustus"))
            .collect();
        let partition = partition_players(
            &players,
            [3, 3],
            PartitionPolicy::EvenSplit,
            &mut ChaChaMapRng::seed_from_u64(11),
        );
        assert_eq!(partition.homeland.len(), 3);
        assert_eq!(partition.distant.len(), 2);
        let mut all: Vec<usize> = partition
            .homeland
            .iter()
            .chain(partition.distant.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn split_regions_balances_land() {
        let mut grid = TileGrid::new(12, 4);
        grid.fill_land(0, 0, 2, 3, 100);
        grid.fill_land(9, 0, 11, 3, 100);
        let regions = split_regions(Region::new(0, 0, 11, 3), 2, &grid);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].west, 0);
        assert_eq!(regions[0].east + 1, regions[1].west);
        assert_eq!(regions[1].east, 11);
        let land = |r: &Region| r.tiles(&grid).filter(|t| !grid.is_water(t.x, t.y)).count();
        assert_eq!(land(&regions[0]), 12);
        assert_eq!(land(&regions[1]), 12);

        let narrow = split_regions(Region::new(0, 0, 2, 3), 5, &grid);
        assert_eq!(narrow.len(), 3);
    }

    #[test]
    fn mountain_region_falls_back_to_a_neighbour() {
        let mut grid = TileGrid::new(10, 4);
        grid.fill_land(0, 0, 4, 3, 900);
        grid.fill_land(5, 0, 9, 3, 100);
        let players = vec![PlayerInfo::ai(7, "rome", "augustus")];
        let regions = [Region::new(0, 0, 4, 3), Region::new(5, 0, 9, 3)];
        let catalog = StartBiasCatalog::default();
        let cfg = PlacementTunables::default();
        let picker = StartPicker::new(&grid, &cfg);
        let mut assignment = StartAssignment::default();
        assign_group(
            &picker,
            &players,
            &[0],
            &regions[..1],
            &catalog,
            PlayerGroup::Homeland,
            &mut assignment,
        );
        assert!(assignment.placements.is_empty());
        assert_eq!(assignment.failures.len(), 1);

        let mut assignment = StartAssignment::default();
        assign_group(
            &picker,
            &players,
            &[0],
            &regions,
            &catalog,
            PlayerGroup::Homeland,
            &mut assignment,
        );
        let placement = assignment.placements[&7];
        assert!(placement.tile.x >= 5);
        assert!(assignment.failures.is_empty());
    }

    #[test]
    fn water_world_reports_failures_without_placements() {
        let grid = TileGrid::new(16, 8);
        let players: Vec<PlayerInfo> = (0..3)
            .map(|id| PlayerInfo::ai(id, "rome", "augustus"))
            .collect();
        let assignment = assign_start_positions(
            &grid,
            &players,
            &StartBiasCatalog::default(),
            [Region::new(0, 0, 7, 7), Region::new(8, 0, 15, 7)],
            &PlacementTunables::default(),
            &mut ChaChaMapRng::seed_from_u64(1),
        );
        assert!(assignment.placements.is_empty());
        assert_eq!(assignment.failures.len(), 3);
    }

    #[test]
    fn every_player_gets_a_distinct_tile() {
        let mut grid = TileGrid::new(40, 20);
        grid.fill_land(1, 1, 18, 18, 100);
        grid.fill_land(21, 1, 38, 18, 100);
        let players: Vec<PlayerInfo> = (0..6)
            .map(|id| PlayerInfo::ai(id, "egypt", "hatshepsut"))
            .collect();
        let cfg = PlacementTunables::default();
        let assignment = assign_start_positions(
            &grid,
            &players,
            &*StartBiasCatalog::builtin(),
            [Region::new(0, 0, 19, 19), Region::new(20, 0, 39, 19)],
            &cfg,
            &mut ChaChaMapRng::seed_from_u64(5),
        );
        assert_eq!(assignment.placements.len(), 6);
        let mut tiles = assignment.placed_tiles();
        tiles.sort_unstable_by_key(|t| (t.y, t.x));
        tiles.dedup();
        assert_eq!(tiles.len(), 6);
    }
}
