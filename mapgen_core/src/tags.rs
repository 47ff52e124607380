//! Sparse narrative tag sets and corridor metadata.
//!
//! Tags are created empty, filled once by the tagging passes and read by the
//! climate and placement stages. [`StoryTags::reset`] clears everything between
//! generations.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use serde::Serialize;

use crate::grid::{land_within, TerrainQuery};

pub type TagSet = HashSet<UVec2>;

#[derive(Resource, Debug, Clone, Default)]
pub struct StoryTags {
    pub hotspot: TagSet,
    pub hotspot_paradise: TagSet,
    pub hotspot_volcanic: TagSet,
    pub rift_line: TagSet,
    pub rift_shoulder: TagSet,
    pub orogeny_belt: TagSet,
    pub windward: TagSet,
    pub lee: TagSet,
    pub active_margin: TagSet,
    pub passive_shelf: TagSet,
    pub corridor_sea_lane: TagSet,
    pub corridor_island_hop: TagSet,
    pub corridor_land_open: TagSet,
    pub corridor_river_chain: TagSet,
}

impl StoryTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        for set in self.sets_mut() {
            set.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.named().iter().all(|(_, set)| set.is_empty())
    }

    /// Every set with a stable name, in declaration order.
    pub fn named(&self) -> [(&'static str, &TagSet); 14] {
        [
            ("hotspot", &self.hotspot),
            ("hotspot_paradise", &self.hotspot_paradise),
            ("hotspot_volcanic", &self.hotspot_volcanic),
            ("rift_line", &self.rift_line),
            ("rift_shoulder", &self.rift_shoulder),
            ("orogeny_belt", &self.orogeny_belt),
            ("windward", &self.windward),
            ("lee", &self.lee),
            ("active_margin", &self.active_margin),
            ("passive_shelf", &self.passive_shelf),
            ("corridor_sea_lane", &self.corridor_sea_lane),
            ("corridor_island_hop", &self.corridor_island_hop),
            ("corridor_land_open", &self.corridor_land_open),
            ("corridor_river_chain", &self.corridor_river_chain),
        ]
    }

    fn sets_mut(&mut self) -> [&mut TagSet; 14] {
        [
            &mut self.hotspot,
            &mut self.hotspot_paradise,
            &mut self.hotspot_volcanic,
            &mut self.rift_line,
            &mut self.rift_shoulder,
            &mut self.orogeny_belt,
            &mut self.windward,
            &mut self.lee,
            &mut self.active_margin,
            &mut self.passive_shelf,
            &mut self.corridor_sea_lane,
            &mut self.corridor_island_hop,
            &mut self.corridor_land_open,
            &mut self.corridor_river_chain,
        ]
    }

    /// Per-set sizes keyed by name; used for reports and logs.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        self.named()
            .iter()
            .map(|(name, set)| (*name, set.len()))
            .collect()
    }
}

/// Members of `set` ordered by row, then column. Hash iteration order is not
/// stable across runs, so anything that indexes into a tag set goes through this.
pub fn sorted(set: &TagSet) -> Vec<UVec2> {
    let mut keys: Vec<UVec2> = set.iter().copied().collect();
    keys.sort_unstable_by_key(|p| (p.y, p.x));
    keys
}

/// Whether any member of `set` lies within Chebyshev `radius` of `(x, y)`,
/// the tile itself excluded.
pub fn near(set: &TagSet, x: u32, y: u32, radius: u32) -> bool {
    if set.is_empty() {
        return false;
    }
    let r = radius as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            if set.contains(&UVec2::new(nx as u32, ny as u32)) {
                return true;
            }
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorridorKind {
    Sea,
    IslandHop,
    Land,
    River,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorridorStyle {
    Ocean,
    Coastal,
    Archipelago,
    Canyon,
    Plateau,
    FlatMtn,
    DesertBelt,
    GrasslandBelt,
    PlainsBelt,
    RiverChain,
}

/// Kind and style for every corridor tile.
#[derive(Resource, Debug, Clone, Default)]
pub struct CorridorMetadata {
    pub kind: HashMap<UVec2, CorridorKind>,
    pub style: HashMap<UVec2, CorridorStyle>,
}

impl CorridorMetadata {
    pub fn record(&mut self, tile: UVec2, kind: CorridorKind, style: CorridorStyle) {
        self.kind.insert(tile, kind);
        self.style.insert(tile, style);
    }

    pub fn kind_at(&self, tile: UVec2) -> Option<CorridorKind> {
        self.kind.get(&tile).copied()
    }

    pub fn style_at(&self, tile: UVec2) -> Option<CorridorStyle> {
        self.style.get(&tile).copied()
    }

    /// Fill kind and style for tagged corridor tiles that lack them. Sea lanes
    /// are styled coastal when land touches them.
    pub fn backfill(&mut self, tags: &StoryTags, query: &(impl TerrainQuery + ?Sized)) -> usize {
        let sources = [
            (&tags.corridor_sea_lane, CorridorKind::Sea),
            (&tags.corridor_island_hop, CorridorKind::IslandHop),
            (&tags.corridor_land_open, CorridorKind::Land),
            (&tags.corridor_river_chain, CorridorKind::River),
        ];
        let mut filled = 0;
        for (set, kind) in sources {
            for tile in set {
                if !self.kind.contains_key(tile) {
                    self.kind.insert(*tile, kind);
                    filled += 1;
                }
                self.style.entry(*tile).or_insert_with(|| match kind {
                    CorridorKind::Sea if land_within(query, tile.x, tile.y, 1) => {
                        CorridorStyle::Coastal
                    }
                    CorridorKind::Sea => CorridorStyle::Ocean,
                    CorridorKind::IslandHop => CorridorStyle::Archipelago,
                    CorridorKind::Land => CorridorStyle::PlainsBelt,
                    CorridorKind::River => CorridorStyle::RiverChain,
                });
            }
        }
        filled
    }
}
