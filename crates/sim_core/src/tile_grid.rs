//! Dense tile grid (§4.1): ground type and height arrays, index = y*width+x.
//! Mutation happens only through construction terrain capture/apply/restore
//! or initial load from the map loader. `on_terrain_modified` lets the
//! renderer refresh its GPU uploads once a mutation batch completes.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::config::CONSTRUCTION_SITE_GROUND_TYPE;

/// Landscape class. Values are small unsigned integers per the spec; named
/// variants stand in for the map loader's actual ground-type table. A ground
/// type of [`GroundType::ConstructionSite`] is never present in map-loader
/// data; it is only ever written by the construction system (§4.9 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GroundType {
    Grass = 0,
    Dirt = 1,
    Sand = 2,
    Rock = 3,
    Water = 10,
    Lava = 11,
    ConstructionSite = CONSTRUCTION_SITE_GROUND_TYPE,
}

impl GroundType {
    pub fn from_raw(v: u8) -> GroundType {
        match v {
            0 => GroundType::Grass,
            1 => GroundType::Dirt,
            2 => GroundType::Sand,
            3 => GroundType::Rock,
            10 => GroundType::Water,
            11 => GroundType::Lava,
            CONSTRUCTION_SITE_GROUND_TYPE => GroundType::ConstructionSite,
            other => {
                tracing::warn!(value = other, "unknown ground type, defaulting to Rock");
                GroundType::Rock
            }
        }
    }
}

/// Walkable classes (§3). Water and lava block movement entirely.
pub fn is_passable(kind: GroundType) -> bool {
    !matches!(kind, GroundType::Water | GroundType::Lava)
}

/// Buildable is a stricter subset of passable: sand and active construction
/// sites cannot host a new footprint.
pub fn is_buildable(kind: GroundType) -> bool {
    matches!(kind, GroundType::Grass | GroundType::Dirt | GroundType::Rock)
}

/// Slope rating for a footprint, derived from the same predicate the
/// placement validator uses so UI indicators and validation never disagree
/// (§7 "User-visible failure behavior").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeStatus {
    Easy,
    Medium,
    Difficult,
    TooSteep,
}

/// Rates the max absolute cardinal-neighbor height delta within a footprint.
/// `MAX_SLOPE` (8) or above is [`SlopeStatus::TooSteep`]; below that, thirds
/// of the range split Easy/Medium/Difficult.
pub fn slope_status(max_delta: u8) -> SlopeStatus {
    use crate::config::MAX_SLOPE;
    if max_delta >= MAX_SLOPE {
        SlopeStatus::TooSteep
    } else if max_delta <= MAX_SLOPE / 3 {
        SlopeStatus::Easy
    } else if max_delta <= (MAX_SLOPE * 2) / 3 {
        SlopeStatus::Medium
    } else {
        SlopeStatus::Difficult
    }
}

/// A callback invoked once per tick when any tile was mutated during that
/// tick's construction pass (§4.9 step 8), so the renderer can refresh its
/// GPU uploads. The core never re-enters this callback mid-mutation.
pub type TerrainModifiedCallback = Box<dyn FnMut(&[(i32, i32)]) + Send + Sync>;

/// Dense width*height arrays of ground type and height, the sole authority
/// over terrain.
#[derive(Resource)]
pub struct TileGrid {
    width: u32,
    height: u32,
    ground_type: Vec<u8>,
    ground_height: Vec<u8>,
    #[allow(clippy::type_complexity)]
    on_terrain_modified: Option<TerrainModifiedCallback>,
    dirty_tiles: Vec<(i32, i32)>,
}

impl TileGrid {
    /// Constructs a grid from the map loader's raw ground-type and
    /// ground-height arrays (§4.1). Panics if array lengths do not match
    /// `width * height` — this is a map-loader contract violation, not a
    /// recoverable simulation condition.
    pub fn from_loader(width: u32, height: u32, ground_type: Vec<u8>, ground_height: Vec<u8>) -> Self {
        let expected = (width as usize) * (height as usize);
        assert_eq!(ground_type.len(), expected, "ground_type length mismatch");
        assert_eq!(ground_height.len(), expected, "ground_height length mismatch");
        Self {
            width,
            height,
            ground_type,
            ground_height,
            on_terrain_modified: None,
            dirty_tiles: Vec::new(),
        }
    }

    /// A flat, unremarkable grid, useful for tests and demo scenes.
    pub fn flat(width: u32, height: u32, kind: GroundType, height_value: u8) -> Self {
        let len = (width as usize) * (height as usize);
        Self::from_loader(width, height, vec![kind as u8; len], vec![height_value; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.to_index(x, y).is_some()
    }

    pub fn ground_type_at(&self, x: i32, y: i32) -> Option<GroundType> {
        self.to_index(x, y).map(|i| GroundType::from_raw(self.ground_type[i]))
    }

    pub fn ground_height_at(&self, x: i32, y: i32) -> Option<u8> {
        self.to_index(x, y).map(|i| self.ground_height[i])
    }

    pub fn is_passable_at(&self, x: i32, y: i32) -> bool {
        self.ground_type_at(x, y).map(is_passable).unwrap_or(false)
    }

    pub fn is_buildable_at(&self, x: i32, y: i32) -> bool {
        self.ground_type_at(x, y).map(is_buildable).unwrap_or(false)
    }

    /// Registers the renderer's refresh callback.
    pub fn set_on_terrain_modified(&mut self, cb: TerrainModifiedCallback) {
        self.on_terrain_modified = Some(cb);
    }

    /// Writes a tile's ground type/height, queuing it for the next
    /// `flush_terrain_modified` notification. Out-of-bounds writes are a
    /// no-op (callers are expected to pre-validate via `in_bounds`).
    pub fn set_tile(&mut self, x: i32, y: i32, kind: GroundType, height: u8) {
        if let Some(i) = self.to_index(x, y) {
            self.ground_type[i] = kind as u8;
            self.ground_height[i] = height;
            self.dirty_tiles.push((x, y));
        }
    }

    pub fn set_height(&mut self, x: i32, y: i32, height: u8) {
        if let Some(i) = self.to_index(x, y) {
            self.ground_height[i] = height;
            self.dirty_tiles.push((x, y));
        }
    }

    pub fn set_ground_type(&mut self, x: i32, y: i32, kind: GroundType) {
        if let Some(i) = self.to_index(x, y) {
            self.ground_type[i] = kind as u8;
            self.dirty_tiles.push((x, y));
        }
    }

    /// Invoked once per tick after all construction mutation for that tick
    /// has completed (§4.9 step 8). No-op if nothing was mutated.
    pub fn flush_terrain_modified(&mut self) {
        if self.dirty_tiles.is_empty() {
            return;
        }
        let tiles = std::mem::take(&mut self.dirty_tiles);
        if let Some(cb) = self.on_terrain_modified.as_mut() {
            cb(&tiles);
        }
    }

    pub(crate) fn raw_ground_type(&self) -> &[u8] {
        &self.ground_type
    }

    pub(crate) fn raw_ground_height(&self) -> &[u8] {
        &self.ground_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passable_and_buildable_predicates_agree_on_the_subset_relationship() {
        for kind in [
            GroundType::Grass,
            GroundType::Dirt,
            GroundType::Sand,
            GroundType::Rock,
            GroundType::Water,
            GroundType::Lava,
        ] {
            if is_buildable(kind) {
                assert!(is_passable(kind), "{:?} buildable implies passable", kind);
            }
        }
        assert!(!is_buildable(GroundType::Sand));
        assert!(is_passable(GroundType::Sand));
    }

    #[test]
    fn slope_status_too_steep_at_max_slope_threshold() {
        assert_eq!(slope_status(8), SlopeStatus::TooSteep);
        assert_eq!(slope_status(7), SlopeStatus::Difficult);
        assert_eq!(slope_status(0), SlopeStatus::Easy);
    }

    #[test]
    fn out_of_bounds_reads_are_none() {
        let grid = TileGrid::flat(4, 4, GroundType::Grass, 0);
        assert!(grid.ground_type_at(-1, 0).is_none());
        assert!(grid.ground_type_at(4, 0).is_none());
    }

    #[test]
    fn terrain_modified_callback_fires_once_per_flush() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut grid = TileGrid::flat(4, 4, GroundType::Grass, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        grid.set_on_terrain_modified(Box::new(move |_tiles| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        grid.set_tile(1, 1, GroundType::Dirt, 2);
        grid.set_tile(2, 1, GroundType::Dirt, 2);
        grid.flush_terrain_modified();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        grid.flush_terrain_modified();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no-op when nothing dirty");
    }
}
