//! Territory map (§4.6): a per-tile owner array, rebuilt wholesale whenever
//! buildings change, with a monotonic `version` for cache invalidation.

use bevy_ecs::prelude::Resource;

use crate::config::BUILDING_TERRITORY_RADIUS;
use crate::hex::hex_distance;

pub const NO_OWNER: u32 = u32::MAX;

/// A `(x, y, owner)` source used to rebuild the map, decoupled from
/// `EntityTable` so the territory map can be unit-tested without a full
/// entity table.
pub struct BuildingOwner {
    pub x: i32,
    pub y: i32,
    pub owner: u32,
}

#[derive(Resource)]
pub struct TerritoryMap {
    width: u32,
    height: u32,
    owner: Vec<u32>,
    version: u64,
}

impl TerritoryMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            owner: vec![NO_OWNER; (width as usize) * (height as usize)],
            version: 0,
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn owner_at(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.owner[i]).filter(|&o| o != NO_OWNER)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rebuilds the entire map from scratch: for each building, paint tiles
    /// within `BUILDING_TERRITORY_RADIUS` (hex distance) with its owner; ties
    /// are broken by nearest building (§4.6). Bumps `version` unconditionally
    /// — callers only rebuild when buildings actually changed, so this is
    /// never a no-op rebuild in practice.
    pub fn rebuild(&mut self, buildings: &[BuildingOwner]) {
        self.owner.fill(NO_OWNER);
        let mut best_dist = vec![f64::INFINITY; self.owner.len()];

        for b in buildings {
            let r = BUILDING_TERRITORY_RADIUS;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (x, y) = (b.x + dx, b.y + dy);
                    let Some(i) = self.index(x, y) else { continue };
                    let d = hex_distance(b.x, b.y, x, y);
                    if d > r as f64 {
                        continue;
                    }
                    if d < best_dist[i] {
                        best_dist[i] = d;
                        self.owner[i] = b.owner;
                    }
                }
            }
        }
        self.version += 1;
        tracing::debug!(version = self.version, buildings = buildings.len(), "territory rebuilt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_building_claims_its_own_tile() {
        let mut map = TerritoryMap::new(20, 20);
        map.rebuild(&[BuildingOwner { x: 10, y: 10, owner: 1 }]);
        assert_eq!(map.owner_at(10, 10), Some(1));
        assert_eq!(map.owner_at(0, 0), None);
    }

    #[test]
    fn tied_tile_goes_to_nearest_building() {
        let mut map = TerritoryMap::new(20, 20);
        map.rebuild(&[
            BuildingOwner { x: 5, y: 10, owner: 1 },
            BuildingOwner { x: 15, y: 10, owner: 2 },
        ]);
        assert_eq!(map.owner_at(5, 10), Some(1));
        assert_eq!(map.owner_at(15, 10), Some(2));
    }

    #[test]
    fn version_increments_on_every_rebuild() {
        let mut map = TerritoryMap::new(10, 10);
        assert_eq!(map.version(), 0);
        map.rebuild(&[]);
        assert_eq!(map.version(), 1);
        map.rebuild(&[]);
        assert_eq!(map.version(), 2);
    }
}
