//! A* pathfinding over the hex grid with LRU caching (§4.10, §10.5). Grounded
//! on the teacher's `path.rs` `PathService`, generalized from 4-directional
//! Manhattan movement to the 6-direction hex grid with a hex-distance
//! heuristic.

use std::num::NonZeroUsize;

use lru::LruCache;
use pathfinding::prelude::astar;

use crate::hex::{hex_distance, neighbors};
use crate::tile_grid::TileGrid;

type PathResult = Option<(Vec<(i32, i32)>, i64)>;
type CacheKey = (i32, i32, i32, i32);
type PathCache = LruCache<CacheKey, PathResult>;

fn hex_neighbors(grid: &TileGrid, x: i32, y: i32) -> Vec<((i32, i32), i64)> {
    neighbors(x, y)
        .into_iter()
        .filter(|&(nx, ny)| grid.is_passable_at(nx, ny))
        .map(|p| (p, 1))
        .collect()
}

/// Finds the shortest hex path from `start` to `goal`, uniform cost with a
/// hex-distance heuristic (§4.10). Includes both endpoints.
pub fn astar_path(grid: &TileGrid, start: (i32, i32), goal: (i32, i32)) -> PathResult {
    astar(
        &start,
        |&(x, y)| hex_neighbors(grid, x, y),
        |&(x, y)| hex_distance(x, y, goal.0, goal.1).round() as i64,
        |&p| p == goal,
    )
}

/// LRU-cached pathfinding service (§10.5), one per [`crate::Game`].
#[derive(Debug)]
pub struct PathService {
    cache: PathCache,
    hits: usize,
    misses: usize,
}

impl PathService {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            cache: LruCache::new(cap),
            hits: 0,
            misses: 0,
        }
    }

    /// Gets a path from `start` to `goal`, using the cache if present. The
    /// cache is keyed on raw coordinates, not terrain — callers must clear or
    /// bypass it if terrain has recently changed along common routes (the
    /// movement system re-paths reactively on obstruction instead).
    pub fn get(&mut self, grid: &TileGrid, start: (i32, i32), goal: (i32, i32)) -> PathResult {
        let key = (start.0, start.1, goal.0, goal.1);
        if let Some(v) = self.cache.get(&key) {
            self.hits += 1;
            return v.clone();
        }
        self.misses += 1;
        let v = astar_path(grid, start, goal);
        self.cache.put(key, v.clone());
        v
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_grid::GroundType;

    #[test]
    fn finds_path_on_open_grid() {
        let grid = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let (path, cost) = astar_path(&grid, (0, 0), (3, 0)).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(3, 0)));
        assert_eq!(cost, 3);
    }

    #[test]
    fn no_path_through_water_wall() {
        let mut grid = TileGrid::flat(5, 5, GroundType::Grass, 0);
        for y in 0..5 {
            grid.set_tile(2, y, GroundType::Water, 0);
        }
        assert!(astar_path(&grid, (0, 0), (4, 0)).is_none());
    }

    #[test]
    fn cache_hit_on_repeated_request() {
        let grid = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let mut svc = PathService::new(4);
        svc.get(&grid, (0, 0), (2, 2));
        svc.get(&grid, (0, 0), (2, 2));
        assert_eq!(svc.stats(), (1, 1));
    }
}
