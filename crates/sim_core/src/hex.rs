//! Hex grid geometry (§4.4). Six neighbor offsets, hex distance, and an
//! approach-tile finder used by movement and logistics alike. This spec fixes
//! hex distance as authoritative for logistics and service areas; placement
//! slope checks remain cardinal (§9 Design Notes).

use crate::entity::EntityKind;
use crate::tile_grid::TileGrid;

/// The six hex directions, in a fixed, deterministic iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HexDirection {
    NorthEast,
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
}

impl HexDirection {
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NorthEast,
        HexDirection::East,
        HexDirection::SouthEast,
        HexDirection::SouthWest,
        HexDirection::West,
        HexDirection::NorthWest,
    ];

    /// Offset `(dx, dy)` applied to a tile coordinate to step in this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            HexDirection::NorthEast => (1, -1),
            HexDirection::East => (1, 0),
            HexDirection::SouthEast => (0, 1),
            HexDirection::SouthWest => (-1, 1),
            HexDirection::West => (-1, 0),
            HexDirection::NorthWest => (0, -1),
        }
    }
}

/// Neighbor tile coordinates of `(x, y)`, in [`HexDirection::ALL`] order.
pub fn neighbors(x: i32, y: i32) -> [(i32, i32); 6] {
    let mut out = [(0, 0); 6];
    for (i, dir) in HexDirection::ALL.iter().enumerate() {
        let (dx, dy) = dir.offset();
        out[i] = (x + dx, y + dy);
    }
    out
}

/// Hex distance between two tile coordinates (§4.4).
///
/// `dx = (x2 - x1) - (y2 - y1) * 0.5`
/// `dy = (y2 - y1) * sqrt(3)/2`
/// `d = sqrt(dx^2 + dy^2)`
pub fn hex_distance(x1: i32, y1: i32, x2: i32, y2: i32) -> f64 {
    const SQRT3_OVER_2: f64 = 0.866_025_403_784_438_6;
    let raw_dx = (x2 - x1) as f64;
    let raw_dy = (y2 - y1) as f64;
    let dx = raw_dx - raw_dy * 0.5;
    let dy = raw_dy * SQRT3_OVER_2;
    (dx * dx + dy * dy).sqrt()
}

/// A predicate abstraction over "is this tile occupied by a Building",
/// so the approach-tile finder does not need to depend on the entity table
/// directly beyond this single query.
pub trait OccupancyQuery {
    fn occupant_kind(&self, x: i32, y: i32) -> Option<EntityKind>;
}

/// Returns the neighbor of `(target_x, target_y)` that minimizes hex distance
/// to `(mover_x, mover_y)` and is not occupied by a Building. In bounds and
/// passable per the tile grid. Units may occupy neighbors; that is resolved
/// later by movement (§4.4).
pub fn find_approach_tile(
    grid: &TileGrid,
    occupancy: &impl OccupancyQuery,
    target_x: i32,
    target_y: i32,
    mover_x: i32,
    mover_y: i32,
) -> Option<(i32, i32)> {
    let mut best: Option<((i32, i32), f64)> = None;
    for (nx, ny) in neighbors(target_x, target_y) {
        if !grid.in_bounds(nx, ny) {
            continue;
        }
        if !grid.is_passable_at(nx, ny) {
            continue;
        }
        if matches!(occupancy.occupant_kind(nx, ny), Some(EntityKind::Building)) {
            continue;
        }
        let d = hex_distance(mover_x, mover_y, nx, ny);
        match &best {
            Some((_, best_d)) if *best_d <= d => {}
            _ => best = Some(((nx, ny), d)),
        }
    }
    best.map(|(tile, _)| tile)
}

/// The set of tiles at exact Chebyshev (square-grid) radius `r` around
/// `(cx, cy)`, visited in a fixed spiral/perimeter order. Used for
/// nearest-free-tile unit spawning (§4.9 step 7, GLOSSARY "Ring").
pub fn ring(cx: i32, cy: i32, r: i32) -> Vec<(i32, i32)> {
    if r <= 0 {
        return vec![(cx, cy)];
    }
    let mut out = Vec::with_capacity((8 * r) as usize);
    // Walk the perimeter of the (2r+1)x(2r+1) square, starting at the top-left
    // corner and proceeding clockwise. This is a fixed, deterministic order.
    let top = cy - r;
    let bottom = cy + r;
    let left = cx - r;
    let right = cx + r;

    for x in left..=right {
        out.push((x, top));
    }
    for y in (top + 1)..=bottom {
        out.push((right, y));
    }
    for x in (left..right).rev() {
        out.push((x, bottom));
    }
    for y in (top + 1..bottom).rev() {
        out.push((left, y));
    }
    out
}
