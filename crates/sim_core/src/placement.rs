//! Placement validation (§4.5): terrain passability/buildability, slope
//! gradient over a footprint, tile-occupancy checks, and territory rights.

use crate::building_catalog::BuildingDef;
use crate::entity::EntityTable;
use crate::territory::TerritoryMap;
use crate::tile_grid::{slope_status, SlopeStatus, TileGrid};

pub use crate::tile_grid::{is_buildable, is_passable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    OutOfBounds,
    NotBuildable,
    TileOccupied,
    TooSteep,
    NoTerritoryRights,
}

impl std::fmt::Display for PlacementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            PlacementError::OutOfBounds => "footprint is out of bounds",
            PlacementError::NotBuildable => "tile is not buildable",
            PlacementError::TileOccupied => "tile is occupied",
            PlacementError::TooSteep => "slope is too steep",
            PlacementError::NoTerritoryRights => "player has no territory rights here",
        };
        f.write_str(msg)
    }
}

/// Absolute footprint tiles for a building anchored at `(anchor_x, anchor_y)`.
pub fn footprint_tiles(def: &BuildingDef, anchor_x: i32, anchor_y: i32) -> Vec<(i32, i32)> {
    def.footprint
        .iter()
        .map(|(dx, dy)| (anchor_x + dx, anchor_y + dy))
        .collect()
}

/// Max absolute cardinal-neighbor height difference among a footprint's
/// tiles, per §3's slope constraint.
pub fn max_footprint_slope(grid: &TileGrid, footprint: &[(i32, i32)]) -> u8 {
    const CARDINAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    let mut max_delta: u8 = 0;
    for &(x, y) in footprint {
        let Some(h) = grid.ground_height_at(x, y) else {
            continue;
        };
        for (dx, dy) in CARDINAL {
            let (nx, ny) = (x + dx, y + dy);
            if !footprint.contains(&(nx, ny)) {
                continue;
            }
            if let Some(nh) = grid.ground_height_at(nx, ny) {
                let delta = h.abs_diff(nh);
                max_delta = max_delta.max(delta);
            }
        }
    }
    max_delta
}

pub fn footprint_slope_status(grid: &TileGrid, footprint: &[(i32, i32)]) -> SlopeStatus {
    slope_status(max_footprint_slope(grid, footprint))
}

/// Validates a building placement against every precondition in §4.5.
/// Succeeds iff every footprint tile is in bounds, buildable, and
/// unoccupied; the slope is not `TooSteep`; and the placing player either
/// owns no buildings yet (bootstrapping their first one) or owns the anchor
/// tile per the territory map.
pub fn validate_building_placement(
    grid: &TileGrid,
    entities: &EntityTable,
    territory: &TerritoryMap,
    def: &BuildingDef,
    anchor_x: i32,
    anchor_y: i32,
    player: u32,
    player_has_any_building: bool,
) -> Result<(), PlacementError> {
    let footprint = footprint_tiles(def, anchor_x, anchor_y);

    for &(x, y) in &footprint {
        if !grid.in_bounds(x, y) {
            return Err(PlacementError::OutOfBounds);
        }
    }
    for &(x, y) in &footprint {
        if !grid.is_buildable_at(x, y) {
            return Err(PlacementError::NotBuildable);
        }
    }
    for &(x, y) in &footprint {
        if entities.get_at(x, y).is_some() {
            return Err(PlacementError::TileOccupied);
        }
    }
    if footprint_slope_status(grid, &footprint) == SlopeStatus::TooSteep {
        return Err(PlacementError::TooSteep);
    }
    if player_has_any_building && territory.owner_at(anchor_x, anchor_y) != Some(player) {
        return Err(PlacementError::NoTerritoryRights);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building_catalog::{BuildingCatalog, BuildingType};
    use crate::tile_grid::GroundType;

    #[test]
    fn placement_on_water_fails_not_buildable() {
        let mut grid = TileGrid::flat(20, 20, GroundType::Grass, 0);
        grid.set_tile(10, 10, GroundType::Water, 0);
        let entities = EntityTable::new();
        let territory = TerritoryMap::new(20, 20);
        let catalog = BuildingCatalog::standard();
        let def = catalog.get(BuildingType::Barrack);

        let result =
            validate_building_placement(&grid, &entities, &territory, def, 10, 10, 1, false);
        assert_eq!(result, Err(PlacementError::NotBuildable));
    }

    #[test]
    fn placement_on_flat_buildable_land_with_bootstrap_rights_succeeds() {
        let grid = TileGrid::flat(20, 20, GroundType::Grass, 5);
        let entities = EntityTable::new();
        let territory = TerritoryMap::new(20, 20);
        let catalog = BuildingCatalog::standard();
        let def = catalog.get(BuildingType::Barrack);

        let result =
            validate_building_placement(&grid, &entities, &territory, def, 5, 5, 1, false);
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn placement_too_steep_is_rejected() {
        let mut grid = TileGrid::flat(20, 20, GroundType::Grass, 0);
        grid.set_height(1, 0, 20);
        let entities = EntityTable::new();
        let territory = TerritoryMap::new(20, 20);
        let catalog = BuildingCatalog::standard();
        let def = catalog.get(BuildingType::Barrack);

        let result =
            validate_building_placement(&grid, &entities, &territory, def, 0, 0, 1, false);
        assert_eq!(result, Err(PlacementError::TooSteep));
    }
}
