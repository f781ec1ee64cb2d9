//! Bootstrap helpers for building a standard [`Game`], analogous to the
//! teacher's `bootstrap.rs` world/schedule builders. Map acquisition is out
//! of scope for this core (§2 "Map loader" is an external supplier): hosts
//! load their own tile data and hand it to [`build_game`]. [`build_demo_game`]
//! exists only for local demos/tests and fabricates a small fixed map.

use crate::building_catalog::{BuildingCatalog, BuildingType, UnitType};
use crate::carrier::CarrierManager;
use crate::carrier_job::CarrierJobController;
use crate::command::Command;
use crate::config::SimConfig;
use crate::construction::ConstructionManager;
use crate::dispatcher::DispatcherState;
use crate::entity::EntityTable;
use crate::event_bus::EventBus;
use crate::inventory::InventoryManager;
use crate::movement::MovementManager;
use crate::path::PathService;
use crate::request::RequestManager;
use crate::reservation::ReservationManager;
use crate::scheduler::TickAccumulator;
use crate::selection::Selection;
use crate::service_area::ServiceAreaIndex;
use crate::territory::TerritoryMap;
use crate::tile_grid::{GroundType, TileGrid};
use crate::{ActionLog, Game};

/// Options controlling what a freshly built [`Game`] contains (§10.4).
#[derive(Debug, Clone, Copy)]
pub struct GameOptions {
    /// If true, places a starter hub and two carriers (demo games only).
    pub populate_demo_scene: bool,
    pub config: SimConfig,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            populate_demo_scene: false,
            config: SimConfig::default(),
        }
    }
}

/// Builds a [`Game`] over an already-loaded map. This is the canonical entry
/// point for hosts: acquiring and parsing map data lives entirely outside
/// this crate (§2).
pub fn build_game(grid: TileGrid, opts: GameOptions) -> Game {
    let width = grid.width();
    let height = grid.height();
    let mut game = Game {
        grid,
        entities: EntityTable::new(),
        catalog: BuildingCatalog::standard(),
        construction: ConstructionManager::default(),
        territory: TerritoryMap::new(width, height),
        inventory: InventoryManager::default(),
        movement: MovementManager::default(),
        paths: PathService::new(opts.config.path_cache_capacity),
        carriers: CarrierManager::default(),
        jobs: CarrierJobController::default(),
        requests: RequestManager::default(),
        reservations: ReservationManager::default(),
        service_areas: ServiceAreaIndex::default(),
        selection: Selection::default(),
        dispatcher_state: DispatcherState::default(),
        bus: EventBus::new(),
        log: ActionLog::default(),
        config: opts.config,
        accumulator: TickAccumulator::default(),
    };

    if opts.populate_demo_scene {
        populate_demo_scene(&mut game);
    }

    game
}

/// Builds a small flat grass map with a lake cut through the middle and a
/// [`Game`] over it, for demos and manual testing only. Real hosts call
/// [`build_game`] with terrain from their own map loader.
pub fn build_demo_game(width: u32, height: u32, opts: GameOptions) -> Game {
    let mut grid = TileGrid::flat(width, height, GroundType::Grass, 1);
    let lake_x0 = width as i32 / 2 - 2;
    let lake_x1 = width as i32 / 2 + 2;
    for y in 2..(height as i32 - 2).max(2) {
        for x in lake_x0..lake_x1 {
            grid.set_tile(x, y, GroundType::Water, 0);
        }
    }
    grid.flush_terrain_modified();
    build_game(grid, opts)
}

/// Places a starter hub and two home-based carriers near the map's top-left
/// quadrant, mirroring the teacher's demo-scene population.
fn populate_demo_scene(game: &mut Game) {
    let now = 0.0;
    let (hub_x, hub_y) = (5, 5);
    let result = game.execute(
        Command::PlaceBuilding {
            building_type: BuildingType::Hub,
            x: hub_x,
            y: hub_y,
            player: 1,
        },
        now,
    );
    if !result.success {
        tracing::warn!(error = ?result.error, "demo scene: hub placement failed");
        return;
    }

    for (dx, dy) in [(-2, 1), (2, 1)] {
        let spawn = game.execute(
            Command::SpawnUnit {
                unit_sub_type: UnitType::Carrier as u32,
                x: hub_x + dx,
                y: hub_y + dy,
                player: 1,
            },
            now,
        );
        if !spawn.success {
            tracing::warn!(error = ?spawn.error, "demo scene: carrier spawn failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_demo_game_has_no_entities_without_demo_scene() {
        let game = build_demo_game(20, 20, GameOptions::default());
        assert!(game.entities.is_empty());
    }

    #[test]
    fn build_demo_game_with_demo_scene_spawns_hub_and_carriers() {
        let game = build_demo_game(20, 20, GameOptions {
            populate_demo_scene: true,
            ..Default::default()
        });
        assert_eq!(game.entities.ids_of_kind_ascending(crate::entity::EntityKind::Building).len(), 1);
        assert_eq!(game.entities.ids_of_kind_ascending(crate::entity::EntityKind::Unit).len(), 2);
        assert_eq!(game.carriers.all_ids_ascending().len(), 2);
    }

    #[test]
    fn build_game_rejects_nothing_on_an_empty_loaded_map() {
        let grid = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let game = build_game(grid, GameOptions::default());
        assert_eq!(game.grid.width(), 10);
        assert!(game.entities.is_empty());
    }
}
