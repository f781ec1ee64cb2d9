//! # Simulation Core
//!
//! `sim_core` is the deterministic simulation heart of a real-time,
//! Settlers-style strategy game, providing:
//!
//! - **Entity table**: monotonic ids, a tile occupancy index, and per-kind
//!   side state owned by small managers keyed off that id.
//! - **Command pipeline**: a closed set of player-issued commands, validated
//!   before any mutation and the sole authorized mutator of world state.
//! - **Fixed-order tick scheduler**: movement, construction, logistics
//!   dispatch, and the carrier system (job reactions plus fatigue decay) run
//!   in a fixed sequence every simulated step.
//! - **Logistics**: resource requests, reservations, and carriers that
//!   fulfil them end to end, with stall detection and recovery.
//! - **Save/Load**: JSON serialization of everything the spec calls out as
//!   persisted state, and nothing more.
//!
//! ## Architecture overview
//!
//! There is no actual ECS here: `bevy_ecs`'s `Resource` derive is kept on
//! manager types for lineage with the wider pack, but the managers
//! themselves are plain `HashMap<Id, _>` stores, composed directly as
//! fields of [`Game`] rather than resources in a `bevy_ecs::World`. The
//! command executor and tick scheduler both need several *disjoint* mutable
//! borrows at once (entity table, construction, inventory, movement, ...);
//! a plain struct gives that for free via field-level borrowing, where a
//! `World` would need either unsafe cell access or per-call
//! `resource_scope` nesting for more resources than is reasonable.
//!
//! ## Module organization
//!
//! - [`tile_grid`]: terrain storage, ground type/height, passability.
//! - [`hex`]: hex-grid distance/neighbor math shared across modules.
//! - [`entity`]: the entity table and tile occupancy index.
//! - [`building_catalog`]: static building/unit/material definitions.
//! - [`placement`]: building placement validation (footprint, slope, terrain).
//! - [`territory`]: per-player territory ownership derived from buildings.
//! - [`construction`]: phased building construction and terrain leveling.
//! - [`path`]: cached A* pathfinding over the tile grid.
//! - [`movement`]: per-unit movement state and step integration.
//! - [`inventory`]: per-building input/output material slots.
//! - [`reservation`]: output reservations backing in-flight requests.
//! - [`request`]: the resource request queue and stall detection.
//! - [`service_area`]: hub service radii and nearest-hub lookup.
//! - [`carrier`]: carrier identity, fatigue, and assignment eligibility.
//! - [`fulfillment`]: request-to-source matching.
//! - [`carrier_job`]: per-carrier job execution (pickup/deliver/return).
//! - [`dispatcher`]: stall checks and request-to-carrier assignment.
//! - [`selection`]: the player's current unit selection.
//! - [`command`]: the command/effect schema and executor.
//! - [`scheduler`]: the fixed-order tick driver.
//! - [`save`]: persisted-state snapshot/restore.
//! - [`bootstrap`]: convenience constructors for a standard [`Game`].
//!
//! ## Usage example
//!
//! ```rust
//! use sim_core::prelude::*;
//!
//! let mut game = build_demo_game(40, 40, GameOptions { populate_demo_scene: true, ..Default::default() });
//! for _ in 0..50 {
//!     game.tick(0.1, 0.1 * 50.0);
//! }
//! ```

use crate::building_catalog::BuildingCatalog;
use crate::carrier::CarrierManager;
use crate::carrier_job::CarrierJobController;
use crate::command::{Command, CommandContext, CommandResult};
use crate::config::SimConfig;
use crate::construction::ConstructionManager;
use crate::dispatcher::DispatcherState;
use crate::entity::EntityTable;
use crate::error::SimResult;
use crate::event_bus::EventBus;
use crate::inventory::InventoryManager;
use crate::movement::MovementManager;
use crate::path::PathService;
use crate::request::RequestManager;
use crate::reservation::ReservationManager;
use crate::save::SaveData;
use crate::scheduler::{TickAccumulator, TickContext};
use crate::selection::Selection;
use crate::service_area::ServiceAreaIndex;
use crate::territory::TerritoryMap;
use crate::tile_grid::TileGrid;

/// Rolling diagnostic log of command/event summaries, independent of
/// `tracing`. Not part of any data contract; purely a replay/debug aid.
#[derive(Debug, Default)]
pub struct ActionLog {
    pub events: Vec<String>,
}

impl ActionLog {
    pub fn log(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// The full, owned state of one running simulation: every manager named by
/// the command/tick pipelines, plus the tick accumulator and ambient config.
/// Built via [`bootstrap::build_game`] or [`bootstrap::build_demo_game`].
pub struct Game {
    pub grid: TileGrid,
    pub entities: EntityTable,
    pub catalog: BuildingCatalog,
    pub construction: ConstructionManager,
    pub territory: TerritoryMap,
    pub inventory: InventoryManager,
    pub movement: MovementManager,
    pub paths: PathService,
    pub carriers: CarrierManager,
    pub jobs: CarrierJobController,
    pub requests: RequestManager,
    pub reservations: ReservationManager,
    pub service_areas: ServiceAreaIndex,
    pub selection: Selection,
    pub dispatcher_state: DispatcherState,
    pub bus: EventBus,
    pub log: ActionLog,
    pub config: SimConfig,
    accumulator: TickAccumulator,
}

impl Game {
    /// Executes a single command against current state (§4.7). The sole
    /// entry point host apps should use to mutate the simulation.
    pub fn execute(&mut self, cmd: Command, now: f64) -> CommandResult {
        let mut ctx = CommandContext {
            grid: &mut self.grid,
            entities: &mut self.entities,
            construction: &mut self.construction,
            catalog: &self.catalog,
            territory: &mut self.territory,
            inventory: &mut self.inventory,
            movement: &mut self.movement,
            paths: &mut self.paths,
            carriers: &mut self.carriers,
            requests: &mut self.requests,
            reservations: &mut self.reservations,
            service_areas: &mut self.service_areas,
            selection: &mut self.selection,
            dispatcher_state: &mut self.dispatcher_state,
            bus: &mut self.bus,
        };
        let result = crate::command::execute(cmd.clone(), &mut ctx, now);
        self.log.log(format!("{:?} -> success={} error={:?}", cmd, result.success, result.error));
        result
    }

    /// Advances the simulation by `dt` seconds, draining as many fixed
    /// sub-steps as `dt` accumulates to (§4.8). `now` is the absolute
    /// simulation clock after this call's `dt` has elapsed.
    pub fn tick(&mut self, dt: f32, now: f64) {
        let steps = self.accumulator.steps(dt, &self.config);
        for step_dt in steps {
            let mut ctx = TickContext {
                grid: &mut self.grid,
                entities: &mut self.entities,
                construction: &mut self.construction,
                catalog: &self.catalog,
                movement: &mut self.movement,
                paths: &mut self.paths,
                jobs: &mut self.jobs,
                carriers: &mut self.carriers,
                inventory: &mut self.inventory,
                dispatcher_state: &mut self.dispatcher_state,
                requests: &mut self.requests,
                reservations: &mut self.reservations,
                service_areas: &mut self.service_areas,
                bus: &mut self.bus,
            };
            crate::scheduler::run_step(step_dt, now, &mut ctx);
        }
    }

    /// Captures a JSON snapshot of persisted state (§6).
    pub fn save_json(&self) -> SimResult<String> {
        let data = crate::save::snapshot(
            &self.grid,
            &self.entities,
            &self.construction,
            &self.carriers,
            &self.requests,
        );
        crate::save::to_json(&data)
    }

    /// Restores persisted state into `self`'s already-allocated managers.
    /// `self.grid` must already have the same dimensions as the save (§6).
    /// Territory ownership and hub service areas are not part of the saved
    /// data (§6 lists exactly what is persisted); both are derived purely
    /// from the restored entities, so they are rebuilt here rather than
    /// left stale from whatever game this `Game` was constructed with.
    pub fn load_json(&mut self, json: &str) -> SimResult<()> {
        let data: SaveData = crate::save::from_json(json)?;
        crate::save::restore(
            &data,
            &mut self.grid,
            &mut self.entities,
            &mut self.construction,
            &mut self.carriers,
            &mut self.requests,
        )?;

        self.service_areas = ServiceAreaIndex::default();
        for id in self.entities.ids_of_kind_ascending(crate::entity::EntityKind::Building) {
            let Some(record) = self.entities.get(id) else { continue };
            if let Some(building_type) = crate::building_catalog::BuildingType::from_sub_type(record.sub_type) {
                if self.catalog.get(building_type).is_hub {
                    self.service_areas.register(id, record.x, record.y, record.player);
                }
            }
        }

        let owners: Vec<crate::territory::BuildingOwner> = self
            .entities
            .ids_of_kind_ascending(crate::entity::EntityKind::Building)
            .into_iter()
            .filter_map(|id| self.entities.get(id))
            .map(|e| crate::territory::BuildingOwner { x: e.x, y: e.y, owner: e.player })
            .collect();
        self.territory.rebuild(&owners);

        Ok(())
    }
}

/// Re-exports the most frequently used types in a single `use` statement.
pub mod prelude {
    pub use crate::bootstrap::{build_demo_game, build_game, GameOptions};
    pub use crate::building_catalog::{BuildingCatalog, BuildingType, MaterialType, UnitType};
    pub use crate::command::{Command, CommandResult, Effect};
    pub use crate::config::SimConfig;
    pub use crate::entity::{EntityId, EntityKind};
    pub use crate::error::{SimError, SimResult};
    pub use crate::tile_grid::{GroundType, TileGrid};
    pub use crate::Game;
    pub use crate::ActionLog;
}

/// Terrain storage: ground type/height grid, passability and slope queries.
pub mod tile_grid;
/// Hex-grid distance and neighbor math shared across modules.
pub mod hex;
/// The entity table: monotonic ids and the tile occupancy index.
pub mod entity;
/// Static building/unit/material definitions.
pub mod building_catalog;
/// Building placement validation.
pub mod placement;
/// Per-player territory ownership derived from building footprints.
pub mod territory;
/// Simulation event bus.
pub mod event_bus;
/// Phased building construction and terrain leveling.
pub mod construction;
/// Cached A* pathfinding.
pub mod path;
/// Per-unit movement state and step integration.
pub mod movement;
/// Per-building input/output material slots.
pub mod inventory;
/// Output reservations backing in-flight requests.
pub mod reservation;
/// The resource request queue and stall detection.
pub mod request;
/// Hub service radii and nearest-hub lookup.
pub mod service_area;
/// Carrier identity, fatigue, and assignment eligibility.
pub mod carrier;
/// Request-to-source matching.
pub mod fulfillment;
/// Per-carrier job execution.
pub mod carrier_job;
/// Stall checks and request-to-carrier assignment.
pub mod dispatcher;
/// The player's current unit selection.
pub mod selection;
/// The command/effect schema and executor.
pub mod command;
/// The fixed-order tick driver.
pub mod scheduler;
/// Persisted-state snapshot/restore.
pub mod save;
/// Fixed interoperability constants and `SimConfig`.
pub mod config;
/// The simulation error taxonomy.
pub mod error;
/// Convenience constructors for a standard `Game`.
pub mod bootstrap;
