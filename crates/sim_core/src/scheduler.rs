//! Fixed-order tick scheduler (§4.8): accumulates wall-clock `dt` into
//! fixed sub-steps and runs every system in the documented order —
//! movement, construction, logistics dispatch, carrier system (job reaction
//! and fatigue decay). `InventoryVisualizer` has no per-tick work of its own
//! (§4.12: it only reacts to [`crate::inventory::InventoryChanged`]
//! notifications as they happen), so it is not a step here.

use crate::building_catalog::BuildingCatalog;
use crate::carrier::CarrierManager;
use crate::carrier_job::{self, CarrierJobController};
use crate::config::SimConfig;
use crate::construction::{construction_system, ConstructionManager};
use crate::dispatcher::{self, DispatcherState};
use crate::entity::EntityTable;
use crate::event_bus::EventBus;
use crate::inventory::InventoryManager;
use crate::movement::{movement_system, MovementManager};
use crate::path::PathService;
use crate::request::RequestManager;
use crate::reservation::ReservationManager;
use crate::service_area::ServiceAreaIndex;
use crate::tile_grid::TileGrid;

/// Accumulates `dt` and drains it in `config.max_step_secs` increments when
/// `config.fixed_step` is set, so every system sees a bounded, consistent
/// step size regardless of host frame-rate jitter (§4.8).
#[derive(Debug, Default)]
pub struct TickAccumulator {
    accumulated: f32,
}

impl TickAccumulator {
    /// Pushes `dt` seconds of wall-clock time and returns the fixed-size
    /// sub-steps to run this call, in order.
    pub fn steps(&mut self, dt: f32, config: &SimConfig) -> Vec<f32> {
        if !config.fixed_step {
            return vec![dt];
        }
        self.accumulated += dt;
        let mut steps = Vec::new();
        while self.accumulated >= config.max_step_secs {
            steps.push(config.max_step_secs);
            self.accumulated -= config.max_step_secs;
        }
        steps
    }
}

/// Every resource a single fixed sub-step needs mutable access to.
#[allow(clippy::too_many_arguments)]
pub struct TickContext<'a> {
    pub grid: &'a mut TileGrid,
    pub entities: &'a mut EntityTable,
    pub construction: &'a mut ConstructionManager,
    pub catalog: &'a BuildingCatalog,
    pub movement: &'a mut MovementManager,
    pub paths: &'a mut PathService,
    pub jobs: &'a mut CarrierJobController,
    pub carriers: &'a mut CarrierManager,
    pub inventory: &'a mut InventoryManager,
    pub dispatcher_state: &'a mut DispatcherState,
    pub requests: &'a mut RequestManager,
    pub reservations: &'a mut ReservationManager,
    pub service_areas: &'a mut ServiceAreaIndex,
    pub bus: &'a mut EventBus,
}

/// Runs one fixed-size sub-step of `dt` seconds across every system, in the
/// order §4.8 specifies: MovementSystem, BuildingConstructionSystem,
/// InventoryVisualizer (no-op), LogisticsDispatcher, CarrierSystem (job
/// reaction to this step's movement stops, then fatigue decay). `now` is the
/// simulation clock after this step (used for request/reservation timestamps).
pub fn run_step(dt: f32, now: f64, ctx: &mut TickContext) {
    let stopped = movement_system(dt, ctx.grid, ctx.entities, ctx.movement, ctx.paths, ctx.bus);

    let completions = construction_system(dt, ctx.grid, ctx.entities, ctx.construction, ctx.catalog, ctx.carriers, ctx.bus);
    for (building, spawned) in &completions {
        for &unit in spawned {
            ctx.movement.ensure(unit, 4.0);
        }
        let _ = building;
    }
    // Terrain leveling may have reshaped the grid this step; cached paths are
    // only valid within a single tick batch (SPEC_FULL §10.5), so drop them
    // before the next tick's movement system runs.
    ctx.paths.invalidate_all();

    // InventoryVisualizer (§4.12) has no per-tick work; it only reacts to
    // InventoryChanged notifications as they happen.

    dispatcher::dispatcher_system(
        dt as f64,
        now,
        ctx.grid,
        ctx.entities,
        ctx.dispatcher_state,
        ctx.requests,
        ctx.reservations,
        ctx.carriers,
        ctx.service_areas,
        ctx.inventory,
        ctx.movement,
        ctx.paths,
        ctx.jobs,
        ctx.bus,
    );

    if !stopped.is_empty() {
        let signals = carrier_job::carrier_job_system(
            &stopped,
            ctx.grid,
            ctx.entities,
            ctx.jobs,
            ctx.carriers,
            ctx.movement,
            ctx.paths,
            ctx.inventory,
            ctx.bus,
        );
        dispatcher::apply_job_signals(&signals, ctx.dispatcher_state, ctx.requests, ctx.reservations);
    }
    ctx.carriers.tick_fatigue(dt, ctx.bus);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_drains_whole_increments_only() {
        let config = SimConfig {
            max_step_secs: 0.1,
            fixed_step: true,
            ..SimConfig::default()
        };
        let mut acc = TickAccumulator::default();
        let steps = acc.steps(0.25, &config);
        assert_eq!(steps.len(), 2);
        assert!((acc.accumulated - 0.05).abs() < 1e-6);
    }

    #[test]
    fn non_fixed_step_passes_dt_through() {
        let config = SimConfig {
            fixed_step: false,
            ..SimConfig::default()
        };
        let mut acc = TickAccumulator::default();
        assert_eq!(acc.steps(0.37, &config), vec![0.37]);
    }
}
