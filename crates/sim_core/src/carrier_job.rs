//! Carrier job execution (§4.18): drives each carrier's active job through
//! pickup → deliver → return-home on top of the movement system, reacting to
//! `unit:movementStopped` arrivals reported for the same tick.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::carrier::{CarrierId, CarrierManager, CarrierStatus};
use crate::entity::{EntityId, EntityTable};
use crate::event_bus::{EventBus, SimEvent};
use crate::inventory::InventoryManager;
use crate::movement::MovementManager;
use crate::path::PathService;
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Pickup,
    Deliver,
    ReturnHome,
}

/// The leg currently in flight for a carrier's unit, set when movement for
/// that leg starts and consulted when `unit:movementStopped` reports arrival
/// (§4.18 "Arrival detection").
#[derive(Debug, Clone, Copy)]
struct PendingLeg {
    carrier: CarrierId,
    phase: JobPhase,
}

#[derive(Resource, Default)]
pub struct CarrierJobController {
    pending: HashMap<EntityId, PendingLeg>,
}

fn start_leg(
    unit: EntityId,
    carrier_id: CarrierId,
    phase: JobPhase,
    target_building: EntityId,
    grid: &TileGrid,
    entities: &EntityTable,
    movement: &mut MovementManager,
    paths: &mut PathService,
    controller: &mut CarrierJobController,
    carriers: &mut CarrierManager,
    bus: &mut EventBus,
) {
    let Some(target) = entities.get(target_building).map(|e| (e.x, e.y)) else {
        return;
    };
    movement.ensure(unit, 4.0);
    if movement.move_to(unit, target, grid, entities, paths) {
        controller.pending.insert(unit, PendingLeg { carrier: carrier_id, phase });
        carriers.set_status(carrier_id, CarrierStatus::Walking, bus);
    }
}

/// Called by the dispatcher once a job is assigned to a carrier (§4.17
/// step 2): begins the pickup leg toward the source building.
pub fn start_job(
    unit: EntityId,
    carrier_id: CarrierId,
    source: EntityId,
    grid: &TileGrid,
    entities: &EntityTable,
    movement: &mut MovementManager,
    paths: &mut PathService,
    controller: &mut CarrierJobController,
    carriers: &mut CarrierManager,
    bus: &mut EventBus,
) {
    start_leg(
        unit, carrier_id, JobPhase::Pickup, source, grid, entities, movement, paths, controller, carriers, bus,
    );
}

/// Reacts to this tick's `unit:movementStopped` signals for carrier units
/// (§4.18). Returns the set of `(carrier, request_outcome)` signals the
/// dispatcher should translate into request-manager calls, since the
/// dispatcher (not this module) owns `RequestManager`/`ReservationManager`.
#[derive(Debug, Clone, Copy)]
pub enum JobSignal {
    PickupComplete { carrier: CarrierId, material: u32, amount: u32 },
    PickupFailed { carrier: CarrierId },
    DeliveryComplete { carrier: CarrierId, material: u32, delivered: u32, overflow: u32 },
    ReturnedHome { carrier: CarrierId },
}

#[allow(clippy::too_many_arguments)]
pub fn carrier_job_system(
    stopped: &[(EntityId, bool)],
    grid: &TileGrid,
    entities: &EntityTable,
    controller: &mut CarrierJobController,
    carriers: &mut CarrierManager,
    movement: &mut MovementManager,
    paths: &mut PathService,
    inventory: &mut InventoryManager,
    bus: &mut EventBus,
) -> Vec<JobSignal> {
    let mut signals = Vec::new();
    let mut units: Vec<EntityId> = stopped.iter().map(|(u, _)| *u).collect();
    units.sort_unstable();

    for unit in units.drain(..) {
        let Some(leg) = controller.pending.remove(&unit) else {
            continue;
        };
        let Some(carrier_id) = carriers.by_unit(unit) else {
            continue;
        };
        let Some(job) = carriers.get(carrier_id).and_then(|c| c.current_job) else {
            continue;
        };
        if entities.get(unit).is_none() {
            continue;
        }

        match leg.phase {
            JobPhase::Pickup => {
                carriers.set_status(carrier_id, CarrierStatus::PickingUp, bus);
                let withdrawn = inventory.withdraw_output(job.source, job.material_type, job.amount as i64);
                if withdrawn > 0 {
                    carriers.set_carrying(carrier_id, Some(job.material_type), withdrawn);
                    bus.emit(SimEvent::CarrierPickupComplete {
                        carrier: carrier_id,
                        material: job.material_type,
                        amount: withdrawn,
                    });
                    signals.push(JobSignal::PickupComplete {
                        carrier: carrier_id,
                        material: job.material_type,
                        amount: withdrawn,
                    });
                    if let Some(c) = carriers.get_mut(carrier_id) {
                        if let Some(ref mut j) = c.current_job {
                            j.amount = withdrawn;
                        }
                    }
                    start_leg(
                        unit,
                        carrier_id,
                        JobPhase::Deliver,
                        job.destination,
                        grid,
                        entities,
                        movement,
                        paths,
                        controller,
                        carriers,
                        bus,
                    );
                } else {
                    bus.emit(SimEvent::CarrierPickupFailed { carrier: carrier_id });
                    signals.push(JobSignal::PickupFailed { carrier: carrier_id });
                    carriers.complete_job(carrier_id, bus);
                    let home = carriers.get(carrier_id).map(|c| c.home_hub_id);
                    if let Some(home) = home {
                        begin_return_home(unit, carrier_id, home, grid, entities, movement, paths, controller, carriers, bus);
                    }
                }
            }
            JobPhase::Deliver => {
                carriers.set_status(carrier_id, CarrierStatus::Delivering, bus);
                let carrying = carriers.get(carrier_id).map(|c| (c.carrying_material, c.carrying_amount));
                if let Some((Some(material), amount)) = carrying {
                    let deposited = inventory.deposit_input(job.destination, material, amount as i64);
                    let overflow = amount.saturating_sub(deposited);
                    carriers.set_carrying(carrier_id, None, 0);
                    bus.emit(SimEvent::CarrierDeliveryComplete {
                        carrier: carrier_id,
                        material,
                        delivered: deposited,
                        overflow,
                    });
                    carriers.add_fatigue(carrier_id, 5);
                    signals.push(JobSignal::DeliveryComplete {
                        carrier: carrier_id,
                        material,
                        delivered: deposited,
                        overflow,
                    });
                }
                let home = carriers.get(carrier_id).map(|c| c.home_hub_id);
                if let Some(home) = home {
                    begin_return_home(unit, carrier_id, home, grid, entities, movement, paths, controller, carriers, bus);
                }
            }
            JobPhase::ReturnHome => {
                carriers.complete_job(carrier_id, bus);
                carriers.set_status(carrier_id, CarrierStatus::Idle, bus);
                bus.emit(SimEvent::CarrierReturnedHome { carrier: carrier_id });
                signals.push(JobSignal::ReturnedHome { carrier: carrier_id });
            }
        }
    }

    signals
}

#[allow(clippy::too_many_arguments)]
fn begin_return_home(
    unit: EntityId,
    carrier_id: CarrierId,
    home_hub: EntityId,
    grid: &TileGrid,
    entities: &EntityTable,
    movement: &mut MovementManager,
    paths: &mut PathService,
    controller: &mut CarrierJobController,
    carriers: &mut CarrierManager,
    bus: &mut EventBus,
) {
    start_leg(
        unit,
        carrier_id,
        JobPhase::ReturnHome,
        home_hub,
        grid,
        entities,
        movement,
        paths,
        controller,
        carriers,
        bus,
    );
}
