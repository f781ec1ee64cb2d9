//! Logistics dispatcher (§4.17): stall detection, request-to-carrier
//! assignment, and the carrier↔request mapping translating carrier job
//! signals into request-manager transitions.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::carrier::{CarrierId, CarrierJob, CarrierManager};
use crate::carrier_job::{self, CarrierJobController, JobSignal};
use crate::config::{MAX_ASSIGNMENTS_PER_TICK, REQUEST_STALL_TIMEOUT_SECS, STALL_CHECK_INTERVAL_SECS};
use crate::entity::{EntityId, EntityTable};
use crate::event_bus::{EventBus, SimEvent};
use crate::fulfillment::{match_request, MatchOptions};
use crate::inventory::InventoryManager;
use crate::movement::MovementManager;
use crate::path::PathService;
use crate::request::{RequestId, RequestManager, ResetReason};
use crate::reservation::ReservationManager;
use crate::service_area::ServiceAreaIndex;
use crate::tile_grid::TileGrid;

#[derive(Resource, Default)]
pub struct DispatcherState {
    time_since_stall_check: f64,
    carrier_to_request: HashMap<CarrierId, RequestId>,
}

impl DispatcherState {
    fn map_carrier(&mut self, carrier: CarrierId, request: RequestId) {
        self.carrier_to_request.insert(carrier, request);
    }

    fn unmap_carrier(&mut self, carrier: CarrierId) -> Option<RequestId> {
        self.carrier_to_request.remove(&carrier)
    }

    fn request_for_carrier(&self, carrier: CarrierId) -> Option<RequestId> {
        self.carrier_to_request.get(&carrier).copied()
    }
}

/// All the managers the dispatcher's single tick entry point needs, grouped
/// so call sites ([`crate::Game::tick`]) don't pass a dozen positional
/// arguments.
#[allow(clippy::too_many_arguments)]
pub fn dispatcher_system(
    dt: f64,
    now: f64,
    grid: &TileGrid,
    entities: &mut EntityTable,
    state: &mut DispatcherState,
    requests: &mut RequestManager,
    reservations: &mut ReservationManager,
    carriers: &mut CarrierManager,
    service_areas: &ServiceAreaIndex,
    inventory: &mut InventoryManager,
    movement: &mut MovementManager,
    paths: &mut PathService,
    jobs: &mut CarrierJobController,
    bus: &mut EventBus,
) {
    state.time_since_stall_check += dt;
    if state.time_since_stall_check >= STALL_CHECK_INTERVAL_SECS {
        state.time_since_stall_check = 0.0;
        for req_id in requests.stalled(REQUEST_STALL_TIMEOUT_SECS, now) {
            reservations.release_for_request(req_id);
            if let Some(carrier) = requests.get(req_id).and_then(|r| r.assigned_carrier) {
                state.unmap_carrier(carrier);
            }
            requests.reset(req_id, ResetReason::Timeout);
        }
    }

    let options = MatchOptions::default();
    let mut assigned = 0;
    for req_id in requests.get_pending() {
        if assigned >= MAX_ASSIGNMENTS_PER_TICK {
            break;
        }
        let Some(req) = requests.get(req_id).cloned() else { continue };

        let Some(m) = match_request(&req, entities, inventory, Some(&*reservations), service_areas, &options) else {
            continue;
        };

        let Some(carrier_id) = find_available_carrier(carriers, service_areas, &m.hubs) else {
            continue;
        };
        let Some(unit) = carriers.get(carrier_id).map(|c| c.unit) else { continue };

        let reservation_id = reservations.create(m.source_building, req.material_type, m.amount, req_id, now);

        let job = CarrierJob {
            source: m.source_building,
            destination: req.building_id,
            material_type: req.material_type,
            amount: m.amount,
        };
        if !carriers.assign_job(carrier_id, job, bus) {
            reservations.release(reservation_id);
            continue;
        }

        carrier_job::start_job(unit, carrier_id, m.source_building, grid, entities, movement, paths, jobs, carriers, bus);
        requests.assign(req_id, m.source_building, carrier_id, now);
        state.map_carrier(carrier_id, req_id);
        assigned += 1;
    }
}

/// First idle, job-free, non-fatigued carrier (by ascending id) whose home
/// hub is among `hubs` (§4.17 step 2).
fn find_available_carrier(carriers: &CarrierManager, service_areas: &ServiceAreaIndex, hubs: &[EntityId]) -> Option<CarrierId> {
    let mut ids = carriers.all_ids_ascending();
    ids.sort_unstable();
    ids.into_iter().find(|id| {
        let Some(carrier) = carriers.get(*id) else { return false };
        if !carrier.can_assign() {
            return false;
        }
        if hubs.is_empty() {
            return false;
        }
        hubs.contains(&carrier.home_hub_id) && service_areas.get(carrier.home_hub_id).is_some()
    })
}

/// Translates this tick's carrier job signals into request-manager
/// transitions (§4.17 step 3).
pub fn apply_job_signals(
    signals: &[JobSignal],
    state: &mut DispatcherState,
    requests: &mut RequestManager,
    reservations: &mut ReservationManager,
) {
    for signal in signals {
        match *signal {
            JobSignal::DeliveryComplete { carrier, .. } => {
                if let Some(req_id) = state.unmap_carrier(carrier) {
                    requests.fulfill(req_id);
                    reservations.release_for_request(req_id);
                }
            }
            JobSignal::PickupFailed { carrier } => {
                if let Some(req_id) = state.unmap_carrier(carrier) {
                    requests.reset(req_id, ResetReason::PickupFailed);
                    reservations.release_for_request(req_id);
                }
            }
            JobSignal::PickupComplete { .. } | JobSignal::ReturnedHome { .. } => {}
        }
    }
}

/// Called when a carrier entity is removed (§4.17 step 3, `carrier:removed`).
pub fn handle_carrier_removed(
    carrier: CarrierId,
    state: &mut DispatcherState,
    requests: &mut RequestManager,
    reservations: &mut ReservationManager,
    bus: &mut EventBus,
) {
    if let Some(req_id) = state.unmap_carrier(carrier) {
        requests.reset(req_id, ResetReason::CarrierRemoved);
        reservations.release_for_request(req_id);
    }
    requests.reset_for_carrier(carrier);
    bus.emit(SimEvent::CarrierRemoved { carrier });
}

/// Cascading building-destruction cleanup (§4.17 step 4).
pub fn handle_building_destroyed(
    building: EntityId,
    state: &mut DispatcherState,
    requests: &mut RequestManager,
    reservations: &mut ReservationManager,
    bus: &mut EventBus,
) {
    let cancelled = requests.cancel_for_building(building).len() as u32;
    let reset = requests.reset_from_source(building).len() as u32;
    let reservations_released = reservations.release_for_building(building);
    let mappings_before = state.carrier_to_request.len();
    state
        .carrier_to_request
        .retain(|_, req_id| requests.get(*req_id).is_some());
    let mappings = (mappings_before - state.carrier_to_request.len()) as u32;

    bus.emit(SimEvent::LogisticsBuildingCleanedUp {
        building,
        cancelled,
        reset,
        reservations: reservations_released,
        mappings,
    });
}
