//! Fulfillment matcher (§4.15): a pure function picking a source building
//! for a request from supply, service-area coverage, and distance.

use crate::config::DEFAULT_FULL_SUPPLY_DISTANCE_FACTOR;
use crate::entity::{EntityId, EntityTable};
use crate::hex::hex_distance;
use crate::inventory::InventoryManager;
use crate::request::ResourceRequest;
use crate::reservation::ReservationManager;
use crate::service_area::ServiceAreaIndex;

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub require_service_area: bool,
    pub full_supply_distance_factor: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            require_service_area: true,
            full_supply_distance_factor: DEFAULT_FULL_SUPPLY_DISTANCE_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FulfillmentMatch {
    pub source_building: EntityId,
    pub amount: u32,
    pub distance: f64,
    pub hubs: Vec<EntityId>,
}

struct Candidate {
    building: EntityId,
    effective: u32,
    distance: f64,
    hubs: Vec<EntityId>,
}

/// Matches `request` against supply (§4.15 steps 1-6). Ascending-id
/// iteration over candidates keeps distance ties deterministic.
pub fn match_request(
    request: &ResourceRequest,
    entities: &EntityTable,
    inventory: &InventoryManager,
    reservations: Option<&ReservationManager>,
    service_areas: &ServiceAreaIndex,
    options: &MatchOptions,
) -> Option<FulfillmentMatch> {
    let dest = entities.get(request.building_id)?;
    let dest_player = dest.player;

    let mut suppliers = inventory.buildings_with_output(request.material_type, 1);
    suppliers.retain(|&b| b != request.building_id);

    let mut candidates = Vec::new();
    for building in suppliers {
        let Some(source) = entities.get(building) else { continue };
        if source.player != dest_player {
            continue;
        }
        let actual = inventory.output_amount(building, request.material_type);
        let effective = match reservations {
            Some(res) => res.available_amount(building, request.material_type, actual),
            None => actual,
        };
        if effective == 0 {
            continue;
        }

        let hubs = service_areas.hubs_serving_both(source.x, source.y, dest.x, dest.y, dest_player);
        if options.require_service_area && hubs.is_empty() {
            continue;
        }

        let distance = hex_distance(source.x, source.y, dest.x, dest.y);
        candidates.push(Candidate {
            building,
            effective,
            distance,
            hubs,
        });
    }

    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.building.cmp(&b.building))
    });

    let nearest = candidates.first()?;
    let threshold = nearest.distance * options.full_supply_distance_factor;
    let chosen = candidates
        .iter()
        .find(|c| c.effective >= request.amount && c.distance <= threshold)
        .unwrap_or(nearest);

    Some(FulfillmentMatch {
        source_building: chosen.building,
        amount: chosen.effective.min(request.amount),
        distance: chosen.distance,
        hubs: chosen.hubs.clone(),
    })
}
