//! Inventory reservation manager (§4.13): soft holds over a building's
//! output that reduce *effective available* supply without mutating the
//! inventory itself, preventing the dispatcher from double-allocating the
//! same units of material to two requests.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::entity::EntityId;
use crate::request::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ReservationId(pub u64);

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub building: EntityId,
    pub material_type: u32,
    pub amount: u32,
    pub request_id: RequestId,
    pub timestamp: f64,
}

#[derive(Resource, Default)]
pub struct ReservationManager {
    next_id: u64,
    reservations: HashMap<ReservationId, Reservation>,
}

impl ReservationManager {
    /// Creates a reservation unconditionally (the dispatcher is expected to
    /// have already checked effective availability before calling this).
    /// Reservations are atomic per §5: always `Some`, never a partial hold.
    pub fn create(&mut self, building: EntityId, material: u32, amount: u32, request_id: RequestId, now: f64) -> ReservationId {
        let id = ReservationId(self.next_id);
        self.next_id += 1;
        self.reservations.insert(
            id,
            Reservation {
                id,
                building,
                material_type: material,
                amount,
                request_id,
                timestamp: now,
            },
        );
        id
    }

    /// Releases a reservation. Idempotent (§5): releasing a nonexistent or
    /// already-released id is a no-op, never an error.
    pub fn release(&mut self, id: ReservationId) {
        self.reservations.remove(&id);
    }

    pub fn release_for_request(&mut self, request_id: RequestId) {
        self.reservations.retain(|_, r| r.request_id != request_id);
    }

    pub fn release_for_building(&mut self, building: EntityId) -> u32 {
        let before = self.reservations.len();
        self.reservations.retain(|_, r| r.building != building);
        (before - self.reservations.len()) as u32
    }

    pub fn reserved_amount(&self, building: EntityId, material: u32) -> u32 {
        self.reservations
            .values()
            .filter(|r| r.building == building && r.material_type == material)
            .map(|r| r.amount)
            .sum()
    }

    /// `max(0, actual - reserved)` (§4.13).
    pub fn available_amount(&self, building: EntityId, material: u32, actual: u32) -> u32 {
        actual.saturating_sub(self.reserved_amount(building, material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_amount_sums_active_reservations() {
        let mut mgr = ReservationManager::default();
        let b = EntityId(1);
        mgr.create(b, 0, 10, RequestId(1), 0.0);
        mgr.create(b, 0, 5, RequestId(2), 0.0);
        assert_eq!(mgr.reserved_amount(b, 0), 15);
        assert_eq!(mgr.available_amount(b, 0, 20), 5);
    }

    #[test]
    fn release_for_request_is_idempotent() {
        let mut mgr = ReservationManager::default();
        let b = EntityId(1);
        mgr.create(b, 0, 10, RequestId(1), 0.0);
        mgr.release_for_request(RequestId(1));
        mgr.release_for_request(RequestId(1));
        assert_eq!(mgr.reserved_amount(b, 0), 0);
    }

    #[test]
    fn release_for_building_returns_count_removed() {
        let mut mgr = ReservationManager::default();
        let b = EntityId(1);
        mgr.create(b, 0, 10, RequestId(1), 0.0);
        mgr.create(b, 1, 3, RequestId(2), 0.0);
        assert_eq!(mgr.release_for_building(b), 2);
        assert_eq!(mgr.release_for_building(b), 0);
    }
}
