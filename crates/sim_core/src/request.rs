//! Resource request manager (§4.14): a priority+timestamp-ordered queue with
//! a single-direction status machine (Pending↔InProgress excepted, via
//! reset), plus stall detection consulted by the logistics dispatcher.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::carrier::CarrierId;
use crate::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Priority {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RequestStatus {
    Pending,
    InProgress,
    Fulfilled,
    Cancelled,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResourceRequest {
    pub id: RequestId,
    pub building_id: EntityId,
    pub material_type: u32,
    pub amount: u32,
    pub priority: Priority,
    pub timestamp: f64,
    pub status: RequestStatus,
    pub assigned_carrier: Option<CarrierId>,
    pub source_building: Option<EntityId>,
    pub assigned_at: Option<f64>,
}

/// Why a request was reset to `Pending` (§4.17), surfaced for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Timeout,
    PickupFailed,
    CarrierRemoved,
    SourceUnavailable,
}

#[derive(Resource, Default)]
pub struct RequestManager {
    next_id: u64,
    requests: HashMap<RequestId, ResourceRequest>,
}

impl RequestManager {
    pub fn add(&mut self, building: EntityId, material: u32, amount: u32, priority: Priority, now: f64) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.insert(
            id,
            ResourceRequest {
                id,
                building_id: building,
                material_type: material,
                amount,
                priority,
                timestamp: now,
                status: RequestStatus::Pending,
                assigned_carrier: None,
                source_building: None,
                assigned_at: None,
            },
        );
        id
    }

    /// Reinserts a previously-serialized request verbatim, preserving its id
    /// and status (§6: active requests are persisted as-is, unlike pending
    /// jobs). A restored `InProgress` request with no matching live carrier
    /// job recovers via the ordinary stall timeout rather than special-cased
    /// restore logic.
    pub fn restore_request(&mut self, request: ResourceRequest) {
        self.next_id = self.next_id.max(request.id.0 + 1);
        self.requests.insert(request.id, request);
    }

    pub fn get(&self, id: RequestId) -> Option<&ResourceRequest> {
        self.requests.get(&id)
    }

    /// Pending requests ordered `(priority asc, timestamp asc)` (§3, §4.14).
    pub fn get_pending(&self) -> Vec<RequestId> {
        let mut pending: Vec<&ResourceRequest> = self
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.id.cmp(&b.id))
        });
        pending.into_iter().map(|r| r.id).collect()
    }

    pub fn assign(&mut self, id: RequestId, source: EntityId, carrier: CarrierId, now: f64) {
        if let Some(req) = self.requests.get_mut(&id) {
            req.status = RequestStatus::InProgress;
            req.source_building = Some(source);
            req.assigned_carrier = Some(carrier);
            req.assigned_at = Some(now);
        }
    }

    pub fn fulfill(&mut self, id: RequestId) {
        self.requests.remove(&id);
    }

    pub fn cancel_for_building(&mut self, building: EntityId) -> Vec<RequestId> {
        let ids: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.building_id == building)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.requests.remove(id);
        }
        ids
    }

    fn reset_internal(&mut self, id: RequestId) {
        if let Some(req) = self.requests.get_mut(&id) {
            req.status = RequestStatus::Pending;
            req.assigned_carrier = None;
            req.source_building = None;
            req.assigned_at = None;
        }
    }

    pub fn reset(&mut self, id: RequestId, reason: ResetReason) {
        tracing::debug!(request = id.0, ?reason, "request reset to pending");
        self.reset_internal(id);
    }

    pub fn reset_for_carrier(&mut self, carrier: CarrierId) -> Vec<RequestId> {
        let ids: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.assigned_carrier == Some(carrier))
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.reset(*id, ResetReason::CarrierRemoved);
        }
        ids
    }

    pub fn reset_from_source(&mut self, source: EntityId) -> Vec<RequestId> {
        let ids: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.source_building == Some(source))
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.reset(*id, ResetReason::SourceUnavailable);
        }
        ids
    }

    /// All `InProgress` request ids, ascending by id (used by save snapshot).
    pub fn in_progress_ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::InProgress)
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// InProgress requests whose `assigned_at + max_age < now` (§4.17 step 1).
    pub fn stalled(&self, max_age: f64, now: f64) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| {
                r.status == RequestStatus::InProgress
                    && r.assigned_at.map(|t| t + max_age < now).unwrap_or(false)
            })
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
