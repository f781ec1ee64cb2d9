//! Carrier manager (§4.16): per-carrier state (status, fatigue, job,
//! carrying) with a home-hub index, plus the assignment-eligibility rule the
//! dispatcher consults every tick.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::config::{FATIGUE_COLLAPSED_MAX, FATIGUE_EXHAUSTED_MAX, FATIGUE_FRESH_MAX, FATIGUE_TIRED_MAX};
use crate::entity::EntityId;
use crate::event_bus::{EventBus, SimEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct CarrierId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CarrierStatus {
    Idle,
    Walking,
    PickingUp,
    Delivering,
    Resting,
}

/// Fatigue band, derived from the same thresholds the dispatcher's
/// acceptance rule consults (§4.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatigueBand {
    Fresh,
    Tired,
    Exhausted,
    Collapsed,
}

pub fn fatigue_band(fatigue: u8) -> FatigueBand {
    if fatigue <= FATIGUE_FRESH_MAX {
        FatigueBand::Fresh
    } else if fatigue <= FATIGUE_TIRED_MAX {
        FatigueBand::Tired
    } else if fatigue <= FATIGUE_EXHAUSTED_MAX {
        FatigueBand::Exhausted
    } else {
        let _ = FATIGUE_COLLAPSED_MAX;
        FatigueBand::Collapsed
    }
}

/// The carrier's currently active delivery job (§4.18). `amount` is the
/// quantity being moved; it may shrink at pickup if the source had less than
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CarrierJob {
    pub source: EntityId,
    pub destination: EntityId,
    pub material_type: u32,
    pub amount: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub unit: EntityId,
    pub home_hub_id: EntityId,
    pub status: CarrierStatus,
    pub current_job: Option<CarrierJob>,
    pub fatigue: u8,
    pub carrying_material: Option<u32>,
    pub carrying_amount: u32,
    /// Sub-point fatigue decay remainder carried between ticks so a fixed
    /// step smaller than a second still decays at the documented per-second
    /// rate (§4.18). Transient; not part of the persisted save.
    #[serde(default)]
    fatigue_decay_carry: f32,
}

impl Carrier {
    /// §4.16: `can_assign = status = Idle ∧ current_job = none ∧ fatigue ∈ Fresh ∨ Tired`.
    pub fn can_assign(&self) -> bool {
        self.status == CarrierStatus::Idle
            && self.current_job.is_none()
            && matches!(fatigue_band(self.fatigue), FatigueBand::Fresh | FatigueBand::Tired)
    }
}

#[derive(Resource, Default)]
pub struct CarrierManager {
    next_id: u64,
    carriers: HashMap<CarrierId, Carrier>,
    unit_to_carrier: HashMap<EntityId, CarrierId>,
}

impl CarrierManager {
    pub fn create(&mut self, unit: EntityId, home_hub_id: EntityId) -> CarrierId {
        let id = CarrierId(self.next_id);
        self.next_id += 1;
        self.carriers.insert(
            id,
            Carrier {
                id,
                unit,
                home_hub_id,
                status: CarrierStatus::Idle,
                current_job: None,
                fatigue: 0,
                carrying_material: None,
                carrying_amount: 0,
                fatigue_decay_carry: 0.0,
            },
        );
        self.unit_to_carrier.insert(unit, id);
        id
    }

    /// Reinserts a carrier from a save, always with `current_job = None`:
    /// pending jobs are not persisted (§6), so a restored carrier is treated
    /// as available and the dispatcher re-assigns it on the next tick if its
    /// old request is still outstanding. `status` is restored as saved
    /// (§6 lists it as persisted), except `Walking`/`PickingUp`/`Delivering`
    /// have no job to resume into, so those fall back to `Idle`.
    pub fn restore_carrier(
        &mut self,
        id: CarrierId,
        unit: EntityId,
        home_hub_id: EntityId,
        status: CarrierStatus,
        fatigue: u8,
        carrying_material: Option<u32>,
        carrying_amount: u32,
    ) {
        self.next_id = self.next_id.max(id.0 + 1);
        let status = match status {
            CarrierStatus::Walking | CarrierStatus::PickingUp | CarrierStatus::Delivering => CarrierStatus::Idle,
            other => other,
        };
        self.carriers.insert(
            id,
            Carrier {
                id,
                unit,
                home_hub_id,
                status,
                current_job: None,
                fatigue,
                carrying_material,
                carrying_amount,
                fatigue_decay_carry: 0.0,
            },
        );
        self.unit_to_carrier.insert(unit, id);
    }

    pub fn remove(&mut self, id: CarrierId) -> Option<Carrier> {
        let carrier = self.carriers.remove(&id)?;
        self.unit_to_carrier.remove(&carrier.unit);
        Some(carrier)
    }

    pub fn get(&self, id: CarrierId) -> Option<&Carrier> {
        self.carriers.get(&id)
    }

    pub fn get_mut(&mut self, id: CarrierId) -> Option<&mut Carrier> {
        self.carriers.get_mut(&id)
    }

    pub fn by_unit(&self, unit: EntityId) -> Option<CarrierId> {
        self.unit_to_carrier.get(&unit).copied()
    }

    /// Carriers home-based at `hub`, ascending by id (§9 Design Notes).
    pub fn by_home_hub(&self, hub: EntityId) -> Vec<CarrierId> {
        let mut out: Vec<CarrierId> = self
            .carriers
            .values()
            .filter(|c| c.home_hub_id == hub)
            .map(|c| c.id)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn all_ids_ascending(&self) -> Vec<CarrierId> {
        let mut ids: Vec<CarrierId> = self.carriers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn assign_job(&mut self, id: CarrierId, job: CarrierJob, bus: &mut EventBus) -> bool {
        let Some(carrier) = self.carriers.get_mut(&id) else {
            return false;
        };
        if !carrier.can_assign() {
            return false;
        }
        carrier.current_job = Some(job);
        bus.emit(SimEvent::CarrierJobAssigned { carrier: id });
        true
    }

    pub fn complete_job(&mut self, id: CarrierId, bus: &mut EventBus) -> Option<CarrierJob> {
        let carrier = self.carriers.get_mut(&id)?;
        let job = carrier.current_job.take();
        if job.is_some() {
            bus.emit(SimEvent::CarrierJobCompleted { carrier: id });
        }
        job
    }

    pub fn set_status(&mut self, id: CarrierId, status: CarrierStatus, bus: &mut EventBus) {
        if let Some(carrier) = self.carriers.get_mut(&id) {
            if carrier.status != status {
                carrier.status = status;
                bus.emit(SimEvent::CarrierStatusChanged { carrier: id });
            }
        }
    }

    pub fn set_carrying(&mut self, id: CarrierId, material: Option<u32>, amount: u32) {
        if let Some(carrier) = self.carriers.get_mut(&id) {
            carrier.carrying_material = material;
            carrier.carrying_amount = amount;
        }
    }

    pub fn add_fatigue(&mut self, id: CarrierId, delta: i16) {
        if let Some(carrier) = self.carriers.get_mut(&id) {
            let next = (carrier.fatigue as i16 + delta).clamp(0, 100);
            carrier.fatigue = next as u8;
        }
    }

    /// Per-tick fatigue decay, the carrier half of §4.18's two
    /// responsibilities. Resting carriers recover at 10/s, Idle ones at 5/s,
    /// everyone else is unchanged; a job-free Idle carrier whose fatigue has
    /// crossed into Exhausted or Collapsed starts Resting instead (so it
    /// recovers enough to become assignable again rather than sitting Idle
    /// at a fatigue band `can_assign` permanently excludes); a Resting
    /// carrier that reaches 0 returns to Idle.
    pub fn tick_fatigue(&mut self, dt: f32, bus: &mut EventBus) {
        const RESTING_DECAY_PER_SEC: f32 = 10.0;
        const IDLE_DECAY_PER_SEC: f32 = 5.0;

        let mut ids: Vec<CarrierId> = self.carriers.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(carrier) = self.carriers.get_mut(&id) else { continue };

            if carrier.status == CarrierStatus::Idle
                && carrier.current_job.is_none()
                && matches!(fatigue_band(carrier.fatigue), FatigueBand::Exhausted | FatigueBand::Collapsed)
            {
                carrier.status = CarrierStatus::Resting;
                bus.emit(SimEvent::CarrierStatusChanged { carrier: id });
            }

            let rate = match carrier.status {
                CarrierStatus::Resting => RESTING_DECAY_PER_SEC,
                CarrierStatus::Idle => IDLE_DECAY_PER_SEC,
                _ => 0.0,
            };
            if rate > 0.0 {
                carrier.fatigue_decay_carry += rate * dt;
                let whole = carrier.fatigue_decay_carry.floor();
                if whole >= 1.0 {
                    carrier.fatigue_decay_carry -= whole;
                    carrier.fatigue = carrier.fatigue.saturating_sub(whole as u8);
                }
            }

            if carrier.status == CarrierStatus::Resting && carrier.fatigue == 0 {
                carrier.status = CarrierStatus::Idle;
                bus.emit(SimEvent::CarrierStatusChanged { carrier: id });
            }
        }
    }

    /// Fails if the carrier has an active job (§4.16).
    pub fn reassign_to_hub(&mut self, id: CarrierId, hub: EntityId) -> bool {
        let Some(carrier) = self.carriers.get_mut(&id) else {
            return false;
        };
        if carrier.current_job.is_some() {
            return false;
        }
        carrier.home_hub_id = hub;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_assign_requires_idle_no_job_and_low_fatigue() {
        let mut mgr = CarrierManager::default();
        let id = mgr.create(EntityId(1), EntityId(2));
        assert!(mgr.get(id).unwrap().can_assign());
        mgr.add_fatigue(id, 60);
        assert!(!mgr.get(id).unwrap().can_assign());
    }

    #[test]
    fn assign_job_fails_when_carrier_is_not_assignable() {
        let mut mgr = CarrierManager::default();
        let mut bus = EventBus::new();
        let id = mgr.create(EntityId(1), EntityId(2));
        let job = CarrierJob {
            source: EntityId(3),
            destination: EntityId(4),
            material_type: 0,
            amount: 5,
        };
        assert!(mgr.assign_job(id, job, &mut bus));
        assert!(!mgr.assign_job(id, job, &mut bus));
    }

    #[test]
    fn reassign_to_hub_fails_with_active_job() {
        let mut mgr = CarrierManager::default();
        let mut bus = EventBus::new();
        let id = mgr.create(EntityId(1), EntityId(2));
        let job = CarrierJob {
            source: EntityId(3),
            destination: EntityId(4),
            material_type: 0,
            amount: 5,
        };
        mgr.assign_job(id, job, &mut bus);
        assert!(!mgr.reassign_to_hub(id, EntityId(9)));
    }

    #[test]
    fn restore_carrier_never_resumes_a_job_but_keeps_saved_status() {
        let mut mgr = CarrierManager::default();
        mgr.restore_carrier(CarrierId(5), EntityId(1), EntityId(2), CarrierStatus::Resting, 40, Some(0), 3);
        let carrier = mgr.get(CarrierId(5)).unwrap();
        assert_eq!(carrier.status, CarrierStatus::Resting);
        assert!(carrier.current_job.is_none());
        assert_eq!(mgr.by_unit(EntityId(1)), Some(CarrierId(5)));
    }

    #[test]
    fn restore_carrier_falls_back_to_idle_from_an_in_transit_status() {
        let mut mgr = CarrierManager::default();
        mgr.restore_carrier(CarrierId(6), EntityId(1), EntityId(2), CarrierStatus::Delivering, 10, None, 0);
        assert_eq!(mgr.get(CarrierId(6)).unwrap().status, CarrierStatus::Idle);
    }

    #[test]
    fn idle_carrier_decays_fatigue_over_time() {
        let mut mgr = CarrierManager::default();
        let mut bus = EventBus::new();
        let id = mgr.create(EntityId(1), EntityId(2));
        mgr.add_fatigue(id, 20);
        mgr.tick_fatigue(1.0, &mut bus);
        assert_eq!(mgr.get(id).unwrap().fatigue, 15);
    }

    #[test]
    fn exhausted_idle_carrier_rests_and_recovers_back_to_idle() {
        let mut mgr = CarrierManager::default();
        let mut bus = EventBus::new();
        let id = mgr.create(EntityId(1), EntityId(2));
        mgr.add_fatigue(id, 60);
        mgr.tick_fatigue(0.1, &mut bus);
        assert_eq!(mgr.get(id).unwrap().status, CarrierStatus::Resting);

        for _ in 0..70 {
            mgr.tick_fatigue(1.0, &mut bus);
        }
        let carrier = mgr.get(id).unwrap();
        assert_eq!(carrier.fatigue, 0);
        assert_eq!(carrier.status, CarrierStatus::Idle);
        assert!(carrier.can_assign());
    }

    #[test]
    fn fatigue_bands_match_documented_ranges() {
        assert_eq!(fatigue_band(0), FatigueBand::Fresh);
        assert_eq!(fatigue_band(25), FatigueBand::Fresh);
        assert_eq!(fatigue_band(26), FatigueBand::Tired);
        assert_eq!(fatigue_band(50), FatigueBand::Tired);
        assert_eq!(fatigue_band(51), FatigueBand::Exhausted);
        assert_eq!(fatigue_band(75), FatigueBand::Exhausted);
        assert_eq!(fatigue_band(76), FatigueBand::Collapsed);
        assert_eq!(fatigue_band(100), FatigueBand::Collapsed);
    }
}
