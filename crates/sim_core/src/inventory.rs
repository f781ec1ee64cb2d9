//! Building inventory manager (§4.12): fixed input/output slots per
//! building, deposit/withdraw with overflow remainder, and a local
//! notification channel for the visualizer (deliberately not on the public
//! [`crate::event_bus::EventBus`] — §4.12).

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::building_catalog::{BuildingDef, SlotSpec};
use crate::entity::EntityId;

/// A single typed slot's live state.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    pub material_type: u32,
    pub current_amount: u32,
    pub max_capacity: u32,
}

impl Slot {
    fn from_spec(spec: &SlotSpec) -> Self {
        Self {
            material_type: spec.material_type,
            current_amount: 0,
            max_capacity: spec.max_capacity,
        }
    }
}

/// A building's fixed-at-creation input and output slot sequences (§3).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BuildingInventory {
    pub input_slots: Vec<Slot>,
    pub output_slots: Vec<Slot>,
}

impl BuildingInventory {
    fn from_def(def: &BuildingDef) -> Self {
        Self {
            input_slots: def.input_slots.iter().map(Slot::from_spec).collect(),
            output_slots: def.output_slots.iter().map(Slot::from_spec).collect(),
        }
    }
}

/// Local (non-bus) notification emitted on any deposit/withdraw that changes
/// a slot's amount, consumed by the visualizer (§4.12).
#[derive(Debug, Clone, Copy)]
pub struct InventoryChanged {
    pub building: EntityId,
    pub material_type: u32,
    pub new_amount: u32,
    pub is_output: bool,
}

type ChangeListener = Box<dyn FnMut(&InventoryChanged) + Send + Sync>;

/// Clamps a caller-supplied amount to a sane non-negative integer. §4.12:
/// invalid amounts (NaN, negative) are treated as 0 — callers only ever pass
/// `u32` here, so the guard is for defense against accidental `as u32`
/// wraparound from a negative `i32` upstream, not float NaN (there is no
/// float amount type in this core).
fn sanitize_amount(amount: i64) -> u32 {
    amount.clamp(0, u32::MAX as i64) as u32
}

#[derive(Resource, Default)]
pub struct InventoryManager {
    inventories: HashMap<EntityId, BuildingInventory>,
    listeners: Vec<ChangeListener>,
}

impl InventoryManager {
    pub fn create(&mut self, building: EntityId, def: &BuildingDef) {
        self.inventories.insert(building, BuildingInventory::from_def(def));
    }

    pub fn remove(&mut self, building: EntityId) -> Option<BuildingInventory> {
        self.inventories.remove(&building)
    }

    pub fn get(&self, building: EntityId) -> Option<&BuildingInventory> {
        self.inventories.get(&building)
    }

    pub fn on_changed(&mut self, listener: impl FnMut(&InventoryChanged) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: InventoryChanged) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Deposits up to `amount` of `material` into `building`'s matching input
    /// slot. Returns the amount actually deposited; the remainder (overflow)
    /// is left for the caller to handle (§4.12).
    pub fn deposit_input(&mut self, building: EntityId, material: u32, amount: i64) -> u32 {
        let amount = sanitize_amount(amount);
        let Some(inv) = self.inventories.get_mut(&building) else {
            return 0;
        };
        let Some(slot) = inv.input_slots.iter_mut().find(|s| s.material_type == material) else {
            return 0;
        };
        let room = slot.max_capacity.saturating_sub(slot.current_amount);
        let deposited = amount.min(room);
        slot.current_amount += deposited;
        let new_amount = slot.current_amount;
        if deposited > 0 {
            self.notify(InventoryChanged {
                building,
                material_type: material,
                new_amount,
                is_output: false,
            });
        }
        deposited
    }

    /// Withdraws up to `amount` of `material` from `building`'s matching
    /// output slot. Returns the amount actually withdrawn.
    pub fn withdraw_output(&mut self, building: EntityId, material: u32, amount: i64) -> u32 {
        let amount = sanitize_amount(amount);
        let Some(inv) = self.inventories.get_mut(&building) else {
            return 0;
        };
        let Some(slot) = inv.output_slots.iter_mut().find(|s| s.material_type == material) else {
            return 0;
        };
        let withdrawn = amount.min(slot.current_amount);
        slot.current_amount -= withdrawn;
        let new_amount = slot.current_amount;
        if withdrawn > 0 {
            self.notify(InventoryChanged {
                building,
                material_type: material,
                new_amount,
                is_output: true,
            });
        }
        withdrawn
    }

    /// Directly sets a slot's amount, clamped to capacity, bypassing
    /// deposit/withdraw bookkeeping and change notifications. Used by save
    /// restore and by the Hub/Warehouse pass-through production step (§10.5:
    /// the spec's inventory manager has no conversion operation of its own).
    pub fn set_slot_amount(&mut self, building: EntityId, material: u32, is_output: bool, amount: u32) {
        let Some(inv) = self.inventories.get_mut(&building) else {
            return;
        };
        let slots = if is_output { &mut inv.output_slots } else { &mut inv.input_slots };
        if let Some(slot) = slots.iter_mut().find(|s| s.material_type == material) {
            slot.current_amount = amount.min(slot.max_capacity);
        }
    }

    pub fn output_amount(&self, building: EntityId, material: u32) -> u32 {
        self.inventories
            .get(&building)
            .and_then(|inv| inv.output_slots.iter().find(|s| s.material_type == material))
            .map(|s| s.current_amount)
            .unwrap_or(0)
    }

    /// Buildings whose output of `material` is at least `min`, ascending by
    /// id for determinism (§9 Design Notes).
    pub fn buildings_with_output(&self, material: u32, min: u32) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = self
            .inventories
            .iter()
            .filter(|(_, inv)| {
                inv.output_slots
                    .iter()
                    .any(|s| s.material_type == material && s.current_amount >= min)
            })
            .map(|(id, _)| *id)
            .collect();
        out.sort_unstable();
        out
    }
}
