//! Entity table (§4.2): monotonic-id entities with per-id lookup, a spatial
//! `(x,y) -> id` occupancy map, and the CRUD surface every manager indexes
//! against by id. This is the single source of truth for positions (§5).

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::tile_grid::TileGrid;

/// A unique, monotonically increasing entity id. Never reused, even once an
/// entity is removed (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// The closed sum of entity kinds (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Building,
    Unit,
    StackedResource,
    MapObject,
}

/// A single entity's core record. Per-type side state (construction,
/// movement, carrier) lives in the owning manager's map, keyed by `id`
/// (§9 Design Notes: either storage choice is acceptable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: EntityKind,
    pub sub_type: u32,
    pub x: i32,
    pub y: i32,
    pub player: u32,
}

/// Reason an `add_entity` call was refused, without mutating state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementRejection {
    OutOfBounds,
    TileOccupied,
}

#[derive(Resource, Default)]
pub struct EntityTable {
    next_id: u32,
    entities: HashMap<EntityId, EntityRecord>,
    occupancy: HashMap<(i32, i32), EntityId>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity at `(x, y)`. Fails softly (returns `Err` without
    /// mutating anything) if the tile is already occupied by any entity —
    /// stacked resources must be placed on their own free tile, never the
    /// same tile as another entity (§4.2).
    pub fn add(
        &mut self,
        grid: &TileGrid,
        kind: EntityKind,
        sub_type: u32,
        x: i32,
        y: i32,
        player: u32,
    ) -> Result<EntityId, PlacementRejection> {
        if !grid.in_bounds(x, y) {
            return Err(PlacementRejection::OutOfBounds);
        }
        if self.occupancy.contains_key(&(x, y)) {
            return Err(PlacementRejection::TileOccupied);
        }
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            id,
            EntityRecord {
                id,
                kind,
                sub_type,
                x,
                y,
                player,
            },
        );
        self.occupancy.insert((x, y), id);
        Ok(id)
    }

    /// Removes an entity. Callers (the command executor) are responsible for
    /// cascading removal into the managers that index by id (§3, §4.7).
    pub fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        let record = self.entities.remove(&id)?;
        // Only clear the occupancy slot if it still points at this id —
        // defends against a prior inconsistency rather than masking one.
        if self.occupancy.get(&(record.x, record.y)) == Some(&id) {
            self.occupancy.remove(&(record.x, record.y));
        }
        Some(record)
    }

    /// Reinserts a previously-serialized record verbatim, preserving its id.
    /// Used only by save restore (§6); overwrites any existing occupant at
    /// the same tile, which is the caller's responsibility to avoid.
    pub fn restore_entity(&mut self, record: EntityRecord) {
        self.occupancy.insert((record.x, record.y), record.id);
        self.next_id = self.next_id.max(record.id.0 + 1);
        self.entities.insert(record.id, record);
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(&id)
    }

    pub fn get_at(&self, x: i32, y: i32) -> Option<EntityId> {
        self.occupancy.get(&(x, y)).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// All entities within hex distance `r` of `(x, y)`, ascending by id for
    /// determinism (§9 Design Notes).
    pub fn entities_in_radius(&self, x: i32, y: i32, r: f64) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| crate::hex::hex_distance(x, y, e.x, e.y) <= r)
            .map(|e| e.id)
            .collect();
        out.sort_unstable();
        out
    }

    /// Moves an entity to a new tile, maintaining the occupancy invariant
    /// (no two entities share a tile). Fails if the destination is occupied
    /// by a different entity.
    pub fn update_position(&mut self, id: EntityId, x: i32, y: i32) -> SimResult<()> {
        let Some(record) = self.entities.get(&id) else {
            return Err(SimError::consistency(format!(
                "update_position on unknown entity {:?}",
                id
            )));
        };
        let (old_x, old_y) = (record.x, record.y);
        if (old_x, old_y) == (x, y) {
            return Ok(());
        }
        if let Some(occupant) = self.occupancy.get(&(x, y)) {
            if *occupant != id {
                return Err(SimError::validation(format!(
                    "tile ({x},{y}) already occupied"
                )));
            }
        }
        self.occupancy.remove(&(old_x, old_y));
        self.occupancy.insert((x, y), id);
        self.entities.get_mut(&id).unwrap().x = x;
        self.entities.get_mut(&id).unwrap().y = y;
        Ok(())
    }

    /// All entity ids, ascending — the canonical deterministic iteration
    /// order required by §9 Design Notes.
    pub fn all_ids_ascending(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn ids_of_kind_ascending(&self, kind: EntityKind) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.kind == kind)
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Invariant check used by tests and debug assertions: every occupied
    /// tile points back to an existing entity at that position, and every
    /// entity appears in occupancy at its own position. Returns the first
    /// violation found, if any.
    pub fn check_occupancy_invariant(&self) -> Option<String> {
        for (pos, id) in &self.occupancy {
            match self.entities.get(id) {
                None => return Some(format!("dangling occupancy at {:?} -> {:?}", pos, id)),
                Some(rec) if (rec.x, rec.y) != *pos => {
                    return Some(format!(
                        "occupancy/position mismatch for {:?}: occupancy says {:?}, record says {:?}",
                        id, pos, (rec.x, rec.y)
                    ))
                }
                _ => {}
            }
        }
        for rec in self.entities.values() {
            if self.occupancy.get(&(rec.x, rec.y)) != Some(&rec.id) {
                return Some(format!("entity {:?} missing from occupancy", rec.id));
            }
        }
        None
    }
}
