//! Unit movement system (§4.10): A* path-follow with bounded-wait obstacle
//! handling and re-path on repeated obstruction.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::config::{BLOCKED_WAIT_TICKS, MAX_REPATH_ATTEMPTS};
use crate::entity::{EntityId, EntityKind, EntityTable};
use crate::event_bus::{EventBus, SimEvent};
use crate::hex::{find_approach_tile, OccupancyQuery};
use crate::path::PathService;
use crate::tile_grid::TileGrid;

impl OccupancyQuery for EntityTable {
    fn occupant_kind(&self, x: i32, y: i32) -> Option<EntityKind> {
        self.get_at(x, y).and_then(|id| self.get(id)).map(|e| e.kind)
    }
}

/// Per-unit movement side state (§3).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MovementState {
    pub path: Vec<(i32, i32)>,
    pub path_index: usize,
    pub move_progress: f32,
    pub speed: f32,
    /// The original movement-command target, kept around so a blocked mover
    /// can request a fresh path to the same destination.
    pub target: Option<(i32, i32)>,
    blocked_ticks: u32,
    repath_attempts: u32,
}

impl MovementState {
    pub fn idle(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.path.is_empty() && self.path_index + 1 < self.path.len()
    }
}

#[derive(Resource, Default)]
pub struct MovementManager {
    states: HashMap<EntityId, MovementState>,
}

impl MovementManager {
    pub fn ensure(&mut self, unit: EntityId, speed: f32) {
        self.states.entry(unit).or_insert_with(|| MovementState::idle(speed));
    }

    pub fn remove(&mut self, unit: EntityId) -> Option<MovementState> {
        self.states.remove(&unit)
    }

    pub fn get(&self, unit: EntityId) -> Option<&MovementState> {
        self.states.get(&unit)
    }

    pub fn get_mut(&mut self, unit: EntityId) -> Option<&mut MovementState> {
        self.states.get_mut(&unit)
    }

    /// Issues a movement command to `target`: selects the approach tile
    /// (§4.4) and computes an initial path. Returns `false` if no approach
    /// tile or no path is available, leaving the unit's state untouched.
    pub fn move_to(
        &mut self,
        unit: EntityId,
        target: (i32, i32),
        grid: &TileGrid,
        entities: &EntityTable,
        paths: &mut PathService,
    ) -> bool {
        let Some(record) = entities.get(unit) else {
            return false;
        };
        let current = (record.x, record.y);
        let Some(approach) = find_approach_tile(grid, entities, target.0, target.1, current.0, current.1) else {
            return false;
        };
        let Some((path, _cost)) = paths.get(grid, current, approach) else {
            return false;
        };
        let speed = self.states.get(&unit).map(|s| s.speed).unwrap_or(1.0);
        self.states.insert(
            unit,
            MovementState {
                path,
                path_index: 0,
                move_progress: 0.0,
                speed,
                target: Some(approach),
                blocked_ticks: 0,
                repath_attempts: 0,
            },
        );
        true
    }
}

/// Advances every moving unit by `dt` seconds (§4.10). Ascending-id order for
/// determinism. Returns `(unit, blocked)` for every unit that stopped this
/// tick (arrived or gave up), mirroring the `unit:movementStopped` event so
/// same-tick consumers (the carrier job controller) don't need a reentrant
/// event-bus subscription to react within the tick that produced it.
pub fn movement_system(
    dt: f32,
    grid: &TileGrid,
    entities: &mut EntityTable,
    movement: &mut MovementManager,
    paths: &mut PathService,
    bus: &mut EventBus,
) -> Vec<(EntityId, bool)> {
    let mut stopped = Vec::new();
    let mut ids: Vec<EntityId> = movement
        .states
        .iter()
        .filter(|(_, s)| s.is_moving())
        .map(|(id, _)| *id)
        .collect();
    ids.sort_unstable();

    for id in ids {
        let Some(state) = movement.states.get(&id) else { continue };
        let next_tile = state.path[state.path_index + 1];
        let blocked = match entities.get_at(next_tile.0, next_tile.1) {
            Some(occupant) if occupant != id => true,
            _ => false,
        };

        if blocked {
            let state = movement.states.get_mut(&id).unwrap();
            state.blocked_ticks += 1;
            if state.blocked_ticks < BLOCKED_WAIT_TICKS {
                continue;
            }
            state.blocked_ticks = 0;
            state.repath_attempts += 1;
            if state.repath_attempts > MAX_REPATH_ATTEMPTS {
                movement.states.remove(&id);
                bus.emit(SimEvent::UnitMovementStopped { unit: id, blocked: true });
                stopped.push((id, true));
                continue;
            }
            let Some(target) = state.target else {
                movement.states.remove(&id);
                bus.emit(SimEvent::UnitMovementStopped { unit: id, blocked: true });
                stopped.push((id, true));
                continue;
            };
            let Some(current) = entities.get(id).map(|e| (e.x, e.y)) else {
                movement.states.remove(&id);
                continue;
            };
            match paths.get(grid, current, target) {
                Some((path, _cost)) => {
                    let state = movement.states.get_mut(&id).unwrap();
                    state.path = path;
                    state.path_index = 0;
                    state.move_progress = 0.0;
                }
                None => {
                    movement.states.remove(&id);
                    bus.emit(SimEvent::UnitMovementStopped { unit: id, blocked: true });
                    stopped.push((id, true));
                }
            }
            continue;
        }

        let state = movement.states.get_mut(&id).unwrap();
        state.blocked_ticks = 0;
        state.move_progress += dt * state.speed;
        if state.move_progress < 1.0 {
            continue;
        }
        state.move_progress -= 1.0;
        state.path_index += 1;

        if entities.update_position(id, next_tile.0, next_tile.1).is_err() {
            // Destination became unavailable between the occupancy check and
            // the move; treat like any other obstruction next tick.
            let state = movement.states.get_mut(&id).unwrap();
            state.path_index -= 1;
            state.move_progress = 0.0;
            continue;
        }

        let arrived = {
            let state = movement.states.get(&id).unwrap();
            state.path_index + 1 >= state.path.len()
        };
        if arrived {
            movement.states.remove(&id);
            bus.emit(SimEvent::UnitMovementStopped { unit: id, blocked: false });
            stopped.push((id, false));
        }
    }

    stopped
}
