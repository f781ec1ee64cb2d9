//! Building construction state machine (§4.9): phased progression with
//! terrain capture/leveling/restore and a unit-spawn step on completion.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::building_catalog::{BuildingCatalog, BuildingType, UnitType};
use crate::carrier::CarrierManager;
use crate::config::PHASE_DURATION_FRACTIONS;
use crate::entity::{EntityId, EntityKind, EntityTable};
use crate::event_bus::{EventBus, SimEvent};
use crate::hex::ring;
use crate::placement::footprint_tiles;
use crate::tile_grid::{GroundType, TileGrid};

/// Ordered construction phases (§3). `Poles` has zero duration and is never
/// actually observed: a newly placed building's state starts directly in
/// `TerrainLeveling` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    Poles,
    TerrainLeveling,
    ConstructionRising,
    CompletedRising,
    Completed,
}

impl Phase {
    /// Cumulative elapsed-fraction boundary at which this phase ends, or
    /// `None` for `Completed` (terminal).
    fn cumulative_end(self) -> Option<f32> {
        match self {
            Phase::Poles => Some(0.0),
            Phase::TerrainLeveling => Some(PHASE_DURATION_FRACTIONS[0]),
            Phase::ConstructionRising => {
                Some(PHASE_DURATION_FRACTIONS[0] + PHASE_DURATION_FRACTIONS[1])
            }
            Phase::CompletedRising => Some(1.0),
            Phase::Completed => None,
        }
    }

    fn start(self) -> f32 {
        match self {
            Phase::Poles => 0.0,
            Phase::TerrainLeveling => 0.0,
            Phase::ConstructionRising => PHASE_DURATION_FRACTIONS[0],
            Phase::CompletedRising => PHASE_DURATION_FRACTIONS[0] + PHASE_DURATION_FRACTIONS[1],
            Phase::Completed => 1.0,
        }
    }

    fn duration(self) -> f32 {
        match self {
            Phase::Poles => PHASE_DURATION_FRACTIONS[0].max(f32::EPSILON),
            Phase::TerrainLeveling => PHASE_DURATION_FRACTIONS[0],
            Phase::ConstructionRising => PHASE_DURATION_FRACTIONS[1],
            Phase::CompletedRising => PHASE_DURATION_FRACTIONS[2],
            Phase::Completed => 1.0,
        }
    }

    /// Determines the phase for a given elapsed fraction, per §4.9 step 2.
    fn from_elapsed_fraction(ef: f32) -> Phase {
        if ef >= 1.0 {
            Phase::Completed
        } else if ef < Phase::TerrainLeveling.cumulative_end().unwrap() {
            Phase::TerrainLeveling
        } else if ef < Phase::ConstructionRising.cumulative_end().unwrap() {
            Phase::ConstructionRising
        } else {
            Phase::CompletedRising
        }
    }
}

/// A single captured terrain tile (§4.9 step 4).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct CapturedTile {
    pub x: i32,
    pub y: i32,
    pub is_footprint: bool,
    pub original_ground_type: u8,
    pub original_height: u8,
}

/// Per-building construction side state (§3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BuildingConstruction {
    pub building_type: BuildingType,
    pub phase: Phase,
    pub phase_progress: f32,
    pub total_duration: f32,
    pub elapsed_time: f32,
    pub anchor_x: i32,
    pub anchor_y: i32,
    pub captured_terrain: Option<Vec<CapturedTile>>,
    pub terrain_modified: bool,
    /// Mean original height across captured tiles, computed once on capture
    /// and reused every tick while leveling (§4.9 step 4).
    target_height: u8,
}

impl BuildingConstruction {
    pub fn new(building_type: BuildingType, total_duration: f32, anchor_x: i32, anchor_y: i32) -> Self {
        Self {
            building_type,
            phase: Phase::TerrainLeveling,
            phase_progress: 0.0,
            total_duration,
            elapsed_time: 0.0,
            anchor_x,
            anchor_y,
            captured_terrain: None,
            terrain_modified: false,
            target_height: 0,
        }
    }

    /// Reconstructs state from a save (§6). `captured_terrain` is not
    /// persisted, so a building restored mid-`TerrainLeveling` that is later
    /// removed will not have its original terrain to restore — an accepted
    /// gap, recorded in `DESIGN.md`.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        building_type: BuildingType,
        phase: Phase,
        phase_progress: f32,
        total_duration: f32,
        elapsed_time: f32,
        anchor_x: i32,
        anchor_y: i32,
        terrain_modified: bool,
    ) -> Self {
        Self {
            building_type,
            phase,
            phase_progress,
            total_duration,
            elapsed_time,
            anchor_x,
            anchor_y,
            captured_terrain: None,
            terrain_modified,
            target_height: 0,
        }
    }
}

/// Pure visual-state projection for the renderer (§4.9 "Visual state query").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructionVisualState {
    pub use_construction_sprite: bool,
    pub vertical_progress: f32,
    pub is_completed: bool,
}

pub fn visual_state(bc: &BuildingConstruction) -> ConstructionVisualState {
    match bc.phase {
        Phase::Poles | Phase::TerrainLeveling => ConstructionVisualState {
            use_construction_sprite: true,
            vertical_progress: 0.0,
            is_completed: false,
        },
        Phase::ConstructionRising => ConstructionVisualState {
            use_construction_sprite: true,
            vertical_progress: bc.phase_progress,
            is_completed: false,
        },
        Phase::CompletedRising => ConstructionVisualState {
            use_construction_sprite: false,
            vertical_progress: bc.phase_progress,
            is_completed: false,
        },
        Phase::Completed => ConstructionVisualState {
            use_construction_sprite: false,
            vertical_progress: 1.0,
            is_completed: true,
        },
    }
}

#[derive(Resource, Default)]
pub struct ConstructionManager {
    states: HashMap<EntityId, BuildingConstruction>,
}

impl ConstructionManager {
    pub fn insert(&mut self, building: EntityId, state: BuildingConstruction) {
        self.states.insert(building, state);
    }

    pub fn remove(&mut self, building: EntityId) -> Option<BuildingConstruction> {
        self.states.remove(&building)
    }

    pub fn get(&self, building: EntityId) -> Option<&BuildingConstruction> {
        self.states.get(&building)
    }

    pub fn iter_ascending(&self) -> Vec<(EntityId, &BuildingConstruction)> {
        let mut ids: Vec<EntityId> = self.states.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| (id, self.states.get(&id).unwrap())).collect()
    }
}

/// Captures the footprint and its cardinal neighbors at the moment
/// `TerrainLeveling` begins (§4.9 step 4).
fn capture_terrain(grid: &TileGrid, footprint: &[(i32, i32)]) -> (Vec<CapturedTile>, u8) {
    const CARDINAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    let mut seen = std::collections::HashSet::new();
    let mut captured = Vec::new();

    for &(x, y) in footprint {
        seen.insert((x, y));
    }
    for &(x, y) in footprint {
        if let (Some(gt), Some(h)) = (grid.ground_type_at(x, y), grid.ground_height_at(x, y)) {
            captured.push(CapturedTile {
                x,
                y,
                is_footprint: true,
                original_ground_type: gt as u8,
                original_height: h,
            });
        }
    }
    for &(x, y) in footprint {
        for (dx, dy) in CARDINAL {
            let (nx, ny) = (x + dx, y + dy);
            if seen.contains(&(nx, ny)) {
                continue;
            }
            if let (Some(gt), Some(h)) = (grid.ground_type_at(nx, ny), grid.ground_height_at(nx, ny)) {
                seen.insert((nx, ny));
                captured.push(CapturedTile {
                    x: nx,
                    y: ny,
                    is_footprint: false,
                    original_ground_type: gt as u8,
                    original_height: h,
                });
            }
        }
    }

    let target_height = if captured.is_empty() {
        0
    } else {
        let sum: u32 = captured.iter().map(|c| c.original_height as u32).sum();
        ((sum as f64 / captured.len() as f64).round()) as u8
    };

    (captured, target_height)
}

fn apply_leveling(grid: &mut TileGrid, captured: &[CapturedTile], target_height: u8, fraction: f32) {
    for tile in captured {
        let lerped = tile.original_height as f32
            + (target_height as f32 - tile.original_height as f32) * fraction.clamp(0.0, 1.0);
        grid.set_height(tile.x, tile.y, lerped.round() as u8);
        if tile.is_footprint && fraction > 0.0 {
            grid.set_ground_type(tile.x, tile.y, GroundType::ConstructionSite);
        }
    }
}

/// Finds valid spawn tiles for `count` units around `(anchor_x, anchor_y)`,
/// scanning ring perimeters of radius 1..=4 in order (§4.9 step 7,
/// GLOSSARY "Ring"). A tile is valid if in bounds, passable, and unoccupied.
fn find_spawn_tiles(
    grid: &TileGrid,
    entities: &EntityTable,
    anchor_x: i32,
    anchor_y: i32,
    count: usize,
) -> Vec<(i32, i32)> {
    use crate::config::UNIT_SPAWN_RING_RADII;
    let mut found = Vec::new();
    for r in UNIT_SPAWN_RING_RADII {
        for (x, y) in ring(anchor_x, anchor_y, r) {
            if found.len() >= count {
                return found;
            }
            if !grid.in_bounds(x, y) || !grid.is_passable_at(x, y) {
                continue;
            }
            if entities.get_at(x, y).is_some() {
                continue;
            }
            found.push((x, y));
        }
    }
    found
}

/// Advances every non-completed building's construction state by `dt`
/// seconds (§4.9). Returns the set of newly-completed buildings paired with
/// the units spawned for each, so the command/tick layer can wire cascading
/// effects (inventory creation happens at placement time, not here).
pub fn construction_system(
    dt: f32,
    grid: &mut TileGrid,
    entities: &mut EntityTable,
    construction: &mut ConstructionManager,
    catalog: &BuildingCatalog,
    carriers: &mut CarrierManager,
    bus: &mut EventBus,
) -> Vec<(EntityId, Vec<EntityId>)> {
    let mut completions = Vec::new();
    let mut any_mutated = false;

    let ids: Vec<EntityId> = {
        let mut ids: Vec<EntityId> = construction
            .states
            .iter()
            .filter(|(_, s)| s.phase != Phase::Completed)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    };

    for id in ids {
        let def = {
            let state = construction.states.get(&id).unwrap();
            catalog.get(state.building_type).clone()
        };

        let state = construction.states.get_mut(&id).unwrap();
        state.elapsed_time += dt;
        let elapsed_fraction = (state.elapsed_time / state.total_duration).min(1.0);
        let previous_phase = state.phase;
        let new_phase = Phase::from_elapsed_fraction(elapsed_fraction);

        state.phase_progress = if new_phase == Phase::Completed {
            1.0
        } else {
            ((elapsed_fraction - new_phase.start()) / new_phase.duration()).clamp(0.0, 1.0)
        };

        // Step 4: capture terrain on first tick inside TerrainLeveling.
        if new_phase == Phase::TerrainLeveling && state.captured_terrain.is_none() {
            let footprint = footprint_tiles(&def, state.anchor_x, state.anchor_y);
            let (captured, target_height) = capture_terrain(grid, &footprint);
            state.captured_terrain = Some(captured);
            state.target_height = target_height;
        }

        // Step 5: during TerrainLeveling, interpolate toward target height.
        if new_phase == Phase::TerrainLeveling {
            if let Some(captured) = state.captured_terrain.clone() {
                apply_leveling(grid, &captured, state.target_height, state.phase_progress);
                any_mutated = true;
            }
        }

        // Step 6: on transition out of TerrainLeveling, finalize at fraction 1.0.
        if previous_phase == Phase::TerrainLeveling && new_phase > Phase::TerrainLeveling && !state.terrain_modified {
            if let Some(captured) = state.captured_terrain.clone() {
                apply_leveling(grid, &captured, state.target_height, 1.0);
                any_mutated = true;
            }
            state.terrain_modified = true;
        }

        state.phase = new_phase;

        // Step 7: on entering Completed, emit events and spawn units.
        if previous_phase != Phase::Completed && new_phase == Phase::Completed {
            bus.emit(SimEvent::BuildingCompleted { building: id });
            let mut spawned = Vec::new();
            let anchor = (state.anchor_x, state.anchor_y);
            for spawn in &def.spawns {
                let tiles = find_spawn_tiles(grid, entities, anchor.0, anchor.1, spawn.count as usize);
                for (x, y) in tiles {
                    let building_player = entities.get(id).map(|e| e.player).unwrap_or(0);
                    if let Ok(unit_id) =
                        entities.add(grid, EntityKind::Unit, spawn.unit_sub_type, x, y, building_player)
                    {
                        // A Hub-spawned Carrier registers with the hub that
                        // spawned it, same as a player-issued spawn_unit
                        // command registers with the nearest hub (§4.7).
                        if spawn.unit_sub_type == UnitType::Carrier as u32 {
                            let carrier_id = carriers.create(unit_id, id);
                            bus.emit(SimEvent::CarrierCreated { carrier: carrier_id });
                        }
                        bus.emit(SimEvent::UnitSpawned {
                            unit: unit_id,
                            spawned_by: id,
                        });
                        spawned.push(unit_id);
                    }
                }
            }
            completions.push((id, spawned));
        }
    }

    if any_mutated {
        grid.flush_terrain_modified();
    }

    completions
}

/// Restores captured terrain for a removed building (§4.9 "On
/// building:removed"). No-op if construction never reached `TerrainLeveling`
/// (impossible in practice since a building starts there) or if it finished
/// (`Completed`): finalized terrain is kept, an explicit implementer choice
/// recorded in `DESIGN.md` (§9 Open Questions).
pub fn restore_terrain_on_removal(grid: &mut TileGrid, state: &BuildingConstruction) {
    if state.phase == Phase::Completed {
        return;
    }
    if let Some(captured) = &state.captured_terrain {
        for tile in captured {
            grid.set_tile(
                tile.x,
                tile.y,
                GroundType::from_raw(tile.original_ground_type),
                tile.original_height,
            );
        }
        grid.flush_terrain_modified();
    }
}
