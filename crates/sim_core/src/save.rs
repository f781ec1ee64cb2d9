//! Save/load (§6 "Persisted state"): a JSON snapshot sufficient to
//! reconstruct entities, terrain, building construction state, carrier
//! identity/status/fatigue/carrying, and active requests. Pending carrier
//! jobs are deliberately excluded — the dispatcher re-creates them from the
//! persisted requests on the next tick.

use serde::{Deserialize, Serialize};

use crate::building_catalog::BuildingType;
use crate::carrier::{CarrierId, CarrierManager, CarrierStatus};
use crate::construction::{BuildingConstruction, ConstructionManager, Phase};
use crate::entity::{EntityRecord, EntityTable};
use crate::error::{SimError, SimResult};
use crate::request::{RequestManager, ResourceRequest};
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConstructionSave {
    building: crate::entity::EntityId,
    building_type: BuildingType,
    phase: Phase,
    phase_progress: f32,
    total_duration: f32,
    elapsed_time: f32,
    anchor_x: i32,
    anchor_y: i32,
    terrain_modified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CarrierSave {
    id: CarrierId,
    unit: crate::entity::EntityId,
    home_hub_id: crate::entity::EntityId,
    status: CarrierStatus,
    fatigue: u8,
    carrying_material: Option<u32>,
    carrying_amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    width: u32,
    height: u32,
    ground_type: Vec<u8>,
    ground_height: Vec<u8>,
    entities: Vec<EntityRecord>,
    constructions: Vec<ConstructionSave>,
    carriers: Vec<CarrierSave>,
    requests: Vec<ResourceRequest>,
}

/// Captures a full snapshot. `BuildingConstruction`'s captured-terrain buffer
/// is intentionally dropped: finalized (`Completed`) buildings never restore
/// terrain anyway, and an interrupted leveling is idempotent to recompute
/// from the terrain on next capture should the building later be removed.
pub fn snapshot(
    grid: &TileGrid,
    entities: &EntityTable,
    construction: &ConstructionManager,
    carriers: &CarrierManager,
    requests: &RequestManager,
) -> SaveData {
    let mut entity_records: Vec<EntityRecord> = entities
        .all_ids_ascending()
        .into_iter()
        .filter_map(|id| entities.get(id).cloned())
        .collect();
    entity_records.sort_by_key(|e| e.id);

    let constructions: Vec<ConstructionSave> = construction
        .iter_ascending()
        .into_iter()
        .map(|(id, bc)| ConstructionSave {
            building: id,
            building_type: bc.building_type,
            phase: bc.phase,
            phase_progress: bc.phase_progress,
            total_duration: bc.total_duration,
            elapsed_time: bc.elapsed_time,
            anchor_x: bc.anchor_x,
            anchor_y: bc.anchor_y,
            terrain_modified: bc.terrain_modified,
        })
        .collect();

    let mut carrier_ids = carriers.all_ids_ascending();
    carrier_ids.sort_unstable();
    let carrier_saves: Vec<CarrierSave> = carrier_ids
        .into_iter()
        .filter_map(|id| {
            carriers.get(id).map(|c| CarrierSave {
                id: c.id,
                unit: c.unit,
                home_hub_id: c.home_hub_id,
                status: c.status,
                fatigue: c.fatigue,
                carrying_material: c.carrying_material,
                carrying_amount: c.carrying_amount,
            })
        })
        .collect();

    let mut request_ids: Vec<_> = requests.get_pending();
    request_ids.extend(requests.in_progress_ids());
    request_ids.sort_unstable();
    request_ids.dedup();
    let requests_saved: Vec<ResourceRequest> = request_ids
        .into_iter()
        .filter_map(|id| requests.get(id).cloned())
        .collect();

    SaveData {
        width: grid.width(),
        height: grid.height(),
        ground_type: grid.raw_ground_type().to_vec(),
        ground_height: grid.raw_ground_height().to_vec(),
        entities: entity_records,
        constructions,
        carriers: carrier_saves,
        requests: requests_saved,
    }
}

pub fn to_json(save: &SaveData) -> SimResult<String> {
    serde_json::to_string(save).map_err(|e| SimError::consistency(format!("save serialization failed: {e}")))
}

pub fn from_json(data: &str) -> SimResult<SaveData> {
    serde_json::from_str(data).map_err(|e| SimError::validation(format!("save deserialization failed: {e}")))
}

/// Restores a snapshot into freshly-constructed managers. Terrain dimensions
/// must match `grid`'s existing allocation — callers are expected to build
/// the grid from the same map before calling this (§6: there is no map data
/// in the save itself beyond the raw arrays).
pub fn restore(
    save: &SaveData,
    grid: &mut TileGrid,
    entities: &mut EntityTable,
    construction: &mut ConstructionManager,
    carriers: &mut CarrierManager,
    requests: &mut RequestManager,
) -> SimResult<()> {
    if grid.width() != save.width || grid.height() != save.height {
        return Err(SimError::validation("save grid dimensions do not match loaded map"));
    }

    for y in 0..save.height as i32 {
        for x in 0..save.width as i32 {
            let i = (y as usize) * (save.width as usize) + (x as usize);
            grid.set_tile(
                x,
                y,
                crate::tile_grid::GroundType::from_raw(save.ground_type[i]),
                save.ground_height[i],
            );
        }
    }
    grid.flush_terrain_modified();

    for record in &save.entities {
        entities.restore_entity(record.clone());
    }

    for c in &save.constructions {
        construction.insert(
            c.building,
            BuildingConstruction::restore(
                c.building_type,
                c.phase,
                c.phase_progress,
                c.total_duration,
                c.elapsed_time,
                c.anchor_x,
                c.anchor_y,
                c.terrain_modified,
            ),
        );
    }

    for c in &save.carriers {
        carriers.restore_carrier(c.id, c.unit, c.home_hub_id, c.status, c.fatigue, c.carrying_material, c.carrying_amount);
    }

    for req in &save.requests {
        requests.restore_request(req.clone());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building_catalog::{BuildingCatalog, BuildingType};
    use crate::entity::EntityKind;
    use crate::request::Priority;
    use crate::tile_grid::GroundType;

    #[test]
    fn snapshot_round_trips_entities_and_requests() {
        let mut grid = TileGrid::flat(10, 10, GroundType::Grass, 3);
        let mut entities = EntityTable::new();
        let construction = ConstructionManager::default();
        let carriers = CarrierManager::default();
        let mut requests = RequestManager::default();

        let building = entities.add(&grid, EntityKind::Building, BuildingType::Hub.sub_type(), 2, 2, 1).unwrap();
        requests.add(building, 0, 5, Priority::Normal, 0.0);

        let save = snapshot(&grid, &entities, &construction, &carriers, &requests);
        let json = to_json(&save).unwrap();
        let restored_save = from_json(&json).unwrap();

        let mut grid2 = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let mut entities2 = EntityTable::new();
        let mut construction2 = ConstructionManager::default();
        let mut carriers2 = CarrierManager::default();
        let mut requests2 = RequestManager::default();
        restore(&restored_save, &mut grid2, &mut entities2, &mut construction2, &mut carriers2, &mut requests2).unwrap();

        assert_eq!(entities2.get(building).map(|e| (e.x, e.y)), Some((2, 2)));
        assert_eq!(grid2.ground_height_at(0, 0), Some(3));
        assert_eq!(requests2.get_pending().len(), 1);
    }

    #[test]
    fn carrier_status_round_trips_through_save() {
        let grid = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let entities = EntityTable::new();
        let construction = ConstructionManager::default();
        let mut carriers = CarrierManager::default();
        let requests = RequestManager::default();

        let id = carriers.create(crate::entity::EntityId(1), crate::entity::EntityId(2));
        let mut bus = crate::event_bus::EventBus::new();
        carriers.set_status(id, crate::carrier::CarrierStatus::Resting, &mut bus);
        carriers.add_fatigue(id, 70);

        let save = snapshot(&grid, &entities, &construction, &carriers, &requests);
        let json = to_json(&save).unwrap();
        let restored_save = from_json(&json).unwrap();

        let mut grid2 = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let mut entities2 = EntityTable::new();
        let mut construction2 = ConstructionManager::default();
        let mut carriers2 = CarrierManager::default();
        let mut requests2 = RequestManager::default();
        restore(&restored_save, &mut grid2, &mut entities2, &mut construction2, &mut carriers2, &mut requests2).unwrap();

        let restored = carriers2.get(id).unwrap();
        assert_eq!(restored.status, crate::carrier::CarrierStatus::Resting);
        assert_eq!(restored.fatigue, 70);
    }

    #[test]
    fn restore_rejects_mismatched_dimensions() {
        let grid = TileGrid::flat(10, 10, GroundType::Grass, 0);
        let entities = EntityTable::new();
        let construction = ConstructionManager::default();
        let carriers = CarrierManager::default();
        let requests = RequestManager::default();
        let save = snapshot(&grid, &entities, &construction, &carriers, &requests);

        let mut other_grid = TileGrid::flat(5, 5, GroundType::Grass, 0);
        let mut e2 = EntityTable::new();
        let mut c2 = ConstructionManager::default();
        let mut car2 = CarrierManager::default();
        let mut r2 = RequestManager::default();
        assert!(restore(&save, &mut other_grid, &mut e2, &mut c2, &mut car2, &mut r2).is_err());
    }

    #[test]
    fn catalog_types_used_in_save_remain_valid() {
        // Guards against BuildingType drifting out of sync with the catalog.
        let catalog = BuildingCatalog::standard();
        for bt in BuildingType::ALL {
            assert!(catalog.get(bt).validate());
        }
    }
}
