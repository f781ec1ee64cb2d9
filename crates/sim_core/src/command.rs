//! Command pipeline (§4.7): the sole authorized mutator of world state. Every
//! precondition is validated before any mutation; on success the executor
//! mutates state, emits the corresponding bus event(s), and returns effects
//! describing what changed for logging/replay/undo (§6).

use crate::building_catalog::{BuildingCatalog, BuildingType};
use crate::carrier::CarrierManager;
use crate::construction::{restore_terrain_on_removal, BuildingConstruction, ConstructionManager};
use crate::dispatcher::{self, DispatcherState};
use crate::entity::{EntityId, EntityKind, EntityTable};
use crate::event_bus::{EventBus, SimEvent};
use crate::inventory::InventoryManager;
use crate::movement::MovementManager;
use crate::path::PathService;
use crate::placement::validate_building_placement;
use crate::request::RequestManager;
use crate::reservation::ReservationManager;
use crate::selection::Selection;
use crate::service_area::ServiceAreaIndex;
use crate::territory::{BuildingOwner, TerritoryMap};
use crate::tile_grid::TileGrid;

/// The closed command schema (§6).
#[derive(Debug, Clone)]
pub enum Command {
    PlaceBuilding { building_type: BuildingType, x: i32, y: i32, player: u32 },
    PlaceResource { material_type: u32, amount: u32, x: i32, y: i32 },
    SpawnUnit { unit_sub_type: u32, x: i32, y: i32, player: u32 },
    MoveUnit { entity_id: EntityId, target_x: i32, target_y: i32 },
    MoveSelectedUnits { target_x: i32, target_y: i32 },
    Select { entity_id: Option<EntityId> },
    SelectAtTile { x: i32, y: i32, add: bool },
    ToggleSelection { entity_id: EntityId },
    SelectArea { x1: i32, y1: i32, x2: i32, y2: i32 },
    RemoveEntity { entity_id: EntityId },
}

/// A side effect of a successfully executed command, for logging/replay/undo.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    EntityCreated { entity: EntityId },
    EntityRemoved { entity: EntityId },
    EntityMoved { entity: EntityId, target_x: i32, target_y: i32 },
    SelectionChanged { selected: Vec<EntityId> },
    BuildingPlaced { building: EntityId },
    UnitSpawned { unit: EntityId },
}

#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub success: bool,
    pub error: Option<String>,
    pub effects: Vec<Effect>,
}

impl CommandResult {
    fn ok(effects: Vec<Effect>) -> Self {
        Self {
            success: true,
            error: None,
            effects,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            effects: Vec::new(),
        }
    }
}

/// Every resource the executor needs mutable access to, gathered so call
/// sites don't pass a dozen positional arguments (mirrors [`crate::dispatcher::dispatcher_system`]).
pub struct CommandContext<'a> {
    pub grid: &'a mut TileGrid,
    pub entities: &'a mut EntityTable,
    pub construction: &'a mut ConstructionManager,
    pub catalog: &'a BuildingCatalog,
    pub territory: &'a mut TerritoryMap,
    pub inventory: &'a mut InventoryManager,
    pub movement: &'a mut MovementManager,
    pub paths: &'a mut PathService,
    pub carriers: &'a mut CarrierManager,
    pub requests: &'a mut RequestManager,
    pub reservations: &'a mut ReservationManager,
    pub service_areas: &'a mut ServiceAreaIndex,
    pub selection: &'a mut Selection,
    pub dispatcher_state: &'a mut DispatcherState,
    pub bus: &'a mut EventBus,
}

fn rebuild_territory(entities: &EntityTable, territory: &mut TerritoryMap) {
    let owners: Vec<BuildingOwner> = entities
        .ids_of_kind_ascending(EntityKind::Building)
        .into_iter()
        .filter_map(|id| entities.get(id))
        .map(|e| BuildingOwner {
            x: e.x,
            y: e.y,
            owner: e.player,
        })
        .collect();
    territory.rebuild(&owners);
}

/// Executes `cmd` against `ctx`, returning the outcome (§4.7). `now` is the
/// wall-clock-equivalent simulation time, used for request/reservation
/// timestamps.
pub fn execute(cmd: Command, ctx: &mut CommandContext, now: f64) -> CommandResult {
    let result = match cmd {
        Command::PlaceBuilding { building_type, x, y, player } => place_building(ctx, building_type, x, y, player),
        Command::PlaceResource { material_type, amount, x, y } => place_resource(ctx, material_type, amount, x, y),
        Command::SpawnUnit { unit_sub_type, x, y, player } => spawn_unit(ctx, unit_sub_type, x, y, player),
        Command::MoveUnit { entity_id, target_x, target_y } => move_unit(ctx, entity_id, target_x, target_y),
        Command::MoveSelectedUnits { target_x, target_y } => move_selected_units(ctx, target_x, target_y),
        Command::Select { entity_id } => select(ctx, entity_id),
        Command::SelectAtTile { x, y, add } => select_at_tile(ctx, x, y, add),
        Command::ToggleSelection { entity_id } => toggle_selection(ctx, entity_id),
        Command::SelectArea { x1, y1, x2, y2 } => select_area(ctx, x1, y1, x2, y2),
        Command::RemoveEntity { entity_id } => remove_entity(ctx, entity_id, now),
    };
    tracing::debug!(success = result.success, error = ?result.error, "command executed");
    result
}

fn place_building(ctx: &mut CommandContext, building_type: BuildingType, x: i32, y: i32, player: u32) -> CommandResult {
    let def = ctx.catalog.get(building_type);
    let player_has_any_building = ctx
        .entities
        .ids_of_kind_ascending(EntityKind::Building)
        .into_iter()
        .filter_map(|id| ctx.entities.get(id))
        .any(|e| e.player == player);

    if let Err(e) = validate_building_placement(ctx.grid, ctx.entities, ctx.territory, def, x, y, player, player_has_any_building) {
        return CommandResult::fail(e.to_string());
    }

    let Ok(building_id) = ctx.entities.add(ctx.grid, EntityKind::Building, building_type.sub_type(), x, y, player) else {
        return CommandResult::fail("tile occupied");
    };

    ctx.inventory.create(building_id, def);
    ctx.construction
        .insert(building_id, BuildingConstruction::new(building_type, def.total_duration, x, y));
    if def.is_hub {
        ctx.service_areas.register(building_id, x, y, player);
    }
    rebuild_territory(ctx.entities, ctx.territory);
    ctx.bus.emit(SimEvent::BuildingPlaced { building: building_id });

    CommandResult::ok(vec![
        Effect::EntityCreated { entity: building_id },
        Effect::BuildingPlaced { building: building_id },
    ])
}

/// Places a `StackedResource` entity at `(x, y)`. `amount` has no side-state
/// slot in the data model (§3 defines side state only for buildings, movers,
/// and carriers) — it is accepted for schema compatibility but not tracked
/// past entity creation, since resource harvesting is out of scope (§1 Non-goals).
fn place_resource(ctx: &mut CommandContext, material_type: u32, _amount: u32, x: i32, y: i32) -> CommandResult {
    if !ctx.grid.in_bounds(x, y) {
        return CommandResult::fail("tile out of bounds");
    }
    match ctx.entities.add(ctx.grid, EntityKind::StackedResource, material_type, x, y, 0) {
        Ok(id) => CommandResult::ok(vec![Effect::EntityCreated { entity: id }]),
        Err(_) => CommandResult::fail("tile occupied"),
    }
}

fn spawn_unit(ctx: &mut CommandContext, unit_sub_type: u32, x: i32, y: i32, player: u32) -> CommandResult {
    if !ctx.grid.in_bounds(x, y) {
        return CommandResult::fail("tile out of bounds");
    }
    let Ok(unit_id) = ctx.entities.add(ctx.grid, EntityKind::Unit, unit_sub_type, x, y, player) else {
        return CommandResult::fail("tile occupied");
    };
    ctx.movement.ensure(unit_id, 4.0);

    let effects = vec![Effect::EntityCreated { entity: unit_id }, Effect::UnitSpawned { unit: unit_id }];

    // §4.7: a spawned Carrier auto-registers with the nearest same-player hub.
    if let Some(home_hub) = ctx.service_areas.nearest_hub(x, y, player) {
        if crate::building_catalog::UnitType::Carrier as u32 == unit_sub_type {
            let carrier_id = ctx.carriers.create(unit_id, home_hub);
            ctx.bus.emit(SimEvent::CarrierCreated { carrier: carrier_id });
        }
    }

    ctx.bus.emit(SimEvent::UnitSpawned { unit: unit_id, spawned_by: unit_id });
    CommandResult::ok(effects)
}

fn move_unit(ctx: &mut CommandContext, entity_id: EntityId, target_x: i32, target_y: i32) -> CommandResult {
    let Some(record) = ctx.entities.get(entity_id) else {
        return CommandResult::fail("unknown entity id");
    };
    if record.kind != EntityKind::Unit {
        return CommandResult::fail("entity is not a unit");
    }
    ctx.movement.ensure(entity_id, 4.0);
    if !ctx.movement.move_to(entity_id, (target_x, target_y), ctx.grid, ctx.entities, ctx.paths) {
        return CommandResult::fail("no path to target");
    }
    CommandResult::ok(vec![Effect::EntityMoved { entity: entity_id, target_x, target_y }])
}

fn move_selected_units(ctx: &mut CommandContext, target_x: i32, target_y: i32) -> CommandResult {
    let ids: Vec<EntityId> = ctx.selection.ids().to_vec();
    let mut effects = Vec::new();
    for id in ids {
        if ctx.entities.get(id).map(|e| e.kind) != Some(EntityKind::Unit) {
            continue;
        }
        ctx.movement.ensure(id, 4.0);
        if ctx.movement.move_to(id, (target_x, target_y), ctx.grid, ctx.entities, ctx.paths) {
            effects.push(Effect::EntityMoved { entity: id, target_x, target_y });
        }
    }
    CommandResult::ok(effects)
}

fn select(ctx: &mut CommandContext, entity_id: Option<EntityId>) -> CommandResult {
    match entity_id {
        Some(id) if !ctx.entities.contains(id) => return CommandResult::fail("unknown entity id"),
        Some(id) => ctx.selection.set(vec![id]),
        None => ctx.selection.clear(),
    }
    CommandResult::ok(vec![Effect::SelectionChanged { selected: ctx.selection.ids().to_vec() }])
}

fn select_at_tile(ctx: &mut CommandContext, x: i32, y: i32, add: bool) -> CommandResult {
    let Some(id) = ctx.entities.get_at(x, y) else {
        if !add {
            ctx.selection.clear();
        }
        return CommandResult::ok(vec![Effect::SelectionChanged { selected: ctx.selection.ids().to_vec() }]);
    };
    if add {
        ctx.selection.add(id);
    } else {
        ctx.selection.set(vec![id]);
    }
    CommandResult::ok(vec![Effect::SelectionChanged { selected: ctx.selection.ids().to_vec() }])
}

fn toggle_selection(ctx: &mut CommandContext, entity_id: EntityId) -> CommandResult {
    if !ctx.entities.contains(entity_id) {
        return CommandResult::fail("unknown entity id");
    }
    ctx.selection.toggle(entity_id);
    CommandResult::ok(vec![Effect::SelectionChanged { selected: ctx.selection.ids().to_vec() }])
}

fn select_area(ctx: &mut CommandContext, x1: i32, y1: i32, x2: i32, y2: i32) -> CommandResult {
    let (min_x, max_x) = (x1.min(x2), x1.max(x2));
    let (min_y, max_y) = (y1.min(y2), y1.max(y2));
    let ids: Vec<EntityId> = ctx
        .entities
        .all_ids_ascending()
        .into_iter()
        .filter(|id| {
            ctx.entities
                .get(*id)
                .map(|e| e.x >= min_x && e.x <= max_x && e.y >= min_y && e.y <= max_y)
                .unwrap_or(false)
        })
        .collect();
    ctx.selection.set(ids);
    CommandResult::ok(vec![Effect::SelectionChanged { selected: ctx.selection.ids().to_vec() }])
}

fn remove_entity(ctx: &mut CommandContext, entity_id: EntityId, now: f64) -> CommandResult {
    let Some(record) = ctx.entities.get(entity_id).cloned() else {
        return CommandResult::fail("unknown entity id");
    };

    match record.kind {
        EntityKind::Building => {
            if let Some(state) = ctx.construction.remove(entity_id) {
                restore_terrain_on_removal(ctx.grid, &state);
                ctx.paths.invalidate_all();
            }
            ctx.inventory.remove(entity_id);
            ctx.service_areas.remove(entity_id);
            dispatcher::handle_building_destroyed(entity_id, ctx.dispatcher_state, ctx.requests, ctx.reservations, ctx.bus);
            ctx.entities.remove(entity_id);
            rebuild_territory(ctx.entities, ctx.territory);
            ctx.bus.emit(SimEvent::BuildingRemoved { building: entity_id });
        }
        EntityKind::Unit => {
            ctx.movement.remove(entity_id);
            if let Some(carrier_id) = ctx.carriers.by_unit(entity_id) {
                ctx.carriers.remove(carrier_id);
                dispatcher::handle_carrier_removed(carrier_id, ctx.dispatcher_state, ctx.requests, ctx.reservations, ctx.bus);
            }
            ctx.entities.remove(entity_id);
        }
        EntityKind::StackedResource | EntityKind::MapObject => {
            // Released rather than cascaded further (§9 Open Questions): no
            // owning manager indexes these by id.
            ctx.entities.remove(entity_id);
        }
    }

    ctx.selection.remove(entity_id);
    CommandResult::ok(vec![Effect::EntityRemoved { entity: entity_id }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_grid::GroundType;

    fn context<'a>(
        grid: &'a mut TileGrid,
        entities: &'a mut EntityTable,
        construction: &'a mut ConstructionManager,
        catalog: &'a BuildingCatalog,
        territory: &'a mut TerritoryMap,
        inventory: &'a mut InventoryManager,
        movement: &'a mut MovementManager,
        paths: &'a mut PathService,
        carriers: &'a mut CarrierManager,
        requests: &'a mut RequestManager,
        reservations: &'a mut ReservationManager,
        service_areas: &'a mut ServiceAreaIndex,
        selection: &'a mut Selection,
        dispatcher_state: &'a mut DispatcherState,
        bus: &'a mut EventBus,
    ) -> CommandContext<'a> {
        CommandContext {
            grid,
            entities,
            construction,
            catalog,
            territory,
            inventory,
            movement,
            paths,
            carriers,
            requests,
            reservations,
            service_areas,
            selection,
            dispatcher_state,
            bus,
        }
    }

    #[test]
    fn place_building_on_water_fails_with_no_mutation() {
        let mut grid = TileGrid::flat(20, 20, GroundType::Grass, 0);
        grid.set_tile(10, 10, GroundType::Water, 0);
        let mut entities = EntityTable::new();
        let mut construction = ConstructionManager::default();
        let catalog = BuildingCatalog::standard();
        let mut territory = TerritoryMap::new(20, 20);
        let mut inventory = InventoryManager::default();
        let mut movement = MovementManager::default();
        let mut paths = PathService::new(16);
        let mut carriers = CarrierManager::default();
        let mut requests = RequestManager::default();
        let mut reservations = ReservationManager::default();
        let mut service_areas = ServiceAreaIndex::default();
        let mut selection = Selection::default();
        let mut dispatcher_state = DispatcherState::default();
        let mut bus = EventBus::new();

        let version_before = territory.version();
        let mut ctx = context(
            &mut grid, &mut entities, &mut construction, &catalog, &mut territory, &mut inventory, &mut movement, &mut paths,
            &mut carriers, &mut requests, &mut reservations, &mut service_areas, &mut selection, &mut dispatcher_state, &mut bus,
        );
        let result = execute(
            Command::PlaceBuilding { building_type: BuildingType::Barrack, x: 10, y: 10, player: 1 },
            &mut ctx,
            0.0,
        );
        assert!(!result.success);
        assert!(entities.is_empty());
        assert_eq!(territory.version(), version_before);
    }

    #[test]
    fn remove_building_cascades_and_restores_terrain() {
        let mut grid = TileGrid::flat(20, 20, GroundType::Grass, 5);
        let mut entities = EntityTable::new();
        let mut construction = ConstructionManager::default();
        let catalog = BuildingCatalog::standard();
        let mut territory = TerritoryMap::new(20, 20);
        let mut inventory = InventoryManager::default();
        let mut movement = MovementManager::default();
        let mut paths = PathService::new(16);
        let mut carriers = CarrierManager::default();
        let mut requests = RequestManager::default();
        let mut reservations = ReservationManager::default();
        let mut service_areas = ServiceAreaIndex::default();
        let mut selection = Selection::default();
        let mut dispatcher_state = DispatcherState::default();
        let mut bus = EventBus::new();

        let building_id;
        {
            let mut ctx = context(
                &mut grid, &mut entities, &mut construction, &catalog, &mut territory, &mut inventory, &mut movement, &mut paths,
                &mut carriers, &mut requests, &mut reservations, &mut service_areas, &mut selection, &mut dispatcher_state, &mut bus,
            );
            let result = execute(
                Command::PlaceBuilding { building_type: BuildingType::Barrack, x: 5, y: 5, player: 1 },
                &mut ctx,
                0.0,
            );
            assert!(result.success);
            building_id = match result.effects[0] {
                Effect::EntityCreated { entity } => entity,
                _ => panic!("expected EntityCreated effect"),
            };
        }

        requests.add(building_id, 0, 1, crate::request::Priority::Normal, 0.0);
        {
            let mut ctx = context(
                &mut grid, &mut entities, &mut construction, &catalog, &mut territory, &mut inventory, &mut movement, &mut paths,
                &mut carriers, &mut requests, &mut reservations, &mut service_areas, &mut selection, &mut dispatcher_state, &mut bus,
            );
            let result = execute(Command::RemoveEntity { entity_id: building_id }, &mut ctx, 1.0);
            assert!(result.success);
        }

        assert!(entities.get(building_id).is_none());
        assert!(requests.get_pending().is_empty());
    }
}
