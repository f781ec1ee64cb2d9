use sim_core::bootstrap::{build_game, GameOptions};
use sim_core::building_catalog::{BuildingType, MaterialType};
use sim_core::command::Command;
use sim_core::construction::Phase;
use sim_core::entity::EntityKind;
use sim_core::request::{Priority, RequestStatus};
use sim_core::tile_grid::{GroundType, TileGrid};
use sim_core::Game;

fn flat_game(width: u32, height: u32) -> Game {
    let grid = TileGrid::flat(width, height, GroundType::Grass, 0);
    build_game(grid, GameOptions::default())
}

fn run_ticks(game: &mut Game, count: u32) -> f64 {
    let dt = game.config.max_step_secs;
    let mut now = 0.0f64;
    for _ in 0..count {
        now += dt as f64;
        game.tick(dt, now);
    }
    now
}

/// Occupancy consistency holds after placement, movement, and removal.
#[test]
fn occupancy_invariant_holds_across_a_full_lifecycle() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];
    assert!(game.entities.check_occupancy_invariant().is_none());

    run_ticks(&mut game, 400);
    assert!(game.entities.check_occupancy_invariant().is_none());

    game.execute(Command::RemoveEntity { entity_id: hub }, 100.0);
    assert!(game.entities.check_occupancy_invariant().is_none());
}

/// phase_progress stays in [0,1], phase is monotonic non-decreasing, and
/// terrain_modified only ever becomes true once the building is past
/// TerrainLeveling.
#[test]
fn construction_phase_is_monotonic_and_progress_bounded() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Barrack, x: 10, y: 10, player: 1 },
        0.0,
    );
    let barrack = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];

    let dt = game.config.max_step_secs;
    let mut now = 0.0;
    let mut last_phase = Phase::Poles;
    for _ in 0..400 {
        now += dt as f64;
        game.tick(dt, now);
        let Some(state) = game.construction.get(barrack) else { break };
        assert!(state.phase_progress >= 0.0 && state.phase_progress <= 1.0);
        assert!(state.phase >= last_phase, "phase regressed from {:?} to {:?}", last_phase, state.phase);
        if state.terrain_modified {
            assert!(state.phase > Phase::TerrainLeveling);
        }
        last_phase = state.phase;
        if state.phase == Phase::Completed {
            break;
        }
    }
}

/// Reserved amounts never exceed a building's actual output stock, and
/// available_amount never goes negative (saturates at 0 instead).
#[test]
fn reservations_never_exceed_output_stock() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];
    game.inventory.set_slot_amount(hub, MaterialType::Wood as u32, true, 8);

    for x in [15, 18, 21] {
        game.execute(
            Command::PlaceBuilding { building_type: BuildingType::Workshop, x, y: 5, player: 1 },
            0.0,
        );
    }
    let consumers: Vec<_> = game.entities.ids_of_kind_ascending(EntityKind::Building)[1..].to_vec();
    for consumer in &consumers {
        game.requests.add(*consumer, MaterialType::Wood as u32, 5, Priority::Normal, 0.0);
    }

    run_ticks(&mut game, 20);

    let output = game.inventory.get(hub).unwrap().output_slots[0].current_amount;
    let reserved = game.reservations.reserved_amount(hub, MaterialType::Wood as u32);
    assert!(reserved <= output);
    assert!(game.reservations.available_amount(hub, MaterialType::Wood as u32, output) >= 0);
}

/// InProgress requests always carry source_building and assigned_carrier;
/// Pending requests always have neither.
#[test]
fn in_progress_and_pending_requests_have_consistent_fields() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];
    game.inventory.set_slot_amount(hub, MaterialType::Wood as u32, true, 10);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Workshop, x: 20, y: 20, player: 1 },
        0.0,
    );
    let workshop = game.entities.ids_of_kind_ascending(EntityKind::Building)[1];
    let req = game.requests.add(workshop, MaterialType::Wood as u32, 5, Priority::Normal, 0.0);

    run_ticks(&mut game, 5);

    if let Some(request) = game.requests.get(req) {
        match request.status {
            RequestStatus::InProgress => {
                assert!(request.source_building.is_some());
                assert!(request.assigned_carrier.is_some());
            }
            RequestStatus::Pending => {
                assert!(request.source_building.is_none());
                assert!(request.assigned_carrier.is_none());
            }
            _ => {}
        }
    }
}

/// `carrier.status = Walking` implies a live `current_job`.
#[test]
fn walking_carrier_always_has_a_current_job() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];
    game.inventory.set_slot_amount(hub, MaterialType::Wood as u32, true, 10);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Workshop, x: 20, y: 20, player: 1 },
        0.0,
    );
    let workshop = game.entities.ids_of_kind_ascending(EntityKind::Building)[1];
    game.requests.add(workshop, MaterialType::Wood as u32, 5, Priority::Normal, 0.0);

    run_ticks(&mut game, 200);

    for carrier_id in game.carriers.all_ids_ascending() {
        let carrier = game.carriers.get(carrier_id).unwrap();
        if carrier.status == sim_core::carrier::CarrierStatus::Walking {
            assert!(carrier.current_job.is_some());
        }
    }
}

/// Round-trip capture/restore with no leveling step is byte-identical.
#[test]
fn round_trip_capture_restore_is_byte_identical() {
    let mut game = flat_game(30, 30);
    let before: Vec<(Option<GroundType>, Option<u8>)> = (8..=12)
        .flat_map(|x| (8..=12).map(move |y| (x, y)))
        .map(|(x, y)| (game.grid.ground_type_at(x, y), game.grid.ground_height_at(x, y)))
        .collect();

    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Barrack, x: 10, y: 10, player: 1 },
        0.0,
    );
    let barrack = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];

    game.execute(Command::RemoveEntity { entity_id: barrack }, 0.001);

    let after: Vec<(Option<GroundType>, Option<u8>)> = (8..=12)
        .flat_map(|x| (8..=12).map(move |y| (x, y)))
        .map(|(x, y)| (game.grid.ground_type_at(x, y), game.grid.ground_height_at(x, y)))
        .collect();

    assert_eq!(before, after);
}

/// Releasing a reservation twice is a no-op the second time.
#[test]
fn releasing_a_reservation_twice_is_idempotent() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];
    let req = game.requests.add(hub, MaterialType::Wood as u32, 5, Priority::Normal, 0.0);
    let reservation = game.reservations.create(hub, MaterialType::Wood as u32, 5, req, 0.0);

    game.reservations.release(reservation);
    assert_eq!(game.reservations.reserved_amount(hub, MaterialType::Wood as u32), 0);
    game.reservations.release(reservation);
    assert_eq!(game.reservations.reserved_amount(hub, MaterialType::Wood as u32), 0);
}

/// Pending request ordering is non-decreasing by (priority, timestamp).
#[test]
fn pending_queue_is_ordered_by_priority_then_timestamp() {
    let mut game = flat_game(30, 30);
    game.execute(
        Command::PlaceBuilding { building_type: BuildingType::Hub, x: 5, y: 5, player: 1 },
        0.0,
    );
    let hub = game.entities.ids_of_kind_ascending(EntityKind::Building)[0];

    game.requests.add(hub, MaterialType::Wood as u32, 1, Priority::Low, 0.0);
    game.requests.add(hub, MaterialType::Wood as u32, 1, Priority::High, 5.0);
    game.requests.add(hub, MaterialType::Wood as u32, 1, Priority::Normal, 1.0);
    game.requests.add(hub, MaterialType::Wood as u32, 1, Priority::High, 2.0);

    let pending = game.requests.get_pending();
    let ordered: Vec<(Priority, f64)> = pending
        .iter()
        .map(|id| {
            let r = game.requests.get(*id).unwrap();
            (r.priority, r.timestamp)
        })
        .collect();

    for pair in ordered.windows(2) {
        let (priority_a, ts_a) = pair[0];
        let (priority_b, ts_b) = pair[1];
        assert!(priority_a <= priority_b);
        if priority_a == priority_b {
            assert!(ts_a <= ts_b);
        }
    }
}
