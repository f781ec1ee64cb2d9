use anyhow::Result;
use clap::{Parser, Subcommand};
use sim_core::building_catalog::{BuildingType, MaterialType};
use sim_core::command::Command;
use sim_core::prelude::*;
use sim_core::request::Priority;
use std::io::{self, Write};

#[derive(Subcommand, Debug, Clone)]
enum Demo {
    /// Interactive menu
    Menu,
    /// Place a hub and a workshop, raise a resource request, and watch a
    /// carrier fulfil it while construction completes
    Run,
    /// A* pathfinding demo over the demo map
    Path,
    /// Save/Load snapshot round-trip demo
    SaveLoad,
}

#[derive(Parser, Debug)]
#[command(name = "sim-cli", version, about = "sim_core headless demo shell")]
struct Args {
    /// Map width
    #[arg(long, default_value_t = 40)]
    width: u32,
    /// Map height
    #[arg(long, default_value_t = 30)]
    height: u32,
    /// Simulated ticks to run (where applicable)
    #[arg(long, default_value_t = 200)]
    steps: u32,
    /// Seconds of simulated time advanced per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Choose a demo to run. If omitted or set to `menu`, an interactive picker is shown.
    #[command(subcommand)]
    demo: Option<Demo>,
}

fn print_ascii_map(game: &Game) {
    for y in 0..game.grid.height() as i32 {
        let mut line = String::with_capacity(game.grid.width() as usize);
        for x in 0..game.grid.width() as i32 {
            let ch = if let Some(id) = game.entities.get_at(x, y) {
                match game.entities.get(id).map(|e| e.kind) {
                    Some(sim_core::entity::EntityKind::Building) => 'B',
                    Some(sim_core::entity::EntityKind::Unit) => 'u',
                    _ => '?',
                }
            } else {
                match game.grid.ground_type_at(x, y) {
                    Some(GroundType::Water) => '~',
                    Some(GroundType::Lava) => '^',
                    Some(GroundType::Grass) => '.',
                    Some(GroundType::Dirt) => ',',
                    Some(GroundType::Sand) => ':',
                    Some(GroundType::Rock) | Some(GroundType::ConstructionSite) | None => '#',
                }
            };
            line.push(ch);
        }
        println!("{}", line);
    }
}

fn run_demo_run(args: &Args) -> Result<()> {
    let mut game = build_demo_game(
        args.width,
        args.height,
        GameOptions {
            populate_demo_scene: true,
            ..Default::default()
        },
    );
    println!("Initial map:");
    print_ascii_map(&game);

    let hub = game
        .entities
        .ids_of_kind_ascending(sim_core::entity::EntityKind::Building)
        .first()
        .copied()
        .expect("demo scene places a hub");
    game.inventory.set_slot_amount(hub, MaterialType::Wood as u32, true, 40);

    let workshop_result = game.execute(
        Command::PlaceBuilding {
            building_type: BuildingType::Workshop,
            x: 12,
            y: 12,
            player: 1,
        },
        0.0,
    );
    if !workshop_result.success {
        println!("workshop placement failed: {:?}", workshop_result.error);
        return Ok(());
    }
    let workshop = game
        .entities
        .ids_of_kind_ascending(sim_core::entity::EntityKind::Building)
        .into_iter()
        .find(|&id| id != hub)
        .expect("workshop was just placed");

    let request_id = game
        .requests
        .add(workshop, MaterialType::Wood as u32, 10, Priority::Normal, 0.0);
    println!("Raised request {:?}: workshop needs 10 wood", request_id);

    let mut now = 0.0f64;
    for step in 0..args.steps {
        now += args.dt as f64;
        game.tick(args.dt, now);

        if step % 20 == 0 {
            let hub_phase = game.construction.get(hub).map(|c| c.phase);
            let workshop_phase = game.construction.get(workshop).map(|c| c.phase);
            let request_status = game.requests.get(request_id).map(|r| r.status);
            println!(
                "t={now:.1}s hub={hub_phase:?} workshop={workshop_phase:?} request={request_status:?} carriers={}",
                game.carriers.all_ids_ascending().len()
            );
        }

        if game.requests.get(request_id).is_none() {
            println!("Request fulfilled at t={now:.1}s");
            break;
        }
    }

    println!("Final map:");
    print_ascii_map(&game);
    println!("Action log entries: {}", game.log.events.len());
    Ok(())
}

fn run_demo_path(args: &Args) -> Result<()> {
    let game = build_demo_game(args.width, args.height, GameOptions::default());
    let start = (1, 1);
    let goal = (args.width as i32 - 2, args.height as i32 - 2);
    match sim_core::path::astar_path(&game.grid, start, goal) {
        Some((path, cost)) => println!("Path found: length={}, cost={}", path.len(), cost),
        None => println!("No path found from {:?} to {:?}", start, goal),
    }
    Ok(())
}

fn run_demo_save_load(args: &Args) -> Result<()> {
    let mut game = build_demo_game(
        args.width,
        args.height,
        GameOptions {
            populate_demo_scene: true,
            ..Default::default()
        },
    );
    let mut now = 0.0f64;
    for _ in 0..20 {
        now += args.dt as f64;
        game.tick(args.dt, now);
    }

    let json = game.save_json()?;
    println!("Serialized save length: {} bytes", json.len());

    let mut reloaded = build_demo_game(args.width, args.height, GameOptions::default());
    reloaded.load_json(&json)?;
    println!(
        "Reloaded {}x{} map with {} entities and {} carriers",
        reloaded.grid.width(),
        reloaded.grid.height(),
        reloaded.entities.all_ids_ascending().len(),
        reloaded.carriers.all_ids_ascending().len(),
    );
    Ok(())
}

fn interactive_pick() -> Demo {
    println!("sim_core — Demo Menu");
    println!("1) Run (place buildings, fulfil a request)");
    println!("2) Pathfinding");
    println!("3) Save/Load");
    print!("Select [1-3]: ");
    let _ = io::stdout().flush();

    let mut buf = String::new();
    if io::stdin().read_line(&mut buf).is_ok() {
        match buf.trim() {
            "1" => Demo::Run,
            "2" => Demo::Path,
            "3" => Demo::SaveLoad,
            _ => Demo::Run,
        }
    } else {
        Demo::Run
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let chosen = match args.demo.clone().unwrap_or(Demo::Menu) {
        Demo::Menu => interactive_pick(),
        other => other,
    };

    match chosen {
        Demo::Run => run_demo_run(&args),
        Demo::Path => run_demo_path(&args),
        Demo::SaveLoad => run_demo_save_load(&args),
        Demo::Menu => Ok(()),
    }
}
