use sim_core::bootstrap::{build_demo_game, GameOptions};
use sim_tui::render_ascii_snapshot;
use std::env;
use std::fs;
use std::path::PathBuf;

fn snapshot_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("tests");
    p.push("__snapshots__");
    fs::create_dir_all(&p).expect("create snapshots dir");
    p.push(name);
    p
}

#[test]
fn tui_ascii_snapshot_20x10_no_demo_scene() {
    let game = build_demo_game(20, 10, GameOptions::default());
    let actual = render_ascii_snapshot(&game);

    let path = snapshot_path("tui_20x10_no_demo_scene.txt");
    if env::var("UPDATE_SNAPSHOTS").is_ok() || !path.exists() {
        fs::write(&path, actual.as_bytes()).expect("write snapshot");
    }

    let expected = fs::read_to_string(&path).expect("read snapshot");
    assert_eq!(
        actual, expected,
        "ASCII snapshot mismatch; run with UPDATE_SNAPSHOTS=1 to refresh"
    );
}

#[test]
fn tui_ascii_snapshot_20x10_with_demo_scene() {
    let game = build_demo_game(
        20,
        10,
        GameOptions {
            populate_demo_scene: true,
            ..Default::default()
        },
    );
    let actual = render_ascii_snapshot(&game);

    let path = snapshot_path("tui_20x10_with_demo_scene.txt");
    if env::var("UPDATE_SNAPSHOTS").is_ok() || !path.exists() {
        fs::write(&path, actual.as_bytes()).expect("write snapshot");
    }

    let expected = fs::read_to_string(&path).expect("read snapshot");
    assert_eq!(
        actual, expected,
        "ASCII snapshot mismatch; run with UPDATE_SNAPSHOTS=1 to refresh"
    );
}
