//! Minimal terminal viewer for `sim_core`, analogous to the teacher's
//! `gc_tui`: renders the tile grid and entities live while the fixed-order
//! scheduler runs, with a small keyboard-driven pause/step/speed control.
//! Rendering, sprites, and combat remain entirely out of scope; this is an
//! ASCII debug view, not a renderer.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::Text,
    widgets::Paragraph,
    Terminal,
};
use sim_core::bootstrap::{build_demo_game, GameOptions};
use sim_core::entity::EntityKind;
use sim_core::tile_grid::GroundType;
use sim_core::Game;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

pub struct AppState {
    pub paused: bool,
    pub steps_per_frame: u32,
    pub dt: f32,
    pub now: f64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            paused: false,
            steps_per_frame: 1,
            dt: 0.1,
            now: 0.0,
        }
    }
}

pub fn build_game(width: u32, height: u32) -> Game {
    build_demo_game(
        width,
        height,
        GameOptions {
            populate_demo_scene: true,
            ..Default::default()
        },
    )
}

/// Renders one ASCII frame of `game`'s tile grid and entities. Exposed for
/// snapshot tests; the interactive loop below also calls it every frame.
pub fn render_ascii_snapshot(game: &Game) -> String {
    let width = game.grid.width();
    let height = game.grid.height();
    let mut out = String::with_capacity((width * (height + 1)) as usize);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let ch = if let Some(id) = game.entities.get_at(x, y) {
                match game.entities.get(id).map(|e| e.kind) {
                    Some(EntityKind::Building) => 'B',
                    Some(EntityKind::Unit) => 'u',
                    Some(EntityKind::StackedResource) => 'r',
                    Some(EntityKind::MapObject) | None => '?',
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
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

fn draw(terminal: &mut Terminal<CrosstermBackend<Stdout>>, game: &Game, app: &AppState) -> Result<()> {
    let text = render_ascii_snapshot(game);
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
            .split(f.size());

        let header = Paragraph::new(Text::raw("sim_core — TUI (q:quit, space:pause, .:step, 1-9:speed)"));
        let body = Paragraph::new(Text::raw(text)).style(Style::default());
        let footer = Paragraph::new(Text::raw(format!(
            "t={:.1}s paused={} steps/frame={} entities={} carriers={}",
            app.now,
            app.paused,
            app.steps_per_frame,
            game.entities.all_ids_ascending().len(),
            game.carriers.all_ids_ascending().len(),
        )));

        f.render_widget(header, chunks[0]);
        f.render_widget(body, chunks[1]);
        f.render_widget(footer, chunks[2]);
    })?;
    Ok(())
}

fn run_frame(game: &mut Game, app: &mut AppState) {
    if app.paused {
        return;
    }
    for _ in 0..app.steps_per_frame {
        app.now += app.dt as f64;
        game.tick(app.dt, app.now);
    }
}

pub fn run(width: u32, height: u32) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = AppState::default();
    let mut game = build_game(width, height);

    let frame_interval = Duration::from_millis(16);
    let mut last = Instant::now();
    loop {
        draw(&mut terminal, &game, &app)?;

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        cleanup_terminal()?;
                        return Ok(());
                    }
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('.') => {
                        app.now += app.dt as f64;
                        game.tick(app.dt, app.now);
                    }
                    KeyCode::Char(d @ '1'..='9') => {
                        let n = (d as u8 - b'0') as u32;
                        app.steps_per_frame = n.max(1);
                    }
                    _ => {}
                },
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last.elapsed() >= frame_interval {
            run_frame(&mut game, &mut app);
            last = Instant::now();
        }
    }
}

fn cleanup_terminal() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}
