use std::env;
use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use duet::engine::Engine;

use crate::app::App;
use crate::mpris::ControlCmd;

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;
mod video_surface;

use video_surface::VideoSurface;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_problem) = settings::load_settings();

    match logging::init_logging(&settings.logging) {
        Ok(path) => info!(path = %path.display(), "duet starting"),
        Err(e) => eprintln!("duet: logging disabled: {e}"),
    }
    if let Some(problem) = config_problem {
        warn!(%problem, "using default settings");
    }

    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"));

    let (mut engine, events) = Engine::spawn(&settings)?;
    let player = engine.handle();
    if let Err(e) = player.add_folder(&dir) {
        warn!(dir = %dir.display(), error = %e, "could not load the music directory");
    }

    let mut app = App::from_snapshot(player.snapshot()?);
    app.set_current_dir(dir.display().to_string());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);
    mpris_sync::update_mpris(&mpris, &app);

    let mut surface = VideoSurface::new(settings.video.clone());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::new(&app);
    let run_result = event_loop::run(
        &mut terminal,
        &mut app,
        event_loop::Wiring {
            settings: &settings,
            engine: &player,
            events: &events,
            surface: &mut surface,
            mpris: &mpris,
            control_rx: &control_rx,
        },
        &mut state,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    surface.shutdown();
    engine.shutdown();
    info!("duet stopped");

    run_result
}
