use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use duet::PlaybackError;
use duet::config::Settings;
use duet::engine::{EngineEvent, EngineHandle, PlayerState};

use crate::app::App;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::update_mpris;
use crate::runtime::video_surface::VideoSurface;
use crate::ui;

const VOLUME_STEP: f32 = 0.1;

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
    /// Last-known current index as emitted to MPRIS.
    pub last_mpris_index: Option<usize>,
    /// Last-known player state as emitted to MPRIS.
    pub last_mpris_playback: PlayerState,
}

impl EventLoopState {
    pub fn new(app: &App) -> Self {
        Self {
            pending_gg: false,
            pending_zz: false,
            last_mpris_index: app.current,
            last_mpris_playback: app.state,
        }
    }
}

/// Everything the loop drives besides the terminal.
pub struct Wiring<'a> {
    pub settings: &'a Settings,
    pub engine: &'a EngineHandle,
    pub events: &'a Receiver<EngineEvent>,
    pub surface: &'a mut VideoSurface,
    pub mpris: &'a MprisHandle,
    pub control_rx: &'a Receiver<ControlCmd>,
}

/// Main terminal event loop: folds engine events into the view, feeds the
/// video surface, handles keys and MPRIS commands. Returns `Ok(())` when
/// shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    mut w: Wiring<'_>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let mut mpris_dirty = false;
        for ev in w.events.try_iter() {
            match ev {
                EngineEvent::VideoRequest(req) => {
                    report(app, w.surface.handle(req, w.engine))?;
                }
                other => mpris_dirty |= app.apply(other),
            }
        }
        report(app, w.surface.tick(w.engine, app.duration_hint()))?;

        if mpris_dirty
            || app.current != state.last_mpris_index
            || app.state != state.last_mpris_playback
        {
            update_mpris(w.mpris, app);
            state.last_mpris_index = app.current;
            state.last_mpris_playback = app.state;
        } else {
            w.mpris.set_position(app.position);
        }

        terminal.draw(|f| ui::draw(f, app, &w.settings.ui))?;

        while let Ok(cmd) = w.control_rx.try_recv() {
            if handle_control_cmd(cmd, app, w.engine)? {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, w.settings, app, w.engine, state)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Surface a failed engine call in the view. Only a vanished engine ends the loop.
fn report(app: &mut App, result: duet::Result<()>) -> Result<(), PlaybackError> {
    match result {
        Ok(()) => Ok(()),
        Err(PlaybackError::EngineGone) => Err(PlaybackError::EngineGone),
        Err(e) => {
            warn!(error = %e, "command failed");
            app.last_error = Some(e.to_string());
            Ok(())
        }
    }
}

fn handle_control_cmd(
    cmd: ControlCmd,
    app: &mut App,
    engine: &EngineHandle,
) -> Result<bool, PlaybackError> {
    let result = match cmd {
        ControlCmd::Quit => {
            info!("quit requested");
            return Ok(true);
        }
        ControlCmd::Play => engine.play(),
        ControlCmd::Pause => engine.pause(),
        ControlCmd::PlayPause => match app.state {
            PlayerState::Playing => engine.pause(),
            PlayerState::Paused | PlayerState::Stopped => engine.play(),
        },
        ControlCmd::Stop => engine.stop(),
        ControlCmd::Next => engine.next(),
        ControlCmd::Prev => engine.previous(),
    };
    report(app, result)?;
    Ok(false)
}

fn handle_key_event(
    key: KeyEvent,
    settings: &Settings,
    app: &mut App,
    engine: &EngineHandle,
    state: &mut EventLoopState,
) -> Result<bool, PlaybackError> {
    if !matches!(key.code, KeyCode::Char('g')) {
        state.pending_gg = false;
    }
    if !matches!(key.code, KeyCode::Char('z')) {
        state.pending_zz = false;
    }

    let result = match key.code {
        KeyCode::Char('q') => return handle_control_cmd(ControlCmd::Quit, app, engine),
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                state.pending_gg = true;
            }
            Ok(())
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.select_last();
            Ok(())
        }
        KeyCode::Char('z') => {
            if state.pending_zz {
                state.pending_zz = false;
                app.follow_playback_on();
            } else {
                state.pending_zz = true;
            }
            Ok(())
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
            Ok(())
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
            Ok(())
        }
        KeyCode::Enter => {
            let playing_selected =
                app.state == PlayerState::Playing && app.current == Some(app.selected);
            if app.has_tracks() && !playing_selected {
                app.follow_playback_on();
                engine.set_song(app.selected)
            } else {
                Ok(())
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            return handle_control_cmd(ControlCmd::PlayPause, app, engine);
        }
        KeyCode::Char('s') => return handle_control_cmd(ControlCmd::Stop, app, engine),
        KeyCode::Char('l') => return handle_control_cmd(ControlCmd::Next, app, engine),
        KeyCode::Char('h') => return handle_control_cmd(ControlCmd::Prev, app, engine),
        KeyCode::Char('L') | KeyCode::Char('H') if app.current.is_some() => {
            let step = settings.ui.seek_step_seconds as f64;
            let delta = if key.code == KeyCode::Char('L') {
                step
            } else {
                -step
            };
            engine.seek_to(app.position + delta)
        }
        KeyCode::Char('m') => engine.set_play_mode(app.play_mode.cycle()),
        KeyCode::Char('v') => engine.toggle_playback_mode(),
        KeyCode::Char('+') | KeyCode::Char('=') => engine.set_volume(app.volume + VOLUME_STEP),
        KeyCode::Char('-') => engine.set_volume(app.volume - VOLUME_STEP),
        KeyCode::Char('d') if app.has_tracks() => engine.remove_song(app.selected),
        KeyCode::Char('C') => engine.clear_playlist(),
        KeyCode::Char('K') => {
            app.toggle_metadata_window();
            Ok(())
        }
        _ => Ok(()),
    };
    report(app, result)?;
    Ok(false)
}
