//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use duet::config::UiSettings;
use duet::engine::{PlaybackMode, PlayerState};
use duet::library::{Cover, MediaType};

use crate::app::App;

/// Key bindings shown in the footer, in display order.
const CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("gg/G", "top/bottom"),
    ("zz", "jump to current"),
    ("enter", "play selected"),
    ("space/p", "play/pause"),
    ("s", "stop"),
    ("h/l", "prev/next"),
    // H/L is filled in from settings.
    ("m", "play mode"),
    ("v", "audio/video"),
    ("+/-", "volume"),
    ("d", "remove"),
    ("C", "clear"),
    ("K", "metadata"),
    ("q", "quit"),
];

fn controls_text(seek_step: u64) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(CONTROLS.len() + 1);
    for (key, what) in CONTROLS {
        parts.push(format!("[{key}] {what}"));
        if *key == "h/l" {
            parts.push(format!("[H/L] seek -/+{seek_step}s"));
        }
    }
    parts.join(" | ")
}

/// Format seconds as `MM:SS`.
fn format_mmss(secs: f64) -> String {
    let secs = if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    };
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format an optional duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!(" {}", app.state.label().to_uppercase()));
    parts.push(format!("MODE: {}", app.play_mode.label()));
    parts.push(format!("OUTPUT: {}", app.playback_mode.label()));
    parts.push(format!("VOL: {:.0}%", app.volume * 100.0));

    if let Some(track) = app.current_track() {
        let time = if app.duration > 0.0 {
            format!("{} / {}", format_mmss(app.position), format_mmss(app.duration))
        } else {
            format_mmss(app.position)
        };
        parts.push(format!("Song: {} [{}]", track.display, time));
    }

    if app.follow_playback {
        parts.push("CURSOR: Follow".to_string());
    } else {
        parts.push("CURSOR: Free-roam".to_string());
    }

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }

    parts.join(" • ")
}

fn track_row(app: &App, i: usize) -> String {
    let track = &app.tracks[i];
    let marker = match (app.current == Some(i), app.state) {
        (true, PlayerState::Playing) => "▶ ",
        (true, PlayerState::Paused) => "⏸ ",
        _ => "  ",
    };
    let badge = if track.is_video() {
        " [video]"
    } else if track.has_video() {
        " [mv]"
    } else {
        ""
    };
    format!("{marker}{}{badge}", track.display)
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" duet ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Track list, windowed around the cursor.
    {
        let total = app.tracks.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_in_view) = if total <= list_height || list_height == 0 {
            (0, total, sel)
        } else {
            let half = list_height / 2;
            let mut start = sel.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel - start)
        };

        let items: Vec<ListItem> = (start..end)
            .map(|i| {
                let item = ListItem::new(track_row(app, i));
                if app.current == Some(i) {
                    item.bold()
                } else {
                    item
                }
            })
            .collect();

        let title = format!(" playlist ({total}) ");
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_in_view));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    // Lyric line, or the last error when there is one.
    let (line_title, line) = match (&app.last_error, app.current_lyric()) {
        (Some(err), _) => (" error ", err.clone()),
        (None, Some(l)) => (" lyrics ", l.text.clone()),
        (None, None) => (" lyrics ", String::new()),
    };
    let line_par = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(line_title));
    let line_par = if app.last_error.is_some() {
        line_par.red()
    } else {
        line_par.italic()
    };
    frame.render_widget(line_par, chunks[3]);

    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 11, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta = match app.tracks.get(app.selected) {
            Some(track) => {
                let kind = match track.media_type {
                    MediaType::Audio => "audio",
                    MediaType::Video => "video",
                };
                let video = track
                    .video_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string());
                let cover = match &track.cover {
                    Some(Cover::Embedded { .. }) => "embedded".to_string(),
                    Some(Cover::Sidecar(p)) => p.display().to_string(),
                    None => "-".to_string(),
                };
                format!(
                    "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nType: {}\nVideo: {}\nCover: {}\nLyrics: {} lines\nPath: {}",
                    track.title,
                    track.artist.as_deref().unwrap_or("-"),
                    track.album.as_deref().unwrap_or("-"),
                    format_duration_mmss_ceil(track.duration),
                    kind,
                    video,
                    cover,
                    track.lyrics.len(),
                    track.path.display()
                )
            }
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let mut footer_text = controls_text(ui_settings.seek_step_seconds);
    if app.playback_mode == PlaybackMode::Video {
        footer_text.push_str(" | video plays in an external window");
    }
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}
