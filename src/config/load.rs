use std::{env, path::PathBuf};

use crate::error::{PlaybackError, Result};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` layers an optional config file under environment
/// variables (prefix `DUET__`) and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> std::result::Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = resolve_config_path() {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("DUET")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let e = &self.engine;
        if !(50..=1000).contains(&e.tick_interval_ms) {
            return Err(PlaybackError::Config(
                "engine.tick_interval_ms must be between 50 and 1000".to_string(),
            ));
        }
        if !(1..=5000).contains(&e.grace_period_ms) {
            return Err(PlaybackError::Config(
                "engine.grace_period_ms must be between 1 and 5000".to_string(),
            ));
        }
        if !(1..=1000).contains(&e.poll_interval_ms) {
            return Err(PlaybackError::Config(
                "engine.poll_interval_ms must be between 1 and 1000".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.audio.volume) {
            return Err(PlaybackError::Config(
                "audio.volume must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.audio.end_check_ms == 0 {
            return Err(PlaybackError::Config(
                "audio.end_check_ms must be >= 1".to_string(),
            ));
        }
        if self.video.command.trim().is_empty() {
            return Err(PlaybackError::Config(
                "video.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the config path from `DUET_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("DUET_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/duet/config.toml`, or `~/.config/duet/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("duet").join("config.toml"))
}

/// `$XDG_STATE_HOME/duet/duet.log`, or `~/.local/state/duet/duet.log`.
pub fn default_log_path() -> Option<PathBuf> {
    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
    };

    state_home.map(|d| d.join("duet").join("duet.log"))
}
