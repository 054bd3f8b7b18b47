use duet::config::Settings;

/// Load settings, falling back to defaults.
///
/// Runs before logging is up, so the reason for a fallback is handed back
/// to be logged once the subscriber exists.
pub fn load_settings() -> (Settings, Option<String>) {
    match Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(e) => (Settings::default(), Some(format!("invalid config: {e}"))),
        },
        Err(e) => (
            Settings::default(),
            Some(format!("failed to load config: {e}")),
        ),
    }
}
