use std::path::Path;

use crate::config::TrackDisplayField;

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn field_value(
    field: TrackDisplayField,
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
) -> Vec<String> {
    match field {
        // "display" inside the field list means "artist - title".
        TrackDisplayField::Display => non_empty(artist)
            .into_iter()
            .chain(non_empty(Some(title)))
            .collect(),
        TrackDisplayField::Title => non_empty(Some(title)).into_iter().collect(),
        TrackDisplayField::Artist => non_empty(artist).into_iter().collect(),
        TrackDisplayField::Album => non_empty(album).into_iter().collect(),
        TrackDisplayField::Filename => {
            non_empty(path.file_stem().and_then(|s| s.to_str())).into_iter().collect()
        }
        TrackDisplayField::Path => vec![path.display().to_string()],
    }
}

/// Build the playlist label for a track from the configured `fields`.
///
/// Empty fields are skipped; when nothing is left the bare `title` is used.
pub fn display_from_fields(
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let parts: Vec<String> = fields
        .iter()
        .flat_map(|&f| field_value(f, path, title, artist, album))
        .collect();

    if parts.is_empty() {
        title.to_string()
    } else {
        parts.join(sep)
    }
}
