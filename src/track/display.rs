use crate::config::TrackDisplayField;

use super::Track;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// This composes metadata fields in the configured order and falls back to
/// the title (or file name) when no parts were produced.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let meta = track.metadata();
    let trimmed = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    for f in fields {
        match f {
            TrackDisplayField::Title => {
                if let Some(t) = trimmed(&meta.title) {
                    parts.push(t);
                }
            }
            TrackDisplayField::Artist => {
                if let Some(a) = trimmed(&meta.artist) {
                    parts.push(a);
                }
            }
            TrackDisplayField::Album => {
                if let Some(a) = trimmed(&meta.album) {
                    parts.push(a);
                }
            }
            TrackDisplayField::Date => {
                if let Some(d) = trimmed(&meta.date) {
                    parts.push(d);
                }
            }
            TrackDisplayField::TrackNumber => {
                if let Some(n) = trimmed(&meta.tracknumber) {
                    parts.push(n);
                }
            }
            TrackDisplayField::Filename => {
                if let Some(stem) = track.path().file_stem().and_then(|s| s.to_str()) {
                    if !stem.trim().is_empty() {
                        parts.push(stem.to_string());
                    }
                }
            }
            TrackDisplayField::Path => {
                parts.push(track.path().display().to_string());
            }
        }
    }

    if parts.is_empty() {
        track.title_or_filename()
    } else {
        parts.join(sep)
    }
}
