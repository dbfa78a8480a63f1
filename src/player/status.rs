//! Status line rendering.

use std::sync::Arc;

use crate::track::Track;
use crate::view::Source;

use super::{Options, PlayerState};

/// Point-in-time view of the player.
#[derive(Debug, Clone)]
pub struct Status {
    pub state: PlayerState,
    /// Seconds.
    pub position: u32,
    /// Seconds; 0 when unknown.
    pub duration: u32,
    /// `None` when the output backend has no volume control.
    pub volume: Option<u8>,
    pub options: Options,
    pub source: Source,
    pub track: Option<Arc<Track>>,
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_time(secs: u32) -> String {
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn flag(on: bool, label: &str) -> &str {
    if on { label } else { "" }
}

/// Fill in the `{...}` placeholders of `template`. Unknown placeholders are
/// left as they are.
pub fn render_status(template: &str, status: &Status) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            out.push_str(after);
            return out;
        };
        let key = &after[1..end];
        let value = match key {
            "state" => Some(status.state.label().to_string()),
            "position" => Some(format_time(status.position)),
            "duration" => Some(format_time(status.duration)),
            "volume" => Some(
                status
                    .volume
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            "continue" => Some(flag(status.options.continue_playback, "continue").to_string()),
            "repeat-all" => Some(flag(status.options.repeat_all, "repeat-all").to_string()),
            "repeat-track" => Some(flag(status.options.repeat_track, "repeat-track").to_string()),
            "source" => Some(status.source.name().to_string()),
            _ => None,
        };
        match value {
            Some(v) => out.push_str(&v),
            None => out.push_str(&after[..=end]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
