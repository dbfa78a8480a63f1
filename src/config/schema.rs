use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/cadenza/config.toml` or `~/.config/cadenza/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CADENZA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub output: OutputSettings,
    pub plugins: PluginSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub library: LibrarySettings,
    pub cache: CacheSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Advance to the next track when one ends.
    #[serde(rename = "continue")]
    pub continue_playback: bool,
    /// Wrap around at the end of the playback source.
    pub repeat_all: bool,
    /// Replay the current track when it ends.
    pub repeat_track: bool,
    /// View that supplies next/previous tracks.
    pub source: SourceSetting,
    /// Output backend name, or "default" for the preferred one.
    pub output_plugin: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            continue_playback: true,
            repeat_all: false,
            repeat_track: false,
            source: SourceSetting::Library,
            output_plugin: "default".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceSetting {
    Library,
    Playlist,
    Browser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Frames per write to the sound device.
    pub buffer_frames: usize,
    /// Chunks allowed to queue up in the mixer before writes block.
    pub queue_depth: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            buffer_frames: 2048,
            queue_depth: 4,
        }
    }
}

/// Per-backend priority overrides (lower wins).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub input_priority: HashMap<String, i32>,
    pub output_priority: HashMap<String, i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Status line template. Placeholders: `{state}`, `{position}`,
    /// `{duration}`, `{volume}`, `{continue}`, `{repeat-all}`,
    /// `{repeat-track}`, `{source}`.
    pub status_format: String,

    /// Which track fields to show in the "now playing" line, and in what order.
    ///
    /// Example: ["artist", "title", "album"]
    pub now_playing_track_fields: Vec<TrackDisplayField>,

    /// Separator used to join `now_playing_track_fields`.
    pub now_playing_track_separator: String,

    /// Whether the browser lists dotfiles.
    pub browser_show_hidden: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " cadenza ".to_string(),
            status_format: "{state}  {position} / {duration}  vol {volume}%  {continue} {repeat-all} {repeat-track}  [{source}]".to_string(),
            now_playing_track_fields: vec![
                TrackDisplayField::Artist,
                TrackDisplayField::Title,
                TrackDisplayField::Album,
            ],
            now_playing_track_separator: " - ".to_string(),
            browser_show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `h` / `l`.
    pub seek_seconds: u32,
    /// Volume change when pressing `+` / `-`.
    pub volume_step: u8,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 5,
            volume_step: 5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    Date,
    #[serde(alias = "tracknumber", alias = "track")]
    TrackNumber,
    Filename,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,

    /// Which fields to use to build the library rows.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            display_fields: vec![
                TrackDisplayField::Artist,
                TrackDisplayField::Album,
                TrackDisplayField::TrackNumber,
                TrackDisplayField::Title,
            ],
            display_separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Persist extracted tags between runs.
    pub enabled: bool,
    /// Cache file; defaults to `$XDG_CACHE_HOME/cadenza/metadata.toml`.
    pub file: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing` filter directive; `CADENZA_LOG` overrides it.
    pub filter: String,
    /// Log file; defaults to `$XDG_STATE_HOME/cadenza/cadenza.log`.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}
