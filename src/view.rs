//! Browsable views: library, playlist, file browser and the ad-hoc queue.
//!
//! Each view owns a [`Menu`](crate::menu::Menu) behind its own mutex. The
//! library, playlist and browser can also act as the player's playback
//! source through [`TrackSource`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{Settings, SourceSetting};
use crate::error::{Error, Result};
use crate::menu::{Scroll, SearchOutcome};
use crate::track::{Track, TrackRegistry};

mod browser;
mod library;
mod list;
mod playlist;
mod queue;

pub use browser::Browser;
pub use library::Library;
pub use list::{Entry, Labels};
pub use playlist::Playlist;
pub use queue::Queue;

/// View that supplies next/previous tracks to the player.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Source {
    Library,
    Playlist,
    Browser,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Playlist => "playlist",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "library" => Ok(Self::Library),
            "playlist" => Ok(Self::Playlist),
            "browser" => Ok(Self::Browser),
            other => Err(Error::InvalidCommand(format!(
                "unknown playback source '{other}' (expected browser, library or playlist)"
            ))),
        }
    }
}

impl From<SourceSetting> for Source {
    fn from(s: SourceSetting) -> Self {
        match s {
            SourceSetting::Library => Self::Library,
            SourceSetting::Playlist => Self::Playlist,
            SourceSetting::Browser => Self::Browser,
        }
    }
}

/// Next/previous track provider. Moving marks the new entry active.
pub trait TrackSource: Send + Sync {
    fn next_track(&self, repeat_all: bool) -> Option<Arc<Track>>;
    fn prev_track(&self, repeat_all: bool) -> Option<Arc<Track>>;
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub selected: bool,
    pub active: bool,
}

/// Cursor and viewport movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    First,
    Last,
    Active,
    ScrollUp(Scroll),
    ScrollDown(Scroll),
}

/// What activating the selected entry did.
#[derive(Debug)]
pub enum Activation {
    Play(Arc<Track>),
    /// The browser changed directory.
    Entered,
    Nothing,
}

/// The part of a view the terminal front end talks to.
pub trait View: Send + Sync {
    fn title(&self) -> String;
    fn len(&self) -> usize;
    fn render(&self, rows: usize) -> Vec<Row>;
    fn navigate(&self, nav: Nav);
    fn search(&self, query: &str, backward: bool) -> SearchOutcome;
    fn selected_track(&self) -> Option<Arc<Track>>;
    fn activate(&self) -> Result<Activation>;
    fn delete_selected(&self);
}

/// All views, shared between the UI thread and the player.
pub struct Views {
    pub library: Arc<Library>,
    pub playlist: Arc<Playlist>,
    pub browser: Arc<Browser>,
    pub queue: Arc<Queue>,
}

impl Views {
    pub fn new(registry: Arc<TrackRegistry>, settings: &Settings) -> Self {
        let library_labels = Labels::new(
            settings.library.display_fields.clone(),
            settings.library.display_separator.clone(),
        );
        Self {
            library: Arc::new(Library::new(
                registry.clone(),
                library_labels.clone(),
                settings.library.clone(),
            )),
            playlist: Arc::new(Playlist::new(registry.clone(), library_labels.clone())),
            browser: Arc::new(Browser::new(
                registry.clone(),
                settings.ui.browser_show_hidden,
            )),
            queue: Arc::new(Queue::new(registry, library_labels)),
        }
    }

    pub fn source(&self, source: Source) -> &dyn TrackSource {
        match source {
            Source::Library => self.library.as_ref(),
            Source::Playlist => self.playlist.as_ref(),
            Source::Browser => self.browser.as_ref(),
        }
    }

    /// Views in the order of their number keys (1-4).
    pub fn all(&self) -> [&dyn View; 4] {
        [
            self.library.as_ref(),
            self.playlist.as_ref(),
            self.browser.as_ref(),
            self.queue.as_ref(),
        ]
    }
}
