use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::menu::SearchOutcome;
use crate::track::{self, Track, TrackRegistry};

use super::list::{EntryList, Labels};
use super::{Activation, Nav, Row, TrackSource, View};

/// Entries of an M3U-style playlist: one path per line, `#` lines are
/// comments. Relative entries are resolved against `base`.
pub(crate) fn parse(text: &str, base: &Path) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            let p = Path::new(l);
            if p.is_absolute() {
                normalize(p)
            } else {
                normalize(&base.join(p))
            }
        })
        .collect()
}

/// Drop `.` and resolve `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// A playlist loaded from a file, played in file order.
pub struct Playlist {
    list: EntryList<Arc<Track>>,
    file: Mutex<Option<PathBuf>>,
}

impl Playlist {
    pub fn new(registry: Arc<TrackRegistry>, labels: Labels) -> Self {
        Self {
            list: EntryList::new(registry, labels),
            file: Mutex::new(None),
        }
    }

    /// Replace the contents with the tracks listed in `file`. Entries that
    /// cannot be loaded are skipped. Returns the number of tracks loaded.
    pub fn load(&self, file: &Path) -> Result<usize> {
        let file = std::path::absolute(file).map_err(|e| Error::io(file, e))?;
        let text = std::fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
        let base = file.parent().unwrap_or(Path::new("/"));

        let registry = self.list.registry();
        let mut tracks = Vec::new();
        for path in parse(&text, base) {
            match registry.require(&path) {
                Ok(t) => tracks.push(t),
                Err(e) => tracing::warn!(playlist = %file.display(), "skipping entry: {e}"),
            }
        }

        let loaded = tracks.len();
        self.list.replace(tracks);
        tracing::info!(playlist = %file.display(), loaded, "playlist loaded");
        *track::lock(&self.file) = Some(file);
        Ok(loaded)
    }

    pub fn file(&self) -> Option<PathBuf> {
        track::lock(&self.file).clone()
    }

    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.list.tracks()
    }
}

impl TrackSource for Playlist {
    fn next_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(true, repeat_all)
    }

    fn prev_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(false, repeat_all)
    }
}

impl View for Playlist {
    fn title(&self) -> String {
        match self.file() {
            Some(f) => format!("Playlist: {}", f.display()),
            None => "Playlist".to_string(),
        }
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn render(&self, rows: usize) -> Vec<Row> {
        self.list.render(rows)
    }

    fn navigate(&self, nav: Nav) {
        self.list.navigate(nav);
    }

    fn search(&self, query: &str, backward: bool) -> SearchOutcome {
        self.list.search(query, backward)
    }

    fn selected_track(&self) -> Option<Arc<Track>> {
        self.list.selected_track()
    }

    fn activate(&self) -> Result<Activation> {
        Ok(match self.list.activate_selected() {
            Some(t) => Activation::Play(t),
            None => Activation::Nothing,
        })
    }

    fn delete_selected(&self) {
        self.list.remove_selected();
    }
}
