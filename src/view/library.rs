//! The sorted library view and the directory scanner that fills it.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::{Error, Result};
use crate::menu::SearchOutcome;
use crate::plugin::PluginRegistry;
use crate::track::{self, Track, TrackRegistry};

use super::list::{EntryList, Labels};
use super::{Activation, Nav, Row, TrackSource, View};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Collect the playable files under `dir`.
pub(crate) fn scan(dir: &Path, settings: &LibrarySettings, plugins: &PluginRegistry) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut paths: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| plugins.is_supported(p))
        .collect();
    paths.sort();
    paths
}

pub struct Library {
    list: EntryList<Arc<Track>>,
    settings: LibrarySettings,
}

impl Library {
    pub fn new(registry: Arc<TrackRegistry>, labels: Labels, settings: LibrarySettings) -> Self {
        Self {
            list: EntryList::new(registry, labels),
            settings,
        }
    }

    /// Add a file, or every playable file below a directory. Returns the
    /// number of tracks added; files already in the library are skipped.
    pub fn add_path(&self, path: &Path) -> Result<usize> {
        let path = std::path::absolute(path).map_err(|e| Error::io(path, e))?;
        let meta = std::fs::metadata(&path).map_err(|e| Error::io(&path, e))?;
        let registry = self.list.registry();

        let paths = if meta.is_dir() {
            scan(&path, &self.settings, registry.plugins())
        } else {
            vec![path]
        };

        let mut tracks = Vec::with_capacity(paths.len());
        for p in &paths {
            match registry.get_or_create(p, None) {
                Ok(t) => tracks.push(t),
                Err(Error::UnsupportedFormat { .. }) if paths.len() > 1 => {}
                Err(e) if paths.len() > 1 => {
                    tracing::warn!(path = %p.display(), "cannot add track: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let mut added = 0;
        let mut duplicates = Vec::new();
        {
            let mut menu = self.list.lock();
            for t in tracks {
                if menu.iter().any(|(_, e)| Arc::ptr_eq(e, &t)) {
                    duplicates.push(t);
                    continue;
                }
                let after = menu
                    .iter()
                    .find(|(_, e)| track::compare(e, &t) == Ordering::Greater)
                    .map(|(id, _)| id);
                match after {
                    Some(id) => menu.insert_before(id, t),
                    None => menu.append(t),
                };
                added += 1;
            }
        }
        for t in &duplicates {
            registry.release(t);
        }
        tracing::info!(added, "library updated");
        Ok(added)
    }

    /// Re-sort after metadata changed, keeping the active and selected
    /// tracks marked.
    pub fn sort(&self) {
        let mut menu = self.list.lock();
        let active = menu.active().and_then(|id| menu.get(id).cloned());
        let selected = menu.selected().and_then(|id| menu.get(id).cloned());

        let mut tracks = menu.clear();
        tracks.sort_by(|a, b| track::compare(a, b));
        for t in tracks {
            let is_active = active.as_ref().is_some_and(|a| Arc::ptr_eq(a, &t));
            let is_selected = selected.as_ref().is_some_and(|s| Arc::ptr_eq(s, &t));
            let id = menu.append(t);
            if is_active {
                menu.set_active(Some(id));
            }
            if is_selected {
                menu.select(id);
            }
        }
    }

    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.list.tracks()
    }
}

impl TrackSource for Library {
    fn next_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(true, repeat_all)
    }

    fn prev_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(false, repeat_all)
    }
}

impl View for Library {
    fn title(&self) -> String {
        "Library".to_string()
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
