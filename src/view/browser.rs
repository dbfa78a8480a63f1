//! File browser: one directory at a time, subdirectories first.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::menu::SearchOutcome;
use crate::track::{self, Track, TrackRegistry};

use super::list::{Entry, EntryList, Labels};
use super::{Activation, Nav, Row, TrackSource, View};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Parent,
    Dir,
    File,
}

#[derive(Debug)]
pub struct BrowserEntry {
    pub kind: EntryKind,
    pub path: PathBuf,
    name: String,
    // Created when the file is first played.
    track: Option<Arc<Track>>,
}

impl BrowserEntry {
    fn new(kind: EntryKind, path: PathBuf) -> Self {
        let name = match kind {
            EntryKind::Parent => "..".to_string(),
            _ => path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };
        Self {
            kind,
            path,
            name,
            track: None,
        }
    }
}

impl Entry for BrowserEntry {
    fn label(&self, _labels: &Labels) -> String {
        match self.kind {
            EntryKind::Parent | EntryKind::Dir => format!("{}/", self.name),
            EntryKind::File => self.name.clone(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }

    fn resolve(&mut self, registry: &TrackRegistry) -> Option<Arc<Track>> {
        if self.kind != EntryKind::File {
            return None;
        }
        if self.track.is_none() {
            match registry.get_or_create(&self.path, None) {
                Ok(t) => self.track = Some(t),
                Err(e) => {
                    tracing::warn!("{e}");
                    return None;
                }
            }
        }
        self.track.clone()
    }

    fn held(&self) -> Option<&Arc<Track>> {
        self.track.as_ref()
    }
}

fn list_dir(dir: &Path, show_hidden: bool, registry: &TrackRegistry) -> Result<Vec<BrowserEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden && !show_hidden {
            continue;
        }
        // Follows symlinks.
        let Ok(meta) = fs::metadata(&path) else { continue };
        if meta.is_dir() {
            entries.push(BrowserEntry::new(EntryKind::Dir, path));
        } else if meta.is_file() && registry.plugins().is_supported(&path) {
            entries.push(BrowserEntry::new(EntryKind::File, path));
        }
    }
    entries.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    if let Some(parent) = dir.parent() {
        entries.insert(0, BrowserEntry::new(EntryKind::Parent, parent.to_path_buf()));
    }
    Ok(entries)
}

pub struct Browser {
    list: EntryList<BrowserEntry>,
    dir: Mutex<Option<PathBuf>>,
    show_hidden: bool,
}

impl Browser {
    pub fn new(registry: Arc<TrackRegistry>, show_hidden: bool) -> Self {
        Self {
            list: EntryList::new(registry, Labels::new(Vec::new(), String::new())),
            dir: Mutex::new(None),
            show_hidden,
        }
    }

    /// Change to `dir`. Going up selects the directory just left.
    pub fn cd(&self, dir: &Path) -> Result<()> {
        let dir = std::path::absolute(dir).map_err(|e| Error::io(dir, e))?;
        let entries = list_dir(&dir, self.show_hidden, self.list.registry())?;
        let previous = track::lock(&self.dir).replace(dir.clone());

        self.list.replace(entries);
        if let Some(prev) = previous.filter(|p| p.parent() == Some(dir.as_path())) {
            let mut menu = self.list.lock();
            let found = menu
                .iter()
                .find(|(_, e)| e.kind == EntryKind::Dir && e.path == prev)
                .map(|(id, _)| id);
            if let Some(id) = found {
                menu.select(id);
            }
        }
        tracing::debug!(dir = %dir.display(), "browser changed directory");
        Ok(())
    }

    pub fn dir(&self) -> Option<PathBuf> {
        track::lock(&self.dir).clone()
    }

    /// Path of the selected entry.
    pub fn selected_path(&self) -> Option<PathBuf> {
        let menu = self.list.lock();
        let id = menu.selected()?;
        menu.get(id).map(|e| e.path.clone())
    }

    /// Entry names in display order.
    pub fn names(&self) -> Vec<String> {
        self.list
            .lock()
            .iter()
            .map(|(_, e)| e.label(&Labels::new(Vec::new(), String::new())))
            .collect()
    }
}

impl TrackSource for Browser {
    fn next_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(true, repeat_all)
    }

    fn prev_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        self.list.step(false, repeat_all)
    }
}

impl View for Browser {
    fn title(&self) -> String {
        match self.dir() {
            Some(d) => format!("Browser: {}", d.display()),
            None => "Browser".to_string(),
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
        let target = {
            let menu = self.list.lock();
            menu.selected()
                .and_then(|id| menu.get(id))
                .map(|e| (e.kind, e.path.clone()))
        };
        match target {
            Some((EntryKind::Parent | EntryKind::Dir, path)) => {
                self.cd(&path)?;
                Ok(Activation::Entered)
            }
            Some((EntryKind::File, _)) => Ok(match self.list.activate_selected() {
                Some(t) => Activation::Play(t),
                None => Activation::Nothing,
            }),
            None => Ok(Activation::Nothing),
        }
    }

    /// The browser only mirrors the file system; nothing to delete.
    fn delete_selected(&self) {}
}
