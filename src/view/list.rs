use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::TrackDisplayField;
use crate::menu::{EntryId, Menu, SearchOutcome};
use crate::track::{self, Track, TrackRegistry, display_from_fields};

use super::{Nav, Row};

/// How track rows are labelled.
#[derive(Debug, Clone)]
pub struct Labels {
    fields: Vec<TrackDisplayField>,
    separator: String,
}

impl Labels {
    pub fn new(fields: Vec<TrackDisplayField>, separator: String) -> Self {
        Self { fields, separator }
    }

    pub fn track(&self, track: &Track) -> String {
        display_from_fields(track, &self.fields, &self.separator)
    }
}

/// Something a view can list.
pub trait Entry: Send {
    fn label(&self, labels: &Labels) -> String;

    fn matches(&self, query: &str) -> bool;

    /// The playable track behind this entry, created on first use.
    fn resolve(&mut self, registry: &TrackRegistry) -> Option<Arc<Track>>;

    /// The track this entry holds in the registry, if any.
    fn held(&self) -> Option<&Arc<Track>>;
}

impl Entry for Arc<Track> {
    fn label(&self, labels: &Labels) -> String {
        labels.track(self)
    }

    fn matches(&self, query: &str) -> bool {
        track::search(self, query)
    }

    fn resolve(&mut self, _registry: &TrackRegistry) -> Option<Arc<Track>> {
        Some(self.clone())
    }

    fn held(&self) -> Option<&Arc<Track>> {
        Some(self)
    }
}

/// A menu behind a mutex plus the operations every view shares.
///
/// Entries hold their track in the registry; removing an entry releases it.
pub(crate) struct EntryList<T> {
    menu: Mutex<Menu<T>>,
    registry: Arc<TrackRegistry>,
    labels: Labels,
}

fn neighbour<T>(menu: &Menu<T>, id: EntryId, forward: bool) -> Option<EntryId> {
    if forward { menu.next(id) } else { menu.prev(id) }
}

fn edge<T>(menu: &Menu<T>, forward: bool) -> Option<EntryId> {
    if forward { menu.first() } else { menu.last() }
}

impl<T: Entry> EntryList<T> {
    pub fn new(registry: Arc<TrackRegistry>, labels: Labels) -> Self {
        Self {
            menu: Mutex::new(Menu::new()),
            registry,
            labels,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Menu<T>> {
        track::lock(&self.menu)
    }

    pub fn registry(&self) -> &Arc<TrackRegistry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn render(&self, rows: usize) -> Vec<Row> {
        let mut menu = self.lock();
        let selected = menu.selected();
        let active = menu.active();
        menu.render(rows)
            .into_iter()
            .map(|(id, entry)| Row {
                text: entry.label(&self.labels),
                selected: Some(id) == selected,
                active: Some(id) == active,
            })
            .collect()
    }

    pub fn navigate(&self, nav: Nav) {
        let mut menu = self.lock();
        match nav {
            Nav::Up => menu.select_prev(),
            Nav::Down => menu.select_next(),
            Nav::First => menu.select_first(),
            Nav::Last => menu.select_last(),
            Nav::Active => menu.select_active(),
            Nav::ScrollUp(s) => menu.scroll_up(s),
            Nav::ScrollDown(s) => menu.scroll_down(s),
        }
    }

    pub fn search(&self, query: &str, backward: bool) -> SearchOutcome {
        if query.is_empty() {
            return SearchOutcome::NotFound;
        }
        let mut menu = self.lock();
        if backward {
            menu.search_prev(|e| e.matches(query))
        } else {
            menu.search_next(|e| e.matches(query))
        }
    }

    pub fn selected_track(&self) -> Option<Arc<Track>> {
        let mut menu = self.lock();
        let id = menu.selected()?;
        menu.get_mut(id)?.resolve(&self.registry)
    }

    /// Resolve the selected entry and mark it playing.
    pub fn activate_selected(&self) -> Option<Arc<Track>> {
        let mut menu = self.lock();
        let id = menu.selected()?;
        let track = menu.get_mut(id)?.resolve(&self.registry)?;
        menu.set_active(Some(id));
        Some(track)
    }

    pub fn remove_selected(&self) -> Option<T> {
        let mut menu = self.lock();
        let id = menu.selected()?;
        let entry = menu.remove(id)?;
        if let Some(track) = entry.held() {
            self.registry.release(track);
        }
        Some(entry)
    }

    pub fn clear(&self) {
        let entries = self.lock().clear();
        for entry in &entries {
            if let Some(track) = entry.held() {
                self.registry.release(track);
            }
        }
    }

    /// Replace every entry.
    pub fn replace(&self, entries: Vec<T>) {
        let old = {
            let mut menu = self.lock();
            let old = menu.clear();
            for entry in entries {
                menu.append(entry);
            }
            old
        };
        for entry in &old {
            if let Some(track) = entry.held() {
                self.registry.release(track);
            }
        }
    }

    /// Tracks currently held by the entries, in order.
    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.lock()
            .iter()
            .filter_map(|(_, e)| e.held().cloned())
            .collect()
    }

    /// Move the active mark one playable entry forward or back. Without an
    /// active entry the walk starts at the first (or last) entry; with
    /// `repeat_all` it wraps around once.
    pub fn step(&self, forward: bool, repeat_all: bool) -> Option<Arc<Track>> {
        let mut menu = self.lock();
        let start = menu.active();
        let mut cur = match start {
            Some(id) => neighbour(&menu, id, forward),
            None => edge(&menu, forward),
        };
        let mut wrapped = start.is_none();

        for _ in 0..=menu.len() {
            let id = match cur {
                Some(id) => id,
                None if repeat_all && !wrapped => {
                    wrapped = true;
                    edge(&menu, forward)?
                }
                None => return None,
            };
            if let Some(track) = menu.get_mut(id).and_then(|e| e.resolve(&self.registry)) {
                menu.set_active(Some(id));
                return Some(track);
            }
            cur = neighbour(&menu, id, forward);
        }
        None
    }
}
