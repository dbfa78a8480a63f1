use std::sync::Arc;

use crate::error::Result;
use crate::menu::SearchOutcome;
use crate::track::{Track, TrackRegistry};

use super::list::{EntryList, Labels};
use super::{Activation, Nav, Row, View};

/// Tracks queued for one-time playback. The player drains the queue
/// before asking the playback source.
pub struct Queue {
    list: EntryList<Arc<Track>>,
}

impl Queue {
    pub fn new(registry: Arc<TrackRegistry>, labels: Labels) -> Self {
        Self {
            list: EntryList::new(registry, labels),
        }
    }

    pub fn push(&self, track: Arc<Track>) {
        self.list.registry().hold(&track);
        self.list.lock().append(track);
    }

    /// Remove and return the head of the queue. The queue's registry hold
    /// passes to the caller, who must release it.
    pub fn take_next(&self) -> Option<Arc<Track>> {
        let mut menu = self.list.lock();
        let first = menu.first()?;
        menu.remove(first)
    }

    pub fn clear(&self) {
        self.list.clear();
    }

    /// Swap the selected entry with its neighbour.
    pub fn move_selected(&self, up: bool) {
        let mut menu = self.list.lock();
        let Some(sel) = menu.selected() else { return };
        if up {
            if let Some(prev) = menu.prev(sel) {
                menu.move_before(prev, sel);
            }
        } else if let Some(next) = menu.next(sel) {
            menu.move_before(sel, next);
        }
    }

    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.list.tracks()
    }
}

impl View for Queue {
    fn title(&self) -> String {
        format!("Queue ({})", self.list.len())
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

    /// Activating a queued track plays it and takes it off the queue.
    fn activate(&self) -> Result<Activation> {
        Ok(match self.list.remove_selected() {
            Some(t) => Activation::Play(t),
            None => Activation::Nothing,
        })
    }

    fn delete_selected(&self) {
        self.list.remove_selected();
    }
}
