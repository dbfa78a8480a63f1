use std::sync::Arc;

use crate::app::App;
use crate::mpris::MprisHandle;
use crate::track::Track;

/// What was last published over MPRIS.
#[derive(Default)]
pub struct MprisSync {
    track: Option<Arc<Track>>,
    serial: usize,
}

impl MprisSync {
    pub fn update(&mut self, mpris: &MprisHandle, app: &App) {
        let current = app.player.current_track();
        let same = match (&current, &self.track) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.serial += 1;
            let id = current.as_ref().map(|_| self.serial);
            mpris.set_track_metadata(id, current.as_deref());
            self.track = current;
        }
        mpris.set_playback(app.player.state());
    }
}
