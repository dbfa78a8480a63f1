use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::plugin::{InputPlugin, PluginRegistry};

use super::{Metadata, MetadataCache, Track, lock};

struct Entry {
    track: Arc<Track>,
    holds: usize,
}

struct Inner {
    tracks: BTreeMap<PathBuf, Entry>,
    cache: MetadataCache,
}

/// Deduplicated set of tracks keyed by path.
///
/// Every successful lookup counts as a hold; callers hand the hold back
/// with [`TrackRegistry::release`]. A track leaves the registry once its
/// last hold is gone and its cache entry has been flushed.
pub struct TrackRegistry {
    plugins: Arc<PluginRegistry>,
    inner: Mutex<Inner>,
}

impl TrackRegistry {
    pub fn new(plugins: Arc<PluginRegistry>, cache: MetadataCache) -> Self {
        Self {
            plugins,
            inner: Mutex::new(Inner {
                tracks: BTreeMap::new(),
                cache,
            }),
        }
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Return the canonical track for `path`, creating it on first use.
    ///
    /// `hint` short-circuits the extension lookup. On creation the tags come
    /// from the metadata cache, or from the decoder backend (and are then
    /// added to the cache).
    pub fn get_or_create(
        &self,
        path: &Path,
        hint: Option<Arc<dyn InputPlugin>>,
    ) -> Result<Arc<Track>> {
        let mut inner = lock(&self.inner);

        if let Some(entry) = inner.tracks.get_mut(path) {
            if entry.track.input().is_none() {
                if let Some(input) = hint.or_else(|| self.plugins.input_for_path(path)) {
                    entry.track.set_input(input);
                }
            }
            entry.holds += 1;
            return Ok(entry.track.clone());
        }

        let input = match hint {
            Some(input) => input,
            None => self
                .plugins
                .input_for_path(path)
                .ok_or_else(|| Error::UnsupportedFormat {
                    path: path.to_path_buf(),
                })?,
        };

        let meta = match inner.cache.get(path) {
            Some(meta) => meta.clone(),
            None => match input.metadata(path) {
                Ok(meta) => {
                    inner.cache.insert(path.to_path_buf(), meta.clone());
                    meta
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cannot read metadata: {e}");
                    Metadata::default()
                }
            },
        };

        let track = Arc::new(Track::new(path.to_path_buf(), Some(input), meta));
        inner.tracks.insert(
            path.to_path_buf(),
            Entry {
                track: track.clone(),
                holds: 1,
            },
        );
        Ok(track)
    }

    /// Lookup used when loading playlists: registry hit or creation, no
    /// other fallback.
    pub fn require(&self, path: &Path) -> Result<Arc<Track>> {
        self.get_or_create(path, None)
    }

    pub fn hold(&self, track: &Arc<Track>) {
        let mut inner = lock(&self.inner);
        match inner.tracks.get_mut(track.path()) {
            Some(entry) => entry.holds += 1,
            None => {
                inner.tracks.insert(
                    track.path().to_path_buf(),
                    Entry {
                        track: track.clone(),
                        holds: 1,
                    },
                );
            }
        }
    }

    pub fn release(&self, track: &Arc<Track>) {
        let mut inner = lock(&self.inner);
        let Inner { tracks, cache } = &mut *inner;
        let Some(entry) = tracks.get_mut(track.path()) else {
            return;
        };
        entry.holds = entry.holds.saturating_sub(1);
        if entry.holds == 0 && !cache.is_pending(track.path()) {
            tracks.remove(track.path());
        }
    }

    /// Number of holds on the track registered at `path`, if any.
    #[cfg(test)]
    pub fn holds(&self, path: &Path) -> Option<usize> {
        lock(&self.inner).tracks.get(path).map(|e| e.holds)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        lock(&self.inner).tracks.len()
    }

    /// Paths with cached metadata.
    #[cfg(test)]
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        lock(&self.inner)
            .cache
            .paths()
            .map(Path::to_path_buf)
            .collect()
    }

    /// Re-read the tags of every registered track from its decoder backend.
    pub fn refresh_metadata(&self) {
        let tracks: Vec<Arc<Track>> = lock(&self.inner)
            .tracks
            .values()
            .map(|e| e.track.clone())
            .collect();

        for track in tracks {
            let Some(input) = track.input() else { continue };
            match input.metadata(track.path()) {
                Ok(meta) => {
                    track.set_metadata(meta.clone());
                    lock(&self.inner)
                        .cache
                        .insert(track.path().to_path_buf(), meta);
                }
                Err(e) => tracing::warn!(path = %track.path().display(), "cannot refresh metadata: {e}"),
            }
        }
    }

    /// Write the cache out, then drop tracks nobody holds any more.
    pub fn flush_cache(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.cache.flush()?;
        inner.tracks.retain(|_, e| e.holds > 0);
        Ok(())
    }
}
