//! Tracks, their metadata, and the ordering/search rules the views use.
//!
//! A track is identified by its absolute path. The canonical instance is
//! owned by the [`TrackRegistry`]; views and the player share it through
//! `Arc<Track>`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::plugin::InputPlugin;

mod cache;
mod display;
mod registry;

pub use cache::MetadataCache;
pub use display::display_from_fields;
pub use registry::TrackRegistry;

/// Tag fields. Everything but the duration is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracknumber: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// PCM layout of a decoded stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SampleFormat {
    pub bits: u8,
    pub channels: u16,
    pub rate: u32,
    pub byte_order: ByteOrder,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits).div_ceil(8)
    }

    pub fn frame_bytes(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }
}

/// Reverse the byte order of every `width`-byte sample in `buf`.
pub fn swap_sample_bytes(buf: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for sample in buf.chunks_exact_mut(width) {
        sample.reverse();
    }
}

pub struct Track {
    path: PathBuf,
    input: Mutex<Option<Arc<dyn InputPlugin>>>,
    meta: Mutex<Metadata>,
    // Only set while the track is open for playback.
    format: Mutex<Option<SampleFormat>>,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track").field("path", &self.path).finish()
    }
}

impl Track {
    pub fn new(path: PathBuf, input: Option<Arc<dyn InputPlugin>>, meta: Metadata) -> Self {
        Self {
            path,
            input: Mutex::new(input),
            meta: Mutex::new(meta),
            format: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input(&self) -> Option<Arc<dyn InputPlugin>> {
        lock(&self.input).clone()
    }

    pub(crate) fn set_input(&self, input: Arc<dyn InputPlugin>) {
        *lock(&self.input) = Some(input);
    }

    /// Lock the metadata. Readers must hold this while looking at fields
    /// because the metadata can be replaced at any time.
    pub fn meta(&self) -> MutexGuard<'_, Metadata> {
        lock(&self.meta)
    }

    /// Snapshot of the metadata.
    pub fn metadata(&self) -> Metadata {
        self.meta().clone()
    }

    pub fn set_metadata(&self, meta: Metadata) {
        *self.meta() = meta;
    }

    pub fn duration(&self) -> u32 {
        self.meta().duration
    }

    pub fn format(&self) -> Option<SampleFormat> {
        *lock(&self.format)
    }

    pub(crate) fn set_format(&self, format: Option<SampleFormat>) {
        *lock(&self.format) = format;
    }

    /// Title, falling back to the file name.
    pub fn title_or_filename(&self) -> String {
        if let Some(title) = self.meta().title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding one of these locks leaves plain data behind;
    // keep going with it.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn cmp_caseless(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Numeric comparison when both sides are plain non-negative integers,
/// case-insensitive string comparison otherwise.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => cmp_caseless(a, b),
    }
}

fn cmp_field(a: Option<&str>, b: Option<&str>, cmp: fn(&str, &str) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Library order: artist, date, album, track number, title, then path.
pub fn compare(a: &Track, b: &Track) -> Ordering {
    if std::ptr::eq(a, b) {
        return Ordering::Equal;
    }
    let (ma, mb) = (a.metadata(), b.metadata());
    cmp_field(ma.artist.as_deref(), mb.artist.as_deref(), cmp_caseless)
        .then_with(|| cmp_field(ma.date.as_deref(), mb.date.as_deref(), cmp_numeric))
        .then_with(|| cmp_field(ma.album.as_deref(), mb.album.as_deref(), cmp_caseless))
        .then_with(|| {
            cmp_field(
                ma.tracknumber.as_deref(),
                mb.tracknumber.as_deref(),
                cmp_numeric,
            )
        })
        .then_with(|| cmp_field(ma.title.as_deref(), mb.title.as_deref(), cmp_caseless))
        .then_with(|| a.path.cmp(&b.path))
}

/// Case-insensitive substring match against every tag field and the path.
pub fn search(track: &Track, query: &str) -> bool {
    let query = query.to_lowercase();
    let contains = |s: &str| s.to_lowercase().contains(&query);

    let meta = track.meta();
    let fields = [
        &meta.album,
        &meta.artist,
        &meta.date,
        &meta.genre,
        &meta.title,
        &meta.tracknumber,
    ];
    fields.iter().any(|f| f.as_deref().is_some_and(contains))
        || contains(&track.path.to_string_lossy())
}
