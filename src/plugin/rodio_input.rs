//! Decoder backend built on `rodio::Decoder`, with tags read by `lofty`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use rodio::Source;

use crate::error::{Error, Result};
use crate::track::{ByteOrder, Metadata, SampleFormat};

use super::{Decoder, InputPlugin};

const NAME: &str = "rodio";

pub struct RodioInput;

impl RodioInput {
    pub fn new() -> Self {
        Self
    }
}

impl InputPlugin for RodioInput {
    fn name(&self) -> &str {
        NAME
    }

    fn extensions(&self) -> &[&str] {
        &["flac", "mp3", "ogg", "wav"]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let source = rodio::Decoder::new(BufReader::new(file))
            .map_err(|e| Error::backend(NAME, format!("{}: {e}", path.display())))?;

        let format = SampleFormat {
            bits: 16,
            channels: source.channels(),
            rate: source.sample_rate(),
            byte_order: ByteOrder::host(),
        };
        Ok(Box::new(RodioStream {
            source,
            format,
            base: Duration::ZERO,
            samples: 0,
        }))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata> {
        let tagged = lofty::read_from_path(path).map_err(|e| Error::backend(NAME, e))?;
        let mut meta = Metadata {
            duration: tagged.properties().duration().as_secs() as u32,
            ..Metadata::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            let get = |key: &ItemKey| {
                tag.get_string(key)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            meta.title = get(&ItemKey::TrackTitle);
            meta.artist = get(&ItemKey::TrackArtist);
            meta.album = get(&ItemKey::AlbumTitle);
            meta.genre = get(&ItemKey::Genre);
            meta.date = get(&ItemKey::RecordingDate).or_else(|| get(&ItemKey::Year));
            meta.tracknumber = get(&ItemKey::TrackNumber);
        }
        Ok(meta)
    }
}

struct RodioStream {
    source: rodio::Decoder<BufReader<File>>,
    format: SampleFormat,
    // Position of the last seek; `samples` counts from there.
    base: Duration,
    samples: u64,
}

/// Convert a float sample to 16-bit PCM.
pub(super) fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

impl Decoder for RodioStream {
    fn format(&self) -> SampleFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        for slot in buf.chunks_exact_mut(2) {
            let Some(sample) = self.source.next() else {
                break;
            };
            slot.copy_from_slice(&f32_to_i16(sample).to_ne_bytes());
            n += 1;
        }
        self.samples += n as u64;
        Ok(n)
    }

    fn seek(&mut self, position: u32) -> Result<()> {
        let target = Duration::from_secs(u64::from(position));
        self.source
            .try_seek(target)
            .map_err(|e| Error::backend(NAME, format!("seek failed: {e}")))?;
        self.base = target;
        self.samples = 0;
        Ok(())
    }

    fn position(&self) -> Result<u32> {
        let per_sec = u64::from(self.format.rate) * u64::from(self.format.channels);
        if per_sec == 0 {
            return Ok(self.base.as_secs() as u32);
        }
        Ok((self.base.as_secs() + self.samples / per_sec) as u32)
    }
}
