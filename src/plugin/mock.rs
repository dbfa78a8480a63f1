//! Scriptable backends for tests. Every call is appended to a shared log.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::track::{ByteOrder, Metadata, SampleFormat};

use super::{Decoder, InputPlugin, OutputPlugin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DecoderOpen(PathBuf),
    DecoderClose(PathBuf),
    Seek(u32),
    OutputOpen,
    OutputClose,
    OutputStart,
    OutputStop,
    /// First two bytes of a written chunk.
    Write([u8; 2]),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    pub fn push(&self, e: Event) {
        self.0.lock().unwrap().push(e);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }

    pub fn position(&self, e: &Event) -> Option<usize> {
        self.events().iter().position(|x| x == e)
    }
}

pub struct MockInput {
    pub name: &'static str,
    pub extensions: Vec<&'static str>,
    pub priority: i32,
    pub log: Log,
    /// Chunks each stream yields before end of stream; `None` streams forever.
    pub chunks: Option<usize>,
    pub byte_order: ByteOrder,
    pub duration: u32,
    pub fail_open: bool,
    /// Fail reads after this many chunks.
    pub fail_read_after: Option<usize>,
}

impl MockInput {
    pub fn new(name: &'static str, extensions: &[&'static str], log: Log) -> Self {
        Self {
            name,
            extensions: extensions.to_vec(),
            priority: 0,
            log,
            chunks: None,
            byte_order: ByteOrder::host(),
            duration: 200,
            fail_open: false,
            fail_read_after: None,
        }
    }
}

impl InputPlugin for MockInput {
    fn name(&self) -> &str {
        self.name
    }

    fn extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Decoder>> {
        if self.fail_open {
            return Err(Error::backend(self.name, "cannot open"));
        }
        self.log.push(Event::DecoderOpen(path.to_path_buf()));
        Ok(Box::new(MockDecoder {
            path: path.to_path_buf(),
            log: self.log.clone(),
            remaining: self.chunks,
            reads: 0,
            fail_read_after: self.fail_read_after,
            position: 0,
            format: SampleFormat {
                bits: 16,
                channels: 2,
                rate: 44_100,
                byte_order: self.byte_order,
            },
        }))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata> {
        Ok(Metadata {
            title: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
            duration: self.duration,
            ..Metadata::default()
        })
    }
}

struct MockDecoder {
    path: PathBuf,
    log: Log,
    remaining: Option<usize>,
    reads: usize,
    fail_read_after: Option<usize>,
    position: u32,
    format: SampleFormat,
}

impl Decoder for MockDecoder {
    fn format(&self) -> SampleFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.fail_read_after.is_some_and(|n| self.reads >= n) {
            return Err(Error::backend("mock", "read error"));
        }
        if let Some(left) = self.remaining.as_mut() {
            if *left == 0 {
                return Ok(0);
            }
            *left -= 1;
        }
        self.reads += 1;
        for pair in buf.chunks_exact_mut(2) {
            pair.copy_from_slice(&[1, 2]);
        }
        Ok(buf.len() / 2)
    }

    fn seek(&mut self, position: u32) -> Result<()> {
        self.log.push(Event::Seek(position));
        self.position = position;
        Ok(())
    }

    fn position(&self) -> Result<u32> {
        Ok(self.position)
    }

    fn close(self: Box<Self>) {
        self.log.push(Event::DecoderClose(self.path.clone()));
    }
}

pub struct MockOutput {
    pub name: &'static str,
    pub log: Log,
    pub buffer_size: usize,
    /// `None` means no volume support.
    pub volume: Option<u8>,
    pub fail_open: bool,
    pub fail_stop: bool,
    pub write_delay: Duration,
    pub started: bool,
}

impl MockOutput {
    pub fn new(log: Log) -> Self {
        Self {
            name: "mock",
            log,
            buffer_size: 64,
            volume: Some(50),
            fail_open: false,
            fail_stop: false,
            write_delay: Duration::from_millis(1),
            started: false,
        }
    }
}

impl OutputPlugin for MockOutput {
    fn name(&self) -> &str {
        self.name
    }

    fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(Error::backend(self.name, "no device"));
        }
        self.log.push(Event::OutputOpen);
        Ok(())
    }

    fn close(&mut self) {
        self.log.push(Event::OutputClose);
    }

    fn start(&mut self, _format: SampleFormat) -> Result<()> {
        self.log.push(Event::OutputStart);
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(Event::OutputStop);
        self.started = false;
        if self.fail_stop {
            return Err(Error::backend(self.name, "stop failed"));
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.log.push(Event::Write([buf[0], buf[1]]));
        thread::sleep(self.write_delay);
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn volume_support(&self) -> bool {
        self.volume.is_some()
    }

    fn volume(&self) -> Result<u8> {
        self.volume
            .ok_or_else(|| Error::backend(self.name, "volume not supported"))
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        match self.volume.as_mut() {
            Some(v) => {
                *v = level;
                Ok(())
            }
            None => Err(Error::backend(self.name, "volume not supported")),
        }
    }
}
