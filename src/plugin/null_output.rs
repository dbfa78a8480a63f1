//! Output backend that discards samples, paced at the stream's real rate.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::track::SampleFormat;

use super::OutputPlugin;

const FRAMES: usize = 4096;

pub struct NullOutput {
    open: bool,
    format: Option<SampleFormat>,
    started: Option<Instant>,
    written_frames: u64,
}

impl NullOutput {
    pub fn new() -> Self {
        Self {
            open: false,
            format: None,
            started: None,
            written_frames: 0,
        }
    }
}

impl OutputPlugin for NullOutput {
    fn name(&self) -> &str {
        "null"
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.format = None;
    }

    fn start(&mut self, format: SampleFormat) -> Result<()> {
        if !self.open {
            return Err(Error::backend("null", "not open"));
        }
        self.format = Some(format);
        self.started = Some(Instant::now());
        self.written_frames = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.format = None;
        self.started = None;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let (Some(format), Some(started)) = (self.format, self.started) else {
            return Err(Error::backend("null", "not started"));
        };
        let frame = format.frame_bytes().max(1);
        self.written_frames += (buf.len() / frame) as u64;

        if format.rate > 0 {
            let due = Duration::from_secs_f64(self.written_frames as f64 / f64::from(format.rate));
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.format.map(|f| FRAMES * f.frame_bytes()).unwrap_or(0)
    }
}
