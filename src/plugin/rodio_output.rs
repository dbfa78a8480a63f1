//! Output backend that feeds PCM chunks into a `rodio` sink.
//!
//! The `OutputStream` lives on its own device thread so the backend itself
//! can move between threads; the sink only needs the stream's mixer.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::mixer::Mixer;
use rodio::{OutputStreamBuilder, Sink};

use crate::config::OutputSettings;
use crate::error::{Error, Result};
use crate::track::{ByteOrder, SampleFormat};

use super::OutputPlugin;

const NAME: &str = "rodio";

struct Device {
    mixer: Mixer,
    shutdown: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

pub struct RodioOutput {
    buffer_frames: usize,
    queue_depth: usize,
    device: Option<Device>,
    sink: Option<Sink>,
    format: Option<SampleFormat>,
    gain: f32,
}

impl RodioOutput {
    pub fn new(settings: &OutputSettings) -> Self {
        Self {
            buffer_frames: settings.buffer_frames,
            queue_depth: settings.queue_depth.max(1),
            device: None,
            sink: None,
            format: None,
            gain: 1.0,
        }
    }
}

/// Gain (0.0..=1.0) to a volume percentage, rounded to nearest.
pub(super) fn gain_to_percent(gain: f32) -> u8 {
    (gain.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub(super) fn percent_to_gain(level: u8) -> f32 {
    f32::from(level.min(100)) / 100.0
}

/// Decode interleaved PCM in `format` to float samples.
pub(super) fn pcm_to_f32(buf: &[u8], format: &SampleFormat) -> Vec<f32> {
    let width = format.bytes_per_sample();
    let big = format.byte_order == ByteOrder::Big;
    buf.chunks_exact(width)
        .map(|b| match width {
            1 => f32::from(b[0] as i8) / 128.0,
            2 => {
                let v = if big {
                    i16::from_be_bytes([b[0], b[1]])
                } else {
                    i16::from_le_bytes([b[0], b[1]])
                };
                f32::from(v) / 32768.0
            }
            3 => {
                let v = if big {
                    i32::from_be_bytes([b[0], b[1], b[2], 0])
                } else {
                    i32::from_le_bytes([0, b[0], b[1], b[2]])
                };
                (v >> 8) as f32 / 8_388_608.0
            }
            _ => {
                let v = if big {
                    i32::from_be_bytes([b[0], b[1], b[2], b[3]])
                } else {
                    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
                };
                v as f32 / 2_147_483_648.0
            }
        })
        .collect()
}

impl OutputPlugin for RodioOutput {
    fn name(&self) -> &str {
        NAME
    }

    fn open(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<Mixer, String>>();
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("cadenza-rodio".into())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                // rodio logs to stderr when the stream is dropped, which
                // would scribble over the TUI.
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(stream.mixer().clone()));
                let _ = shutdown_rx.recv();
            })
            .map_err(|e| Error::backend(NAME, e))?;

        match ready_rx.recv() {
            Ok(Ok(mixer)) => {
                self.device = Some(Device {
                    mixer,
                    shutdown,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(Error::backend(NAME, e))
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::backend(NAME, "device thread exited"))
            }
        }
    }

    fn close(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        if let Some(device) = self.device.take() {
            let _ = device.shutdown.send(());
            let _ = device.thread.join();
        }
        self.format = None;
    }

    fn start(&mut self, format: SampleFormat) -> Result<()> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| Error::backend(NAME, "device not open"))?;
        let sink = Sink::connect_new(&device.mixer);
        sink.set_volume(self.gain);
        sink.play();
        self.sink = Some(sink);
        self.format = Some(format);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.format = None;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let (Some(sink), Some(format)) = (self.sink.as_ref(), self.format.as_ref()) else {
            return Err(Error::backend(NAME, "output not started"));
        };
        let samples = pcm_to_f32(buf, format);
        sink.append(SamplesBuffer::new(format.channels, format.rate, samples));

        // Back-pressure: keep only a few chunks queued in the mixer.
        while sink.len() > self.queue_depth {
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.format
            .map(|f| self.buffer_frames * f.frame_bytes())
            .unwrap_or(0)
    }

    fn volume_support(&self) -> bool {
        true
    }

    fn volume(&self) -> Result<u8> {
        Ok(gain_to_percent(self.gain))
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        self.gain = percent_to_gain(level);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.gain);
        }
        Ok(())
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(bits: u8, byte_order: ByteOrder) -> SampleFormat {
        SampleFormat {
            bits,
            channels: 2,
            rate: 44_100,
            byte_order,
        }
    }

    #[test]
    fn volume_rounds_to_nearest_percent() {
        assert_eq!(gain_to_percent(0.0), 0);
        assert_eq!(gain_to_percent(0.494), 49);
        assert_eq!(gain_to_percent(0.496), 50);
        assert_eq!(gain_to_percent(1.0), 100);
        assert_eq!(gain_to_percent(1.7), 100);
        for level in 0..=100u8 {
            assert_eq!(gain_to_percent(percent_to_gain(level)), level);
        }
    }

    #[test]
    fn pcm16_decodes_in_either_byte_order() {
        let le = pcm_to_f32(&0x4000i16.to_le_bytes(), &fmt(16, ByteOrder::Little));
        let be = pcm_to_f32(&0x4000i16.to_be_bytes(), &fmt(16, ByteOrder::Big));
        assert_eq!(le, vec![0.5]);
        assert_eq!(be, vec![0.5]);
    }

    #[test]
    fn pcm24_sign_extends() {
        // -1 in 24-bit little endian.
        let out = pcm_to_f32(&[0xff, 0xff, 0xff], &fmt(24, ByteOrder::Little));
        assert!(out[0] < 0.0);
        assert!(out[0] > -0.001);
    }

    #[test]
    fn buffer_size_is_zero_until_started() {
        let out = RodioOutput::new(&OutputSettings::default());
        assert_eq!(out.buffer_size(), 0);
    }

    #[test]
    fn write_before_start_fails() {
        let mut out = RodioOutput::new(&OutputSettings::default());
        assert!(out.write(&[0, 0]).is_err());
    }
}
