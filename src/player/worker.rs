//! The playback thread.

use std::sync::{Arc, MutexGuard};

use crate::error::{Error, Result};
use crate::plugin::Decoder;
use crate::track::{self, SampleFormat, Track, swap_sample_bytes};

use super::{Command, Control, PlayerState, Shared};

/// Why streaming stopped.
pub(super) enum Exit {
    EndOfStream,
    Stopped,
    Failed(Error),
}

/// What the inner loop needs for one track.
struct Stream {
    buffer: Vec<u8>,
    sample_bytes: usize,
    // Sample width to byte-swap, when the decoder's byte order is not the host's.
    swap: Option<usize>,
}

pub(super) fn run(shared: &Arc<Shared>) {
    tracing::debug!("player thread started");
    let mut control = shared.control();
    loop {
        control = shared.wait_while(control, |c| {
            matches!(c.command, Command::Stop | Command::Pause)
        });
        if control.command == Command::Quit {
            break;
        }

        let track = match shared.current_track() {
            Some(t) => Some(t),
            None => {
                let next = shared.next_track(shared.options().repeat_all);
                if next.is_some() {
                    shared.set_current_held(next.clone());
                }
                next
            }
        };
        let Some(track) = track else {
            tracing::debug!("nothing to play");
            control.command = Command::Stop;
            shared.reporter.status_changed();
            continue;
        };

        let mut stream = match open(shared, &track) {
            Ok(s) => s,
            Err(e) => {
                control.command = Command::Stop;
                shared.report(&e);
                shared.cond.notify_all();
                continue;
            }
        };

        tracing::debug!(path = %track.path().display(), "playing");
        shared.set_state(&mut control, PlayerState::Playing);
        shared.cond.notify_all();
        shared.reporter.status_changed();
        drop(control);

        let exit = stream_track(shared, &mut stream);
        close(shared, &track);

        control = shared.control();
        finish(shared, &mut control, exit, &track);
        tracing::debug!("stopped");
        shared.reporter.status_changed();
        shared.cond.notify_all();
    }
    tracing::debug!("player thread exiting");
}

/// Enter `Stopped` after `track` stopped streaming and decide whether the
/// worker goes on.
pub(super) fn finish(
    shared: &Shared,
    control: &mut MutexGuard<'_, Control>,
    exit: Exit,
    track: &Arc<Track>,
) {
    shared.set_state(control, PlayerState::Stopped);
    match exit {
        Exit::EndOfStream => match control.command {
            Command::Play => advance(shared, control, track),
            // A pause that arrived after the last chunk: move on, but stay stopped.
            Command::Pause => {
                advance(shared, control, track);
                control.command = Command::Stop;
            }
            Command::Stop | Command::Quit => {}
        },
        Exit::Stopped => {}
        Exit::Failed(e) => {
            if control.command != Command::Quit {
                control.command = Command::Stop;
            }
            shared.report(&e);
        }
    }
}

/// Pick what plays after `finished` reached its end.
fn advance(shared: &Shared, control: &mut MutexGuard<'_, Control>, finished: &Arc<Track>) {
    let options = shared.options();
    if options.repeat_track {
        return;
    }
    let next = if options.continue_playback {
        shared.next_track(options.repeat_all)
    } else {
        None
    };
    match next {
        Some(t) => {
            if Arc::ptr_eq(&t, finished) {
                shared.registry.release(&t);
            } else {
                shared.set_current_held(Some(t));
            }
        }
        None => control.command = Command::Stop,
    }
}

/// Open the decoder, then open (if needed) and start the output.
fn open(shared: &Shared, track: &Arc<Track>) -> Result<Stream> {
    let input = track
        .input()
        .or_else(|| shared.registry.plugins().input_for_path(track.path()))
        .ok_or_else(|| Error::UnsupportedFormat {
            path: track.path().to_path_buf(),
        })?;
    let decoder = input.open(track.path())?;
    let format = decoder.format();

    let swap = (format.byte_order != shared.host_order).then(|| format.bytes_per_sample());
    let out_format = SampleFormat {
        byte_order: shared.host_order,
        ..format
    };

    let size = match start_output(shared, out_format) {
        Ok(size) => size,
        Err(e) => {
            decoder.close();
            return Err(e);
        }
    };

    track.set_format(Some(format));
    *track::lock(&shared.decoder) = Some(decoder);
    Ok(Stream {
        buffer: vec![0; size],
        sample_bytes: format.bytes_per_sample().max(1),
        swap,
    })
}

fn start_output(shared: &Shared, format: SampleFormat) -> Result<usize> {
    let mut out = track::lock(&shared.output);
    let slot = &mut *out;
    let plugin = slot.plugin.as_mut().ok_or(Error::NoOutput)?;

    if !slot.open {
        plugin.open()?;
        slot.open = true;
    }
    plugin.start(format)?;

    let size = plugin.buffer_size();
    if size == 0 {
        let _ = plugin.stop();
        return Err(Error::ZeroBuffer {
            plugin: plugin.name().to_string(),
        });
    }
    Ok(size)
}

/// Decode and write chunks until end of stream, an error, or a stop.
fn stream_track(shared: &Shared, stream: &mut Stream) -> Exit {
    loop {
        let read = {
            let mut decoder = track::lock(&shared.decoder);
            match decoder.as_mut() {
                Some(d) => d.read(&mut stream.buffer),
                None => return Exit::Stopped,
            }
        };
        let samples = match read {
            Ok(0) => return Exit::EndOfStream,
            Ok(n) => n,
            Err(e) => return Exit::Failed(e),
        };

        let len = (samples * stream.sample_bytes).min(stream.buffer.len());
        let chunk = &mut stream.buffer[..len];
        if let Some(width) = stream.swap {
            swap_sample_bytes(chunk, width);
        }

        let written = {
            let mut out = track::lock(&shared.output);
            match out.plugin.as_mut() {
                Some(p) => p.write(chunk),
                None => Err(Error::NoOutput),
            }
        };
        if let Err(e) = written {
            return Exit::Failed(e);
        }

        let mut control = shared.control();
        match control.command {
            Command::Play => {}
            Command::Stop | Command::Quit => return Exit::Stopped,
            Command::Pause => {
                shared.set_state(&mut control, PlayerState::Paused);
                shared.cond.notify_all();
                shared.reporter.status_changed();
                tracing::debug!("paused");

                control = shared.wait_while(control, |c| c.command == Command::Pause);
                if control.command != Command::Play {
                    return Exit::Stopped;
                }
                shared.set_state(&mut control, PlayerState::Playing);
                shared.cond.notify_all();
                shared.reporter.status_changed();
                tracing::debug!("resumed");
            }
        }
    }
}

/// Close the decoder and stop the output, closing it if stopping fails.
fn close(shared: &Shared, track: &Track) {
    let decoder: Option<Box<dyn Decoder>> = track::lock(&shared.decoder).take();
    if let Some(d) = decoder {
        d.close();
    }

    let mut out = track::lock(&shared.output);
    let slot = &mut *out;
    if let Some(plugin) = slot.plugin.as_mut() {
        if let Err(e) = plugin.stop() {
            tracing::warn!("{e}; closing output");
            plugin.close();
            slot.open = false;
        }
    }
    track.set_format(None);
}
