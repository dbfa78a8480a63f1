//! Playback coordinator.
//!
//! A [`Player`] owns one worker thread that streams the current track from
//! its decoder backend to the output backend. The UI thread drives it
//! through the public operations, which update a `(state, command)` pair
//! under one mutex and signal the worker through a condition variable.
//!
//! Lock order: the control lock comes first; the published-state,
//! current-track, output, decoder, source and options locks are leaves and
//! are never nested with each other. Status readers only take leaves. Views are only locked with at most the control lock held.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::config::PlayerSettings;
use crate::error::{Error, Result};
use crate::plugin::{Decoder, OutputPlugin};
use crate::track::{self, ByteOrder, Track, TrackRegistry};
use crate::view::{Source, Views};

mod status;
mod worker;

pub use status::{Status, format_time, render_status};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

impl PlayerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

/// The latest request the worker has to honor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
    Stop,
    Quit,
}

/// Playback options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Options {
    /// Advance to the next track at end of stream.
    pub continue_playback: bool,
    /// Wrap around at either end of the playback source.
    pub repeat_all: bool,
    /// Replay the finished track.
    pub repeat_track: bool,
}

impl From<&PlayerSettings> for Options {
    fn from(s: &PlayerSettings) -> Self {
        Self {
            continue_playback: s.continue_playback,
            repeat_all: s.repeat_all,
            repeat_track: s.repeat_track,
        }
    }
}

/// Where the player sends notifications. Called from the worker thread,
/// sometimes with the control lock held: implementations must not call
/// back into the player.
pub trait Reporter: Send + Sync {
    /// State, position, volume or options changed.
    fn status_changed(&self) {}

    /// A different track became current.
    fn track_changed(&self) {}

    fn error(&self, message: &str);
}

struct Control {
    state: PlayerState,
    command: Command,
}

struct OutputSlot {
    plugin: Option<Box<dyn OutputPlugin>>,
    open: bool,
}

struct Shared {
    control: Mutex<Control>,
    cond: Condvar,
    // Copy of `Control::state` for readers that must not wait on the control lock.
    state: Mutex<PlayerState>,
    track: Mutex<Option<Arc<Track>>>,
    output: Mutex<OutputSlot>,
    decoder: Mutex<Option<Box<dyn Decoder>>>,
    source: Mutex<Source>,
    options: Mutex<Options>,
    registry: Arc<TrackRegistry>,
    views: Arc<Views>,
    reporter: Arc<dyn Reporter>,
    host_order: ByteOrder,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        track::lock(&self.control)
    }

    /// Change the state; the caller holds the control lock.
    fn set_state(&self, control: &mut Control, state: PlayerState) {
        control.state = state;
        *track::lock(&self.state) = state;
    }

    fn state(&self) -> PlayerState {
        *track::lock(&self.state)
    }

    fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, Control>,
        cond: impl FnMut(&mut Control) -> bool,
    ) -> MutexGuard<'a, Control> {
        self.cond
            .wait_while(guard, cond)
            .unwrap_or_else(|e| e.into_inner())
    }

    fn current_track(&self) -> Option<Arc<Track>> {
        track::lock(&self.track).clone()
    }

    /// Replace the current track, moving the registry hold along.
    fn set_current(&self, new: Option<Arc<Track>>) {
        if let Some(t) = &new {
            self.registry.hold(t);
        }
        self.set_current_held(new);
    }

    /// Like [`Shared::set_current`] for a track whose hold the caller
    /// already took.
    fn set_current_held(&self, new: Option<Arc<Track>>) {
        let old = std::mem::replace(&mut *track::lock(&self.track), new);
        if let Some(t) = old {
            self.registry.release(&t);
        }
        self.reporter.track_changed();
    }

    fn options(&self) -> Options {
        *track::lock(&self.options)
    }

    fn source(&self) -> Source {
        *track::lock(&self.source)
    }

    /// Next track: the queue first, then the playback source. The track
    /// comes with a registry hold that the caller owns.
    fn next_track(&self, repeat_all: bool) -> Option<Arc<Track>> {
        if let Some(t) = self.views.queue.take_next() {
            return Some(t);
        }
        let t = self.views.source(self.source()).next_track(repeat_all)?;
        self.registry.hold(&t);
        Some(t)
    }

    fn report(&self, err: &Error) {
        tracing::warn!("{err}");
        self.reporter.error(&err.to_string());
    }
}

pub struct Player {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Create the player and start its worker thread. A missing output
    /// backend is reported, not fatal: playback attempts fail until
    /// another backend is selected.
    pub fn new(
        registry: Arc<TrackRegistry>,
        views: Arc<Views>,
        reporter: Arc<dyn Reporter>,
        settings: &PlayerSettings,
    ) -> Result<Self> {
        let plugin = match registry.plugins().create_output(&settings.output_plugin) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("{e}");
                reporter.error(&e.to_string());
                None
            }
        };

        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                state: PlayerState::Stopped,
                command: Command::Stop,
            }),
            cond: Condvar::new(),
            state: Mutex::new(PlayerState::Stopped),
            track: Mutex::new(None),
            output: Mutex::new(OutputSlot {
                plugin,
                open: false,
            }),
            decoder: Mutex::new(None),
            source: Mutex::new(settings.source.into()),
            options: Mutex::new(Options::from(settings)),
            registry,
            views,
            reporter,
            host_order: ByteOrder::host(),
        });

        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("cadenza-player".into())
            .spawn(move || worker::run(&worker_shared))
            .map_err(|e| Error::backend("player", e))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Current state. Never waits on a state transition in progress.
    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.shared.current_track()
    }

    /// Start playing the current track, or the next one if there is none.
    /// From `Playing` the track is stopped first and restarted.
    pub fn play(&self) {
        let mut control = self.shared.control();
        if control.state == PlayerState::Playing {
            control.command = Command::Stop;
            self.shared.cond.notify_all();
            control = self
                .shared
                .wait_while(control, |c| c.state != PlayerState::Stopped);
        }
        if control.command != Command::Quit {
            control.command = Command::Play;
            self.shared.cond.notify_all();
        }
    }

    /// Toggle between playing and paused. Does nothing while stopped.
    pub fn pause(&self) {
        let mut control = self.shared.control();
        match control.state {
            PlayerState::Playing => control.command = Command::Pause,
            PlayerState::Paused => {
                control.command = Command::Play;
                self.shared.cond.notify_all();
            }
            PlayerState::Stopped => {}
        }
    }

    /// Stop and wait until the decoder and output are shut down.
    pub fn stop(&self) {
        let mut control = self.shared.control();
        if control.command != Command::Quit {
            control.command = Command::Stop;
        }
        if control.state == PlayerState::Stopped {
            return;
        }
        self.shared.cond.notify_all();
        let _control = self
            .shared
            .wait_while(control, |c| c.state != PlayerState::Stopped);
    }

    pub fn play_track(&self, track: Arc<Track>) {
        self.shared.registry.hold(&track);
        self.play_held(track);
    }

    fn play_held(&self, track: Arc<Track>) {
        self.stop();
        self.shared.set_current_held(Some(track));
        self.play();
    }

    pub fn play_next(&self) {
        let repeat_all = self.shared.options().repeat_all;
        if let Some(t) = self.shared.next_track(repeat_all) {
            self.play_held(t);
        }
    }

    pub fn play_prev(&self) {
        let repeat_all = self.shared.options().repeat_all;
        let source = self.shared.source();
        if let Some(t) = self.shared.views.source(source).prev_track(repeat_all) {
            self.play_track(t);
        }
    }

    /// Seek to `offset` seconds, or by `offset` seconds when `relative`.
    /// The target is clamped to the track's duration when it is known.
    pub fn seek(&self, offset: i64, relative: bool) {
        if self.state() == PlayerState::Stopped {
            return;
        }
        let duration = self.current_track().map(|t| t.duration()).unwrap_or(0);

        let result = {
            let mut decoder = track::lock(&self.shared.decoder);
            match decoder.as_mut() {
                Some(d) => {
                    let base = if relative {
                        i64::from(d.position().unwrap_or(0))
                    } else {
                        0
                    };
                    let mut target = base.saturating_add(offset).max(0);
                    if duration > 0 {
                        target = target.min(i64::from(duration));
                    }
                    let target = u32::try_from(target).unwrap_or(u32::MAX);
                    tracing::debug!(target, "seek");
                    d.seek(target)
                }
                None => Ok(()),
            }
        };
        if let Err(e) = result {
            self.shared.report(&e);
        }
        self.shared.reporter.status_changed();
    }

    /// Set the output volume (0-100), or change it by `level` when
    /// `relative`. Does nothing without volume support.
    pub fn set_volume(&self, level: i32, relative: bool) {
        let result = {
            let mut out = track::lock(&self.shared.output);
            let Some(plugin) = out.plugin.as_mut().filter(|p| p.volume_support()) else {
                return;
            };
            let base = if relative {
                plugin.volume().map(i32::from).unwrap_or(0)
            } else {
                0
            };
            let target = base.saturating_add(level).clamp(0, 100) as u8;
            plugin.set_volume(target)
        };
        if let Err(e) = result {
            self.shared.report(&e);
        }
        self.shared.reporter.status_changed();
    }

    pub fn volume(&self) -> Option<u8> {
        let out = track::lock(&self.shared.output);
        let plugin = out.plugin.as_ref().filter(|p| p.volume_support())?;
        plugin.volume().ok()
    }

    pub fn set_source(&self, source: Source) {
        *track::lock(&self.shared.source) = source;
        self.shared.reporter.status_changed();
    }

    pub fn source(&self) -> Source {
        self.shared.source()
    }

    pub fn options(&self) -> Options {
        self.shared.options()
    }

    pub fn set_options(&self, options: Options) {
        *track::lock(&self.shared.options) = options;
        self.shared.reporter.status_changed();
    }

    /// Name of the selected output backend.
    pub fn output_name(&self) -> Option<String> {
        let out = track::lock(&self.shared.output);
        out.plugin.as_ref().map(|p| p.name().to_string())
    }

    /// Stop, close the current output backend and switch to `name`.
    pub fn change_output_backend(&self, name: &str) -> Result<()> {
        self.stop();
        let mut out = track::lock(&self.shared.output);
        close_output(&mut out);
        out.plugin = None;
        let mut plugin = self.shared.registry.plugins().create_output(name)?;
        plugin.open()?;
        tracing::info!(plugin = plugin.name(), "output backend selected");
        out.plugin = Some(plugin);
        out.open = true;
        Ok(())
    }

    /// Stop, then close and reopen the current output backend so that
    /// changed backend parameters take effect.
    pub fn reopen_output_backend(&self) -> Result<()> {
        self.stop();
        let mut out = track::lock(&self.shared.output);
        close_output(&mut out);
        let plugin = out.plugin.as_mut().ok_or(Error::NoOutput)?;
        plugin.open()?;
        out.open = true;
        Ok(())
    }

    /// Snapshot for the status line.
    pub fn status(&self) -> Status {
        let state = self.state();
        let track = self.current_track();
        let position = if state == PlayerState::Stopped {
            0
        } else {
            track::lock(&self.shared.decoder)
                .as_ref()
                .and_then(|d| d.position().ok())
                .unwrap_or(0)
        };
        Status {
            state,
            position,
            duration: track.as_ref().map(|t| t.duration()).unwrap_or(0),
            volume: self.volume(),
            options: self.options(),
            source: self.source(),
            track,
        }
    }

    /// Stop playback, end the worker thread and close the output.
    pub fn shutdown(&self) {
        let Some(handle) = track::lock(&self.worker).take() else {
            return;
        };
        self.stop();
        {
            let mut control = self.shared.control();
            control.command = Command::Quit;
            self.shared.cond.notify_all();
        }
        if handle.join().is_err() {
            tracing::error!("player thread panicked");
        }
        close_output(&mut track::lock(&self.shared.output));
        self.shared.set_current(None);
        tracing::info!("player shut down");
    }

    /// Wait until `pred` holds for the player state, or `timeout` passes.
    #[cfg(test)]
    fn wait_for_state(&self, pred: impl Fn(PlayerState) -> bool, timeout: std::time::Duration) -> bool {
        let control = self.shared.control();
        let (control, _) = self
            .shared
            .cond
            .wait_timeout_while(control, timeout, |c| !pred(c.state))
            .unwrap_or_else(|e| e.into_inner());
        pred(control.state)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn close_output(out: &mut OutputSlot) {
    if out.open {
        if let Some(p) = out.plugin.as_mut() {
            p.close();
        }
        out.open = false;
    }
}

#[cfg(test)]
mod tests;
