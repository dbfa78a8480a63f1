//! Command execution against the player and the views.

use crate::command::{Command, Flag, Setting};
use crate::error::Result;
use crate::player::{Options, PlayerState};
use crate::view::Activation;

use super::model::{App, ViewKind};
use super::notice::Notice;

fn set_flag(options: &mut Options, flag: Flag, value: bool) {
    match flag {
        Flag::Continue => options.continue_playback = value,
        Flag::RepeatAll => options.repeat_all = value,
        Flag::RepeatTrack => options.repeat_track = value,
    }
}

fn flag_value(options: &Options, flag: Flag) -> bool {
    match flag {
        Flag::Continue => options.continue_playback,
        Flag::RepeatAll => options.repeat_all,
        Flag::RepeatTrack => options.repeat_track,
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

impl App {
    /// Parse and execute one `:` command line.
    pub fn run_line(&mut self, line: &str) {
        match Command::parse(line) {
            Ok(cmd) => self.execute(cmd),
            Err(e) => self.error(e.to_string()),
        }
    }

    /// Execute `cmd`. Failures end up on the message line; success clears
    /// it unless the command has something to say.
    pub fn execute(&mut self, cmd: Command) {
        tracing::debug!(?cmd, "executing command");
        match self.apply(cmd) {
            Ok(Some(info)) => self.info(info),
            Ok(None) => self.clear_message(),
            Err(e) => {
                tracing::warn!("{e}");
                self.error(e.to_string());
            }
        }
    }

    fn apply(&mut self, cmd: Command) -> Result<Option<String>> {
        let player = self.player.clone();
        match cmd {
            Command::Play => player.play(),
            Command::Pause => player.pause(),
            Command::Stop => player.stop(),
            Command::PlayNext => player.play_next(),
            Command::PlayPrev => player.play_prev(),
            Command::Seek { offset, relative } => player.seek(offset, relative),
            Command::SetVolume { level, relative } => player.set_volume(level, relative),
            Command::SetSource(source) => {
                player.set_source(source);
                return Ok(Some(format!("playback source: {source}")));
            }
            Command::Set(Setting::Flag(flag, value)) => {
                let mut options = player.options();
                set_flag(&mut options, flag, value);
                player.set_options(options);
            }
            Command::Set(Setting::OutputPlugin(name)) => {
                player.change_output_backend(&name)?;
                return Ok(Some(format!("output plugin: {name}")));
            }
            Command::Toggle(flag) => {
                let mut options = player.options();
                let value = !flag_value(&options, flag);
                set_flag(&mut options, flag, value);
                player.set_options(options);
                let state = if value { "on" } else { "off" };
                return Ok(Some(format!("{}: {state}", flag.name())));
            }
            Command::ReopenOutput => player.reopen_output_backend()?,
            Command::AddPath(path) => {
                let n = self.views.library.add_path(&path)?;
                return Ok(Some(format!("added {n} track{}", plural(n))));
            }
            Command::LoadPlaylist(path) => {
                let n = self.views.playlist.load(&path)?;
                self.set_view(ViewKind::Playlist);
                return Ok(Some(format!("loaded {n} track{}", plural(n))));
            }
            Command::Cd(path) => {
                self.views.browser.cd(&path)?;
                self.set_view(ViewKind::Browser);
            }
            Command::AddQueue => self.add_selected_to_queue(),
            Command::ClearQueue => self.views.queue.clear(),
            Command::UpdateCache => {
                self.registry.refresh_metadata();
                self.registry.flush_cache()?;
                self.views.library.sort();
                return Ok(Some("metadata cache updated".to_string()));
            }
            Command::Quit => self.request_quit(),
        }
        Ok(None)
    }

    /// Play the selected entry, or enter it when it is a directory.
    pub fn activate(&mut self) {
        match self.active_view().activate() {
            Ok(Activation::Play(track)) => {
                self.player.play_track(track);
                self.clear_message();
            }
            Ok(Activation::Entered) => self.clear_message(),
            Ok(Activation::Nothing) => {}
            Err(e) => self.error(e.to_string()),
        }
    }

    /// Space bar: start playback when stopped, otherwise toggle pause.
    pub fn play_pause(&mut self) {
        if self.player.state() == PlayerState::Stopped {
            self.execute(Command::Play);
        } else {
            self.execute(Command::Pause);
        }
    }

    pub fn add_selected_to_queue(&mut self) {
        if let Some(track) = self.active_view().selected_track() {
            self.views.queue.push(track);
        }
    }

    pub fn delete_selected(&mut self) {
        self.active_view().delete_selected();
    }

    /// Move the selected queue entry; other views ignore this.
    pub fn move_queued(&mut self, up: bool) {
        if self.view_kind() == ViewKind::Queue {
            self.views.queue.move_selected(up);
        }
    }

    /// In the browser, go to the parent directory.
    pub fn browse_up(&mut self) {
        if self.view_kind() != ViewKind::Browser {
            return;
        }
        let Some(parent) = self.views.browser.dir().and_then(|d| d.parent().map(|p| p.to_path_buf())) else {
            return;
        };
        self.execute(Command::Cd(parent));
    }

    pub fn handle_notice(&mut self, notice: Notice) {
        if let Notice::Error(message) = notice {
            self.error(message);
        }
    }
}
