use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::{App, Notice, Prompt, ViewKind};
use crate::command::{Command, Flag};
use crate::config;
use crate::menu::Scroll;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::player::PlayerState;
use crate::runtime::mpris_sync::MprisSync;
use crate::ui;
use crate::view::Nav;

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
    pub mpris: MprisSync,
}

/// Main terminal event loop: handles input, player notices, MPRIS requests
/// and drawing. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    mpris: &MprisHandle,
    control_rx: &Receiver<ControlCmd>,
    notices: &Receiver<Notice>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        while let Ok(notice) = notices.try_recv() {
            app.handle_notice(notice);
        }
        while let Ok(cmd) = control_rx.try_recv() {
            handle_control_cmd(cmd, app);
        }
        if app.should_quit() {
            return Ok(());
        }

        // Keep MPRIS in sync even when playback changes come from media keys
        // or the player advancing on its own.
        state.mpris.update(mpris, app);

        terminal.draw(|f| ui::draw(f, app, settings))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                handle_key_event(key, settings, app, state);
            }
        }
    }
}

fn handle_control_cmd(cmd: ControlCmd, app: &mut App) {
    let playback = app.player.state();
    match cmd {
        ControlCmd::Quit => app.execute(Command::Quit),
        ControlCmd::Play => match playback {
            PlayerState::Stopped => app.execute(Command::Play),
            PlayerState::Paused => app.execute(Command::Pause),
            PlayerState::Playing => {}
        },
        ControlCmd::Pause => {
            if playback == PlayerState::Playing {
                app.execute(Command::Pause);
            }
        }
        ControlCmd::PlayPause => app.play_pause(),
        ControlCmd::Stop => app.execute(Command::Stop),
        ControlCmd::Next => app.execute(Command::PlayNext),
        ControlCmd::Prev => app.execute(Command::PlayPrev),
    }
}

fn handle_prompt_key(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => app.cancel_prompt(),
        KeyCode::Enter => app.submit_prompt(),
        KeyCode::Backspace => app.pop_input(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.cancel_prompt();
        }
        KeyCode::Char(c) if !c.is_control() => app.push_input(c),
        _ => {}
    }
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    state: &mut EventLoopState,
) {
    if app.prompt().is_some() {
        handle_prompt_key(key, app);
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let seek = i64::from(settings.controls.seek_seconds);
    let step = i32::from(settings.controls.volume_step);

    // Two-key prefixes clear on any other key.
    let gg = std::mem::take(&mut state.pending_gg);
    let zz = std::mem::take(&mut state.pending_zz);

    match key.code {
        KeyCode::Char('d') if ctrl => app.navigate(Nav::ScrollDown(Scroll::HalfPage)),
        KeyCode::Char('u') if ctrl => app.navigate(Nav::ScrollUp(Scroll::HalfPage)),
        KeyCode::Char('f') if ctrl => app.navigate(Nav::ScrollDown(Scroll::Page)),
        KeyCode::Char('b') if ctrl => app.navigate(Nav::ScrollUp(Scroll::Page)),
        KeyCode::Char('e') if ctrl => app.navigate(Nav::ScrollDown(Scroll::Line)),
        KeyCode::Char('y') if ctrl => app.navigate(Nav::ScrollUp(Scroll::Line)),
        KeyCode::PageDown => app.navigate(Nav::ScrollDown(Scroll::Page)),
        KeyCode::PageUp => app.navigate(Nav::ScrollUp(Scroll::Page)),

        KeyCode::Char('q') => app.execute(Command::Quit),
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(kind) = ViewKind::from_key(c) {
                app.set_view(kind);
            }
        }
        KeyCode::Char(':') => app.begin_prompt(Prompt::Command),
        KeyCode::Char('/') => app.begin_prompt(Prompt::Search { backward: false }),
        KeyCode::Char('?') => app.begin_prompt(Prompt::Search { backward: true }),
        KeyCode::Char('n') => app.search_again(false),
        KeyCode::Char('N') => app.search_again(true),

        KeyCode::Char('j') | KeyCode::Down => app.navigate(Nav::Down),
        KeyCode::Char('k') | KeyCode::Up => app.navigate(Nav::Up),
        KeyCode::Char('g') => {
            if gg {
                app.navigate(Nav::First);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Home => app.navigate(Nav::First),
        KeyCode::Char('G') | KeyCode::End => app.navigate(Nav::Last),
        KeyCode::Char('z') => {
            if zz {
                app.navigate(Nav::Active);
            } else {
                state.pending_zz = true;
            }
        }

        KeyCode::Enter => app.activate(),
        KeyCode::Backspace => app.browse_up(),
        KeyCode::Char('p') | KeyCode::Char(' ') => app.play_pause(),
        KeyCode::Char('s') => app.execute(Command::Stop),
        KeyCode::Char('l') => app.execute(Command::PlayNext),
        KeyCode::Char('h') => app.execute(Command::PlayPrev),
        KeyCode::Char('L') | KeyCode::Right => app.execute(Command::Seek {
            offset: seek,
            relative: true,
        }),
        KeyCode::Char('H') | KeyCode::Left => app.execute(Command::Seek {
            offset: -seek,
            relative: true,
        }),
        KeyCode::Char('+') | KeyCode::Char('=') => app.execute(Command::SetVolume {
            level: step,
            relative: true,
        }),
        KeyCode::Char('-') => app.execute(Command::SetVolume {
            level: -step,
            relative: true,
        }),

        KeyCode::Char('c') => app.execute(Command::Toggle(Flag::Continue)),
        KeyCode::Char('r') => app.execute(Command::Toggle(Flag::RepeatAll)),
        KeyCode::Char('t') => app.execute(Command::Toggle(Flag::RepeatTrack)),

        KeyCode::Char('e') => app.execute(Command::AddQueue),
        KeyCode::Char('D') | KeyCode::Delete => app.delete_selected(),
        KeyCode::Char('J') => app.move_queued(false),
        KeyCode::Char('K') => app.move_queued(true),
        _ => {}
    }
}
