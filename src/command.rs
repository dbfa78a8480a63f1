//! The `:` command language.
//!
//! Commands are parsed into [`Command`] values and executed by the
//! application against the player and the views. Range checks that do not
//! depend on runtime state happen here, at parse time.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::view::Source;

/// Boolean player options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flag {
    Continue,
    RepeatAll,
    RepeatTrack,
}

impl Flag {
    pub fn name(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::RepeatAll => "repeat-all",
            Self::RepeatTrack => "repeat-track",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "continue" => Ok(Self::Continue),
            "repeat-all" => Ok(Self::RepeatAll),
            "repeat-track" => Ok(Self::RepeatTrack),
            other => Err(invalid(format!("unknown option '{other}'"))),
        }
    }
}

/// Value assignments accepted by `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Flag(Flag, bool),
    OutputPlugin(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    PlayNext,
    PlayPrev,
    /// Seconds; relative offsets may be negative.
    Seek { offset: i64, relative: bool },
    SetVolume { level: i32, relative: bool },
    SetSource(Source),
    Set(Setting),
    Toggle(Flag),
    ReopenOutput,
    AddPath(PathBuf),
    LoadPlaylist(PathBuf),
    Cd(PathBuf),
    /// Queue the selected track.
    AddQueue,
    ClearQueue,
    UpdateCache,
    Quit,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidCommand(msg.into())
}

/// Split a leading `+` or `-` off `arg`. A second sign is rejected.
fn split_sign(arg: &str) -> Result<(Option<char>, &str)> {
    let (sign, rest) = match arg.chars().next() {
        Some(c @ ('+' | '-')) => (Some(c), &arg[1..]),
        _ => (None, arg),
    };
    if rest.starts_with(['+', '-']) {
        return Err(invalid(format!("invalid number '{arg}'")));
    }
    Ok((sign, rest))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `[[h:]m:]s` into seconds.
pub fn parse_time(s: &str) -> Result<i64> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid(format!("invalid time '{s}'")));
    }
    let bad = || invalid(format!("invalid time '{s}'"));
    let mut secs: i64 = 0;
    for (i, part) in parts.iter().enumerate() {
        if !is_digits(part) {
            return Err(bad());
        }
        let n: i64 = part.parse().map_err(|_| bad())?;
        if i > 0 && n >= 60 {
            return Err(bad());
        }
        secs = secs
            .checked_mul(60)
            .and_then(|v| v.checked_add(n))
            .ok_or_else(bad)?;
    }
    Ok(secs)
}

fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(invalid(format!("expected true or false, got '{other}'"))),
    }
}

fn expand_home(arg: &str) -> PathBuf {
    if let Some(rest) = arg.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(arg)
}

impl Command {
    /// Volume command; an absolute level must lie in 0-100.
    pub fn volume(level: i32, relative: bool) -> Result<Self> {
        if !relative && !(0..=100).contains(&level) {
            return Err(invalid(format!("volume must be 0-100, got {level}")));
        }
        Ok(Self::SetVolume { level, relative })
    }

    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((n, a)) => (n, a.trim()),
            None => (line, ""),
        };

        let no_arg = |cmd: Command| {
            if arg.is_empty() {
                Ok(cmd)
            } else {
                Err(invalid(format!("{name}: unexpected argument")))
            }
        };
        let need_arg = || {
            if arg.is_empty() {
                Err(invalid(format!("{name}: missing argument")))
            } else {
                Ok(arg)
            }
        };

        match name {
            "play" => no_arg(Self::Play),
            "pause" => no_arg(Self::Pause),
            "stop" => no_arg(Self::Stop),
            "play-next" => no_arg(Self::PlayNext),
            "play-prev" => no_arg(Self::PlayPrev),
            "reopen-output" => no_arg(Self::ReopenOutput),
            "add-queue" => no_arg(Self::AddQueue),
            "clear-queue" => no_arg(Self::ClearQueue),
            "update-cache" => no_arg(Self::UpdateCache),
            "quit" => no_arg(Self::Quit),
            "seek" => {
                let (sign, rest) = split_sign(need_arg()?)?;
                let secs = parse_time(rest)?;
                Ok(match sign {
                    Some('-') => Self::Seek {
                        offset: -secs,
                        relative: true,
                    },
                    Some(_) => Self::Seek {
                        offset: secs,
                        relative: true,
                    },
                    None => Self::Seek {
                        offset: secs,
                        relative: false,
                    },
                })
            }
            "set-volume" => {
                let (sign, rest) = split_sign(need_arg()?)?;
                let bad = || invalid(format!("invalid volume '{arg}'"));
                if !is_digits(rest) {
                    return Err(bad());
                }
                let level: i32 = rest.parse().map_err(|_| bad())?;
                match sign {
                    Some('-') => Self::volume(level.checked_neg().ok_or_else(bad)?, true),
                    Some(_) => Self::volume(level, true),
                    None => Self::volume(level, false),
                }
            }
            "set-playback-source" => Ok(Self::SetSource(need_arg()?.parse()?)),
            "set" => {
                let (key, value) = need_arg()?
                    .split_once(|c: char| c == '=' || c.is_whitespace())
                    .map(|(k, v)| (k.trim(), v.trim()))
                    .ok_or_else(|| invalid("set: expected <option> <value>"))?;
                if key == "output-plugin" {
                    if value.is_empty() {
                        return Err(invalid("set: missing value"));
                    }
                    return Ok(Self::Set(Setting::OutputPlugin(value.to_string())));
                }
                Ok(Self::Set(Setting::Flag(Flag::parse(key)?, parse_bool(value)?)))
            }
            "toggle" => Ok(Self::Toggle(Flag::parse(need_arg()?)?)),
            "add-path" => Ok(Self::AddPath(expand_home(need_arg()?))),
            "load-playlist" => Ok(Self::LoadPlaylist(expand_home(need_arg()?))),
            "cd" => Ok(Self::Cd(expand_home(need_arg()?))),
            "" => Err(invalid("empty command")),
            other => Err(invalid(format!("unknown command '{other}'"))),
        }
    }
}
