//! Application model types: `App`, `ViewKind`, `Prompt` and `Message`.

use std::sync::Arc;

use crate::menu::SearchOutcome;
use crate::player::Player;
use crate::track::TrackRegistry;
use crate::view::{Nav, View, Views};

/// The four views, in the order of their number keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Library,
    Playlist,
    Browser,
    Queue,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [Self::Library, Self::Playlist, Self::Browser, Self::Queue];

    pub fn index(self) -> usize {
        self as usize
    }

    /// View for a number key, `'1'` to `'4'`.
    pub fn from_key(c: char) -> Option<Self> {
        let n = c.to_digit(10)? as usize;
        Self::ALL.get(n.checked_sub(1)?).copied()
    }
}

/// Input line waiting for Enter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Prompt {
    Command,
    Search { backward: bool },
}

impl Prompt {
    pub fn symbol(self) -> char {
        match self {
            Self::Command => ':',
            Self::Search { backward: false } => '/',
            Self::Search { backward: true } => '?',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Info(String),
    Error(String),
}

impl Message {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(s) | Self::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone)]
struct LastSearch {
    query: String,
    backward: bool,
}

/// The main application model.
pub struct App {
    pub views: Arc<Views>,
    pub player: Arc<Player>,
    pub(super) registry: Arc<TrackRegistry>,
    view: ViewKind,
    prompt: Option<Prompt>,
    input: String,
    message: Option<Message>,
    last_search: Option<LastSearch>,
    quit: bool,
}

impl App {
    pub fn new(views: Arc<Views>, player: Arc<Player>, registry: Arc<TrackRegistry>) -> Self {
        Self {
            views,
            player,
            registry,
            view: ViewKind::default(),
            prompt: None,
            input: String::new(),
            message: None,
            last_search: None,
            quit: false,
        }
    }

    pub fn view_kind(&self) -> ViewKind {
        self.view
    }

    pub fn set_view(&mut self, kind: ViewKind) {
        self.view = kind;
    }

    pub fn active_view(&self) -> &dyn View {
        self.views.all()[self.view.index()]
    }

    pub fn navigate(&mut self, nav: Nav) {
        self.active_view().navigate(nav);
    }

    pub fn prompt(&self) -> Option<Prompt> {
        self.prompt
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Open the input line. Any message is replaced by the prompt.
    pub fn begin_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
        self.input.clear();
        self.message = None;
    }

    pub fn push_input(&mut self, c: char) {
        if self.prompt.is_some() {
            self.input.push(c);
        }
    }

    /// Delete the last input character; on an empty line, close the prompt.
    pub fn pop_input(&mut self) {
        if self.input.pop().is_none() {
            self.cancel_prompt();
        }
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
        self.input.clear();
    }

    /// Run the pending prompt. The prompt is consumed: a second call does
    /// nothing.
    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let line = std::mem::take(&mut self.input);
        match prompt {
            Prompt::Command => {
                if !line.trim().is_empty() {
                    self.run_line(&line);
                }
            }
            Prompt::Search { backward } => {
                if !line.is_empty() {
                    self.last_search = Some(LastSearch {
                        query: line,
                        backward,
                    });
                    self.search_again(false);
                }
            }
        }
    }

    /// Repeat the last search, in the opposite direction with `reverse`.
    pub fn search_again(&mut self, reverse: bool) {
        let Some(last) = self.last_search.clone() else {
            self.error("no previous search");
            return;
        };
        let backward = last.backward != reverse;
        match self.active_view().search(&last.query, backward) {
            SearchOutcome::Found { wrapped: true, .. } => self.info("search wrapped"),
            SearchOutcome::Found { .. } => self.clear_message(),
            SearchOutcome::NotFound => self.error(format!("pattern not found: {}", last.query)),
        }
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.message = Some(Message::Info(text.into()));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.message = Some(Message::Error(text.into()));
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }
}
