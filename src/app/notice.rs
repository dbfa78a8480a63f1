use std::sync::mpsc::Sender;

use crate::player::Reporter;

/// Player notifications, delivered to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Status,
    Track,
    Error(String),
}

/// Forwards player notifications over a channel so the worker thread never
/// touches UI state.
pub struct ChannelReporter {
    tx: Sender<Notice>,
}

impl ChannelReporter {
    pub fn new(tx: Sender<Notice>) -> Self {
        Self { tx }
    }
}

impl Reporter for ChannelReporter {
    fn status_changed(&self) {
        let _ = self.tx.send(Notice::Status);
    }

    fn track_changed(&self) {
        let _ = self.tx.send(Notice::Track);
    }

    fn error(&self, message: &str) {
        let _ = self.tx.send(Notice::Error(message.to_string()));
    }
}
