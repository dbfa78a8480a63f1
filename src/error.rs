//! Error type shared by the playback core, the views and the backends.
//!
//! Backend failures never escape the player or the views: they are turned
//! into status messages. Only programming errors panic.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No decoder backend claims the file's extension.
    #[error("{}: unsupported file format", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A decoder or output backend reported a failure.
    #[error("{plugin}: {message}")]
    Backend { plugin: String, message: String },

    /// The output backend reported a zero-sized buffer.
    #[error("{plugin}: output buffer size is zero")]
    ZeroBuffer { plugin: String },

    #[error("no such output plugin: {0}")]
    UnknownOutput(String),

    #[error("no output plugin available")]
    NoOutput,

    #[error("{0}")]
    InvalidCommand(String),

    #[error("metadata cache: {0}")]
    Cache(String),
}

impl Error {
    pub fn backend(plugin: impl Into<String>, message: impl ToString) -> Self {
        Self::Backend {
            plugin: plugin.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
