//! File logging. The terminal belongs to the UI, so events go to a file.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Install the global subscriber. `CADENZA_LOG` overrides `log.filter`.
/// Without a writable log file nothing is logged.
pub fn init(settings: &Settings) {
    let Some(file) = settings.log_file().as_deref().and_then(open_log_file) else {
        return;
    };
    let filter = EnvFilter::try_from_env("CADENZA_LOG")
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .ok();
}
