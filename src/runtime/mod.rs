use std::env;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::{App, ChannelReporter, Notice, ViewKind};
use crate::mpris::ControlCmd;
use crate::player::Player;
use crate::plugin::PluginRegistry;
use crate::track::{MetadataCache, TrackRegistry};
use crate::view::Views;

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;

fn open_cache(file: Option<PathBuf>) -> MetadataCache {
    let Some(file) = file else {
        return MetadataCache::in_memory();
    };
    match MetadataCache::load(file) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("{e}; starting with an empty cache");
            MetadataCache::in_memory()
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();
    logging::init(&settings);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cadenza starting");
    if let Some(w) = &config_warning {
        tracing::warn!("{w}");
    }

    let plugins = Arc::new(PluginRegistry::builtin(&settings.plugins, &settings.output));
    for name in plugins.output_names() {
        tracing::debug!(output = name, promises = ?plugins.output_promises(name), "output backend available");
    }
    let registry = Arc::new(TrackRegistry::new(plugins, open_cache(settings.cache_file())));
    let views = Arc::new(Views::new(registry.clone(), &settings));

    let (notice_tx, notice_rx) = mpsc::channel::<Notice>();
    let player = Arc::new(Player::new(
        registry.clone(),
        views.clone(),
        Arc::new(ChannelReporter::new(notice_tx)),
        &settings.player,
    )?);

    let mut app = App::new(views, player.clone(), registry.clone());
    if let Some(w) = config_warning {
        app.error(w);
    }

    // An optional argument is added to the library; the browser starts in
    // that directory, or in the working directory.
    let arg = env::args_os().nth(1).map(PathBuf::from);
    let start_dir = match &arg {
        Some(p) if p.is_dir() => p.clone(),
        _ => env::current_dir()?,
    };
    if let Err(e) = app.views.browser.cd(&start_dir) {
        app.error(e.to_string());
    }
    if let Some(path) = arg {
        match app.views.library.add_path(&path) {
            Ok(_) => app.set_view(ViewKind::Library),
            Err(e) => app.error(e.to_string()),
        }
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mpris,
        &control_rx,
        &notice_rx,
        &mut state,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    player.shutdown();
    if let Err(e) = registry.flush_cache() {
        tracing::warn!("{e}");
    }
    tracing::info!("cadenza stopped");

    run_result
}
