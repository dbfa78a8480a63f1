use std::fs;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use super::*;
use crate::config::{PlayerSettings, Settings};
use crate::player::Player;
use crate::plugin::PluginRegistry;
use crate::plugin::mock::{Log, MockInput, MockOutput};
use crate::track::{MetadataCache, TrackRegistry};
use crate::view::Views;

struct Fixture {
    app: App,
    _notices: Receiver<Notice>,
    dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let log = Log::default();
    let mut plugins = PluginRegistry::new();
    plugins.register_input(Arc::new(MockInput::new("mock", &["ogg"], log.clone())));
    plugins.register_output(
        "mock",
        0,
        None,
        Arc::new(move || Box::new(MockOutput::new(log.clone())) as Box<dyn crate::plugin::OutputPlugin>),
    );

    let registry = Arc::new(TrackRegistry::new(
        Arc::new(plugins),
        MetadataCache::in_memory(),
    ));
    let views = Arc::new(Views::new(registry.clone(), &Settings::default()));
    let (tx, notices) = mpsc::channel();
    let player = Player::new(
        registry.clone(),
        views.clone(),
        Arc::new(ChannelReporter::new(tx)),
        &PlayerSettings::default(),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    for name in ["alpha.ogg", "beta.ogg", "notes.txt"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }

    Fixture {
        app: App::new(views, Arc::new(player), registry),
        _notices: notices,
        dir,
    }
}

fn type_line(app: &mut App, prompt: Prompt, line: &str) {
    app.begin_prompt(prompt);
    for c in line.chars() {
        app.push_input(c);
    }
    app.submit_prompt();
}

fn command(app: &mut App, line: &str) {
    type_line(app, Prompt::Command, line);
}

fn add_library(f: &mut Fixture) {
    let dir = f.dir.path().display().to_string();
    command(&mut f.app, &format!("add-path {dir}"));
    assert_eq!(f.app.message(), Some(&Message::Info("added 2 tracks".into())));
}

#[test]
fn view_keys_map_in_order() {
    assert_eq!(ViewKind::from_key('1'), Some(ViewKind::Library));
    assert_eq!(ViewKind::from_key('4'), Some(ViewKind::Queue));
    assert_eq!(ViewKind::from_key('0'), None);
    assert_eq!(ViewKind::from_key('5'), None);
    assert_eq!(ViewKind::from_key('x'), None);
}

#[test]
fn prompt_is_consumed_once() {
    let mut f = fixture();
    command(&mut f.app, "set repeat-all true");
    assert!(f.app.player.options().repeat_all);
    assert_eq!(f.app.prompt(), None);
    assert_eq!(f.app.input(), "");

    f.app.set_view(ViewKind::Queue);
    f.app.submit_prompt();
    assert_eq!(f.app.message(), None);
}

#[test]
fn backspace_on_empty_input_closes_prompt() {
    let mut f = fixture();
    f.app.begin_prompt(Prompt::Search { backward: true });
    assert_eq!(f.app.prompt().map(Prompt::symbol), Some('?'));
    f.app.push_input('a');
    f.app.pop_input();
    assert!(f.app.prompt().is_some());
    f.app.pop_input();
    assert_eq!(f.app.prompt(), None);
}

#[test]
fn errors_stay_until_the_next_successful_action() {
    let mut f = fixture();
    command(&mut f.app, "set-volume 150");
    let msg = f.app.message().unwrap();
    assert!(msg.is_error());
    assert!(msg.text().contains("0-100"));

    command(&mut f.app, "stop");
    assert_eq!(f.app.message(), None);
}

#[test]
fn toggle_reports_the_new_value() {
    let mut f = fixture();
    command(&mut f.app, "toggle continue");
    assert!(!f.app.player.options().continue_playback);
    assert_eq!(f.app.message(), Some(&Message::Info("continue: off".into())));
}

#[test]
fn add_path_fills_the_library() {
    let mut f = fixture();
    add_library(&mut f);
    assert_eq!(f.app.views.library.tracks().len(), 2);

    command(&mut f.app, "add-path /nonexistent/cadenza");
    assert!(f.app.message().unwrap().is_error());
}

#[test]
fn search_reports_wrap_and_miss() {
    let mut f = fixture();
    add_library(&mut f);

    type_line(&mut f.app, Prompt::Search { backward: false }, "beta");
    assert_eq!(f.app.message(), None);
    f.app.search_again(false);
    assert_eq!(f.app.message(), Some(&Message::Info("search wrapped".into())));

    type_line(&mut f.app, Prompt::Search { backward: false }, "gamma");
    assert_eq!(
        f.app.message(),
        Some(&Message::Error("pattern not found: gamma".into()))
    );
}

#[test]
fn search_again_without_a_search() {
    let mut f = fixture();
    f.app.search_again(true);
    assert!(f.app.message().unwrap().is_error());
}

#[test]
fn queue_commands() {
    let mut f = fixture();
    add_library(&mut f);

    command(&mut f.app, "add-queue");
    f.app.navigate(crate::view::Nav::Down);
    f.app.add_selected_to_queue();
    let names: Vec<String> = f
        .app
        .views
        .queue
        .tracks()
        .iter()
        .map(|t| t.title_or_filename())
        .collect();
    assert_eq!(names, ["alpha", "beta"]);

    command(&mut f.app, "clear-queue");
    assert!(f.app.views.queue.tracks().is_empty());
}

#[test]
fn cd_switches_to_the_browser() {
    let mut f = fixture();
    let sub = f.dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    command(&mut f.app, &format!("cd {}", sub.display()));
    assert_eq!(f.app.view_kind(), ViewKind::Browser);
    assert_eq!(f.app.views.browser.dir(), Some(sub));

    f.app.browse_up();
    assert_eq!(f.app.views.browser.dir().as_deref(), Some(f.dir.path()));
    // Parent entry, then the directory just left, then the two tracks.
    assert_eq!(f.app.active_view().len(), 4);
}

#[test]
fn load_playlist_switches_view() {
    let mut f = fixture();
    let list = f.dir.path().join("mix.m3u");
    fs::write(&list, "# mix\nbeta.ogg\nalpha.ogg\n").unwrap();
    command(&mut f.app, &format!("load-playlist {}", list.display()));
    assert_eq!(f.app.view_kind(), ViewKind::Playlist);
    assert_eq!(f.app.message(), Some(&Message::Info("loaded 2 tracks".into())));
    assert_eq!(f.app.active_view().len(), 2);
}

#[test]
fn unknown_output_plugin_is_reported() {
    let mut f = fixture();
    command(&mut f.app, "set output-plugin pulse");
    assert_eq!(
        f.app.message(),
        Some(&Message::Error("no such output plugin: pulse".into()))
    );
}

#[test]
fn player_errors_reach_the_message_line() {
    let mut f = fixture();
    f.app.handle_notice(Notice::Status);
    assert_eq!(f.app.message(), None);
    f.app.handle_notice(Notice::Error("mock: no device".into()));
    assert_eq!(f.app.message(), Some(&Message::Error("mock: no device".into())));
}

#[test]
fn quit_command() {
    let mut f = fixture();
    assert!(!f.app.should_quit());
    command(&mut f.app, "quit");
    assert!(f.app.should_quit());
}
