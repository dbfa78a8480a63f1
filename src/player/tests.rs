use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::config::{PlayerSettings, Settings};
use crate::plugin::PluginRegistry;
use crate::plugin::mock::{Event, Log, MockInput, MockOutput};
use crate::track::MetadataCache;
use crate::view::TrackSource;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Recorder {
    errors: Mutex<Vec<String>>,
    statuses: AtomicUsize,
    tracks: AtomicUsize,
}

impl Recorder {
    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Reporter for Recorder {
    fn status_changed(&self) {
        self.statuses.fetch_add(1, Ordering::SeqCst);
    }

    fn track_changed(&self) {
        self.tracks.fetch_add(1, Ordering::SeqCst);
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

struct Fixture {
    log: Log,
    registry: Arc<TrackRegistry>,
    views: Arc<Views>,
    reporter: Arc<Recorder>,
    player: Player,
}

impl Fixture {
    fn track(&self, path: &str) -> Arc<Track> {
        self.registry.get_or_create(Path::new(path), None).unwrap()
    }

    fn wait_for(&self, state: PlayerState) {
        assert!(
            self.player.wait_for_state(|s| s == state, WAIT),
            "player never reached {state:?}"
        );
    }

    fn opened(&self) -> Vec<PathBuf> {
        self.log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::DecoderOpen(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

fn fixture_with(
    input: impl FnOnce(&mut MockInput),
    output: impl Fn(&mut MockOutput) + Send + Sync + 'static,
    settings: PlayerSettings,
) -> Fixture {
    let log = Log::default();
    let mut mock_input = MockInput::new("mock", &["ogg"], log.clone());
    input(&mut mock_input);

    let mut plugins = PluginRegistry::new();
    plugins.register_input(Arc::new(mock_input));
    let output_log = log.clone();
    plugins.register_output(
        "mock",
        0,
        None,
        Arc::new(move || {
            let mut out = MockOutput::new(output_log.clone());
            output(&mut out);
            Box::new(out) as Box<dyn crate::plugin::OutputPlugin>
        }),
    );

    let registry = Arc::new(TrackRegistry::new(
        Arc::new(plugins),
        MetadataCache::in_memory(),
    ));
    let views = Arc::new(Views::new(registry.clone(), &Settings::default()));
    let reporter = Arc::new(Recorder::default());
    let player = Player::new(
        registry.clone(),
        views.clone(),
        reporter.clone(),
        &settings,
    )
    .unwrap();

    Fixture {
        log,
        registry,
        views,
        reporter,
        player,
    }
}

fn fixture() -> Fixture {
    fixture_with(|_| {}, |_| {}, PlayerSettings::default())
}

fn eventually(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    f()
}

fn library_dir(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    dir
}

#[test]
fn stop_when_stopped_returns_immediately() {
    let f = fixture();
    f.player.stop();
    f.player.pause();
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert!(f.log.events().is_empty());
}

#[test]
fn play_with_nothing_to_play_stays_stopped() {
    let f = fixture();
    f.player.play();
    assert!(eventually(|| f.reporter.statuses.load(Ordering::SeqCst) > 0));
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert!(f.player.current_track().is_none());
    assert!(f.opened().is_empty());
}

#[test]
fn switching_tracks_closes_the_old_decoder_first() {
    let f = fixture();
    let a = f.track("/m/a.ogg");
    let b = f.track("/m/b.ogg");

    f.player.play_track(a.clone());
    f.wait_for(PlayerState::Playing);
    f.player.play_track(b.clone());
    f.wait_for(PlayerState::Playing);

    let close_a = f
        .log
        .position(&Event::DecoderClose(a.path().to_path_buf()))
        .unwrap();
    let open_b = f
        .log
        .position(&Event::DecoderOpen(b.path().to_path_buf()))
        .unwrap();
    assert!(close_a < open_b);
    assert_eq!(f.log.count(|e| *e == Event::OutputOpen), 1);
    assert!(Arc::ptr_eq(&f.player.current_track().unwrap(), &b));
    assert!(f.reporter.tracks.load(Ordering::SeqCst) >= 2);
}

#[test]
fn pause_and_resume_keep_backends_open() {
    let f = fixture();
    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);

    f.player.pause();
    f.wait_for(PlayerState::Paused);
    assert_eq!(f.log.count(|e| matches!(e, Event::DecoderClose(_))), 0);
    assert_eq!(f.log.count(|e| *e == Event::OutputStop), 0);
    assert_eq!(f.log.count(|e| *e == Event::OutputClose), 0);

    f.player.pause();
    f.wait_for(PlayerState::Playing);
    assert_eq!(f.opened().len(), 1);

    f.player.stop();
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert_eq!(f.log.count(|e| matches!(e, Event::DecoderClose(_))), 1);
    assert_eq!(f.log.count(|e| *e == Event::OutputStop), 1);
    assert_eq!(f.log.count(|e| *e == Event::OutputClose), 0);
}

#[test]
fn stop_while_paused_wakes_the_worker() {
    let f = fixture();
    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);
    f.player.pause();
    f.wait_for(PlayerState::Paused);

    f.player.stop();
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert_eq!(f.log.count(|e| matches!(e, Event::DecoderClose(_))), 1);
}

#[test]
fn play_while_playing_restarts_the_track() {
    let f = fixture();
    let a = f.track("/m/a.ogg");
    f.player.play_track(a.clone());
    f.wait_for(PlayerState::Playing);

    f.player.play();
    assert!(eventually(|| f.opened().len() == 2));
    f.wait_for(PlayerState::Playing);
    assert_eq!(f.log.count(|e| matches!(e, Event::DecoderClose(_))), 1);
}

#[test]
fn seek_clamps_to_track_bounds() {
    let f = fixture();
    f.player.seek(30, false);
    assert_eq!(f.log.count(|e| matches!(e, Event::Seek(_))), 0);

    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);

    f.player.seek(100_000, true);
    assert!(f.log.events().contains(&Event::Seek(200)));
    assert_eq!(f.player.status().position, 200);

    f.player.seek(-50, true);
    assert_eq!(f.player.status().position, 150);

    f.player.seek(-10, false);
    assert_eq!(f.player.status().position, 0);
}

#[test]
fn extreme_relative_seeks_saturate() {
    let f = fixture();
    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);

    f.player.seek(10, false);
    f.player.seek(i64::MAX, true);
    assert_eq!(f.player.status().position, 200);

    f.player.seek(i64::MIN, true);
    assert_eq!(f.player.status().position, 0);
}

#[test]
fn extreme_relative_volume_saturates() {
    let f = fixture();
    f.player.set_volume(i32::MAX, true);
    assert_eq!(f.player.volume(), Some(100));
    f.player.set_volume(i32::MIN, true);
    assert_eq!(f.player.volume(), Some(0));
}

#[test]
fn volume_is_clamped() {
    let f = fixture();
    assert_eq!(f.player.volume(), Some(50));

    f.player.set_volume(150, false);
    assert_eq!(f.player.volume(), Some(100));
    f.player.set_volume(-30, true);
    assert_eq!(f.player.volume(), Some(70));
    f.player.set_volume(-500, true);
    assert_eq!(f.player.volume(), Some(0));
}

#[test]
fn volume_without_support_is_a_no_op() {
    let f = fixture_with(|_| {}, |o| o.volume = None, PlayerSettings::default());
    f.player.set_volume(30, false);
    assert_eq!(f.player.volume(), None);
    assert_eq!(f.reporter.statuses.load(Ordering::SeqCst), 0);
    assert!(f.reporter.errors().is_empty());
}

#[test]
fn foreign_byte_order_is_swapped() {
    let foreign = match ByteOrder::host() {
        ByteOrder::Little => ByteOrder::Big,
        ByteOrder::Big => ByteOrder::Little,
    };
    let f = fixture_with(
        move |i| i.byte_order = foreign,
        |_| {},
        PlayerSettings::default(),
    );
    f.player.play_track(f.track("/m/a.ogg"));
    assert!(eventually(|| f.log.count(|e| matches!(e, Event::Write(_))) > 0));
    f.player.stop();
    assert!(f.log.events().contains(&Event::Write([2, 1])));
    assert!(!f.log.events().contains(&Event::Write([1, 2])));
}

#[test]
fn host_byte_order_is_written_as_is() {
    let f = fixture();
    f.player.play_track(f.track("/m/a.ogg"));
    assert!(eventually(|| f.log.count(|e| matches!(e, Event::Write(_))) > 0));
    f.player.stop();
    assert!(f.log.events().contains(&Event::Write([1, 2])));
}

#[test]
fn decoder_open_failure_leaves_player_stopped() {
    let f = fixture_with(|i| i.fail_open = true, |_| {}, PlayerSettings::default());
    f.player.play_track(f.track("/m/a.ogg"));

    assert!(eventually(|| !f.reporter.errors().is_empty()));
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert_eq!(f.log.count(|e| *e == Event::OutputOpen), 0);
    assert!(f.reporter.errors()[0].contains("cannot open"));
}

#[test]
fn output_open_failure_closes_the_decoder() {
    let f = fixture_with(|_| {}, |o| o.fail_open = true, PlayerSettings::default());
    let a = f.track("/m/a.ogg");
    f.player.play_track(a.clone());

    assert!(eventually(|| !f.reporter.errors().is_empty()));
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert!(eventually(|| {
        f.log
            .events()
            .contains(&Event::DecoderClose(a.path().to_path_buf()))
    }));
}

#[test]
fn zero_buffer_size_aborts_the_attempt() {
    let f = fixture_with(|_| {}, |o| o.buffer_size = 0, PlayerSettings::default());
    f.player.play_track(f.track("/m/a.ogg"));

    assert!(eventually(|| !f.reporter.errors().is_empty()));
    assert!(f.reporter.errors()[0].contains("buffer size is zero"));
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert!(eventually(|| f.log.count(|e| matches!(e, Event::DecoderClose(_))) == 1));
    assert_eq!(f.log.count(|e| *e == Event::OutputStop), 1);
    assert_eq!(f.log.count(|e| matches!(e, Event::Write(_))), 0);
}

#[test]
fn read_error_stops_playback() {
    let f = fixture_with(
        |i| i.fail_read_after = Some(2),
        |_| {},
        PlayerSettings::default(),
    );
    f.player.play_track(f.track("/m/a.ogg"));

    assert!(eventually(|| !f.reporter.errors().is_empty()));
    assert!(eventually(|| f.log.count(|e| *e == Event::OutputStop) == 1));
    f.wait_for(PlayerState::Stopped);
    assert_eq!(f.log.count(|e| matches!(e, Event::Write(_))), 2);
    assert_eq!(f.log.count(|e| matches!(e, Event::DecoderClose(_))), 1);
    assert_eq!(f.opened().len(), 1);
}

#[test]
fn failed_output_stop_closes_the_output() {
    let f = fixture_with(|_| {}, |o| o.fail_stop = true, PlayerSettings::default());
    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);
    f.player.stop();
    assert_eq!(f.log.count(|e| *e == Event::OutputClose), 1);

    f.player.play();
    f.wait_for(PlayerState::Playing);
    assert_eq!(f.log.count(|e| *e == Event::OutputOpen), 2);
}

#[test]
fn continue_walks_the_source_then_stops() {
    let f = fixture_with(|i| i.chunks = Some(2), |_| {}, PlayerSettings::default());
    let dir = library_dir(&["a.ogg", "b.ogg", "c.ogg"]);
    f.views.library.add_path(dir.path()).unwrap();

    f.player.play();
    let c_closed = Event::DecoderClose(dir.path().join("c.ogg"));
    assert!(eventually(|| f.log.events().contains(&c_closed)));
    f.wait_for(PlayerState::Stopped);

    assert_eq!(
        f.opened(),
        vec![
            dir.path().join("a.ogg"),
            dir.path().join("b.ogg"),
            dir.path().join("c.ogg"),
        ]
    );
    assert_eq!(
        f.player.current_track().unwrap().path(),
        dir.path().join("c.ogg")
    );
}

#[test]
fn without_continue_playback_stops_at_end_of_track() {
    let settings = PlayerSettings {
        continue_playback: false,
        ..PlayerSettings::default()
    };
    let f = fixture_with(|i| i.chunks = Some(1), |_| {}, settings);
    let dir = library_dir(&["a.ogg", "b.ogg"]);
    f.views.library.add_path(dir.path()).unwrap();

    f.player.play();
    assert!(eventually(|| f.log.count(|e| matches!(e, Event::DecoderClose(_))) == 1));
    f.wait_for(PlayerState::Stopped);
    thread::sleep(Duration::from_millis(5));
    assert_eq!(f.opened(), vec![dir.path().join("a.ogg")]);
}

#[test]
fn repeat_track_replays_the_same_track() {
    let settings = PlayerSettings {
        repeat_track: true,
        ..PlayerSettings::default()
    };
    let f = fixture_with(|i| i.chunks = Some(1), |_| {}, settings);
    let a = f.track("/m/a.ogg");
    f.player.play_track(a.clone());

    assert!(eventually(|| f.opened().len() >= 3));
    f.player.stop();
    assert!(f.opened().iter().all(|p| p == a.path()));
}

#[test]
fn queue_is_drained_before_the_source() {
    let f = fixture_with(|i| i.chunks = Some(1), |_| {}, PlayerSettings::default());
    let dir = library_dir(&["lib.ogg"]);
    f.views.library.add_path(dir.path()).unwrap();
    f.views.queue.push(f.track("/m/q1.ogg"));
    f.views.queue.push(f.track("/m/q2.ogg"));

    f.player.play();
    let lib_closed = Event::DecoderClose(dir.path().join("lib.ogg"));
    assert!(eventually(|| f.log.events().contains(&lib_closed)));
    f.wait_for(PlayerState::Stopped);

    assert_eq!(
        f.opened(),
        vec![
            PathBuf::from("/m/q1.ogg"),
            PathBuf::from("/m/q2.ogg"),
            dir.path().join("lib.ogg"),
        ]
    );
    assert!(f.views.queue.tracks().is_empty());
}

#[test]
fn next_and_prev_ask_the_selected_source() {
    let f = fixture();
    let dir = library_dir(&["a.ogg", "b.ogg"]);
    f.views.playlist.load(&{
        let list = dir.path().join("p.m3u");
        std::fs::write(&list, "b.ogg\na.ogg\n").unwrap();
        list
    })
    .unwrap();
    f.player.set_source(Source::Playlist);
    assert_eq!(f.player.source(), Source::Playlist);

    f.player.play_next();
    f.wait_for(PlayerState::Playing);
    assert_eq!(
        f.player.current_track().unwrap().path(),
        dir.path().join("b.ogg")
    );

    f.player.play_next();
    f.wait_for(PlayerState::Playing);
    assert_eq!(
        f.player.current_track().unwrap().path(),
        dir.path().join("a.ogg")
    );

    f.player.play_prev();
    f.wait_for(PlayerState::Playing);
    assert_eq!(
        f.player.current_track().unwrap().path(),
        dir.path().join("b.ogg")
    );

    // Nothing before the first entry without repeat-all: keeps playing.
    f.player.play_prev();
    assert_eq!(
        f.player.current_track().unwrap().path(),
        dir.path().join("b.ogg")
    );
    assert!(f.views.playlist.prev_track(true).is_some());
}

#[test]
fn output_backend_can_be_reopened_and_changed() {
    let f = fixture();
    f.player.play_track(f.track("/m/a.ogg"));
    f.wait_for(PlayerState::Playing);

    f.player.reopen_output_backend().unwrap();
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert_eq!(f.log.count(|e| *e == Event::OutputClose), 1);
    assert_eq!(f.log.count(|e| *e == Event::OutputOpen), 2);

    match f.player.change_output_backend("pulse") {
        Err(Error::UnknownOutput(name)) => assert_eq!(name, "pulse"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(f.player.output_name(), None);

    f.player.change_output_backend("mock").unwrap();
    assert_eq!(f.player.output_name().as_deref(), Some("mock"));
}

#[test]
fn missing_output_is_reported_and_playback_fails() {
    let settings = PlayerSettings {
        output_plugin: "pulse".to_string(),
        ..PlayerSettings::default()
    };
    let f = fixture_with(|_| {}, |_| {}, settings);
    assert_eq!(f.reporter.errors().len(), 1);

    f.player.play_track(f.track("/m/a.ogg"));
    assert!(eventually(|| f.reporter.errors().len() == 2));
    assert_eq!(f.player.state(), PlayerState::Stopped);
}

#[test]
fn status_snapshot_and_options() {
    let f = fixture();
    let mut options = f.player.options();
    assert!(options.continue_playback);
    options.repeat_all = true;
    f.player.set_options(options);

    let status = f.player.status();
    assert_eq!(status.state, PlayerState::Stopped);
    assert_eq!(status.position, 0);
    assert_eq!(status.volume, Some(50));
    assert!(status.options.repeat_all);
    assert_eq!(status.source, Source::Library);
    assert!(status.track.is_none());
}

#[test]
fn shutdown_stops_and_joins() {
    let f = fixture();
    let a = f.track("/m/a.ogg");
    f.player.play_track(a.clone());
    f.wait_for(PlayerState::Playing);

    f.player.shutdown();
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert_eq!(f.log.count(|e| *e == Event::OutputClose), 1);
    assert!(f.player.current_track().is_none());

    // Later calls are harmless.
    f.player.shutdown();
    f.player.stop();
}

#[test]
fn status_does_not_wait_for_the_control_lock() {
    let f = fixture();
    let player = &f.player;
    let control = player.shared.control();
    let (tx, rx) = mpsc::channel();
    thread::scope(|s| {
        s.spawn(move || {
            tx.send((player.state(), player.status().state)).unwrap();
        });
        let got = rx.recv_timeout(WAIT);
        drop(control);
        assert_eq!(got.unwrap(), (PlayerState::Stopped, PlayerState::Stopped));
    });
}

#[test]
fn pause_racing_the_end_of_stream_advances_but_stays_stopped() {
    let f = fixture();
    let a = f.track("/m/a.ogg");
    let b = f.track("/m/b.ogg");
    f.player.shared.set_current(Some(a.clone()));
    f.views.queue.push(b.clone());

    {
        let mut control = f.player.shared.control();
        control.command = Command::Pause;
        super::worker::finish(&f.player.shared, &mut control, super::worker::Exit::EndOfStream, &a);
        assert_eq!(control.command, Command::Stop);
        assert_eq!(control.state, PlayerState::Stopped);
    }
    assert_eq!(f.player.state(), PlayerState::Stopped);
    assert!(Arc::ptr_eq(&f.player.current_track().unwrap(), &b));
    assert!(f.opened().is_empty());
}

#[test]
fn queued_track_keeps_its_registry_entry_on_the_way_to_the_player() {
    let f = fixture();
    let b = f.track("/m/b.ogg");
    f.views.queue.push(b.clone());
    f.registry.release(&b);
    assert_eq!(f.registry.holds(b.path()), Some(1));

    let next = f.player.shared.next_track(false).unwrap();
    assert_eq!(f.registry.holds(b.path()), Some(1));
    f.player.shared.set_current_held(Some(next));
    assert_eq!(f.registry.holds(b.path()), Some(1));
    assert!(Arc::ptr_eq(&f.track("/m/b.ogg"), &b));
}
