use super::load::{default_config_path, resolve_config_path, state_dir};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_cadenza_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", "/tmp/cadenza-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/cadenza-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("cadenza")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("cadenza")
            .join("config.toml")
    );
}

#[test]
fn state_dir_falls_back_to_local_state() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_STATE_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        state_dir().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/state/cadenza")
    );
}

#[test]
fn defaults_are_valid() {
    let s = Settings::default();
    assert!(s.validate().is_ok());
    assert!(s.player.continue_playback);
    assert!(!s.player.repeat_all);
    assert_eq!(s.player.source, SourceSetting::Library);
    assert_eq!(s.player.output_plugin, "default");
}

#[test]
fn validate_rejects_zero_volume_step_and_empty_format() {
    let mut s = Settings::default();
    s.controls.volume_step = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.ui.status_format = "  ".to_string();
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.output.queue_depth = 0;
    assert!(s.validate().is_err());
}

#[test]
fn disabled_cache_has_no_file() {
    let mut s = Settings::default();
    s.cache.enabled = false;
    s.cache.file = Some("/tmp/x.toml".into());
    assert!(s.cache_file().is_none());

    s.cache.enabled = true;
    assert_eq!(s.cache_file(), Some("/tmp/x.toml".into()));
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[player]
continue = false
repeat_all = true
repeat_track = true
source = "playlist"
output_plugin = "null"

[output]
buffer_frames = 512
queue_depth = 2

[plugins.input_priority]
rodio = 3

[controls]
seek_seconds = 9
volume_step = 10

[ui]
header_text = "hello"
status_format = "{state} {position}"
now_playing_track_fields = ["artist", "tracknumber", "title"]
now_playing_track_separator = " • "

[library]
recursive = false
include_hidden = true
follow_links = false
display_fields = ["filename"]
display_separator = "::"

[cache]
enabled = false

[log]
filter = "debug"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("CADENZA__CONTROLS__SEEK_SECONDS");

    let s = Settings::load().unwrap();
    assert!(!s.player.continue_playback);
    assert!(s.player.repeat_all);
    assert!(s.player.repeat_track);
    assert_eq!(s.player.source, SourceSetting::Playlist);
    assert_eq!(s.player.output_plugin, "null");
    assert_eq!(s.output.buffer_frames, 512);
    assert_eq!(s.output.queue_depth, 2);
    assert_eq!(s.plugins.input_priority.get("rodio"), Some(&3));
    assert_eq!(s.controls.seek_seconds, 9);
    assert_eq!(s.controls.volume_step, 10);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.ui.status_format, "{state} {position}");
    assert_eq!(
        s.ui.now_playing_track_fields,
        vec![
            TrackDisplayField::Artist,
            TrackDisplayField::TrackNumber,
            TrackDisplayField::Title
        ]
    );
    assert_eq!(s.ui.now_playing_track_separator, " • ");
    assert!(!s.library.recursive);
    assert!(s.library.include_hidden);
    assert!(!s.library.follow_links);
    assert_eq!(s.library.display_separator, "::");
    assert_eq!(s.library.display_fields, vec![TrackDisplayField::Filename]);
    assert!(!s.cache.enabled);
    assert_eq!(s.log.filter, "debug");
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[controls]
seek_seconds = 30
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("CADENZA__CONTROLS__SEEK_SECONDS", "2");

    let s = Settings::load().unwrap();
    assert_eq!(s.controls.seek_seconds, 2);
}
