use std::sync::Mutex;

use tempfile::NamedTempFile;

use liftguard::config::{ClassifierBackendKind, GuardConfig, NotifyMode};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LIFTGUARD_CONFIG",
        "LIFTGUARD_SOURCE",
        "LIFTGUARD_SKIP_INTERVAL",
        "LIFTGUARD_COOLDOWN_SECS",
        "LIFTGUARD_CHAT_ID",
        "LIFTGUARD_BOT_TOKEN",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "video": {
                "source": "rtsp://cabin-camera-1/stream",
                "skip_interval": 5,
                "pace_ms": 10
            },
            "classifier": {
                "backend": "stub"
            },
            "alerts": {
                "cooldown_secs": 120,
                "min_confidence": 0.7
            },
            "dispatch": {
                "workers": 4,
                "queue_depth": 16
            },
            "notify": {
                "mode": "telegram",
                "chat_id": "100200300"
            }
        }"#,
    );

    std::env::set_var("LIFTGUARD_CONFIG", file.path());
    std::env::set_var("LIFTGUARD_SKIP_INTERVAL", "7");
    std::env::set_var("LIFTGUARD_COOLDOWN_SECS", "300");
    std::env::set_var("LIFTGUARD_BOT_TOKEN", "123:abc");

    let cfg = GuardConfig::load(None).expect("load config");

    assert_eq!(cfg.video.source, "rtsp://cabin-camera-1/stream");
    assert_eq!(cfg.video.skip_interval, 7);
    assert_eq!(cfg.video.pace.as_millis(), 10);
    assert_eq!(cfg.classifier.backend, ClassifierBackendKind::Stub);
    assert_eq!(cfg.alerts.cooldown.as_secs(), 300);
    assert_eq!(cfg.alerts.min_confidence, 0.7);
    assert_eq!(cfg.dispatch.workers, 4);
    assert_eq!(cfg.dispatch.queue_depth, 16);
    assert_eq!(cfg.notify.mode, NotifyMode::Telegram);
    assert_eq!(cfg.notify.chat_id, "100200300");
    assert_eq!(cfg.notify.bot_token.as_deref(), Some("123:abc"));

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    // Telegram is the default mode and requires credentials.
    std::env::set_var("LIFTGUARD_CHAT_ID", "42");
    std::env::set_var("LIFTGUARD_BOT_TOKEN", "123:abc");

    let cfg = GuardConfig::load(None).expect("load config");

    assert_eq!(cfg.video.source, "stub://cabin");
    assert_eq!(cfg.video.skip_interval, 3);
    assert_eq!(cfg.alerts.cooldown.as_secs(), 180);
    assert_eq!(cfg.dispatch.workers, 2);
    assert_eq!(cfg.notify.chat_id, "42");

    clear_env();
}

#[test]
fn telegram_mode_without_token_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIFTGUARD_CHAT_ID", "42");

    let err = GuardConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("LIFTGUARD_BOT_TOKEN"));

    clear_env();
}

#[test]
fn log_mode_needs_no_credentials() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{"notify": {"mode": "log"}}"#);

    let cfg = GuardConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.notify.mode, NotifyMode::Log);

    clear_env();
}

#[test]
fn zero_skip_interval_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{"video": {"skip_interval": 0}, "notify": {"mode": "log"}}"#);

    let err = GuardConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("skip_interval"));

    clear_env();
}

#[test]
fn tract_backend_requires_a_model_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{"classifier": {"backend": "tract"}, "notify": {"mode": "log"}}"#);

    let err = GuardConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("model_path"));

    clear_env();
}
