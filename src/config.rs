use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_SOURCE: &str = "stub://cabin";
const DEFAULT_SKIP_INTERVAL: u64 = 3;
const DEFAULT_PACE_MS: u64 = 30;
const DEFAULT_COOLDOWN_SECS: u64 = 180;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_QUEUE_DEPTH: usize = 8;
const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_MODEL_INPUT: u32 = 224;

#[derive(Debug, Deserialize, Default)]
struct GuardConfigFile {
    video: Option<VideoConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    alerts: Option<AlertConfigFile>,
    dispatch: Option<DispatchConfigFile>,
    notify: Option<NotifyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    source: Option<String>,
    skip_interval: Option<u64>,
    pace_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<String>,
    model_path: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    cooldown_secs: Option<u64>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DispatchConfigFile {
    workers: Option<usize>,
    queue_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    mode: Option<String>,
    api_url: Option<String>,
    chat_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub video: VideoSettings,
    pub classifier: ClassifierSettings,
    pub alerts: AlertSettings,
    pub dispatch: DispatchSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    /// Stream descriptor: `stub://…`, an http(s) URL, or anything FFmpeg opens.
    pub source: String,
    /// Forward one frame in every `skip_interval`.
    pub skip_interval: u64,
    /// Fixed delay per raw frame; zero disables pacing.
    pub pace: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackendKind {
    Stub,
    Tract,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub backend: ClassifierBackendKind,
    pub model_path: Option<String>,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub cooldown: Duration,
    pub min_confidence: f32,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub workers: usize,
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Telegram,
    Log,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub mode: NotifyMode,
    pub api_url: String,
    pub chat_id: String,
    /// Bot token, env-only (`LIFTGUARD_BOT_TOKEN`); never read from the file.
    pub bot_token: Option<String>,
}

impl GuardConfig {
    /// Load from `path` when given, else from `LIFTGUARD_CONFIG`, else
    /// defaults; env overrides apply on top either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("LIFTGUARD_CONFIG").ok();
        let file_cfg = match (path, env_path.as_deref()) {
            (Some(path), _) => Some(read_config_file(path)?),
            (None, Some(path)) => Some(read_config_file(Path::new(path))?),
            (None, None) => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GuardConfigFile) -> Result<Self> {
        let video = VideoSettings {
            source: file
                .video
                .as_ref()
                .and_then(|video| video.source.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            skip_interval: file
                .video
                .as_ref()
                .and_then(|video| video.skip_interval)
                .unwrap_or(DEFAULT_SKIP_INTERVAL),
            pace: Duration::from_millis(
                file.video
                    .as_ref()
                    .and_then(|video| video.pace_ms)
                    .unwrap_or(DEFAULT_PACE_MS),
            ),
        };
        let classifier = ClassifierSettings {
            backend: match file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.backend.as_deref())
            {
                None | Some("stub") => ClassifierBackendKind::Stub,
                Some("tract") => ClassifierBackendKind::Tract,
                Some(other) => {
                    return Err(anyhow!(
                        "unknown classifier backend '{}'; expected 'stub' or 'tract'",
                        other
                    ))
                }
            },
            model_path: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.model_path.clone()),
            input_width: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.input_width)
                .unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.input_height)
                .unwrap_or(DEFAULT_MODEL_INPUT),
        };
        let alerts = AlertSettings {
            cooldown: Duration::from_secs(
                file.alerts
                    .as_ref()
                    .and_then(|alerts| alerts.cooldown_secs)
                    .unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
            min_confidence: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.min_confidence)
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
        };
        let dispatch = DispatchSettings {
            workers: file
                .dispatch
                .as_ref()
                .and_then(|dispatch| dispatch.workers)
                .unwrap_or(DEFAULT_WORKERS),
            queue_depth: file
                .dispatch
                .as_ref()
                .and_then(|dispatch| dispatch.queue_depth)
                .unwrap_or(DEFAULT_QUEUE_DEPTH),
        };
        let notify = NotifySettings {
            mode: match file
                .notify
                .as_ref()
                .and_then(|notify| notify.mode.as_deref())
            {
                None | Some("telegram") => NotifyMode::Telegram,
                Some("log") => NotifyMode::Log,
                Some(other) => {
                    return Err(anyhow!(
                        "unknown notify mode '{}'; expected 'telegram' or 'log'",
                        other
                    ))
                }
            },
            api_url: file
                .notify
                .as_ref()
                .and_then(|notify| notify.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            chat_id: file
                .notify
                .and_then(|notify| notify.chat_id)
                .unwrap_or_default(),
            bot_token: None,
        };
        Ok(Self {
            video,
            classifier,
            alerts,
            dispatch,
            notify,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("LIFTGUARD_SOURCE") {
            if !source.trim().is_empty() {
                self.video.source = source;
            }
        }
        if let Ok(skip) = std::env::var("LIFTGUARD_SKIP_INTERVAL") {
            self.video.skip_interval = skip
                .parse()
                .map_err(|_| anyhow!("LIFTGUARD_SKIP_INTERVAL must be a positive integer"))?;
        }
        if let Ok(cooldown) = std::env::var("LIFTGUARD_COOLDOWN_SECS") {
            let seconds: u64 = cooldown
                .parse()
                .map_err(|_| anyhow!("LIFTGUARD_COOLDOWN_SECS must be an integer number of seconds"))?;
            self.alerts.cooldown = Duration::from_secs(seconds);
        }
        if let Ok(chat_id) = std::env::var("LIFTGUARD_CHAT_ID") {
            if !chat_id.trim().is_empty() {
                self.notify.chat_id = chat_id;
            }
        }
        if let Ok(token) = std::env::var("LIFTGUARD_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.notify.bot_token = Some(token);
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.video.source.trim().is_empty() {
            return Err(anyhow!("video.source must not be empty"));
        }
        if self.video.skip_interval == 0 {
            return Err(anyhow!("video.skip_interval must be at least 1"));
        }
        if self.alerts.cooldown.as_secs() == 0 {
            return Err(anyhow!("alerts.cooldown_secs must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.alerts.min_confidence) {
            return Err(anyhow!("alerts.min_confidence must be within [0, 1]"));
        }
        if self.dispatch.workers == 0 {
            return Err(anyhow!("dispatch.workers must be at least 1"));
        }
        if self.dispatch.queue_depth == 0 {
            return Err(anyhow!("dispatch.queue_depth must be at least 1"));
        }
        if self.classifier.backend == ClassifierBackendKind::Tract
            && self.classifier.model_path.is_none()
        {
            return Err(anyhow!(
                "classifier.model_path is required for the tract backend"
            ));
        }
        if self.notify.mode == NotifyMode::Telegram {
            if self.notify.chat_id.trim().is_empty() {
                return Err(anyhow!(
                    "notify.chat_id (or LIFTGUARD_CHAT_ID) is required for telegram delivery"
                ));
            }
            if self.notify.bot_token.is_none() {
                return Err(anyhow!(
                    "LIFTGUARD_BOT_TOKEN must be set for telegram delivery"
                ));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GuardConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
