//! liftguardd - lift-cabin incident watcher daemon.
//!
//! This daemon:
//! 1. Opens the configured camera stream (stub, file/RTSP via FFmpeg, HTTP)
//! 2. Samples one frame in every `skip_interval`
//! 3. Classifies sampled frames on a bounded worker pool
//! 4. Gates positive detections through the cooldown window
//! 5. Delivers fired alerts to the configured Telegram chat
//! 6. Answers inbound `/start` and chat messages on the same bot transport

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use liftguard::config::{ClassifierBackendKind, GuardConfig, NotifyMode};
use liftguard::{
    AlertGate, ClassifierBackend, CommandListener, DispatchConfig, Dispatcher, FrameSampler,
    LogSink, NotificationSink, StubClassifier, TelegramClient, TelegramSink,
};

#[derive(Debug, Parser)]
#[command(name = "liftguardd", version, about = "Lift-cabin incident watcher")]
struct Args {
    /// Path to the JSON config file (falls back to LIFTGUARD_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the stream descriptor from the config.
    #[arg(long)]
    source: Option<String>,

    /// Load and validate the configuration, then exit.
    #[arg(long)]
    check_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = GuardConfig::load(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.video.source = source;
    }

    if args.check_config {
        log::info!(
            "config ok: source={} skip={} cooldown={}s workers={} notify={:?}",
            cfg.video.source,
            cfg.video.skip_interval,
            cfg.alerts.cooldown.as_secs(),
            cfg.dispatch.workers,
            cfg.notify.mode
        );
        return Ok(());
    }

    // Frame source; an open failure is fatal before the loop starts.
    let mut source = liftguard::open_source(&cfg.video.source)?;
    source.connect()?;

    let classifier = build_classifier(&cfg)?;
    classifier.warm_up().context("classifier warm-up failed")?;
    log::info!("classifier backend: {}", classifier.name());

    let gate = Arc::new(AlertGate::new(cfg.alerts.cooldown));

    let (sink, listener): (Arc<dyn NotificationSink>, Option<CommandListener>) =
        match cfg.notify.mode {
            NotifyMode::Telegram => {
                let token = cfg
                    .notify
                    .bot_token
                    .as_deref()
                    .ok_or_else(|| anyhow!("bot token missing after validation"))?;
                let client = Arc::new(TelegramClient::new(&cfg.notify.api_url, token)?);
                let listener = CommandListener::spawn(client.clone());
                (Arc::new(TelegramSink::new(client)), Some(listener))
            }
            NotifyMode::Log => (Arc::new(LogSink), None),
        };

    let dispatcher = Dispatcher::start(
        DispatchConfig {
            workers: cfg.dispatch.workers,
            queue_depth: cfg.dispatch.queue_depth,
            min_confidence: cfg.alerts.min_confidence,
        },
        classifier,
        gate,
        sink,
        &cfg.notify.chat_id,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, shutting down");
        ctrlc_shutdown.store(true, Ordering::SeqCst);
    })
    .context("install interrupt handler")?;

    let pace = if cfg.video.pace.is_zero() {
        None
    } else {
        Some(cfg.video.pace)
    };
    let mut sampler = FrameSampler::new(source, cfg.video.skip_interval, pace);

    log::info!(
        "liftguardd running. source={} skip={} cooldown={}s",
        cfg.video.source,
        cfg.video.skip_interval,
        cfg.alerts.cooldown.as_secs()
    );

    let stats = liftguard::pipeline::run(&mut sampler, &dispatcher, &shutdown)?;

    // Drain in-flight classifications before reporting.
    let dispatch = dispatcher.shutdown();
    log::info!(
        "pipeline stopped. read={} sampled={} dropped={} alerts={}",
        stats.frames_read,
        stats.frames_sampled,
        dispatch.dropped,
        dispatch.alerts_sent
    );

    if let Some(listener) = listener {
        listener.stop()?;
    }
    Ok(())
}

fn build_classifier(cfg: &GuardConfig) -> Result<Arc<dyn ClassifierBackend>> {
    match cfg.classifier.backend {
        ClassifierBackendKind::Stub => Ok(Arc::new(StubClassifier::new())),
        ClassifierBackendKind::Tract => {
            #[cfg(feature = "backend-tract")]
            {
                let model_path = cfg
                    .classifier
                    .model_path
                    .as_deref()
                    .ok_or_else(|| anyhow!("model path missing after validation"))?;
                Ok(Arc::new(liftguard::TractClassifier::new(
                    model_path,
                    cfg.classifier.input_width,
                    cfg.classifier.input_height,
                )?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "the tract backend requires building with the backend-tract feature"
                ))
            }
        }
    }
}
