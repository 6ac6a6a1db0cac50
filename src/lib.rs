//! liftguard - lift-cabin incident watcher.
//!
//! Samples frames from a cabin camera stream, classifies each sampled frame
//! for an incident, and delivers a rate-limited Telegram alert to the
//! configured recipient.
//!
//! # Architecture
//!
//! ```text
//! frame source -> sampler -> dispatcher (worker pool)
//!                              |  incident, confidence >= threshold
//!                              v
//!                         alert gate (cooldown) -> notification sink
//! ```
//!
//! - The sampler forwards one frame in every `skip_interval`; the blocking
//!   frame read is the pipeline's pacing.
//! - Every sampled frame is an isolated unit of work on a bounded pool; a
//!   classifier failure is logged and contained to its unit.
//! - The gate is the only shared mutable state: one mutex-guarded
//!   check-then-set enforces at most one notification per cooldown window,
//!   no matter how many detections race.
//! - Delivery is at-most-once; a failed send never re-arms the gate.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (stub, FFmpeg, HTTP)
//! - `sampler`: skip-interval cadence control
//! - `classify`: classifier seam and backends (stub, tract ONNX)
//! - `dispatch`: bounded worker pool and unit-of-work isolation
//! - `alert`: cooldown gate
//! - `notify`: Telegram/log sinks and the inbound command listener
//! - `pipeline`: the top-level sampling loop
//! - `config`: JSON file + env configuration

pub mod alert;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod frame;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod sampler;

pub use alert::{AlertGate, GateOutcome};
pub use classify::{Classification, ClassifierBackend, Label, StubClassifier};
#[cfg(feature = "backend-tract")]
pub use classify::TractClassifier;
pub use config::GuardConfig;
pub use dispatch::{DispatchConfig, DispatchStats, Dispatcher};
pub use frame::Frame;
#[cfg(feature = "ingest-ffmpeg")]
pub use ingest::FileSource;
#[cfg(feature = "ingest-http")]
pub use ingest::HttpSource;
pub use ingest::{open_source, FrameSource, SourceStats, StubSource};
pub use notify::{
    CommandListener, LogSink, NotificationRequest, NotificationSink, TelegramClient, TelegramSink,
};
pub use pipeline::PipelineStats;
pub use sampler::FrameSampler;
