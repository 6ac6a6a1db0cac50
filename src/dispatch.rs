//! Detection dispatcher.
//!
//! Each sampled frame becomes one unit of work on a bounded worker pool:
//! classify, then on a qualifying incident attempt the alert gate, then hand
//! a fired alert to the notification sink. A unit's failure - classifier
//! error or delivery error - is contained to that unit and logged; it can
//! never abort the sampler or another in-flight unit.
//!
//! Backpressure is drop-newest: when every worker is busy and the queue is
//! full, the incoming frame is discarded with a warning. The sampler is never
//! blocked by a slow classifier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime};

use crate::alert::{AlertGate, GateOutcome};
use crate::classify::{ClassifierBackend, Label};
use crate::frame::Frame;
use crate::notify::{NotificationRequest, NotificationSink};

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Concurrent classification units. Bounds classifier parallelism.
    pub workers: usize,
    /// Frames buffered between sampler and workers before drops begin.
    pub queue_depth: usize,
    /// Incidents below this confidence are logged and ignored.
    pub min_confidence: f32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_depth: 8,
            min_confidence: 0.5,
        }
    }
}

/// Counter snapshot for health logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub dropped: u64,
    pub incidents: u64,
    pub suppressed: u64,
    pub classify_errors: u64,
    pub alerts_sent: u64,
    pub delivery_errors: u64,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    incidents: AtomicU64,
    suppressed: AtomicU64,
    classify_errors: AtomicU64,
    alerts_sent: AtomicU64,
    delivery_errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            incidents: self.incidents.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            classify_errors: self.classify_errors.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
        }
    }
}

/// Everything one worker needs; cloned per worker thread.
#[derive(Clone)]
struct WorkerContext {
    classifier: Arc<dyn ClassifierBackend>,
    gate: Arc<AlertGate>,
    sink: Arc<dyn NotificationSink>,
    recipient: String,
    min_confidence: f32,
    counters: Arc<Counters>,
}

pub struct Dispatcher {
    tx: Option<SyncSender<Frame>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    pub fn start(
        config: DispatchConfig,
        classifier: Arc<dyn ClassifierBackend>,
        gate: Arc<AlertGate>,
        sink: Arc<dyn NotificationSink>,
        recipient: &str,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let context = WorkerContext {
            classifier,
            gate,
            sink,
            recipient: recipient.to_string(),
            min_confidence: config.min_confidence,
            counters: counters.clone(),
        };

        let (tx, rx) = sync_channel(config.queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let context = context.clone();
                std::thread::spawn(move || worker_loop(worker, rx, context))
            })
            .collect();

        Self {
            tx: Some(tx),
            workers,
            counters,
        }
    }

    /// Hand one sampled frame to the pool. Never blocks; a full queue drops
    /// the frame.
    pub fn dispatch(&self, frame: Frame) {
        let Some(tx) = &self.tx else {
            return;
        };
        let index = frame.index;
        match tx.try_send(frame) {
            Ok(()) => {
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "frame {}: classification queue full, frame dropped",
                    index
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("frame {}: classification workers are gone", index);
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    /// Close the queue, wait for in-flight units to finish, and return the
    /// final counters.
    pub fn shutdown(mut self) -> DispatchStats {
        self.close();
        self.counters.snapshot()
    }

    fn close(&mut self) {
        self.tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("classification worker panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(worker: usize, rx: Arc<Mutex<Receiver<Frame>>>, context: WorkerContext) {
    log::debug!("classification worker {} ready", worker);
    loop {
        let frame = {
            let guard = rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.recv()
        };
        match frame {
            Ok(frame) => process_frame(&context, frame),
            Err(_) => break,
        }
    }
    log::debug!("classification worker {} done", worker);
}

/// One unit of work: classify one frame and maybe alert.
fn process_frame(context: &WorkerContext, frame: Frame) {
    // Detection timestamps are taken when the unit starts, not when the
    // (possibly slow) classifier returns.
    let detected_mono = Instant::now();
    let detected_wall = SystemTime::now();
    let index = frame.index;

    let classification =
        match context
            .classifier
            .classify(&frame.pixels, frame.width, frame.height)
        {
            Ok(classification) => classification,
            Err(e) => {
                context
                    .counters
                    .classify_errors
                    .fetch_add(1, Ordering::Relaxed);
                log::warn!("frame {}: classification failed: {}", index, e);
                return;
            }
        };

    match classification.label {
        Label::Incident if classification.confidence >= context.min_confidence => {
            context.counters.incidents.fetch_add(1, Ordering::Relaxed);
            match context.gate.try_fire(detected_mono) {
                GateOutcome::Fired => {
                    let request = NotificationRequest::incident(
                        &context.recipient,
                        detected_wall,
                        classification.confidence,
                    );
                    log::info!(
                        "frame {}: incident (confidence {:.2}), alerting chat {}",
                        index,
                        classification.confidence,
                        context.recipient
                    );
                    match context.sink.send(&request) {
                        Ok(()) => {
                            context.counters.alerts_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            context
                                .counters
                                .delivery_errors
                                .fetch_add(1, Ordering::Relaxed);
                            // Cooldown stays consumed; retrying here could
                            // duplicate or re-order alerts.
                            log::warn!("frame {}: alert delivery failed: {}", index, e);
                        }
                    }
                }
                GateOutcome::Suppressed => {
                    context.counters.suppressed.fetch_add(1, Ordering::Relaxed);
                    log::debug!("frame {}: incident within cooldown, suppressed", index);
                }
            }
        }
        Label::Incident => {
            log::debug!(
                "frame {}: incident below confidence threshold ({:.2} < {:.2})",
                index,
                classification.confidence,
                context.min_confidence
            );
        }
        Label::NoIncident => {
            log::trace!(
                "frame {}: no incident (confidence {:.2})",
                index,
                classification.confidence
            );
        }
        Label::Unknown => {
            log::debug!("frame {}: unknown class, ignored", index);
        }
    }
}
