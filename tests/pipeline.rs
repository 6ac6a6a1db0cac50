//! End-to-end pipeline tests over scripted sources, classifiers and sinks.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use liftguard::{
    AlertGate, Classification, ClassifierBackend, DispatchConfig, Dispatcher, Frame, FrameSampler,
    FrameSource, Label, NotificationRequest, NotificationSink, SourceStats, StubClassifier,
    StubSource,
};

/// Source yielding `total` frames whose first pixel encodes the 1-indexed
/// production order, then end of stream.
struct MarkedSource {
    total: u8,
    produced: u8,
}

impl MarkedSource {
    fn new(total: u8) -> Self {
        Self { total, produced: 0 }
    }
}

impl FrameSource for MarkedSource {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.produced >= self.total {
            return Ok(None);
        }
        self.produced += 1;
        Ok(Some(Frame::new(vec![self.produced, 0, 0], 1, 1)))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.produced as u64,
            descriptor: "test://marked".to_string(),
        }
    }
}

type Verdict = Box<dyn Fn(u8) -> Result<Classification> + Send + Sync>;

/// Classifier that records the marker pixel of every frame it sees and
/// answers according to the provided verdict function.
struct ObservingClassifier {
    seen: Mutex<Vec<u8>>,
    verdict: Verdict,
}

impl ObservingClassifier {
    fn new(verdict: Verdict) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            verdict,
        }
    }

    fn seen(&self) -> Vec<u8> {
        self.seen.lock().unwrap().clone()
    }
}

impl ClassifierBackend for ObservingClassifier {
    fn name(&self) -> &'static str {
        "observing"
    }

    fn classify(&self, pixels: &[u8], _width: u32, _height: u32) -> Result<Classification> {
        let marker = pixels[0];
        self.seen.lock().unwrap().push(marker);
        (self.verdict)(marker)
    }
}

struct RecordingSink {
    sent: Mutex<Vec<NotificationRequest>>,
    fail: bool,
}

impl RecordingSink {
    fn new(fail: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, request: &NotificationRequest) -> Result<()> {
        self.sent.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(anyhow!("transport down"));
        }
        Ok(())
    }
}

fn incident(confidence: f32) -> Result<Classification> {
    Ok(Classification {
        label: Label::Incident,
        confidence,
    })
}

fn quiet() -> Result<Classification> {
    Ok(Classification {
        label: Label::NoIncident,
        confidence: 0.9,
    })
}

fn run_pipeline(
    source: Box<dyn FrameSource>,
    skip_interval: u64,
    classifier: Arc<dyn ClassifierBackend>,
    sink: Arc<dyn NotificationSink>,
    cooldown: Duration,
) -> (liftguard::PipelineStats, liftguard::DispatchStats) {
    let gate = Arc::new(AlertGate::new(cooldown));
    let dispatcher = Dispatcher::start(
        DispatchConfig {
            workers: 1,
            queue_depth: 32,
            min_confidence: 0.5,
        },
        classifier,
        gate,
        sink,
        "42",
    );
    let mut sampler = FrameSampler::new(source, skip_interval, None);
    let shutdown = AtomicBool::new(false);

    let stats = liftguard::pipeline::run(&mut sampler, &dispatcher, &shutdown)
        .expect("pipeline run failed");
    let dispatch = dispatcher.shutdown();
    (stats, dispatch)
}

#[test]
fn skip_cadence_classifies_only_every_third_frame() {
    let classifier = Arc::new(ObservingClassifier::new(Box::new(|_| quiet())));
    let sink = Arc::new(RecordingSink::new(false));

    let (stats, dispatch) = run_pipeline(
        Box::new(MarkedSource::new(10)),
        3,
        classifier.clone(),
        sink.clone(),
        Duration::from_secs(180),
    );

    assert_eq!(stats.frames_read, 10);
    assert_eq!(stats.frames_sampled, 3);
    assert_eq!(dispatch.dispatched, 3);
    assert_eq!(dispatch.dropped, 0);
    assert_eq!(classifier.seen(), vec![3, 6, 9]);
    assert_eq!(sink.attempts(), 0);
}

#[test]
fn burst_of_incidents_alerts_exactly_once_per_window() {
    let classifier = Arc::new(ObservingClassifier::new(Box::new(|_| incident(0.92))));
    let sink = Arc::new(RecordingSink::new(false));

    let (stats, dispatch) = run_pipeline(
        Box::new(MarkedSource::new(10)),
        1,
        classifier,
        sink.clone(),
        Duration::from_secs(3600),
    );

    assert_eq!(stats.frames_sampled, 10);
    assert_eq!(dispatch.incidents, 10);
    assert_eq!(dispatch.alerts_sent, 1);
    assert_eq!(dispatch.suppressed, 9);
    assert_eq!(sink.attempts(), 1);
}

#[test]
fn classify_error_on_one_frame_does_not_stall_the_stream() {
    // Frame 2 fails; frames 4 and 6 still reach the classifier and alert.
    let classifier = Arc::new(ObservingClassifier::new(Box::new(|marker| {
        if marker == 2 {
            Err(anyhow!("model exploded"))
        } else {
            incident(0.9)
        }
    })));
    let sink = Arc::new(RecordingSink::new(false));

    let (_, dispatch) = run_pipeline(
        Box::new(MarkedSource::new(6)),
        2,
        classifier.clone(),
        sink.clone(),
        Duration::from_secs(3600),
    );

    assert_eq!(classifier.seen(), vec![2, 4, 6]);
    assert_eq!(dispatch.classify_errors, 1);
    assert_eq!(dispatch.alerts_sent, 1);
    assert_eq!(sink.attempts(), 1);
}

#[test]
fn failed_delivery_is_never_retried() {
    let classifier = Arc::new(ObservingClassifier::new(Box::new(|_| incident(0.9))));
    let sink = Arc::new(RecordingSink::new(true));

    let (_, dispatch) = run_pipeline(
        Box::new(MarkedSource::new(5)),
        1,
        classifier,
        sink.clone(),
        Duration::from_secs(3600),
    );

    // One gate-pass, one attempt; the failure consumed the window.
    assert_eq!(sink.attempts(), 1);
    assert_eq!(dispatch.delivery_errors, 1);
    assert_eq!(dispatch.alerts_sent, 0);
    assert_eq!(dispatch.suppressed, 4);
}

#[test]
fn bounded_stub_stream_stops_cleanly() {
    let classifier = Arc::new(StubClassifier::new());
    let sink = Arc::new(RecordingSink::new(false));

    let mut source = StubSource::new("stub://cabin?frames=10").expect("stub source");
    source.connect().expect("connect");

    let (stats, dispatch) = run_pipeline(
        Box::new(source),
        3,
        classifier,
        sink,
        Duration::from_secs(180),
    );

    assert_eq!(stats.frames_read, 10);
    assert_eq!(stats.frames_sampled, 3);
    assert_eq!(dispatch.dispatched + dispatch.dropped, 3);
}
