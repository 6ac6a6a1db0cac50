//! Frame sampler.
//!
//! Pulls every raw frame from the source and forwards one in every
//! `skip_interval` to the dispatcher. The blocking frame read is the
//! pipeline's natural pacing; an optional fixed delay per raw frame throttles
//! reads against sources that decode faster than real time (recordings).

use std::time::Duration;

use anyhow::Result;

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

pub struct FrameSampler {
    source: Box<dyn FrameSource>,
    skip_interval: u64,
    pace: Option<Duration>,
    counter: u64,
}

impl FrameSampler {
    /// `skip_interval` must be >= 1 (validated by config); 1 forwards every
    /// frame.
    pub fn new(source: Box<dyn FrameSource>, skip_interval: u64, pace: Option<Duration>) -> Self {
        Self {
            source,
            skip_interval: skip_interval.max(1),
            pace,
            counter: 0,
        }
    }

    /// Next frame that passes the skip cadence.
    ///
    /// With `skip_interval = k`, forwarded frames sit at 1-indexed raw-stream
    /// positions `k, 2k, 3k, …` (carried in [`Frame::index`]). `Ok(None)`
    /// means the source is exhausted; read errors propagate and are terminal
    /// for the sampling loop.
    pub fn next_sampled(&mut self) -> Result<Option<Frame>> {
        loop {
            let Some(mut frame) = self.source.next_frame()? else {
                return Ok(None);
            };
            self.counter += 1;
            frame.index = self.counter;

            if let Some(pace) = self.pace {
                std::thread::sleep(pace);
            }

            if self.counter % self.skip_interval == 0 {
                return Ok(Some(frame));
            }
        }
    }

    /// Raw frames read so far (sampled or skipped).
    pub fn frames_read(&self) -> u64 {
        self.counter
    }

    pub fn source_healthy(&self) -> bool {
        self.source.is_healthy()
    }

    pub fn source_stats(&self) -> SourceStats {
        self.source.stats()
    }

    pub fn close(&mut self) {
        self.source.close();
    }
}
