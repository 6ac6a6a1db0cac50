//! Top-level sampling loop.
//!
//! Drives the sampler and hands every sampled frame to the dispatcher until
//! the stream ends, the source fails, or shutdown is requested. This is the
//! only place that may unwind on an error; everything per-frame is contained
//! inside the dispatcher's units of work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::dispatch::Dispatcher;
use crate::sampler::FrameSampler;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    /// Raw frames pulled from the source.
    pub frames_read: u64,
    /// Frames that passed the skip cadence and were offered to the pool.
    pub frames_sampled: u64,
}

/// Run the detection loop to completion.
///
/// Returns `Ok` on end-of-stream or shutdown; a source read error propagates
/// after the source is released. The dispatcher is left running - callers own
/// its shutdown so in-flight units can drain.
pub fn run(
    sampler: &mut FrameSampler,
    dispatcher: &Dispatcher,
    shutdown: &AtomicBool,
) -> Result<PipelineStats> {
    let mut stats = PipelineStats::default();
    let result = drive(sampler, dispatcher, shutdown, &mut stats);
    sampler.close();
    result.map(|_| stats)
}

fn drive(
    sampler: &mut FrameSampler,
    dispatcher: &Dispatcher,
    shutdown: &AtomicBool,
    stats: &mut PipelineStats,
) -> Result<()> {
    let mut last_health_log = Instant::now();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("shutdown requested, stopping sampling loop");
            break;
        }

        match sampler.next_sampled()? {
            Some(frame) => {
                stats.frames_sampled += 1;
                dispatcher.dispatch(frame);
            }
            None => {
                log::info!("end of stream after {} frames", sampler.frames_read());
                break;
            }
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let source = sampler.source_stats();
            let dispatch = dispatcher.stats();
            log::info!(
                "source health={} frames={} sampled={} dropped={} alerts={} ({})",
                sampler.source_healthy(),
                source.frames_captured,
                stats.frames_sampled,
                dispatch.dropped,
                dispatch.alerts_sent,
                source.descriptor
            );
            last_health_log = Instant::now();
        }
    }

    stats.frames_read = sampler.frames_read();
    Ok(())
}
