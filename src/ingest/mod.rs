//! Frame ingestion sources.
//!
//! This module provides the sources raw frames come from:
//! - Synthetic stub streams (`stub://…`, always available, used by tests)
//! - Local files and network streams via FFmpeg (feature: ingest-ffmpeg)
//! - MJPEG/JPEG over HTTP (feature: ingest-http)
//!
//! All sources produce RGB24 [`Frame`]s that flow into the sampler. Opening a
//! source is fatal when it fails; a finished stream is a graceful end, not a
//! fault. Sources do not decimate — cadence control belongs to the sampler.

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[cfg(feature = "ingest-ffmpeg")]
mod file;
#[cfg(feature = "ingest-http")]
mod http;
mod stub;

#[cfg(feature = "ingest-ffmpeg")]
pub use file::FileSource;
#[cfg(feature = "ingest-http")]
pub use http::HttpSource;
pub use stub::StubSource;

/// A sequential frame source.
///
/// `connect` must be called once before the first `next_frame`. `next_frame`
/// blocks for up to one frame-read; `Ok(None)` signals end of stream.
pub trait FrameSource: Send {
    /// Open the underlying stream. Failure here is fatal for the pipeline.
    fn connect(&mut self) -> Result<()>;

    /// Read the next frame. `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying stream. Default: rely on drop.
    fn close(&mut self) {}

    /// True while the source is delivering frames at a plausible rate.
    fn is_healthy(&self) -> bool;

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics common to every source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub descriptor: String,
}

/// Build a frame source from a stream descriptor.
///
/// Dispatches on the scheme: `stub://` is built in, `http(s)://` requires the
/// ingest-http feature, and anything else (local paths, `rtsp://` and other
/// FFmpeg-readable URLs) requires the ingest-ffmpeg feature.
pub fn open_source(descriptor: &str) -> Result<Box<dyn FrameSource>> {
    if descriptor.trim().is_empty() {
        return Err(anyhow!("stream descriptor must not be empty"));
    }
    if descriptor.starts_with("stub://") {
        return Ok(Box::new(StubSource::new(descriptor)?));
    }
    if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
        #[cfg(feature = "ingest-http")]
        {
            return Ok(Box::new(HttpSource::new(descriptor)?));
        }
        #[cfg(not(feature = "ingest-http"))]
        {
            return Err(anyhow!(
                "http sources require the ingest-http feature (descriptor: {})",
                descriptor
            ));
        }
    }
    #[cfg(feature = "ingest-ffmpeg")]
    {
        Ok(Box::new(FileSource::new(descriptor)?))
    }
    #[cfg(not(feature = "ingest-ffmpeg"))]
    {
        Err(anyhow!(
            "file/stream sources require the ingest-ffmpeg feature (descriptor: {})",
            descriptor
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_descriptor_is_rejected() {
        assert!(open_source("  ").is_err());
    }

    #[test]
    fn stub_descriptor_opens_without_features() {
        assert!(open_source("stub://cabin").is_ok());
    }

    #[cfg(not(feature = "ingest-ffmpeg"))]
    #[test]
    fn file_descriptor_requires_feature() {
        let err = open_source("/var/lib/liftguard/cabin.mp4")
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("ingest-ffmpeg"));
    }
}
