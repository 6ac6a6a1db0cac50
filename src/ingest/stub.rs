//! Synthetic frame source.
//!
//! Generates a deterministic-ish test pattern: mostly dim cabin background
//! with an occasional short bright burst that the stub classifier reads as an
//! incident. `stub://name?frames=N` bounds the stream so end-of-stream paths
//! are exercisable; without the parameter the stream is endless.

use anyhow::{Context, Result};
use url::Url;

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;

/// Frames per simulated-incident cycle, and how many of them are bright.
const BURST_PERIOD: u64 = 150;
const BURST_LEN: u64 = 4;

pub struct StubSource {
    descriptor: String,
    frame_limit: Option<u64>,
    frame_count: u64,
    scene_state: u8,
    connected: bool,
}

impl StubSource {
    pub fn new(descriptor: &str) -> Result<Self> {
        let url = Url::parse(descriptor).context("parse stub descriptor")?;
        let frame_limit = url
            .query_pairs()
            .find(|(key, _)| key == "frames")
            .map(|(_, value)| {
                value
                    .parse::<u64>()
                    .context("stub 'frames' parameter must be an integer")
            })
            .transpose()?;

        Ok(Self {
            descriptor: descriptor.to_string(),
            frame_limit,
            frame_count: 0,
            scene_state: 0,
            connected: false,
        })
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (STUB_WIDTH * STUB_HEIGHT * 3) as usize;

        // Change scene state occasionally to simulate cabin activity.
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let burst = self.frame_count % BURST_PERIOD >= BURST_PERIOD - BURST_LEN;
        let mut pixels = vec![0u8; pixel_count];
        if burst {
            for (i, pixel) in pixels.iter_mut().enumerate() {
                *pixel = 210 + ((i as u64 + self.frame_count) % 40) as u8;
            }
        } else {
            for (i, pixel) in pixels.iter_mut().enumerate() {
                *pixel =
                    ((i as u64 + self.frame_count + self.scene_state as u64) % 160) as u8;
            }
        }

        // Per-frame noise so consecutive frames never hash identical.
        pixels[0] ^= rand::random::<u8>();
        pixels
    }
}

impl FrameSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("StubSource: connected to {} (synthetic)", self.descriptor);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.frame_limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Ok(Some(Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT)))
    }

    fn close(&mut self) {
        self.connected = false;
        log::info!(
            "StubSource: released {} after {} frames",
            self.descriptor,
            self.frame_count
        );
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            descriptor: self.descriptor.clone(),
        }
    }
}
