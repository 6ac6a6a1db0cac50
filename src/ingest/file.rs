//! FFmpeg frame source.
//!
//! Decodes anything FFmpeg can open — local recordings, RTSP cameras, other
//! network streams — to RGB24 frames. Decode happens in-memory; nothing is
//! written back to disk.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use std::time::{Duration, Instant};

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

pub struct FileSource {
    descriptor: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    draining: bool,
    finished: bool,
}

impl FileSource {
    pub fn new(descriptor: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&descriptor.to_string())
            .with_context(|| format!("failed to open input '{}' with ffmpeg", descriptor))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("input has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            descriptor: descriptor.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            last_frame_at: None,
            connected_at: None,
            draining: false,
            finished: false,
        })
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(Frame::new(pixels, width, height))
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        self.connected_at = Some(Instant::now());
        log::info!("FileSource: connected to {} (ffmpeg)", self.descriptor);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.draining {
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    return self.convert(&decoded).map(Some);
                }
                self.finished = true;
                return Ok(None);
            }

            let mut got_frame = false;
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        got_frame = true;
                    }
                }
                None => {
                    // Demuxer exhausted; flush frames buffered in the decoder.
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.draining = true;
                }
            }
            if got_frame {
                return self.convert(&decoded).map(Some);
            }
        }
    }

    fn close(&mut self) {
        self.finished = true;
        log::info!(
            "FileSource: released {} after {} frames",
            self.descriptor,
            self.frame_count
        );
    }

    fn is_healthy(&self) -> bool {
        if self.finished {
            return false;
        }
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= Duration::from_secs(5)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            descriptor: self.descriptor.clone(),
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
