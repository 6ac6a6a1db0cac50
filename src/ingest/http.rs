//! HTTP frame source.
//!
//! Ingests JPEG frames from cabin cameras that expose either a multipart
//! MJPEG stream or a single-JPEG snapshot endpoint. Frames are decoded
//! in-memory with the `image` crate.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use image::GenericImageView;

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

pub struct HttpSource {
    descriptor: String,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    frame_count: u64,
    ended: bool,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpSource {
    pub fn new(descriptor: &str) -> Result<Self> {
        Ok(Self {
            descriptor: descriptor.to_string(),
            stream: None,
            last_frame_at: None,
            connected_at: None,
            frame_count: 0,
            ended: false,
        })
    }
}

impl FrameSource for HttpSource {
    fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.descriptor)
            .call()
            .context("connect to http camera stream")?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
        }
        self.connected_at = Some(Instant::now());
        log::info!("HttpSource: connected to {}", self.descriptor);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.ended {
            return Ok(None);
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http source not connected; call connect() first"))?;

        let jpeg_bytes = match stream {
            HttpStream::Mjpeg(stream) => match stream.read_next_jpeg()? {
                Some(bytes) => bytes,
                None => {
                    // The camera closed the multipart stream.
                    self.ended = true;
                    return Ok(None);
                }
            },
            HttpStream::SingleJpeg => fetch_single_jpeg(&self.descriptor)?,
        };

        let (pixels, width, height) = decode_jpeg(&jpeg_bytes)?;
        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        Ok(Some(Frame::new(pixels, width, height)))
    }

    fn close(&mut self) {
        self.stream = None;
        self.ended = true;
        log::info!(
            "HttpSource: released {} after {} frames",
            self.descriptor,
            self.frame_count
        );
    }

    fn is_healthy(&self) -> bool {
        if self.ended {
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

struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    /// Read bytes until a full JPEG is buffered. `Ok(None)` = stream closed.
    fn read_next_jpeg(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(Some(frame));
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok((rgb.into_raw(), width, height))
}

fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}
