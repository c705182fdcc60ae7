//! HTTP network camera backend.
//!
//! Handles cameras that serve MJPEG over multipart HTTP as well as plain
//! JPEG snapshot endpoints. The mode is picked from the Content-Type of the
//! initial response.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// Socket read timeout; bounds how long a stalled camera can block a frame read.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) struct HttpCamera {
    url: String,
    agent: ureq::Agent,
    target_fps: u32,
    stream: HttpStream,
    last_frame_at: Option<Instant>,
    connected_at: Instant,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    Snapshot,
}

impl HttpCamera {
    pub(super) fn connect(url: &str, target_fps: u32) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().timeout_read(READ_TIMEOUT).build();
        let response = agent
            .get(url)
            .call()
            .with_context(|| format!("connect to camera stream {}", url))?;
        let content_type = response.header("Content-Type").unwrap_or("");
        let stream = if content_type.to_lowercase().contains("multipart") {
            HttpStream::Mjpeg(MjpegStream::new(response.into_reader()))
        } else {
            HttpStream::Snapshot
        };
        log::info!("HttpCamera: connected to {}", url);
        Ok(Self {
            url: url.to_string(),
            agent,
            target_fps,
            stream,
            last_frame_at: None,
            connected_at: Instant::now(),
        })
    }

    pub(super) fn next_image(&mut self) -> Result<RgbImage> {
        let min_interval = frame_interval(self.target_fps);
        loop {
            let jpeg_bytes = match &mut self.stream {
                HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
                HttpStream::Snapshot => fetch_snapshot(&self.agent, &self.url),
            }?;

            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }

            let image = image::load_from_memory(&jpeg_bytes)
                .context("decode camera jpeg")?
                .into_rgb8();
            self.last_frame_at = Some(now);
            return Ok(image);
        }
    }

    pub(super) fn is_healthy(&self) -> bool {
        let Some(last_frame_at) = self.last_frame_at else {
            return self.connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= health_grace(self.target_fps)
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

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
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

fn fetch_snapshot(agent: &ureq::Agent, url: &str) -> Result<Vec<u8>> {
    let response = agent
        .get(url)
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

/// Locate one complete JPEG (SOI through EOI) in the buffer.
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

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

fn health_grace(target_fps: u32) -> Duration {
    let base_ms = if target_fps == 0 {
        2_000
    } else {
        (1000 / target_fps).saturating_mul(6)
    };
    Duration::from_millis(base_ms.max(2_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_bounds_skip_multipart_headers() {
        let mut buffer = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        buffer.extend_from_slice(&[0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        buffer.extend_from_slice(b"\r\n--frame");

        let (start, end) = find_jpeg_bounds(&buffer).unwrap();
        assert_eq!(&buffer[start..start + 2], &[0xFF, 0xD8]);
        assert_eq!(&buffer[end - 2..end], &[0xFF, 0xD9]);
    }

    #[test]
    fn jpeg_bounds_wait_for_the_end_marker() {
        let buffer = [0x00, 0xFF, 0xD8, 0x01, 0x02];
        assert!(find_jpeg_bounds(&buffer).is_none());
    }

    #[test]
    fn frame_interval_handles_zero_fps() {
        assert_eq!(frame_interval(0), Duration::from_millis(0));
        assert_eq!(frame_interval(30), Duration::from_millis(33));
    }

    #[test]
    fn health_grace_has_a_floor() {
        assert!(health_grace(0) >= Duration::from_secs(2));
        assert!(health_grace(240) >= Duration::from_secs(2));
    }
}
