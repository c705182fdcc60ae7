//! Camera capture sources.
//!
//! This module provides `CaptureSession` for acquiring frames from a camera
//! device:
//! - HTTP MJPEG/JPEG network cameras (http:// and https:// devices)
//! - Synthetic source (stub:// devices, used by tests and demos)
//!
//! The capture layer is responsible for:
//! - Acquiring and releasing the device
//! - Decoding frames into RGB
//! - Tracking the live frame dimensions
//! - Rate limiting / frame decimation
//!
//! The capture layer MUST NOT:
//! - Retry acquisition on its own
//! - Hand out frames after release

mod http;

use std::fmt;

use anyhow::{anyhow, Result};
use image::RgbImage;
use url::Url;

use crate::frame::{FrameDimensions, VideoFrame};

use http::HttpCamera;

/// Configuration for a capture session.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Device URL. Supported schemes: http(s):// for network cameras,
    /// stub:// for the synthetic source.
    pub device: String,
    /// Target frame rate (frames per second). Network sources decimate to
    /// this rate.
    pub target_fps: u32,
    /// Frame width for synthetic devices.
    pub width: u32,
    /// Frame height for synthetic devices.
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// The camera device could not be acquired or has gone away.
///
/// This is the one capture failure callers are expected to branch on; all
/// other capture errors flow through `anyhow`.
#[derive(Debug, Clone)]
pub struct DeviceUnavailable {
    pub device: String,
    pub reason: String,
}

impl DeviceUnavailable {
    pub fn new(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DeviceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera device {} unavailable: {}", self.device, self.reason)
    }
}

impl std::error::Error for DeviceUnavailable {}

/// Statistics for a capture session.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

/// An acquired camera device producing decoded RGB frames.
///
/// Dimensions are live: they track the most recently decoded frame and stay
/// degenerate (0x0) for network cameras until the first frame arrives.
pub struct CaptureSession {
    device: String,
    backend: Option<CaptureBackend>,
    dimensions: FrameDimensions,
    frame_count: u64,
}

// Manual impl: the HTTP backend holds a `Box<dyn Read>` stream, so Debug
// cannot be derived through `CaptureBackend`.
impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("released", &self.backend.is_none())
            .field("dimensions", &self.dimensions)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

enum CaptureBackend {
    Synthetic(SyntheticCamera),
    Http(HttpCamera),
}

impl CaptureSession {
    /// Acquire the configured device.
    ///
    /// Fails with `DeviceUnavailable` when the device URL is malformed, the
    /// scheme is unsupported, or the network camera refuses the connection.
    pub fn acquire(config: &CaptureConfig) -> Result<Self, DeviceUnavailable> {
        let url = Url::parse(&config.device).map_err(|err| {
            DeviceUnavailable::new(&config.device, format!("invalid device url: {}", err))
        })?;
        let (backend, dimensions) = match url.scheme() {
            "stub" => (
                CaptureBackend::Synthetic(SyntheticCamera::new(config)),
                FrameDimensions::new(config.width, config.height),
            ),
            "http" | "https" => {
                let camera = HttpCamera::connect(&config.device, config.target_fps)
                    .map_err(|err| DeviceUnavailable::new(&config.device, format!("{:#}", err)))?;
                // Dimensions stay 0x0 until the first frame decodes.
                (CaptureBackend::Http(camera), FrameDimensions::default())
            }
            other => {
                return Err(DeviceUnavailable::new(
                    &config.device,
                    format!("unsupported device scheme '{}'; expected stub or http(s)", other),
                ))
            }
        };
        log::info!("CaptureSession: acquired {}", config.device);
        Ok(Self {
            device: config.device.clone(),
            backend: Some(backend),
            dimensions,
            frame_count: 0,
        })
    }

    /// Capture and decode the next frame, updating the live dimensions.
    pub fn next_frame(&mut self) -> Result<VideoFrame> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| anyhow!("capture session for {} already released", self.device))?;
        let image = match backend {
            CaptureBackend::Synthetic(camera) => camera.next_image()?,
            CaptureBackend::Http(camera) => camera.next_image()?,
        };
        self.frame_count += 1;
        self.dimensions = FrameDimensions::new(image.width(), image.height());
        Ok(VideoFrame::new(image, self.frame_count))
    }

    /// Dimensions of the most recent frame.
    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Release the device. Safe to call repeatedly; later calls are no-ops.
    pub fn release(&mut self) {
        if self.backend.take().is_some() {
            log::info!("CaptureSession: released {}", self.device);
        }
    }

    pub fn is_released(&self) -> bool {
        self.backend.is_none()
    }

    /// Check if the session is still delivering frames.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            Some(CaptureBackend::Synthetic(_)) => true,
            Some(CaptureBackend::Http(camera)) => camera.is_healthy(),
            None => false,
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_count: u64,
    /// Simulated "scene" state so consecutive frames differ.
    scene_state: u8,
}

impl SyntheticCamera {
    fn new(config: &CaptureConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn next_image(&mut self) -> Result<RgbImage> {
        self.frame_count += 1;

        // Change scene state occasionally to simulate motion
        if self.frame_count.is_multiple_of(50) {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; rgb_buffer_len(self.width, self.height)];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            // Mix frame count, scene state, and position for variation
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }

        RgbImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| anyhow!("synthetic frame buffer has the wrong size"))
    }
}

/// Byte length of a packed RGB8 buffer, widened so large dimensions cannot
/// overflow u32 arithmetic.
fn rgb_buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CaptureConfig {
        CaptureConfig {
            device: "stub://test".to_string(),
            target_fps: 30,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn stub_session_produces_frames() -> Result<()> {
        let mut session = CaptureSession::acquire(&stub_config())?;

        let first = session.next_frame()?;
        assert_eq!(first.seq, 1);
        assert_eq!(first.dimensions(), FrameDimensions::new(64, 48));

        let second = session.next_frame()?;
        assert_eq!(second.seq, 2);
        assert_ne!(first.image.as_raw(), second.image.as_raw());

        assert_eq!(session.stats().frames_captured, 2);
        assert!(session.is_healthy());
        Ok(())
    }

    #[test]
    fn dimensions_track_the_delivered_frames() -> Result<()> {
        let mut session = CaptureSession::acquire(&stub_config())?;
        assert_eq!(session.dimensions(), FrameDimensions::new(64, 48));

        session.next_frame()?;
        assert_eq!(session.dimensions(), FrameDimensions::new(64, 48));
        Ok(())
    }

    #[test]
    fn zero_sized_stub_reports_degenerate_dimensions() -> Result<()> {
        let config = CaptureConfig {
            width: 0,
            height: 0,
            ..stub_config()
        };
        let mut session = CaptureSession::acquire(&config)?;
        assert!(session.dimensions().is_degenerate());

        let frame = session.next_frame()?;
        assert!(frame.dimensions().is_degenerate());
        Ok(())
    }

    #[test]
    fn frame_buffer_length_survives_large_dimensions() {
        // 65536 * 65536 * 3 does not fit in u32.
        assert_eq!(rgb_buffer_len(65536, 65536) as u64, 12_884_901_888);
        assert_eq!(rgb_buffer_len(640, 480), 640 * 480 * 3);
        assert_eq!(rgb_buffer_len(0, 0), 0);
    }

    #[test]
    fn acquire_rejects_unsupported_schemes() {
        let config = CaptureConfig {
            device: "rtsp://192.168.1.10:554/stream".to_string(),
            ..stub_config()
        };
        let err = CaptureSession::acquire(&config).unwrap_err();
        assert!(err.device.contains("rtsp://"));
        assert!(err.to_string().contains("unsupported device scheme"));
    }

    #[test]
    fn acquire_rejects_malformed_device_urls() {
        let config = CaptureConfig {
            device: "not a url".to_string(),
            ..stub_config()
        };
        let err = CaptureSession::acquire(&config).unwrap_err();
        assert!(err.to_string().contains("invalid device url"));
    }

    #[test]
    fn release_is_idempotent_and_stops_frames() -> Result<()> {
        let mut session = CaptureSession::acquire(&stub_config())?;
        session.next_frame()?;

        session.release();
        session.release();

        assert!(session.is_released());
        assert!(!session.is_healthy());
        assert!(session.next_frame().is_err());
        Ok(())
    }
}
