//! Video frame types shared by capture, overlay, and the render loop.
//!
//! - `VideoFrame`: one decoded RGB8 frame plus its capture sequence number.
//! - `FrameDimensions`: live width/height as reported by the device.
//!
//! Dimensions are read fresh each render tick because a device may change
//! its native resolution mid-session, and network cameras report 0x0 until
//! their first frame decodes. The render loop skips painting while the
//! dimensions are degenerate.

use image::RgbImage;

// ----------------------------------------------------------------------------
// FrameDimensions
// ----------------------------------------------------------------------------

/// Width and height of the live capture, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True while either side is zero (device not ready, or released).
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ----------------------------------------------------------------------------
// VideoFrame
// ----------------------------------------------------------------------------

/// One decoded frame of live video.
///
/// Frames are cheap to clone relative to the render cadence; the detection
/// path clones the frame it samples so encoding happens off the paint path.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Decoded RGB8 pixels.
    pub image: RgbImage,
    /// Capture sequence number, starting at 1 for the first frame.
    pub seq: u64,
}

impl VideoFrame {
    pub fn new(image: RgbImage, seq: u64) -> Self {
        Self { image, seq }
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(self.image.width(), self.image.height())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
