//! Display surfaces: where composed frames end up.
//!
//! A surface accepts finished canvases from the render loop and shows them
//! somewhere: the MJPEG viewer server, nowhere (`NullSurface`), or a test
//! recorder. Presenting must never block the render loop on slow viewers.

mod mjpeg;

use anyhow::Result;
use image::RgbImage;

pub use mjpeg::{MjpegServer, MjpegServerConfig, MjpegServerHandle, MjpegSurface};

/// Sink for composed frames.
pub trait DisplaySurface: Send {
    /// Show the canvas as the current frame.
    fn present(&mut self, canvas: &RgbImage) -> Result<()>;

    /// Drop the current frame and go blank.
    fn clear(&mut self) -> Result<()>;
}

/// Surface that discards everything. Useful for headless runs.
#[derive(Debug, Default)]
pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn present(&mut self, _canvas: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Surface that keeps the last canvas and counts calls, for tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub presented: u64,
    pub cleared: u64,
    pub last_canvas: Option<RgbImage>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.last_canvas.is_none()
    }
}

impl DisplaySurface for RecordingSurface {
    fn present(&mut self, canvas: &RgbImage) -> Result<()> {
        self.presented += 1;
        self.last_canvas = Some(canvas.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.cleared += 1;
        self.last_canvas = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_surface_tracks_presents_and_clears() -> Result<()> {
        let mut surface = RecordingSurface::new();
        assert!(surface.is_blank());

        let canvas = RgbImage::new(8, 8);
        surface.present(&canvas)?;
        surface.present(&canvas)?;
        assert_eq!(surface.presented, 2);
        assert!(!surface.is_blank());

        surface.clear()?;
        assert_eq!(surface.cleared, 1);
        assert!(surface.is_blank());
        Ok(())
    }

    #[test]
    fn null_surface_accepts_everything() -> Result<()> {
        let mut surface = NullSurface;
        surface.present(&RgbImage::new(4, 4))?;
        surface.clear()?;
        Ok(())
    }
}
