//! Live camera view with remote detection overlays.
//!
//! The crate splits the work into two loops that share only published
//! overlay state:
//!
//! 1. **Render loop**: captures a frame every refresh tick, paints the most
//!    recently published detections onto it, and presents the canvas.
//! 2. **Detection loop**: at most one request issued per detection
//!    interval, each carried by its own worker thread. The remote service
//!    may take arbitrarily long and answers may arrive out of order.
//!
//! The scheduler reconciles the two. Every request carries a strictly
//! increasing generation, and a completed result set is published only when
//! its generation is higher than the one on screen, so the overlay can go
//! stale but never move backwards.
//!
//! # Module Structure
//!
//! - `capture`: camera devices (HTTP MJPEG cameras, synthetic stub)
//! - `detect`: wire client, result types, request scheduler
//! - `overlay`: box and label-tag painting
//! - `surface`: where finished canvases go (MJPEG viewer server)
//! - `session`: lifecycle controller and the render loop
//! - `config`: file and environment configuration for the daemon

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod overlay;
pub mod session;
pub mod surface;

pub use capture::{CaptureConfig, CaptureSession, CaptureStats, DeviceUnavailable};
pub use config::{CameraSettings, DetectSettings, LiveviewConfig};
pub use detect::{
    BoundingBox, CompletionOutcome, Detection, DetectionClient, DetectionResultSet,
    DetectionScheduler, DetectionTicket, HttpDetectionClient, SchedulerStats, TransportError,
};
pub use frame::{FrameDimensions, VideoFrame};
pub use overlay::{OverlayRenderer, OverlayStyle};
pub use session::{LogNotifier, Notifier, SessionConfig, SessionController, StreamState};
pub use surface::{
    DisplaySurface, MjpegServer, MjpegServerConfig, MjpegServerHandle, MjpegSurface, NullSurface,
    RecordingSurface,
};
