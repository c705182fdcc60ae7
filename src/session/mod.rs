//! Session lifecycle.
//!
//! `SessionController` owns the camera, the render loop, and the teardown
//! order. It is the only place that moves the stream between states:
//! - Idle: no device held, surface blank
//! - Active: camera acquired, render loop ticking
//! - Stopping: teardown in progress
//!
//! Teardown always runs in the same order: stop the render loop, release
//! the camera, discard detection state, blank the surface. The controller
//! MUST NOT:
//! - Wait for in-flight detection exchanges to finish
//! - Let a completion from a stopped session reach the surface

mod render_loop;

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::capture::{CaptureConfig, CaptureSession, CaptureStats, DeviceUnavailable};
use crate::detect::{DetectionClient, DetectionScheduler};
use crate::overlay::OverlayRenderer;
use crate::surface::DisplaySurface;

use render_loop::RenderLoopHandle;

/// Where the stream currently is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Active,
    Stopping,
}

/// Channel for surfacing session-level failures to whoever is watching.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::error!("{}", message);
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub capture: CaptureConfig,
    /// Render loop tick rate.
    pub refresh_hz: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            refresh_hz: 30,
        }
    }
}

/// Owns one camera session and its render loop.
pub struct SessionController {
    config: SessionConfig,
    state: StreamState,
    scheduler: DetectionScheduler,
    client: Arc<dyn DetectionClient>,
    renderer: Arc<OverlayRenderer>,
    surface: Arc<Mutex<dyn DisplaySurface>>,
    notifier: Arc<dyn Notifier>,
    capture: Option<Arc<Mutex<CaptureSession>>>,
    render: Option<RenderLoopHandle>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        scheduler: DetectionScheduler,
        client: Arc<dyn DetectionClient>,
        surface: Arc<Mutex<dyn DisplaySurface>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            state: StreamState::Idle,
            scheduler,
            client,
            renderer: Arc::new(OverlayRenderer::default()),
            surface,
            notifier,
            capture: None,
            render: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamState::Active
    }

    /// Snapshot of the camera's counters, if a session is running.
    pub fn capture_stats(&self) -> Option<CaptureStats> {
        let capture = self.capture.as_ref()?;
        Some(capture.lock().expect("capture mutex poisoned").stats())
    }

    pub fn capture_healthy(&self) -> bool {
        match &self.capture {
            Some(capture) => capture.lock().expect("capture mutex poisoned").is_healthy(),
            None => false,
        }
    }

    /// Acquire the camera and start the render loop.
    ///
    /// A second call while active is a no-op. When the device cannot be
    /// acquired the failure is pushed through the notifier, the state stays
    /// Idle, and the error is returned; the controller never retries.
    pub fn start(&mut self) -> Result<(), DeviceUnavailable> {
        if self.state == StreamState::Active {
            log::debug!("start ignored, session already active");
            return Ok(());
        }

        let capture = match CaptureSession::acquire(&self.config.capture) {
            Ok(capture) => capture,
            Err(err) => {
                self.notifier.notify(&err.to_string());
                log::error!("session start failed: {}", err);
                return Err(err);
            }
        };

        // Fresh session, fresh overlay state.
        self.scheduler.reset();

        let capture = Arc::new(Mutex::new(capture));
        self.render = Some(render_loop::spawn(
            capture.clone(),
            self.scheduler.clone(),
            self.client.clone(),
            self.renderer.clone(),
            self.surface.clone(),
            self.config.refresh_hz,
        ));
        self.capture = Some(capture);
        self.state = StreamState::Active;
        log::info!("session started ({})", self.config.capture.device);
        Ok(())
    }

    /// Tear the session down and return to Idle.
    ///
    /// Safe to call in any state; stopping an idle session is a no-op. The
    /// steps run in a fixed order so nothing can repaint after the surface
    /// goes blank.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == StreamState::Idle {
            log::debug!("stop ignored, session already idle");
            return Ok(());
        }
        self.state = StreamState::Stopping;

        if let Some(render) = self.render.take() {
            render.stop()?;
        }

        if let Some(capture) = self.capture.take() {
            capture.lock().expect("capture mutex poisoned").release();
        }

        self.scheduler.reset();

        {
            let mut surface = self.surface.lock().expect("surface mutex poisoned");
            if let Err(err) = surface.clear() {
                log::warn!("surface clear failed during teardown: {:#}", err);
            }
        }

        self.state = StreamState::Idle;
        log::info!("session stopped");
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
