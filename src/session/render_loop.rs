//! High-frequency render loop.
//!
//! One tick per refresh interval: capture a frame, paint the published
//! overlay onto it, present the canvas, and hand a detection request to a
//! worker thread when one is due. The loop never waits for detection; a
//! slow or failed exchange costs nothing but overlay freshness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::capture::CaptureSession;
use crate::detect::{DetectionClient, DetectionScheduler};
use crate::overlay::OverlayRenderer;
use crate::surface::DisplaySurface;

pub(crate) struct RenderLoopHandle {
    run: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl RenderLoopHandle {
    /// Ask the loop to finish its current tick and exit, then wait for it.
    pub(crate) fn stop(mut self) -> Result<()> {
        self.run.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("render loop thread panicked"))?;
        }
        Ok(())
    }
}

pub(crate) fn spawn(
    capture: Arc<Mutex<CaptureSession>>,
    scheduler: DetectionScheduler,
    client: Arc<dyn DetectionClient>,
    renderer: Arc<OverlayRenderer>,
    surface: Arc<Mutex<dyn DisplaySurface>>,
    refresh_hz: u32,
) -> RenderLoopHandle {
    let run = Arc::new(AtomicBool::new(true));
    let run_thread = run.clone();
    let join = std::thread::spawn(move || {
        run_loop(capture, scheduler, client, renderer, surface, refresh_hz, run_thread);
    });
    RenderLoopHandle {
        run,
        join: Some(join),
    }
}

fn run_loop(
    capture: Arc<Mutex<CaptureSession>>,
    scheduler: DetectionScheduler,
    client: Arc<dyn DetectionClient>,
    renderer: Arc<OverlayRenderer>,
    surface: Arc<Mutex<dyn DisplaySurface>>,
    refresh_hz: u32,
    run: Arc<AtomicBool>,
) {
    let tick = tick_interval(refresh_hz);
    while run.load(Ordering::SeqCst) {
        let started = Instant::now();
        run_tick(&capture, &scheduler, &client, &renderer, &surface);
        if let Some(rest) = tick.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    log::debug!("render loop exited");
}

fn run_tick(
    capture: &Arc<Mutex<CaptureSession>>,
    scheduler: &DetectionScheduler,
    client: &Arc<dyn DetectionClient>,
    renderer: &Arc<OverlayRenderer>,
    surface: &Arc<Mutex<dyn DisplaySurface>>,
) {
    let frame = {
        let mut capture = capture.lock().expect("capture mutex poisoned");
        if capture.is_released() {
            return;
        }
        match capture.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed: {:#}", err);
                return;
            }
        }
    };

    if frame.dimensions().is_degenerate() {
        log::debug!("skipping render tick, frame dimensions are degenerate");
        return;
    }

    let canvas = renderer.paint(&frame, &scheduler.published());
    {
        let mut surface = surface.lock().expect("surface mutex poisoned");
        if let Err(err) = surface.present(&canvas) {
            log::warn!("surface present failed: {:#}", err);
        }
    }

    if let Some(ticket) = scheduler.begin_if_due(Instant::now()) {
        let client = client.clone();
        let scheduler = scheduler.clone();
        // The frame moves to the worker; the exchange may outlive many
        // ticks and resolves through the scheduler whenever it finishes.
        std::thread::spawn(move || {
            let outcome = client.detect(&frame);
            scheduler.complete(ticket, outcome);
        });
    }
}

fn tick_interval(refresh_hz: u32) -> Duration {
    if refresh_hz == 0 {
        Duration::from_millis(33)
    } else {
        Duration::from_millis((1000 / refresh_hz).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_matches_refresh_rate() {
        assert_eq!(tick_interval(30), Duration::from_millis(33));
        assert_eq!(tick_interval(240), Duration::from_millis(4));
        assert_eq!(tick_interval(0), Duration::from_millis(33));
    }
}
