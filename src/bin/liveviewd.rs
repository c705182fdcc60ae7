//! liveviewd - live view daemon
//!
//! This daemon:
//! 1. Acquires the configured camera device
//! 2. Runs the render loop at the configured refresh rate
//! 3. Issues detection requests on the detection interval
//! 4. Paints the newest published detections onto every frame
//! 5. Serves the overlaid feed over HTTP MJPEG

use anyhow::Result;
use clap::Parser;
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use liveview::{
    CaptureConfig, DetectionScheduler, DisplaySurface, HttpDetectionClient, LiveviewConfig,
    LogNotifier, MjpegServer, MjpegServerConfig, SessionConfig, SessionController,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera device URL (stub:// or http(s)://); overrides config.
    #[arg(long)]
    camera: Option<String>,
    /// Detection service endpoint; overrides config.
    #[arg(long)]
    detect_url: Option<String>,
    /// Milliseconds between detection requests; overrides config.
    #[arg(long)]
    detect_interval_ms: Option<u64>,
    /// Render refresh rate in Hz; overrides config.
    #[arg(long)]
    refresh_hz: Option<u32>,
    /// Listen address for the MJPEG viewer; overrides config.
    #[arg(long)]
    viewer_addr: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = LiveviewConfig::load()?;
    if let Some(camera) = args.camera {
        cfg.camera.device = camera;
    }
    if let Some(url) = args.detect_url {
        cfg.detect.url = url;
    }
    if let Some(millis) = args.detect_interval_ms {
        cfg.detect.interval = Duration::from_millis(millis);
    }
    if let Some(refresh) = args.refresh_hz {
        cfg.refresh_hz = refresh;
    }
    if let Some(addr) = args.viewer_addr {
        cfg.viewer_addr = addr;
    }
    cfg.validate()?;

    let (surface, server_handle) = MjpegServer::new(MjpegServerConfig {
        addr: cfg.viewer_addr.clone(),
    })
    .spawn()?;
    log::info!("viewer stream at http://{}/stream", server_handle.addr);

    let scheduler = DetectionScheduler::new(cfg.detect.interval);
    let client = Arc::new(HttpDetectionClient::new(
        cfg.detect.url.clone(),
        cfg.detect.jpeg_quality,
    ));
    let surface: Arc<Mutex<dyn DisplaySurface>> = Arc::new(Mutex::new(surface));

    let session_config = SessionConfig {
        capture: CaptureConfig {
            device: cfg.camera.device.clone(),
            target_fps: cfg.camera.target_fps,
            width: cfg.camera.width,
            height: cfg.camera.height,
        },
        refresh_hz: cfg.refresh_hz,
    };
    let mut controller = SessionController::new(
        session_config,
        scheduler.clone(),
        client,
        surface,
        Arc::new(LogNotifier),
    );
    controller.start()?;

    log::info!(
        "liveviewd running. camera={} detect={} interval={}ms refresh={}hz",
        cfg.camera.device,
        cfg.detect.url,
        cfg.detect.interval.as_millis(),
        cfg.refresh_hz
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    let mut last_health_log = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let sched = scheduler.stats();
            if let Some(stats) = controller.capture_stats() {
                log::info!(
                    "camera health={} frames={} overlay_generation={} in_flight={} consecutive_failures={}",
                    controller.capture_healthy(),
                    stats.frames_captured,
                    sched.published_generation,
                    sched.in_flight,
                    sched.consecutive_failures
                );
            }
            last_health_log = Instant::now();
        }
    }

    log::info!("shutdown signal received, stopping session...");
    controller.stop()?;
    server_handle.stop()?;

    Ok(())
}
