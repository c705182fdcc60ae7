//! detect_check - one-shot probe of the detection service
//!
//! Grabs a single frame from the configured camera, sends it to the
//! detection endpoint, and prints what came back. Useful for checking
//! connectivity and response shape before starting liveviewd.

use anyhow::Result;
use clap::Parser;

use liveview::{CaptureConfig, CaptureSession, DetectionClient, HttpDetectionClient};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detection service endpoint to probe.
    #[arg(long, default_value = "http://127.0.0.1:5000/detect")]
    detect_url: String,
    /// Camera device URL to grab the probe frame from.
    #[arg(long, default_value = "stub://camera")]
    camera: String,
    /// JPEG quality for the probe frame (1-100).
    #[arg(long, default_value_t = 70)]
    jpeg_quality: u8,
    /// Probe frame width (stub camera only).
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Probe frame height (stub camera only).
    #[arg(long, default_value_t = 480)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    stage("acquire camera");
    let mut session = CaptureSession::acquire(&CaptureConfig {
        device: args.camera.clone(),
        target_fps: 30,
        width: args.width,
        height: args.height,
    })?;

    stage("grab probe frame");
    let frame = session.next_frame()?;

    stage("send detection request");
    let client = HttpDetectionClient::new(args.detect_url.clone(), args.jpeg_quality);
    let detections = client.detect(&frame)?;
    session.release();

    println!("detect_check summary:");
    println!("  endpoint: {}", args.detect_url);
    println!("  frame: {}", frame.dimensions());
    println!("  detections: {}", detections.len());
    for detection in &detections {
        let bounds = detection.bounds;
        println!(
            "  - {} box=[{:.0}, {:.0}, {:.0}, {:.0}]",
            detection.tag_text(),
            bounds.x1,
            bounds.y1,
            bounds.x2,
            bounds.y2
        );
    }

    Ok(())
}

fn stage(msg: &str) {
    eprintln!("detect_check: {}", msg);
}
