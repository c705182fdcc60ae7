use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

const DEFAULT_CAMERA_DEVICE: &str = "stub://camera";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_DETECT_URL: &str = "http://127.0.0.1:5000/detect";
const DEFAULT_DETECT_INTERVAL_MS: u64 = 100;
const DEFAULT_REFRESH_HZ: u32 = 30;
const DEFAULT_VIEWER_ADDR: &str = "127.0.0.1:8650";

const MAX_REFRESH_HZ: u32 = 240;
const MAX_STUB_DIMENSION: u32 = 4096;

#[derive(Debug, Deserialize, Default)]
struct LiveviewConfigFile {
    camera: Option<CameraConfigFile>,
    detect: Option<DetectConfigFile>,
    render: Option<RenderConfigFile>,
    stream: Option<StreamConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    service_url: Option<String>,
    interval_ms: Option<u64>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    refresh_hz: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LiveviewConfig {
    pub camera: CameraSettings,
    pub detect: DetectSettings,
    pub refresh_hz: u32,
    pub viewer_addr: String,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub url: String,
    pub interval: Duration,
    pub jpeg_quality: u8,
}

impl LiveviewConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LIVEVIEW_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LiveviewConfigFile) -> Self {
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let detect = DetectSettings {
            url: file
                .detect
                .as_ref()
                .and_then(|detect| detect.service_url.clone())
                .unwrap_or_else(|| DEFAULT_DETECT_URL.to_string()),
            interval: Duration::from_millis(
                file.detect
                    .as_ref()
                    .and_then(|detect| detect.interval_ms)
                    .unwrap_or(DEFAULT_DETECT_INTERVAL_MS),
            ),
            jpeg_quality: file
                .detect
                .and_then(|detect| detect.jpeg_quality)
                .unwrap_or(crate::detect::DEFAULT_JPEG_QUALITY),
        };
        let refresh_hz = file
            .render
            .and_then(|render| render.refresh_hz)
            .unwrap_or(DEFAULT_REFRESH_HZ);
        let viewer_addr = file
            .stream
            .and_then(|stream| stream.addr)
            .unwrap_or_else(|| DEFAULT_VIEWER_ADDR.to_string());
        Self {
            camera,
            detect,
            refresh_hz,
            viewer_addr,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("LIVEVIEW_CAMERA_URL") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(url) = std::env::var("LIVEVIEW_DETECT_URL") {
            if !url.trim().is_empty() {
                self.detect.url = url;
            }
        }
        if let Ok(interval) = std::env::var("LIVEVIEW_DETECT_INTERVAL_MS") {
            let millis: u64 = interval.parse().map_err(|_| {
                anyhow!("LIVEVIEW_DETECT_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.detect.interval = Duration::from_millis(millis);
        }
        if let Ok(quality) = std::env::var("LIVEVIEW_JPEG_QUALITY") {
            let quality: u8 = quality.parse().map_err(|_| {
                anyhow!("LIVEVIEW_JPEG_QUALITY must be an integer between 1 and 100")
            })?;
            self.detect.jpeg_quality = quality;
        }
        if let Ok(refresh) = std::env::var("LIVEVIEW_REFRESH_HZ") {
            let refresh: u32 = refresh
                .parse()
                .map_err(|_| anyhow!("LIVEVIEW_REFRESH_HZ must be an integer frame rate"))?;
            self.refresh_hz = refresh;
        }
        if let Ok(addr) = std::env::var("LIVEVIEW_STREAM_ADDR") {
            if !addr.trim().is_empty() {
                self.viewer_addr = addr;
            }
        }
        Ok(())
    }

    /// Check the invariants the daemon relies on. `load` runs this; callers
    /// that override fields afterwards (CLI flags) should run it again.
    pub fn validate(&self) -> Result<()> {
        let device_url = Url::parse(&self.camera.device).map_err(|e| {
            anyhow!(
                "camera device '{}' is not a valid url: {}",
                self.camera.device,
                e
            )
        })?;
        if !matches!(device_url.scheme(), "stub" | "http" | "https") {
            return Err(anyhow!(
                "camera device '{}' must use stub or http(s)",
                self.camera.device
            ));
        }
        if device_url.scheme() == "stub" {
            if self.camera.width == 0 || self.camera.height == 0 {
                return Err(anyhow!("stub camera dimensions must be nonzero"));
            }
            if self.camera.width > MAX_STUB_DIMENSION || self.camera.height > MAX_STUB_DIMENSION {
                return Err(anyhow!(
                    "stub camera dimensions must be at most {}x{}",
                    MAX_STUB_DIMENSION,
                    MAX_STUB_DIMENSION
                ));
            }
        }

        let detect_url = Url::parse(&self.detect.url)
            .map_err(|e| anyhow!("detect url '{}' is not valid: {}", self.detect.url, e))?;
        if !matches!(detect_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "detect url '{}' must use http or https",
                self.detect.url
            ));
        }

        if self.detect.interval.is_zero() {
            return Err(anyhow!("detect interval must be greater than zero"));
        }
        if self.detect.jpeg_quality == 0 || self.detect.jpeg_quality > 100 {
            return Err(anyhow!("jpeg quality must be between 1 and 100"));
        }
        if self.refresh_hz == 0 || self.refresh_hz > MAX_REFRESH_HZ {
            return Err(anyhow!(
                "refresh rate must be between 1 and {} Hz",
                MAX_REFRESH_HZ
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LiveviewConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
