use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use liveview::LiveviewConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LIVEVIEW_CONFIG",
        "LIVEVIEW_CAMERA_URL",
        "LIVEVIEW_DETECT_URL",
        "LIVEVIEW_DETECT_INTERVAL_MS",
        "LIVEVIEW_JPEG_QUALITY",
        "LIVEVIEW_REFRESH_HZ",
        "LIVEVIEW_STREAM_ADDR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "device": "http://camera-1/stream",
            "target_fps": 12,
            "width": 800,
            "height": 600
        },
        "detect": {
            "service_url": "http://detector:5000/detect",
            "interval_ms": 250,
            "jpeg_quality": 55
        },
        "render": {
            "refresh_hz": 24
        },
        "stream": {
            "addr": "0.0.0.0:9000"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("LIVEVIEW_CONFIG", file.path());
    std::env::set_var("LIVEVIEW_CAMERA_URL", "stub://override");
    std::env::set_var("LIVEVIEW_REFRESH_HZ", "60");

    let cfg = LiveviewConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://override");
    assert_eq!(cfg.camera.target_fps, 12);
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.detect.url, "http://detector:5000/detect");
    assert_eq!(cfg.detect.interval, Duration::from_millis(250));
    assert_eq!(cfg.detect.jpeg_quality, 55);
    assert_eq!(cfg.refresh_hz, 60);
    assert_eq!(cfg.viewer_addr, "0.0.0.0:9000");

    clear_env();
}

#[test]
fn partial_file_sets_stream_addr_and_detect_url() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "detect": {
            "service_url": "http://10.9.8.7:5000/detect"
        },
        "stream": {
            "addr": "0.0.0.0:19999"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("LIVEVIEW_CONFIG", file.path());

    let cfg = LiveviewConfig::load().expect("load config");

    assert_eq!(cfg.detect.url, "http://10.9.8.7:5000/detect");
    assert_eq!(cfg.viewer_addr, "0.0.0.0:19999");

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = LiveviewConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://camera");
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.detect.url, "http://127.0.0.1:5000/detect");
    assert_eq!(cfg.detect.interval, Duration::from_millis(100));
    assert_eq!(cfg.detect.jpeg_quality, 70);
    assert_eq!(cfg.refresh_hz, 30);
    assert_eq!(cfg.viewer_addr, "127.0.0.1:8650");
}

#[test]
fn rejects_zero_detect_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_DETECT_INTERVAL_MS", "0");
    let err = LiveviewConfig::load().expect_err("zero interval must fail");
    assert!(err.to_string().contains("greater than zero"));

    clear_env();
}

#[test]
fn rejects_non_http_detect_urls() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_DETECT_URL", "ftp://detector/detect");
    let err = LiveviewConfig::load().expect_err("ftp detect url must fail");
    assert!(err.to_string().contains("http or https"));

    clear_env();
}

#[test]
fn rejects_zero_stub_dimensions() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"camera": {"width": 0}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("LIVEVIEW_CONFIG", file.path());

    let err = LiveviewConfig::load().expect_err("zero width must fail");
    assert!(err.to_string().contains("dimensions must be nonzero"));

    clear_env();
}

#[test]
fn rejects_oversized_stub_dimensions() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"camera": {"width": 1000000, "height": 1000000}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("LIVEVIEW_CONFIG", file.path());

    let err = LiveviewConfig::load().expect_err("1000000x1000000 must fail");
    assert!(err.to_string().contains("at most"));

    clear_env();
}

#[test]
fn network_cameras_skip_stub_dimension_checks() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"camera": {"device": "http://camera-1/stream", "width": 0, "height": 0}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("LIVEVIEW_CONFIG", file.path());

    let cfg = LiveviewConfig::load().expect("network camera ignores stub dimensions");
    assert_eq!(cfg.camera.device, "http://camera-1/stream");

    clear_env();
}

#[test]
fn rejects_unsupported_camera_schemes() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_CAMERA_URL", "rtsp://192.168.1.10:554/stream");
    let err = LiveviewConfig::load().expect_err("rtsp camera must fail");
    assert!(err.to_string().contains("must use stub or http"));

    clear_env();
}

#[test]
fn rejects_non_numeric_refresh_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_REFRESH_HZ", "fast");
    let err = LiveviewConfig::load().expect_err("non-numeric refresh must fail");
    assert!(err.to_string().contains("LIVEVIEW_REFRESH_HZ"));

    clear_env();
}

#[test]
fn rejects_out_of_range_refresh_rates() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_REFRESH_HZ", "500");
    let err = LiveviewConfig::load().expect_err("500 Hz must fail");
    assert!(err.to_string().contains("between 1 and 240"));

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LIVEVIEW_CONFIG", "/nonexistent/liveview.json");
    let err = LiveviewConfig::load().expect_err("missing file must fail");
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
