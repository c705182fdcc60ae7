//! Integration tests for the HTTP camera backend.
//!
//! Each test scripts a camera on a loopback socket and drives it through
//! `CaptureSession`: multipart MJPEG delivery, snapshot mode, and a stalled
//! stream hitting the read timeout.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use liveview::{CaptureConfig, CaptureSession, FrameDimensions};

fn camera_config(url: String) -> CaptureConfig {
    CaptureConfig {
        device: url,
        target_fps: 0,
        width: 0,
        height: 0,
    }
}

fn jpeg_frame(shade: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(32, 24, Rgb([shade, 120, 40]));
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 80)
        .encode_image(&image)
        .expect("encode jpeg");
    bytes
}

fn read_request(stream: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).expect("read request");
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }
}

/// Serve one viewer connection with a multipart stream of the given frames,
/// then close the connection.
fn mjpeg_camera(frames: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind camera");
    let addr = listener.local_addr().expect("camera addr");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept viewer");
        read_request(&mut stream);
        let header =
            "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary=frame\r\n\r\n";
        stream.write_all(header.as_bytes()).expect("write header");
        for frame in frames {
            let part = format!(
                "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                frame.len()
            );
            stream.write_all(part.as_bytes()).expect("write part header");
            stream.write_all(&frame).expect("write frame");
            stream.write_all(b"\r\n").expect("write part tail");
        }
    });
    format!("http://{}/stream", addr)
}

/// Serve the same JPEG to every connection, one request per connection.
fn snapshot_camera(frame: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind camera");
    let addr = listener.local_addr().expect("camera addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            read_request(&mut stream);
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                frame.len()
            );
            stream.write_all(header.as_bytes()).expect("write header");
            stream.write_all(&frame).expect("write frame");
        }
    });
    format!("http://{}/snapshot.jpg", addr)
}

#[test]
fn mjpeg_camera_delivers_decoded_frames() {
    let url = mjpeg_camera(vec![jpeg_frame(10), jpeg_frame(200)]);
    let mut session = CaptureSession::acquire(&camera_config(url)).expect("acquire");
    assert!(session.dimensions().is_degenerate());

    let first = session.next_frame().expect("first frame");
    assert_eq!(first.dimensions(), FrameDimensions::new(32, 24));

    let second = session.next_frame().expect("second frame");
    assert_eq!(second.seq, 2);
    assert_ne!(first.image.as_raw(), second.image.as_raw());
    assert_eq!(session.dimensions(), FrameDimensions::new(32, 24));
    session.release();
}

#[test]
fn snapshot_camera_fetches_one_jpeg_per_frame() {
    let url = snapshot_camera(jpeg_frame(90));
    let mut session = CaptureSession::acquire(&camera_config(url)).expect("acquire");

    let first = session.next_frame().expect("first snapshot");
    assert_eq!(first.dimensions(), FrameDimensions::new(32, 24));

    let second = session.next_frame().expect("second snapshot");
    assert_eq!(second.seq, 2);
    session.release();
}

#[test]
fn stalled_stream_errors_instead_of_blocking_release() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind camera");
    let addr = listener.local_addr().expect("camera addr");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept viewer");
        read_request(&mut stream);
        let header =
            "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary=frame\r\n\r\n";
        stream.write_all(header.as_bytes()).expect("write header");
        // Hold the socket open without ever sending a frame.
        thread::sleep(Duration::from_secs(60));
    });

    let url = format!("http://{}/stream", addr);
    let mut session = CaptureSession::acquire(&camera_config(url)).expect("acquire");

    let started = Instant::now();
    let err = session.next_frame().expect_err("stalled stream must time out");
    assert!(started.elapsed() >= Duration::from_secs(4));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(format!("{:#}", err).contains("read mjpeg chunk"));
    session.release();
}
