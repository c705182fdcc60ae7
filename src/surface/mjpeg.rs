//! MJPEG viewer server.
//!
//! Serves the most recently presented canvas over plain HTTP so any browser
//! or `curl` can watch the overlaid feed:
//! - `GET /stream` multipart/x-mixed-replace MJPEG stream
//! - `GET /frame`  single JPEG snapshot (404 while the surface is blank)
//! - `GET /health` liveness probe
//!
//! The surface half encodes each canvas once; viewer connections copy the
//! shared bytes at their own pace and can never stall the render loop.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use super::DisplaySurface;

const MAX_REQUEST_BYTES: usize = 8192;
const STREAM_BOUNDARY: &str = "liveviewframe";
const STREAM_JPEG_QUALITY: u8 = 80;

#[derive(Clone, Debug)]
pub struct MjpegServerConfig {
    pub addr: String,
}

impl Default for MjpegServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8650".to_string(),
        }
    }
}

#[derive(Default)]
struct SharedFrame {
    jpeg: Option<Vec<u8>>,
    seq: u64,
}

type Shared = Arc<Mutex<SharedFrame>>;

#[derive(Debug)]
pub struct MjpegServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl MjpegServerHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("mjpeg server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct MjpegServer {
    cfg: MjpegServerConfig,
}

impl MjpegServer {
    pub fn new(cfg: MjpegServerConfig) -> Self {
        Self { cfg }
    }

    /// Bind and start serving, returning the surface half and a stop handle.
    pub fn spawn(self) -> Result<(MjpegSurface, MjpegServerHandle)> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "viewer configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shared: Shared = Arc::new(Mutex::new(SharedFrame::default()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shared_thread = shared.clone();
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, shared_thread, shutdown_thread) {
                log::error!("mjpeg viewer server stopped: {}", err);
            }
        });
        log::info!("MjpegServer: listening on http://{}", addr);

        Ok((
            MjpegSurface { shared },
            MjpegServerHandle {
                addr,
                shutdown,
                join: Some(join),
            },
        ))
    }
}

/// Surface half of the viewer server.
pub struct MjpegSurface {
    shared: Shared,
}

impl DisplaySurface for MjpegSurface {
    fn present(&mut self, canvas: &RgbImage) -> Result<()> {
        let jpeg = encode_jpeg(canvas, STREAM_JPEG_QUALITY)?;
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("viewer frame lock poisoned"))?;
        shared.jpeg = Some(jpeg);
        shared.seq += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| anyhow!("viewer frame lock poisoned"))?;
        shared.jpeg = None;
        shared.seq += 1;
        Ok(())
    }
}

fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(canvas)
        .map_err(|err| anyhow!("encode viewer jpeg: {}", err))?;
    Ok(bytes)
}

fn run_server(listener: TcpListener, shared: Shared, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &shared, &shutdown) {
                    log::warn!("mjpeg viewer request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    shared: &Shared,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    if request.method != "GET" {
        write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
        return Ok(());
    }
    match request.path.as_str() {
        "/health" => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        "/frame" => {
            let jpeg = shared
                .lock()
                .map_err(|_| anyhow!("viewer frame lock poisoned"))?
                .jpeg
                .clone();
            match jpeg {
                Some(jpeg) => write_response(&mut stream, 200, "image/jpeg", &jpeg),
                None => write_json_response(&mut stream, 404, r#"{"error":"no_frame"}"#),
            }
        }
        "/stream" => {
            // Each viewer gets its own pusher thread; it exits when the
            // client disconnects or the server shuts down.
            let shared = shared.clone();
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                if let Err(err) = stream_frames(stream, shared, shutdown) {
                    log::debug!("mjpeg viewer disconnected: {}", err);
                }
            });
            Ok(())
        }
        _ => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
    }
}

fn stream_frames(mut stream: TcpStream, shared: Shared, shutdown: Arc<AtomicBool>) -> Result<()> {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={}\r\nCache-Control: no-store\r\n\r\n",
        STREAM_BOUNDARY
    );
    stream.write_all(header.as_bytes())?;

    let mut last_seq = 0u64;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let next = {
            let shared = shared
                .lock()
                .map_err(|_| anyhow!("viewer frame lock poisoned"))?;
            if shared.seq == last_seq {
                None
            } else {
                last_seq = shared.seq;
                shared.jpeg.clone()
            }
        };
        match next {
            Some(jpeg) => {
                let part_header = format!(
                    "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                    STREAM_BOUNDARY,
                    jpeg.len()
                );
                stream.write_all(part_header.as_bytes())?;
                stream.write_all(&jpeg)?;
                stream.write_all(b"\r\n")?;
            }
            // Blank surface or no new frame yet.
            None => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    Ok(())
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let request_line = text
        .split("\r\n")
        .next()
        .ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}
