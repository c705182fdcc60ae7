//! HTTP client for the remote detection service.
//!
//! One frame in, one parsed detection list out. The exchange is a single
//! `POST` carrying a base64 JPEG; the response is a JSON detection list.
//! There is deliberately no retry and no timeout here: the scheduler bounds
//! the issue rate, and a hung exchange simply never wins the generation
//! race.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::detect::{BoundingBox, Detection};
use crate::frame::VideoFrame;

/// Fallback JPEG quality for sampled frames (0..=100).
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

// ----------------------------------------------------------------------------
// TransportError
// ----------------------------------------------------------------------------

/// Typed failure of one detection exchange.
///
/// Always non-fatal: the caller treats any variant as "no update" and keeps
/// the previously published results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// Connection or mid-transfer IO failure.
    Network(String),
    /// The service answered with a non-success status.
    Status(u16),
    /// The response body was not a valid detection list.
    MalformedResponse(String),
    /// The frame could not be encoded into a request payload.
    Payload(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {}", msg),
            TransportError::Status(code) => write!(f, "service returned status {}", code),
            TransportError::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            TransportError::Payload(msg) => write!(f, "payload encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

// ----------------------------------------------------------------------------
// DetectionClient
// ----------------------------------------------------------------------------

/// Boundary to the remote detection service.
///
/// Implementations must be shareable across the worker threads that carry
/// in-flight exchanges.
pub trait DetectionClient: Send + Sync {
    /// Submit one frame and block until the service answers.
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, TransportError>;
}

/// Production client speaking the service's JSON-over-HTTP protocol.
pub struct HttpDetectionClient {
    service_url: String,
    jpeg_quality: u8,
}

impl HttpDetectionClient {
    pub fn new(service_url: impl Into<String>, jpeg_quality: u8) -> Self {
        Self {
            service_url: service_url.into(),
            jpeg_quality,
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }
}

impl DetectionClient for HttpDetectionClient {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, TransportError> {
        let jpeg = encode_frame_jpeg(frame, self.jpeg_quality)?;
        let request = DetectRequest {
            image: BASE64_STANDARD.encode(&jpeg),
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| TransportError::Payload(e.to_string()))?;

        let response = ureq::post(&self.service_url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => TransportError::Status(code),
                ureq::Error::Transport(transport) => {
                    TransportError::Network(transport.to_string())
                }
            })?;

        let mut payload = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut payload)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        parse_detections(&payload)
    }
}

// ----------------------------------------------------------------------------
// Wire format
// ----------------------------------------------------------------------------

/// Request body: `{"image": "<base64 jpeg>"}`.
#[derive(Debug, Serialize)]
struct DetectRequest {
    image: String,
}

/// Response body: `{"detections": [...]}`. A missing list is an empty list.
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<WireDetection>,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    label: String,
    #[serde(default)]
    confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels of the submitted frame.
    #[serde(rename = "box")]
    bounds: [f32; 4],
}

impl WireDetection {
    fn into_detection(self) -> Detection {
        let [x1, y1, x2, y2] = self.bounds;
        Detection::new(BoundingBox::new(x1, y1, x2, y2), self.label, self.confidence)
    }
}

/// Parse a detection-service response body.
pub fn parse_detections(payload: &[u8]) -> Result<Vec<Detection>, TransportError> {
    let response: DetectResponse = serde_json::from_slice(payload)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
    Ok(response
        .detections
        .into_iter()
        .map(WireDetection::into_detection)
        .collect())
}

/// JPEG-encode a frame at the given quality for the request payload.
pub fn encode_frame_jpeg(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>, TransportError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&frame.image)
        .map_err(|e| TransportError::Payload(e.to_string()))?;
    Ok(bytes)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
