//! Remote detection: wire client, result types, and the scheduler that
//! sequences requests and publishes the newest completed results.

mod client;
mod result;
mod scheduler;

pub use client::{
    encode_frame_jpeg, parse_detections, DetectionClient, HttpDetectionClient, TransportError,
    DEFAULT_JPEG_QUALITY,
};
pub use result::{BoundingBox, Detection, DetectionResultSet};
pub use scheduler::{
    CompletionOutcome, DetectionScheduler, DetectionTicket, PendingRequest, SchedulerStats,
};
