//! Issue-rate throttling and generation-ordered publication.
//!
//! The scheduler decides when a new detection request is due, assigns each
//! issued request a strictly increasing generation, and publishes a
//! completed result set only if its generation is higher than the one
//! already published. Completions may arrive in any order; the comparison
//! and publish happen in one step under the state mutex.
//!
//! The scheduler MUST NOT:
//! - Block the caller of `begin_if_due` on network activity
//! - Let a completion from a previous session epoch touch published state
//! - Let a transport failure disturb the published results

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::detect::{Detection, DetectionResultSet, TransportError};

/// Bookkeeping for one issued, not-yet-completed request.
#[derive(Clone, Copy, Debug)]
pub struct PendingRequest {
    pub generation: u64,
    pub issued_at: Instant,
}

/// Handed out at issue time; the worker carrying the exchange returns it
/// with the outcome. Carries the session epoch it was issued under.
#[derive(Clone, Copy, Debug)]
pub struct DetectionTicket {
    epoch: u64,
    generation: u64,
}

impl DetectionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the scheduler did with a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Results published under the ticket's generation.
    Published,
    /// A same-or-newer generation was already published; results discarded.
    Superseded,
    /// Ticket belongs to a previous session epoch; discarded unconditionally.
    Expired,
    /// Transport failure; published results left untouched.
    Failed,
}

/// Counters for the daemon's health line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub published_generation: u64,
    pub published_detections: usize,
    pub in_flight: usize,
    pub consecutive_failures: u32,
}

struct SchedulerState {
    epoch: u64,
    next_generation: u64,
    last_issued_at: Option<Instant>,
    pending: Vec<PendingRequest>,
    published: DetectionResultSet,
    consecutive_failures: u32,
}

/// Shared scheduler handle. Clones refer to the same state; the render
/// loop issues, worker threads complete.
#[derive(Clone)]
pub struct DetectionScheduler {
    interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
}

impl DetectionScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(SchedulerState {
                epoch: 0,
                next_generation: 1,
                last_issued_at: None,
                pending: Vec::new(),
                published: DetectionResultSet::default(),
                consecutive_failures: 0,
            })),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Issue a new request if at least `interval` has elapsed since the
    /// last *issue* (not the last completion). Issue rate is bounded; the
    /// number of requests concurrently in flight is not.
    pub fn begin_if_due(&self, now: Instant) -> Option<DetectionTicket> {
        let mut state = self.lock();
        if let Some(last) = state.last_issued_at {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        let generation = state.next_generation;
        state.next_generation += 1;
        state.last_issued_at = Some(now);
        state.pending.push(PendingRequest {
            generation,
            issued_at: now,
        });
        log::debug!("detection request issued, g={}", generation);
        Some(DetectionTicket {
            epoch: state.epoch,
            generation,
        })
    }

    /// Resolve one completed exchange. Comparison and publish are a single
    /// step under the state lock, so two completions can never interleave
    /// between the generation check and the write.
    pub fn complete(
        &self,
        ticket: DetectionTicket,
        outcome: Result<Vec<Detection>, TransportError>,
    ) -> CompletionOutcome {
        let mut state = self.lock();
        if ticket.epoch != state.epoch {
            log::debug!(
                "discarding completion for g={} from a stopped session",
                ticket.generation
            );
            return CompletionOutcome::Expired;
        }
        state.pending.retain(|p| p.generation != ticket.generation);
        match outcome {
            Ok(detections) => {
                state.consecutive_failures = 0;
                if ticket.generation > state.published.generation {
                    log::debug!(
                        "published g={} with {} detections (was g={})",
                        ticket.generation,
                        detections.len(),
                        state.published.generation
                    );
                    state.published = DetectionResultSet::new(ticket.generation, detections);
                    CompletionOutcome::Published
                } else {
                    log::debug!(
                        "discarding stale completion g={} (published g={})",
                        ticket.generation,
                        state.published.generation
                    );
                    CompletionOutcome::Superseded
                }
            }
            Err(err) => {
                state.consecutive_failures += 1;
                log::warn!(
                    "detection request g={} failed ({} consecutive): {}",
                    ticket.generation,
                    state.consecutive_failures,
                    err
                );
                CompletionOutcome::Failed
            }
        }
    }

    /// Snapshot of the currently published result set.
    pub fn published(&self) -> DetectionResultSet {
        self.lock().published.clone()
    }

    /// Tear down for this session: advance the epoch so every in-flight
    /// completion is discarded, forget pending bookkeeping, and blank the
    /// published set.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        if !state.pending.is_empty() {
            log::debug!(
                "abandoning {} in-flight detection request(s)",
                state.pending.len()
            );
        }
        state.pending.clear();
        state.published = DetectionResultSet::default();
        state.last_issued_at = None;
        state.consecutive_failures = 0;
    }

    pub fn in_flight(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.lock();
        SchedulerStats {
            published_generation: state.published.generation,
            published_detections: state.published.detections.len(),
            in_flight: state.pending.len(),
            consecutive_failures: state.consecutive_failures,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("scheduler mutex poisoned")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
