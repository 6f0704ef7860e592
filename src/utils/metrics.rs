//! Observability and Metrics
//!
//! Atomic counters fed from session events. A [`Metrics`] instance is created
//! by whoever runs the server and handed to it as an [`EventSink`]; there is
//! no process-wide instance.

use crate::protocol::events::{EventSink, SessionEvent};
use crate::protocol::session::SessionState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Counters for one server process
#[derive(Debug)]
pub struct Metrics {
    /// Sessions accepted
    pub sessions_total: AtomicU64,
    /// Sessions that reached `Done`
    pub sessions_completed: AtomicU64,
    /// Sessions that ended in `Failed`
    pub sessions_failed: AtomicU64,
    /// Successful authentications
    pub auth_success: AtomicU64,
    /// Well-formed but refused authentications
    pub auth_failed: AtomicU64,
    /// Unparseable authentication messages
    pub auth_malformed: AtomicU64,
    /// Vectors multiplied
    pub vectors_processed: AtomicU64,
    /// Products replaced by a saturation sentinel
    pub saturations: AtomicU64,
    /// Short reads/writes and disconnects
    pub transport_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_total: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            auth_success: AtomicU64::new(0),
            auth_failed: AtomicU64::new(0),
            auth_malformed: AtomicU64::new(0),
            vectors_processed: AtomicU64::new(0),
            saturations: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            auth_success: self.auth_success.load(Ordering::Relaxed),
            auth_failed: self.auth_failed.load(Ordering::Relaxed),
            auth_malformed: self.auth_malformed.load(Ordering::Relaxed),
            vectors_processed: self.vectors_processed.load(Ordering::Relaxed),
            saturations: self.saturations.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_total = snapshot.sessions_total,
            sessions_completed = snapshot.sessions_completed,
            sessions_failed = snapshot.sessions_failed,
            auth_success = snapshot.auth_success,
            auth_failed = snapshot.auth_failed,
            auth_malformed = snapshot.auth_malformed,
            vectors_processed = snapshot.vectors_processed,
            saturations = snapshot.saturations,
            transport_errors = snapshot.transport_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Server metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Metrics {
    fn record(&self, event: &SessionEvent) {
        let counter = match event {
            SessionEvent::Connected { .. } => &self.sessions_total,
            SessionEvent::AuthMalformed { .. } => &self.auth_malformed,
            SessionEvent::AuthFailed { .. } => &self.auth_failed,
            SessionEvent::Authenticated { .. } => &self.auth_success,
            SessionEvent::BatchReceived { vectors } => {
                self.vectors_processed
                    .fetch_add(*vectors as u64, Ordering::Relaxed);
                return;
            }
            SessionEvent::Saturated { .. } => &self.saturations,
            SessionEvent::TransportFailed { .. } => &self.transport_errors,
            SessionEvent::Closed { outcome } => match outcome {
                SessionState::Done => &self.sessions_completed,
                _ => &self.sessions_failed,
            },
            SessionEvent::AuthAttempt { .. } | SessionEvent::ResultsSent { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_total: u64,
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub auth_success: u64,
    pub auth_failed: u64,
    pub auth_malformed: u64,
    pub vectors_processed: u64,
    pub saturations: u64,
    pub transport_errors: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
