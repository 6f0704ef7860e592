//! Session events and the sinks that consume them.
//!
//! A session never logs directly; it reports [`SessionEvent`]s to the
//! [`EventSink`] it was constructed with. [`TracingSink`] turns them into
//! structured `tracing` records, [`Metrics`](crate::utils::metrics::Metrics)
//! counts them, and a tuple `(A, B)` forwards to both.

use crate::error::{AuthFailure, AuthFormatError};
use crate::protocol::session::SessionState;
use tracing::{debug, error, info, warn};

/// Something observable that happened during one session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected {
        peer: String,
    },
    AuthMalformed {
        reason: AuthFormatError,
    },
    AuthAttempt {
        login: String,
        salt: String,
        /// Truncated claimed hash, never the full value.
        hash_prefix: String,
    },
    AuthFailed {
        login: String,
        reason: AuthFailure,
    },
    Authenticated {
        login: String,
    },
    BatchReceived {
        vectors: usize,
    },
    Saturated {
        index: usize,
        value: f64,
    },
    ResultsSent {
        results: usize,
    },
    TransportFailed {
        state: SessionState,
        error: String,
    },
    Closed {
        outcome: SessionState,
    },
}

/// Receiver of session events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SessionEvent);
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn record(&self, event: &SessionEvent) {
        self.0.record(event);
        self.1.record(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn record(&self, event: &SessionEvent) {
        (**self).record(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &SessionEvent) {}
}

/// Emits each event as a `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected { peer } => info!(peer = %peer, "New client connection"),
            SessionEvent::AuthMalformed { reason } => {
                error!(reason = %reason, "Malformed authentication message")
            }
            SessionEvent::AuthAttempt {
                login,
                salt,
                hash_prefix,
            } => info!(login = %login, salt = %salt, hash = %hash_prefix, "Authentication attempt"),
            SessionEvent::AuthFailed { login, reason } => {
                warn!(login = %login, reason = %reason, "Authentication failed")
            }
            SessionEvent::Authenticated { login } => {
                info!(login = %login, "Client authenticated successfully")
            }
            SessionEvent::BatchReceived { vectors } => {
                debug!(vectors = *vectors, "Vector batch received")
            }
            SessionEvent::Saturated { index, value } => {
                debug!(index = *index, value = *value, "Product overflow, returning sentinel")
            }
            SessionEvent::ResultsSent { results } => {
                info!(results = *results, "Successfully processed vectors")
            }
            SessionEvent::TransportFailed { state, error } => {
                error!(state = ?state, error = %error, "Transport failure, closing session")
            }
            SessionEvent::Closed { outcome } => debug!(outcome = ?outcome, "Session closed"),
        }
    }
}
