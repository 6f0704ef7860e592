//! # Protocol Layer
//!
//! The two-phase exchange with a connected peer.
//!
//! ## Components
//! - **Verifier**: salted SHA-224 credential check
//! - **Session**: per-connection state machine (auth, then one vector batch)
//! - **Events**: the sink a session reports to instead of logging directly

pub mod events;
pub mod session;
pub mod verifier;
