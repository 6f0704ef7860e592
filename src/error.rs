//! # Error Types
//!
//! Error handling for the vector calculation protocol.
//!
//! Every failure a session can hit is a variant of [`ProtocolError`]. The
//! session boundary classifies them with [`ProtocolError::kind`] to decide
//! whether a reply is still owed to the peer:
//!
//! ## Error Categories
//! - **Protocol format**: malformed authentication message (`ERR` is sent)
//! - **Authentication**: unknown login or hash mismatch (`ERR` is sent)
//! - **Transport**: short read/write or peer disconnect (nothing is sent)
//! - **Local**: configuration and credential database problems, never tied to a peer
//!
//! The wire never distinguishes "unknown login" from "wrong hash"; the
//! [`AuthFailure`] carried by [`ProtocolError::AuthRejected`] exists for logs only.
//!
//! ## Example Usage
//! ```rust
//! use vcalc::error::{ErrorKind, ProtocolError, Result};
//! use tracing::error;
//!
//! fn check_reply(reply: &[u8]) -> Result<()> {
//!     match reply {
//!         b"OK" => Ok(()),
//!         b"ERR" => Err(ProtocolError::AuthDenied),
//!         other => Err(ProtocolError::UnexpectedReply(other.to_vec())),
//!     }
//! }
//!
//! if let Err(e) = check_reply(b"ERR") {
//!     assert_eq!(e.kind(), ErrorKind::Authentication);
//!     error!(error = %e, "Login refused");
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Credential database errors
    pub const ERR_CREDENTIALS_OPEN: &str = "Failed to open credential database";
    pub const ERR_CREDENTIALS_READ: &str = "Failed to read credential database";

    /// Configuration errors
    pub const ERR_CONFIG_OPEN: &str = "Failed to open config file";
    pub const ERR_CONFIG_READ: &str = "Failed to read config file";
    pub const ERR_CONFIG_PARSE: &str = "Failed to parse TOML";
    pub const ERR_CONFIG_SERIALIZE: &str = "Failed to serialize config";
    pub const ERR_CONFIG_WRITE: &str = "Failed to write config file";

    /// Logging setup errors
    pub const ERR_LOG_FILE: &str = "Failed to open log file";
    pub const ERR_LOG_INIT: &str = "Failed to install tracing subscriber";
}

/// Why an authentication message could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFormatError {
    #[error("expected 76 bytes, got {0}")]
    WrongLength(usize),

    #[error("login {0:?} is not accepted")]
    LoginNotAccepted(String),

    #[error("salt is not 16 hexadecimal digits")]
    InvalidSalt,

    #[error("hash is not 56 hexadecimal digits")]
    InvalidHash,
}

/// Why a well-formed authentication request was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("unknown login")]
    UnknownLogin,

    #[error("salt could not be decoded")]
    InvalidSalt,

    #[error("hash mismatch")]
    HashMismatch,
}

/// Coarse classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed authentication message.
    ProtocolFormat,
    /// Well-formed but refused credentials.
    Authentication,
    /// Short read/write or disconnect.
    Transport,
    /// Process-local failure unrelated to a peer.
    Local,
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Stream ended mid-frame with {0} bytes buffered")]
    TruncatedFrame(usize),

    #[error("Malformed authentication message: {0}")]
    MalformedAuth(AuthFormatError),

    #[error("Authentication rejected: {0}")]
    AuthRejected(AuthFailure),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Server rejected authentication")]
    AuthDenied,

    #[error("Unexpected reply from server: {0:?}")]
    UnexpectedReply(Vec<u8>),

    #[error("Result set too large: {0} values")]
    OversizedResultSet(usize),

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Classify the error the way the session boundary handles it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::MalformedAuth(_) => ErrorKind::ProtocolFormat,
            ProtocolError::AuthRejected(_) | ProtocolError::AuthDenied => {
                ErrorKind::Authentication
            }
            ProtocolError::Io(_)
            | ProtocolError::ConnectionClosed
            | ProtocolError::TruncatedFrame(_)
            | ProtocolError::Timeout
            | ProtocolError::UnexpectedReply(_) => ErrorKind::Transport,
            ProtocolError::OversizedResultSet(_)
            | ProtocolError::CredentialStore(_)
            | ProtocolError::ConfigError(_) => ErrorKind::Local,
        }
    }

    /// Whether the peer should still receive an `ERR` reply.
    pub fn warrants_reply(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProtocolFormat | ErrorKind::Authentication
        )
    }
}

impl From<AuthFormatError> for ProtocolError {
    fn from(err: AuthFormatError) -> Self {
        ProtocolError::MalformedAuth(err)
    }
}

impl From<AuthFailure> for ProtocolError {
    fn from(err: AuthFailure) -> Self {
        ProtocolError::AuthRejected(err)
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ProtocolError::from(AuthFormatError::WrongLength(75)).kind(),
            ErrorKind::ProtocolFormat
        );
        assert_eq!(
            ProtocolError::from(AuthFailure::HashMismatch).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(ProtocolError::TruncatedFrame(3).kind(), ErrorKind::Transport);
        assert_eq!(
            ProtocolError::ConfigError("bad".into()).kind(),
            ErrorKind::Local
        );
    }

    #[test]
    fn test_only_auth_errors_warrant_reply() {
        assert!(ProtocolError::from(AuthFormatError::InvalidSalt).warrants_reply());
        assert!(ProtocolError::from(AuthFailure::UnknownLogin).warrants_reply());
        assert!(!ProtocolError::ConnectionClosed.warrants_reply());
        assert!(!ProtocolError::Io(io::ErrorKind::BrokenPipe.into()).warrants_reply());
    }

    #[test]
    fn test_failure_reasons_render_distinctly() {
        let unknown = ProtocolError::from(AuthFailure::UnknownLogin).to_string();
        let mismatch = ProtocolError::from(AuthFailure::HashMismatch).to_string();
        assert_ne!(unknown, mismatch);
        assert!(mismatch.contains("hash mismatch"));
    }
}
