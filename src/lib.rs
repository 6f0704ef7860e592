//! # vcalc
//!
//! A small authenticated calculation service. A peer connects over TCP,
//! proves knowledge of a shared secret with a salted SHA-224 digest, sends a
//! batch of `f64` vectors in big-endian binary, and receives one product per
//! vector. Products that leave the `i64` range are clamped to sentinel values.
//!
//! ## Wire exchange
//! ```text
//! peer -> server  LOGIN(4) SALT_HEX(16) HASH_HEX(56)          76 ASCII bytes
//! server -> peer  "OK" | "ERR"
//! peer -> server  u32 count, then per vector: u32 len, len x f64
//! server -> peer  u32 count, count x f64
//! ```
//!
//! ## Layout
//! - [`core`]: auth message parsing, binary codec, saturating product
//! - [`protocol`]: hash verification, session state machine, session events
//! - [`credentials`]: `login:secret` database
//! - [`service`]: TCP server loop and peer-side client
//! - [`config`]: TOML / environment configuration
//! - [`utils`]: logging setup and metrics
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use vcalc::{CredentialDb, Server, SessionContext, TracingSink};
//!
//! # async fn run() -> vcalc::Result<()> {
//! let store = CredentialDb::load("vcalc.conf")?;
//! let ctx = SessionContext::new(Arc::new(store), Arc::new(TracingSink), "user");
//! Server::bind("0.0.0.0:33333", ctx).await?.run().await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod credentials;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use config::Settings;
pub use credentials::{CredentialDb, CredentialStore};
pub use error::{ErrorKind, ProtocolError, Result};
pub use protocol::events::{EventSink, NullSink, SessionEvent, TracingSink};
pub use protocol::session::{Session, SessionContext, SessionState, SessionSummary};
pub use service::client::Client;
pub use service::server::Server;
