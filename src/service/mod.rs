//! # Service Layer
//!
//! Network endpoints built on the protocol layer.
//!
//! ## Components
//! - **Server**: sequential TCP accept loop with graceful shutdown
//! - **Client**: peer side of the exchange, for tools and tests

pub mod client;
pub mod server;
