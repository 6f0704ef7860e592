//! # Core Protocol Components
//!
//! Wire formats and the pure computation behind them.
//!
//! ## Components
//! - **Message**: the 76-byte text authentication message and its replies
//! - **Codec**: Tokio codecs for the big-endian binary data phase
//! - **Product**: the saturating product computed per vector
//!
//! ## Wire Format
//! ```text
//! Auth:     [LOGIN(4)] [SALT_HEX(16)] [HASH_HEX(56)]  ->  "OK" | "ERR"
//! Request:  [count:u32] { [len:u32] [f64 x len] } x count
//! Response: [count:u32] [f64 x count]
//! ```

pub mod codec;
pub mod message;
pub mod product;

/// Ordered IEEE-754 doubles as they arrive on the wire.
pub type Vector = Vec<f64>;

/// Ordered batch of vectors submitted in one request.
pub type VectorBatch = Vec<Vector>;

/// One result per input vector, same order.
pub type ResultSet = Vec<f64>;
