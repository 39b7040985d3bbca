//! Payment request handling.
//!
//! # Data Flow
//! ```text
//! request line
//!     → types.rs (PAYMENT|<amount> parsing)
//!     → processor.rs (simulated downstream latency)
//!     → response line
//! ```

pub mod processor;
pub mod types;

pub use processor::{PaymentProcessor, RequestProcessor};
pub use types::{PaymentRequest, ProtocolError, Response};
