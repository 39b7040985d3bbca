//! Resilience subsystem.
//!
//! # Design Decisions
//! - Transient accept failures never stop the listener; they only slow it down
//! - No request-level retries: the protocol has no redelivery concept

pub mod backoff;

pub use backoff::Backoff;
