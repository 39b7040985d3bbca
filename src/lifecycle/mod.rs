//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → fired_at recorded → every ShutdownSignal observes it
//!         → acceptor stops, sessions race the grace deadline
//! ```
//!
//! # Design Decisions
//! - Level-triggered: late observers still see the fired state
//! - The grace deadline is anchored at the trigger instant
//! - A second signal forces exit

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
