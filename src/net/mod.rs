//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → server.rs (accept loop, registers with the tracker, spawns)
//!     → session.rs (read → process → write, grace-period race)
//!     → connection.rs (guard released on close, drain wakes)
//!
//! Session Phases:
//!     Normal → InGrace → Terminated
//! ```
//!
//! # Design Decisions
//! - One task per connection, no admission limit
//! - Each connection tracked for graceful shutdown
//! - Listener is dropped the moment shutdown fires

pub mod connection;
pub mod listener;
pub mod server;
pub mod session;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Acceptor, Listener, ListenerError};
pub use server::{Server, ServerError};
pub use session::{CloseReason, Phase, Session};
