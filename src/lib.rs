//! Line-oriented TCP payment gateway with graceful shutdown.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod payments;
pub mod resilience;

pub use config::GatewayConfig;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use net::Server;
pub use payments::{PaymentProcessor, RequestProcessor, Response};
