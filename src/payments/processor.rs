//! Payment request processing.
//!
//! Processing is synchronous and may block the calling thread for a while,
//! standing in for a slow downstream payment system. Callers on the async
//! runtime must run it off the reactor.

use std::time::Duration;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::payments::types::{PaymentRequest, Response};

/// Maps one request line to one response line.
///
/// Implementations never fail: malformed input is answered with a
/// rejection response.
pub trait RequestProcessor: Send + Sync + 'static {
    fn handle(&self, line: &str) -> String;
}

/// Simulated payment backend.
///
/// Amounts above `latency_threshold` take `min(amount, max_latency_ms)`
/// milliseconds to be accepted.
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    latency_threshold: u64,
    max_latency: Duration,
}

impl PaymentProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            latency_threshold: config.latency_threshold,
            max_latency: Duration::from_millis(config.max_latency_ms),
        }
    }

    /// How long a valid payment of `amount` takes to process.
    pub fn processing_time(&self, amount: u64) -> Duration {
        if amount <= self.latency_threshold {
            return Duration::ZERO;
        }
        Duration::from_millis(amount).min(self.max_latency)
    }

    /// Process a request line into a typed response.
    pub fn process(&self, line: &str) -> Response {
        let request = match PaymentRequest::parse(line) {
            Ok(request) => request,
            Err(err) => {
                debug!(request = %line, error = %err, "Rejecting request");
                return err.into();
            }
        };

        let delay = self.processing_time(request.amount);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Response::Accepted
    }
}

impl Default for PaymentProcessor {
    fn default() -> Self {
        Self::new(&ProcessingConfig::default())
    }
}

impl RequestProcessor for PaymentProcessor {
    fn handle(&self, line: &str) -> String {
        self.process(line).as_line().to_string()
    }
}
