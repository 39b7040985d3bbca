//! Accept loop and shutdown drain.
//!
//! # Responsibilities
//! - Bind the listener and hand each accepted socket to its own session task
//! - Stop accepting and close the listening socket as soon as shutdown fires
//! - Return only after every session has finished

use std::sync::Arc;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Acceptor, Listener, ListenerError};
use crate::net::session::Session;
use crate::observability::metrics;
use crate::payments::{PaymentProcessor, RequestProcessor};
use crate::resilience::Backoff;

/// Error type for the server's top-level entry points.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// The payment gateway server.
pub struct Server {
    config: GatewayConfig,
    processor: Arc<dyn RequestProcessor>,
    tracker: ConnectionTracker,
}

impl Server {
    /// Create a server backed by the simulated payment processor.
    pub fn new(config: GatewayConfig) -> Self {
        let processor = Arc::new(PaymentProcessor::new(&config.processing));
        Self::with_processor(config, processor)
    }

    /// Create a server with a custom request processor.
    pub fn with_processor(config: GatewayConfig, processor: Arc<dyn RequestProcessor>) -> Self {
        Self {
            config,
            processor,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Live session registry.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Bind the configured address and serve until shutdown completes.
    ///
    /// Bind failures are returned immediately.
    pub async fn start(&self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = Listener::bind(&self.config.listener).await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serve on an already-bound listener until shutdown fires and every
    /// session has ended.
    ///
    /// Failed accepts are retried with backoff; shutdown interrupts the wait.
    pub async fn serve<A: Acceptor>(&self, listener: A, shutdown: ShutdownSignal) {
        let grace_period = self.config.shutdown.grace_period();
        let mut backoff = Backoff::default();

        tracing::info!(
            address = %listener.local_addr(),
            grace_period_ms = grace_period.as_millis() as u64,
            "Gateway accepting connections"
        );

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.fired() => break,
                res = listener.accept() => res,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    backoff.reset();
                    metrics::record_connection_accepted();

                    let guard = self.tracker.track();
                    tracing::debug!(connection_id = %guard.id(), peer_addr = %peer_addr, "Session registered");
                    let mut session = Session::new(
                        stream,
                        peer_addr,
                        guard,
                        Arc::clone(&self.processor),
                        shutdown.clone(),
                        grace_period,
                    );
                    tokio::spawn(async move {
                        session.run().await;
                    });
                }
                Err(e) => {
                    metrics::record_accept_error();
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Error accepting connection"
                    );
                    tokio::select! {
                        _ = shutdown.fired() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        // Closing the socket makes the OS refuse new connections and drop
        // anything still sitting in the backlog.
        drop(listener);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            "Stopped accepting new connections"
        );

        self.tracker.wait_idle().await;
        tracing::info!("All connections closed, shutdown complete");
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("active_connections", &self.tracker.active_count())
            .finish()
    }
}
