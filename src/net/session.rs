//! Per-connection session state machine.
//!
//! # State Machine
//! ```text
//! Normal ──shutdown observed──▶ InGrace ──deadline / peer gone──▶ Terminated
//!    └────────────── peer gone / I/O error ─────────────────────────▲
//! ```
//!
//! A session answers every line it reads, in order, until the peer hangs
//! up. Once shutdown fires, reads and in-flight processing race the grace
//! deadline (`fired_at + grace_period`, shared by every session):
//! - processing finishes first: the real response is written
//! - deadline first with a request read or partially read: `Cancelled` is
//!   written and the processor's eventual result is discarded
//! - deadline first on an idle connection: closed without a response
//!
//! A line longer than [`MAX_LINE_LENGTH`] is answered with `Invalid request`
//! and the connection is closed.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionGuard, ConnectionId};
use crate::observability::metrics;
use crate::payments::{RequestProcessor, Response};

/// Longest request line accepted, terminator included.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Serving requests; shutdown not yet observed.
    Normal,
    /// Shutdown observed; racing the grace deadline.
    InGrace,
    /// [`Session::run`] has returned and the socket is shut down.
    Terminated,
}

/// Why a session ended.
#[derive(Debug)]
pub enum CloseReason {
    PeerClosed,
    ReadFailed(std::io::Error),
    WriteFailed(std::io::Error),
    /// A line exceeded [`MAX_LINE_LENGTH`]; `Invalid request` was sent.
    LineTooLong,
    /// Deadline reached with no request pending.
    GraceExpired,
    /// Deadline reached with a request pending; `Cancelled` was sent.
    Cancelled,
    /// The processor thread could not be started or died.
    ProcessorFailed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {}", e),
            CloseReason::WriteFailed(e) => write!(f, "write failed: {}", e),
            CloseReason::LineTooLong => write!(f, "request line exceeds {} bytes", MAX_LINE_LENGTH),
            CloseReason::GraceExpired => f.write_str("grace period expired while idle"),
            CloseReason::Cancelled => f.write_str("grace period expired, request cancelled"),
            CloseReason::ProcessorFailed => f.write_str("processor failed"),
        }
    }
}

enum ReadOutcome {
    Line,
    Eof,
    TooLong,
    Failed(std::io::Error),
    Expired,
}

enum ProcessOutcome {
    Completed(String),
    Expired,
    Failed,
}

enum Event<T> {
    Ready(T),
    ShutdownObserved(tokio::time::Instant),
    Deadline,
}

/// Everything a session owns besides the socket.
struct SessionState {
    id: ConnectionId,
    peer_addr: SocketAddr,
    phase: Phase,
    shutdown: ShutdownSignal,
    grace_period: Duration,
    processor: Arc<dyn RequestProcessor>,
}

impl SessionState {
    fn enter_grace(&mut self, fired_at: tokio::time::Instant) {
        if self.phase != Phase::Normal {
            return;
        }
        self.phase = Phase::InGrace;
        let remaining = (fired_at + self.grace_period).saturating_duration_since(tokio::time::Instant::now());
        debug!(
            connection_id = %self.id,
            peer_addr = %self.peer_addr,
            remaining_ms = remaining.as_millis() as u64,
            "Shutdown observed, entering grace period"
        );
    }
}

/// One accepted connection.
pub struct Session {
    conn: BufReader<TcpStream>,
    state: SessionState,
    _guard: ConnectionGuard,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        guard: ConnectionGuard,
        processor: Arc<dyn RequestProcessor>,
        shutdown: ShutdownSignal,
        grace_period: Duration,
    ) -> Self {
        Self {
            conn: BufReader::new(stream),
            state: SessionState {
                id: guard.id(),
                peer_addr,
                phase: Phase::Normal,
                shutdown,
                grace_period,
                processor,
            },
            _guard: guard,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Drive the session to completion and close the socket.
    ///
    /// The phase is [`Phase::Terminated`] afterwards. The connection stays
    /// registered until the session is dropped.
    pub async fn run(&mut self) -> CloseReason {
        debug!(connection_id = %self.state.id, peer_addr = %self.state.peer_addr, "Session started");

        let reason = self.serve().await;
        self.state.phase = Phase::Terminated;

        if let Err(e) = self.conn.get_mut().shutdown().await {
            debug!(connection_id = %self.state.id, error = %e, "Socket shutdown failed");
        }

        match &reason {
            CloseReason::ReadFailed(_) | CloseReason::WriteFailed(_) | CloseReason::ProcessorFailed => warn!(
                connection_id = %self.state.id,
                peer_addr = %self.state.peer_addr,
                reason = %reason,
                "Closing connection"
            ),
            _ => info!(
                connection_id = %self.state.id,
                peer_addr = %self.state.peer_addr,
                reason = %reason,
                "Closing connection"
            ),
        }
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        let mut buf = Vec::with_capacity(64);
        loop {
            buf.clear();
            match self.read_request(&mut buf).await {
                ReadOutcome::Line => {}
                ReadOutcome::Eof => return CloseReason::PeerClosed,
                ReadOutcome::Failed(e) => return CloseReason::ReadFailed(e),
                ReadOutcome::TooLong => {
                    warn!(connection_id = %self.state.id, limit = MAX_LINE_LENGTH, "Request line too long");
                    let written = self.write_response(Response::InvalidRequest.as_line()).await;
                    metrics::record_response(Response::InvalidRequest.outcome(), Instant::now());
                    return match written {
                        Ok(()) => CloseReason::LineTooLong,
                        Err(e) => CloseReason::WriteFailed(e),
                    };
                }
                ReadOutcome::Expired if buf.is_empty() => return CloseReason::GraceExpired,
                ReadOutcome::Expired => {
                    // Part of a request arrived; it is owed an answer.
                    let written = self.write_response(Response::Cancelled.as_line()).await;
                    metrics::record_response(Response::Cancelled.outcome(), Instant::now());
                    return match written {
                        Ok(()) => CloseReason::Cancelled,
                        Err(e) => CloseReason::WriteFailed(e),
                    };
                }
            }

            let request = decode_line(&buf);
            let started = Instant::now();
            debug!(
                connection_id = %self.state.id,
                request = %request,
                grace = self.state.phase == Phase::InGrace,
                "Request received"
            );

            let response = match self.process(request).await {
                ProcessOutcome::Completed(response) => response,
                ProcessOutcome::Failed => return CloseReason::ProcessorFailed,
                ProcessOutcome::Expired => {
                    info!(
                        connection_id = %self.state.id,
                        peer_addr = %self.state.peer_addr,
                        "Grace period expired during processing, cancelling request"
                    );
                    let written = self.write_response(Response::Cancelled.as_line()).await;
                    metrics::record_response(Response::Cancelled.outcome(), started);
                    return match written {
                        Ok(()) => CloseReason::Cancelled,
                        Err(e) => CloseReason::WriteFailed(e),
                    };
                }
            };

            debug!(connection_id = %self.state.id, response = %response, "Response ready");
            if let Err(e) = self.write_response(&response).await {
                return CloseReason::WriteFailed(e);
            }
            let outcome = Response::parse(&response).map_or("other", |r| r.outcome());
            metrics::record_response(outcome, started);
        }
    }

    /// Read one line into `buf`, racing the grace deadline.
    ///
    /// At most [`MAX_LINE_LENGTH`] bytes are buffered per line.
    async fn read_request(&mut self, buf: &mut Vec<u8>) -> ReadOutcome {
        let res = {
            let mut limited = (&mut self.conn).take(MAX_LINE_LENGTH as u64);
            let read = limited.read_until(b'\n', buf);
            tokio::pin!(read);

            loop {
                let event = tokio::select! {
                    biased;
                    _ = self.state.shutdown.deadline(self.state.grace_period) => Event::Deadline,
                    at = self.state.shutdown.fired(), if self.state.phase == Phase::Normal => {
                        Event::ShutdownObserved(at)
                    }
                    res = &mut read => Event::Ready(res),
                };

                match event {
                    Event::Ready(res) => break res,
                    Event::ShutdownObserved(at) => self.state.enter_grace(at),
                    Event::Deadline => return ReadOutcome::Expired,
                }
            }
        };

        match res {
            Ok(0) => ReadOutcome::Eof,
            Ok(n) if n >= MAX_LINE_LENGTH && buf.last() != Some(&b'\n') => ReadOutcome::TooLong,
            Ok(_) => ReadOutcome::Line,
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    /// Run the processor on its own thread and race it against the deadline.
    ///
    /// The thread is never interrupted; if the deadline wins its result is
    /// dropped on the floor.
    async fn process(&mut self, request: String) -> ProcessOutcome {
        let (tx, mut rx) = oneshot::channel();
        let processor = Arc::clone(&self.state.processor);
        let spawned = std::thread::Builder::new()
            .name(format!("{}-processor", self.state.id))
            .spawn(move || {
                let _ = tx.send(processor.handle(&request));
            });
        if let Err(e) = spawned {
            warn!(connection_id = %self.state.id, error = %e, "Failed to start processor thread");
            return ProcessOutcome::Failed;
        }

        loop {
            let event = tokio::select! {
                biased;
                res = &mut rx => Event::Ready(res),
                _ = self.state.shutdown.deadline(self.state.grace_period) => Event::Deadline,
                at = self.state.shutdown.fired(), if self.state.phase == Phase::Normal => {
                    Event::ShutdownObserved(at)
                }
            };

            match event {
                Event::Ready(Ok(response)) => return ProcessOutcome::Completed(response),
                Event::Ready(Err(_)) => return ProcessOutcome::Failed,
                Event::ShutdownObserved(at) => self.state.enter_grace(at),
                Event::Deadline => return ProcessOutcome::Expired,
            }
        }
    }

    async fn write_response(&mut self, response: &str) -> std::io::Result<()> {
        let stream = self.conn.get_mut();
        let mut line = String::with_capacity(response.len() + 1);
        line.push_str(response);
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await
    }
}

/// Turn raw bytes into a request string without the line terminator.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
