//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use payment_gateway::config::{GatewayConfig, ListenerConfig};
use payment_gateway::net::Listener;
use payment_gateway::{Server, Shutdown};

/// A gateway running on an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

/// Start a gateway on `127.0.0.1:0` with the given grace period.
pub async fn start_gateway(grace: Duration) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.listener = ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
    };
    config.shutdown.grace_period_ms = grace.as_millis() as u64;

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr();
    let shutdown = Shutdown::new();
    let signal = shutdown.signal();
    let server = Server::new(config);

    let task = tokio::spawn(async move { server.serve(listener, signal).await });

    TestGateway {
        addr,
        shutdown,
        task,
    }
}

/// A client connection speaking the line protocol.
pub struct LineClient {
    stream: BufReader<TcpStream>,
}

impl LineClient {
    pub async fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    pub async fn send(&mut self, line: &str) {
        self.stream
            .get_mut()
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    /// Read one response line; `None` once the gateway has closed.
    pub async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.stream.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end().to_string()),
        }
    }
}
