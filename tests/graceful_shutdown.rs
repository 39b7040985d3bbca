//! End-to-end shutdown behaviour of the gateway.

use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use payment_gateway::payments::types::{RESPONSE_ACCEPTED, RESPONSE_CANCELLED};

mod common;

use common::{start_gateway, LineClient};

#[tokio::test]
async fn active_requests_complete() {
    let gateway = start_gateway(Duration::from_secs(2)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    client.send("PAYMENT|150").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    gateway.shutdown.trigger();

    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
}

#[tokio::test]
async fn grace_period_requests_complete() {
    let gateway = start_gateway(Duration::from_secs(2)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    client.send("PAYMENT|1500").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    gateway.shutdown.trigger();

    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
}

#[tokio::test]
async fn reject_after_grace_period() {
    let gateway = start_gateway(Duration::from_secs(3)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    client.send("PAYMENT|5000").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let start = Instant::now();
    gateway.shutdown.trigger();

    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_CANCELLED));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2900), "cancelled too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(4000), "waited for processing: {:?}", elapsed);

    // Connection is closed after the cancellation.
    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn request_sent_after_shutdown_on_open_connection_is_cancelled() {
    let gateway = start_gateway(Duration::from_millis(500)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    gateway.shutdown.trigger();
    client.send("PAYMENT|5000").await;

    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_CANCELLED));
}

#[tokio::test]
async fn stop_accepting_new_connections() {
    let gateway = start_gateway(Duration::from_secs(2)).await;
    let mut first = LineClient::connect(gateway.addr).await.unwrap();
    first.send("PAYMENT|150").await;
    // Let the acceptor pick up the first connection; backlog entries are
    // reset once the listener is dropped.
    tokio::time::sleep(Duration::from_millis(20)).await;

    gateway.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        TcpStream::connect(gateway.addr).await.is_err(),
        "gateway accepted a connection after shutdown started"
    );
    assert_eq!(first.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
}

#[tokio::test]
async fn requests_not_accepted_during_shutdown() {
    let gateway = start_gateway(Duration::from_secs(2)).await;
    gateway.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(TcpStream::connect(gateway.addr).await.is_err());
    tokio::time::timeout(Duration::from_millis(500), gateway.task)
        .await
        .expect("idle gateway should finish immediately")
        .unwrap();
}

#[tokio::test]
async fn serve_waits_for_in_flight_responses() {
    let gateway = start_gateway(Duration::from_secs(3)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    client.send("PAYMENT|600").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    gateway.shutdown.trigger();

    // The response is still being processed, so the drain cannot be done.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!gateway.task.is_finished());

    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
    drop(client);

    tokio::time::timeout(Duration::from_secs(1), gateway.task)
        .await
        .expect("drain should finish once the client hangs up")
        .unwrap();
}

#[tokio::test]
async fn drain_finishes_at_deadline_with_lingering_clients() {
    let gateway = start_gateway(Duration::from_millis(300)).await;
    let mut idle = LineClient::connect(gateway.addr).await.unwrap();
    let mut busy = LineClient::connect(gateway.addr).await.unwrap();
    busy.send("PAYMENT|5000").await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let start = Instant::now();
    gateway.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(2), gateway.task)
        .await
        .expect("drain must end at the grace deadline")
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(250));

    assert_eq!(busy.recv().await.as_deref(), Some(RESPONSE_CANCELLED));
    assert_eq!(idle.recv().await, None);
}

#[tokio::test]
async fn concurrent_connections_are_independent() {
    let gateway = start_gateway(Duration::from_secs(3)).await;

    let mut slow = LineClient::connect(gateway.addr).await.unwrap();
    slow.send("PAYMENT|800").await;

    let start = Instant::now();
    let mut fast = LineClient::connect(gateway.addr).await.unwrap();
    fast.send("PAYMENT|5").await;
    assert_eq!(fast.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
    assert!(start.elapsed() < Duration::from_millis(300));

    assert_eq!(slow.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
    gateway.shutdown.trigger();
}
