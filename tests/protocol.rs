//! Request/response behaviour over a live socket.

use std::time::{Duration, Instant};

use payment_gateway::client::send_requests;
use payment_gateway::payments::types::{
    RESPONSE_ACCEPTED, RESPONSE_INVALID_AMOUNT, RESPONSE_INVALID_REQUEST,
};

mod common;

use common::{start_gateway, LineClient};

#[tokio::test]
async fn answers_each_line_in_order() {
    let gateway = start_gateway(Duration::from_secs(1)).await;

    let responses = send_requests(
        gateway.addr,
        ["PAYMENT|10", "INVALIDREQUEST", "INVALID|123", "PAYMENT|abc", "PAYMENT|-5", "PAYMENT|150"],
    )
    .await
    .unwrap();

    assert_eq!(
        responses,
        vec![
            RESPONSE_ACCEPTED,
            RESPONSE_INVALID_REQUEST,
            RESPONSE_INVALID_REQUEST,
            RESPONSE_INVALID_AMOUNT,
            RESPONSE_INVALID_AMOUNT,
            RESPONSE_ACCEPTED,
        ]
    );
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn small_and_invalid_requests_are_fast() {
    let gateway = start_gateway(Duration::from_secs(1)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    for (line, expected) in [
        ("PAYMENT|100", RESPONSE_ACCEPTED),
        ("PAYMENT|x", RESPONSE_INVALID_AMOUNT),
        ("REFUND|5", RESPONSE_INVALID_REQUEST),
    ] {
        let start = Instant::now();
        client.send(line).await;
        assert_eq!(client.recv().await.as_deref(), Some(expected));
        assert!(start.elapsed() < Duration::from_millis(50), "{} was slow", line);
    }
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn latency_tracks_amount() {
    let gateway = start_gateway(Duration::from_secs(1)).await;
    let mut client = LineClient::connect(gateway.addr).await.unwrap();

    let start = Instant::now();
    client.send("PAYMENT|400").await;
    assert_eq!(client.recv().await.as_deref(), Some(RESPONSE_ACCEPTED));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_millis(500));
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn crlf_terminated_lines_are_accepted() {
    let gateway = start_gateway(Duration::from_secs(1)).await;
    let responses = send_requests(gateway.addr, ["PAYMENT|42\r"]).await.unwrap();
    assert_eq!(responses, vec![RESPONSE_ACCEPTED]);
    gateway.shutdown.trigger();
}
