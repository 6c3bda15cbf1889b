//! Relay Integration Tests
//!
//! Each test spawns its own relay on a loopback ephemeral port; no external
//! services are required.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use futures_util::SinkExt;
use integration_tests::{
    expect_closed, next_data, next_text, send_text, stays_quiet, TestServer, INDEX_HTML,
};
use paint_common::RelayConfig;
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Fan-out Tests
// ============================================================================

#[tokio::test]
async fn test_message_reaches_every_client() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(3).await.unwrap();

    send_text(&mut clients[0], "hello").await.unwrap();

    for client in &mut clients {
        assert_eq!(next_text(client).await.unwrap(), "hello");
    }
}

#[tokio::test]
async fn test_sender_excluded_when_echo_disabled() {
    let server = TestServer::start_with_relay(RelayConfig {
        echo_to_sender: false,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let mut clients = server.connect_many(3).await.unwrap();

    send_text(&mut clients[0], "from a").await.unwrap();
    assert_eq!(next_text(&mut clients[1]).await.unwrap(), "from a");
    assert_eq!(next_text(&mut clients[2]).await.unwrap(), "from a");

    send_text(&mut clients[1], "from b").await.unwrap();
    // A's first message is B's: its own was never echoed back.
    assert_eq!(next_text(&mut clients[0]).await.unwrap(), "from b");
}

#[tokio::test]
async fn test_messages_from_one_client_keep_order() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    for i in 0..20 {
        send_text(&mut clients[0], &format!("stroke-{i}")).await.unwrap();
    }

    for i in 0..20 {
        assert_eq!(
            next_text(&mut clients[1]).await.unwrap(),
            format!("stroke-{i}")
        );
    }
}

#[tokio::test]
async fn test_binary_frames_stay_binary() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    clients[0]
        .send(Message::Binary(vec![1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(
        next_data(&mut clients[1]).await.unwrap(),
        Message::Binary(vec![1, 2, 3])
    );
}

#[tokio::test]
async fn test_late_joiner_sees_only_new_messages() {
    let server = TestServer::start().await.unwrap();
    let mut early = server.connect_many(1).await.unwrap();

    send_text(&mut early[0], "before").await.unwrap();
    assert_eq!(next_text(&mut early[0]).await.unwrap(), "before");

    let mut late = server.connect().await.unwrap();
    server.wait_for_connections(2).await.unwrap();
    send_text(&mut early[0], "after").await.unwrap();

    assert_eq!(next_text(&mut late).await.unwrap(), "after");
}

// ============================================================================
// Disconnect Tests
// ============================================================================

#[tokio::test]
async fn test_closed_client_is_unregistered() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    let mut leaving = clients.remove(0);
    leaving.close(None).await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    send_text(&mut clients[0], "still here").await.unwrap();
    assert_eq!(next_text(&mut clients[0]).await.unwrap(), "still here");
}

#[tokio::test]
async fn test_oversized_message_closes_connection() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    let oversized = "x".repeat(RelayConfig::default().max_message_size + 1);
    send_text(&mut clients[0], &oversized).await.unwrap();

    expect_closed(&mut clients[0]).await.unwrap();
    server.wait_for_connections(1).await.unwrap();
    assert!(stays_quiet(&mut clients[1], Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_message_at_limit_is_relayed() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    let at_limit = "y".repeat(RelayConfig::default().max_message_size);
    send_text(&mut clients[0], &at_limit).await.unwrap();

    assert_eq!(next_text(&mut clients[1]).await.unwrap(), at_limit);
}

#[tokio::test]
async fn test_registry_shutdown_closes_clients() {
    let server = TestServer::start().await.unwrap();
    let mut clients = server.connect_many(2).await.unwrap();

    server.registry().shutdown();

    for client in &mut clients {
        expect_closed(client).await.unwrap();
    }
}

// ============================================================================
// HTTP Tests
// ============================================================================

#[tokio::test]
async fn test_health_reports_connections() {
    let server = TestServer::start().await.unwrap();
    let _clients = server.connect_many(2).await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 2);
}

#[tokio::test]
async fn test_canvas_page_served_at_root() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), INDEX_HTML);
}
