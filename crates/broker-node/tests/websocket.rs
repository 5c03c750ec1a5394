//! End-to-end coverage driving a real bound server over actual WebSocket connections, the way the
//! reference codebase's JSON-RPC subscription tests drive a live `axum` listener instead of
//! in-process fakes.

use std::sync::Arc;
use std::time::Duration;

use broker_core::Broker;
use broker_node::server;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server() -> String {
    let broker = Arc::new(Broker::new());
    let (app, _shutdown) = server::build_app(broker);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/messagebus/v1")
}

async fn connect(base: &str, agent_id: &str) -> tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
> {
    let (ws, _response) = tokio_tungstenite::connect_async(format!("{base}/{agent_id}"))
        .await
        .expect("connection should upgrade");
    ws
}

async fn recv_json(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("websocket error");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn ping_pong_over_a_real_socket() {
    let base = spawn_server().await;
    let mut ws = connect(&base, "a").await;

    let welcome = recv_json(&mut ws).await;
    assert_eq!(
        welcome,
        json!({"type": "connection_established", "agent_id": "a", "server_id": server::SERVER_ID})
    );

    ws.send(Message::Text(r#"{"type":"ping","id":"p1"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut ws).await, json!({"type": "pong", "id": "p1"}));
}

#[tokio::test]
async fn subscribe_and_publish_fan_out_over_real_sockets() {
    let base = spawn_server().await;
    let mut subscriber = connect(&base, "sub").await;
    recv_json(&mut subscriber).await; // connection_established

    let mut publisher = connect(&base, "pub").await;
    recv_json(&mut publisher).await; // connection_established

    subscriber
        .send(Message::Text(
            r#"{"type":"subscribe","id":"s1","topic":"t/1"}"#.into(),
        ))
        .await
        .unwrap();
    assert_eq!(
        recv_json(&mut subscriber).await,
        json!({"type": "subscribe_confirm", "id": "s1", "topic": "t/1"})
    );

    publisher
        .send(Message::Text(
            r#"{"type":"publish","id":"p1","topic":"t/1","data":{"v":1}}"#.into(),
        ))
        .await
        .unwrap();
    assert_eq!(
        recv_json(&mut publisher).await,
        json!({"type": "publish_confirm", "id": "p1", "topic": "t/1"})
    );
    assert_eq!(
        recv_json(&mut subscriber).await,
        json!({"type": "message", "topic": "t/1", "sender": "pub", "data": {"v": 1}})
    );
}

#[tokio::test]
async fn duplicate_identity_is_closed_with_policy_violation() {
    let base = spawn_server().await;
    let mut first = connect(&base, "dup").await;
    recv_json(&mut first).await; // connection_established

    let mut second = connect(&base, "dup").await;
    let msg = tokio::time::timeout(Duration::from_secs(2), second.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");
    match msg {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1008),
        other => panic!("expected a close frame, got {other:?}"),
    }

    // The first connection is untouched by the rejected duplicate.
    first
        .send(Message::Text(r#"{"type":"ping","id":"p1"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_json(&mut first).await, json!({"type": "pong", "id": "p1"}));
}

#[tokio::test]
async fn broadcast_shutdown_closes_open_connections_with_code_1000() {
    let broker = Arc::new(Broker::new());
    let (app, shutdown) = server::build_app(broker);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut ws = connect(&format!("ws://{addr}/messagebus/v1"), "a").await;
    recv_json(&mut ws).await; // connection_established

    shutdown.send(()).unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for shutdown close")
        .expect("stream ended")
        .expect("websocket error");
    match msg {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1000),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn binary_frames_are_rejected_as_invalid() {
    let base = spawn_server().await;
    let mut ws = connect(&base, "a").await;
    recv_json(&mut ws).await; // connection_established

    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    assert_eq!(
        recv_json(&mut ws).await,
        json!({"type": "error", "error": "Invalid JSON message"})
    );
}

#[tokio::test]
async fn health_probe_reports_online() {
    let broker = Arc::new(Broker::new());
    let (app, _shutdown) = server::build_app(broker);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest_like_get(addr).await;
    assert_eq!(response, json!({"status": "online", "service": "volttron-messagebus"}));
}

/// A tiny hand-rolled HTTP GET, avoiding a dedicated HTTP client dependency for one probe check.
async fn reqwest_like_get(addr: std::net::SocketAddr) -> Value {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET / HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    serde_json::from_str(body).unwrap()
}
