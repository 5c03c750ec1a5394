//! HTTP/WebSocket server harness. Transport glue around the transport-agnostic `broker-core`
//! router: decodes/encodes frames, owns the real socket, and turns connection lifecycle events
//! into registry/subscription/RPC teardown.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use broker_core::{AgentId, Broker, BrokerError, ConnectionState, OutboundEnvelope};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Server identity announced in `connection_established`.
pub const SERVER_ID: &str = "volttron.messagebus.fastapi";

/// Bound on draining a connection's writer queue after its reader stops, before the socket is
/// forced closed.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct AppState {
    broker: Arc<Broker>,
    shutdown: broadcast::Sender<()>,
}

/// Builds the router together with the broadcast sender used to fan out graceful shutdown to
/// every open connection; the caller fires it once the process decides to exit.
pub fn build_app(broker: Arc<Broker>) -> (Router, broadcast::Sender<()>) {
    let (shutdown, _rx) = broadcast::channel(1);
    let state = AppState {
        broker,
        shutdown: shutdown.clone(),
    };
    let app = Router::new()
        .route("/", get(root))
        .route("/messagebus/v1/:agent_id", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    (app, shutdown)
}

async fn root() -> impl IntoResponse {
    Json(json!({"status": "online", "service": "volttron-messagebus"}))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(identity) = AgentId::new(agent_id) else {
        return (axum::http::StatusCode::BAD_REQUEST, "agent id must not be empty").into_response();
    };
    let shutdown_rx = state.shutdown.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state.broker, shutdown_rx))
}

#[instrument(skip(socket, broker, shutdown_rx), fields(agent_id = %identity))]
async fn handle_socket(
    socket: WebSocket,
    identity: AgentId,
    broker: Arc<Broker>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut state = ConnectionState::Accepting;
    let mut close_code = 1000u16;
    let (writer, mut writer_rx) = broker_core::WriterHandle::channel();
    let (mut sink, mut stream) = socket.split();

    if let Err(err) = broker.try_register(identity.clone(), writer.clone()) {
        warn!(error = %err, "rejecting connection");
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: 1008,
                reason: Cow::Owned(err.to_string()),
            })))
            .await;
        return;
    }

    let welcome = OutboundEnvelope::ConnectionEstablished {
        agent_id: identity.as_str().to_string(),
        server_id: SERVER_ID.to_string(),
    };
    if sink.send(Message::Text(welcome.to_json())).await.is_err() {
        broker.unregister(&identity);
        return;
    }
    state = ConnectionState::Open;
    info!("connection established");

    let doomed = Arc::new(tokio::sync::Notify::new());
    let write_task = tokio::spawn({
        let doomed = doomed.clone();
        let identity = identity.clone();
        async move {
            while let Some(msg) = writer_rx.recv().await {
                if sink.send(Message::Text(msg.to_json())).await.is_err() {
                    warn!(error = %BrokerError::WriteFailed(identity.to_string()), "writer task could not deliver a send");
                    doomed.notify_one();
                    break;
                }
            }
            sink
        }
    });

    while state.accepts_envelopes() {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                state = ConnectionState::Closing;
            }
            _ = doomed.notified() => {
                // The writer task failed to deliver a send; this connection cannot be salvaged.
                close_code = 1011;
                state = ConnectionState::Closing;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(frame))) => {
                    broker_core::router::process_frame(&broker, &identity, &writer, &frame);
                }
                Some(Ok(Message::Binary(_))) => {
                    // Binary frames are not accepted; treat like any other malformed envelope.
                    writer.try_send(OutboundEnvelope::error(None, BrokerError::BadEnvelope.to_string()));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Transport-level ping/pong is handled by axum; distinct from the JSON-level
                    // `ping`/`pong` envelope types carried in text frames.
                }
                Some(Ok(Message::Close(_))) | None => state = ConnectionState::Closing,
                Some(Err(err)) => {
                    warn!(error = %err, "error reading from websocket");
                    close_code = 1011;
                    state = ConnectionState::Closing;
                }
            },
        }
    }

    broker.unregister(&identity);
    drop(writer);
    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, write_task).await {
        Ok(Ok(mut sink)) => {
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: close_code,
                    reason: Cow::Borrowed(""),
                })))
                .await;
        }
        Ok(Err(_)) => warn!("writer task panicked during teardown"),
        Err(_) => warn!("writer task did not drain in time, forcing close"),
    }
    state = ConnectionState::Closed;
    info!(?state, "connection closed");
}
