//! Outbound envelope shapes. Broker-originated replies (`connection_established`, `pong`,
//! `subscribe_confirm`, `publish_confirm`, `message`, `error`) are built from typed structs so
//! they can never be malformed. `rpc`/`rpc_response` forwarding instead carries the caller's
//! original JSON object forward verbatim (with `sender` overwritten) — the broker does not
//! understand `method`/`params`/`result` well enough to reconstruct them faithfully.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::identity::AgentId;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEnvelope {
    #[serde(rename = "connection_established")]
    ConnectionEstablished { agent_id: String, server_id: String },
    #[serde(rename = "pong")]
    Pong { id: String },
    #[serde(rename = "subscribe_confirm")]
    SubscribeConfirm { id: String, topic: String },
    #[serde(rename = "publish_confirm")]
    PublishConfirm { id: String, topic: String },
    #[serde(rename = "message")]
    Message {
        topic: String,
        sender: String,
        data: Value,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        error: String,
    },
}

impl OutboundEnvelope {
    pub fn error(id: Option<String>, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("OutboundEnvelope is always representable as JSON")
    }
}

/// A wire message queued on a connection's writer handle: either a broker-built envelope, or a
/// raw JSON object forwarded from another agent's `rpc`/`rpc_response`.
#[derive(Debug, Clone)]
pub enum WireMessage {
    Typed(OutboundEnvelope),
    Forwarded(Map<String, Value>),
}

impl WireMessage {
    pub fn to_json(&self) -> String {
        match self {
            WireMessage::Typed(env) => env.to_json(),
            WireMessage::Forwarded(fields) => {
                serde_json::to_string(fields).expect("forwarded envelope is always valid JSON")
            }
        }
    }
}

impl From<OutboundEnvelope> for WireMessage {
    fn from(value: OutboundEnvelope) -> Self {
        WireMessage::Typed(value)
    }
}

/// Re-stamps the `sender` field on a raw forwarded envelope with the caller's verified identity,
/// overwriting whatever the caller claimed — the broker is the sole authority on sender identity.
pub fn forward_with_sender(mut fields: Map<String, Value>, kind: &str, sender: &AgentId) -> WireMessage {
    fields.insert(
        "type".to_string(),
        Value::String(kind.to_string()),
    );
    fields.insert("sender".to_string(), Value::String(sender.as_str().to_string()));
    WireMessage::Forwarded(fields)
}
