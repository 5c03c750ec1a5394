//! Router core: classifies each inbound envelope by `type` and either replies locally, forwards
//! to a named peer, fans out to subscribers, or emits a typed `error` envelope.
//!
//! Dispatch never awaits: every send is a non-blocking [`WriterHandle::try_send`], so one slow
//! peer can never stall another connection's processing.

use serde_json::Value;
use tracing::{debug, warn};

use crate::broker::Broker;
use crate::codec::InboundEnvelope;
use crate::envelope::{forward_with_sender, OutboundEnvelope};
use crate::error::BrokerError;
use crate::identity::AgentId;
use crate::metrics;
use crate::writer::{SendOutcome, WriterHandle};

/// Decodes one WebSocket text frame and routes it. On a codec failure, replies to the sender
/// with the fixed `"Invalid JSON message"` error and returns without touching any shared state.
pub fn process_frame(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, frame: &str) {
    match InboundEnvelope::decode(frame) {
        Ok(envelope) => dispatch(broker, sender, self_writer, envelope),
        Err(_) => {
            self_writer.try_send(OutboundEnvelope::error(None, BrokerError::BadEnvelope.to_string()));
        }
    }
}

/// Routes an already-decoded envelope. Exposed separately from [`process_frame`] so tests can
/// drive the router without going through JSON at all.
pub fn dispatch(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, envelope: InboundEnvelope) {
    metrics::envelope_routed(kind_label(&envelope.kind));
    match envelope.kind.as_str() {
        "ping" => handle_ping(self_writer, &envelope),
        "subscribe" => handle_subscribe(broker, sender, self_writer, &envelope),
        "publish" => handle_publish(broker, sender, self_writer, envelope),
        "rpc" => handle_rpc(broker, sender, self_writer, envelope),
        "rpc_response" => handle_rpc_response(broker, sender, self_writer, envelope),
        other => {
            self_writer.try_send(OutboundEnvelope::error(
                envelope.str_field("id").map(str::to_string),
                BrokerError::UnknownType(other.to_string()).to_string(),
            ));
        }
    }
}

/// `"ping"`, `"subscribe"`, `"publish"`, `"rpc"`, `"rpc_response"` are the only metric labels that
/// do not leak arbitrary client-controlled strings into the metrics namespace.
fn kind_label(kind: &str) -> &'static str {
    match kind {
        "ping" => "ping",
        "subscribe" => "subscribe",
        "publish" => "publish",
        "rpc" => "rpc",
        "rpc_response" => "rpc_response",
        _ => "unknown",
    }
}

fn handle_ping(self_writer: &WriterHandle, envelope: &InboundEnvelope) {
    let id = envelope.str_field("id").unwrap_or_default().to_string();
    self_writer.try_send(OutboundEnvelope::Pong { id });
}

fn handle_subscribe(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, envelope: &InboundEnvelope) {
    let id = envelope.str_field("id").map(str::to_string);
    let Some(topic) = envelope.non_empty_str_field("topic") else {
        self_writer.try_send(OutboundEnvelope::error(id, BrokerError::MissingSubscribeTopic.to_string()));
        return;
    };
    broker.subscribe(topic, sender.clone());
    self_writer.try_send(OutboundEnvelope::SubscribeConfirm {
        id: id.unwrap_or_default(),
        topic: topic.to_string(),
    });
}

fn handle_publish(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, envelope: InboundEnvelope) {
    let id = envelope.str_field("id").map(str::to_string);
    let Some(topic) = envelope.str_field("topic").map(str::to_string) else {
        self_writer.try_send(OutboundEnvelope::error(id, BrokerError::MissingPublishTopic.to_string()));
        return;
    };
    let data = envelope.field("data").cloned().unwrap_or(Value::Null);

    for subscriber in broker.subscribers_of(&topic) {
        if subscriber == *sender {
            continue;
        }
        let Some(writer) = broker.writer_of(subscriber.as_str()) else {
            continue;
        };
        let message = OutboundEnvelope::Message {
            topic: topic.clone(),
            sender: sender.as_str().to_string(),
            data: data.clone(),
        };
        match writer.try_send(message) {
            SendOutcome::Sent => {}
            SendOutcome::QueueFull => {
                metrics::publish_fanout_dropped();
                warn!(topic = %topic, subscriber = %subscriber, "dropped publish: writer queue full");
            }
            SendOutcome::Closed => {
                debug!(topic = %topic, subscriber = %subscriber, "dropped publish: connection closing");
            }
        }
    }

    self_writer.try_send(OutboundEnvelope::PublishConfirm {
        id: id.unwrap_or_default(),
        topic,
    });
}

fn handle_rpc(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, envelope: InboundEnvelope) {
    let id = envelope.str_field("id").map(str::to_string);
    let target = envelope.str_field("target").map(str::to_string);

    match &target {
        None => {
            self_writer.try_send(OutboundEnvelope::error(id, BrokerError::InvalidRpcTarget.to_string()));
        }
        Some(target) if target == sender.as_str() => {
            self_writer.try_send(OutboundEnvelope::error(id, BrokerError::InvalidRpcTarget.to_string()));
        }
        Some(target) => {
            let Some(writer) = broker.writer_of(target) else {
                self_writer.try_send(OutboundEnvelope::error(
                    id,
                    BrokerError::UnknownRpcTarget(target.clone()).to_string(),
                ));
                return;
            };
            let forwarded = forward_with_sender(envelope.into_fields(), "rpc", sender);
            match writer.try_send(forwarded) {
                SendOutcome::Sent => {}
                SendOutcome::QueueFull => {
                    metrics::rpc_forward_dropped();
                    warn!(target = %target, "dropped rpc request: writer queue full");
                }
                SendOutcome::Closed => {
                    self_writer.try_send(OutboundEnvelope::error(
                        id,
                        BrokerError::UnknownRpcTarget(target.clone()).to_string(),
                    ));
                }
            }
        }
    }
}

fn handle_rpc_response(broker: &Broker, sender: &AgentId, self_writer: &WriterHandle, envelope: InboundEnvelope) {
    let id = envelope.str_field("id").map(str::to_string);
    let target = envelope.str_field("target").map(str::to_string);

    let target = match &target {
        Some(target) if broker.contains(target) => target.clone(),
        other => {
            let missing = other.as_deref().unwrap_or("<missing>").to_string();
            self_writer.try_send(OutboundEnvelope::error(
                id,
                BrokerError::UnknownRpcResponseTarget(missing).to_string(),
            ));
            return;
        }
    };

    let Some(writer) = broker.writer_of(&target) else {
        self_writer.try_send(OutboundEnvelope::error(
            id,
            BrokerError::UnknownRpcResponseTarget(target).to_string(),
        ));
        return;
    };

    let forwarded = forward_with_sender(envelope.into_fields(), "rpc_response", sender);
    match writer.try_send(forwarded) {
        SendOutcome::Sent => {}
        SendOutcome::QueueFull => {
            metrics::rpc_forward_dropped();
            warn!(target = %target, "dropped rpc response: writer queue full");
        }
        SendOutcome::Closed => {
            self_writer.try_send(OutboundEnvelope::error(
                id,
                BrokerError::UnknownRpcResponseTarget(target).to_string(),
            ));
        }
    }
}
