//! Error taxonomy for the broker core.
//!
//! Per-envelope errors (everything except [`BrokerError::DuplicateIdentity`],
//! [`BrokerError::CapacityExceeded`], and [`BrokerError::WriteFailed`]) are always recovered
//! locally by the router and reported to the originating agent as an `error` envelope; they never
//! tear down a connection.

use thiserror::Error;

/// Failure to decode an inbound WebSocket text frame into a recognizable envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("envelope root must be a JSON object")]
    NotAnObject,
    #[error("envelope is missing a string \"type\" field")]
    MissingType,
}

/// Core routing errors. Each variant's `Display` is the literal message the router sends in the
/// `error` envelope for that failure — `router.rs` builds every reply from these instead of its
/// own string literals, so the wording lives in exactly one place.
///
/// [`DuplicateIdentity`](BrokerError::DuplicateIdentity) and
/// [`CapacityExceeded`](BrokerError::CapacityExceeded) are the exception: both close the
/// connection (policy-violation, before any envelope is sent) rather than reply with one, so their
/// `Display` text only ever reaches a log line, not the wire. `Broker::try_register` returns this
/// enum directly rather than a separate marker type, so the log line and the eventual close reason
/// agree on wording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Invalid JSON message")]
    BadEnvelope,
    #[error("Missing topic in subscription request")]
    MissingSubscribeTopic,
    #[error("Missing topic in publish request")]
    MissingPublishTopic,
    #[error("Unsupported message type: {0}")]
    UnknownType(String),
    #[error("Invalid RPC target")]
    InvalidRpcTarget,
    #[error("Failed to route RPC request to {0}")]
    UnknownRpcTarget(String),
    #[error("Unknown target agent {0} for RPC response")]
    UnknownRpcResponseTarget(String),
    #[error("identity {0} is already connected")]
    DuplicateIdentity(String),
    #[error("connection capacity ({0}) reached")]
    CapacityExceeded(usize),
    #[error("write to connection {0} failed")]
    WriteFailed(String),
}

impl From<CodecError> for BrokerError {
    fn from(_: CodecError) -> Self {
        BrokerError::BadEnvelope
    }
}

/// Errors surfaced by the broker-side RPC correlator, used only for broker-initiated RPCs.
/// Agent-to-agent RPCs are correlated by the agents themselves and never produce these.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RpcCorrelationError {
    #[error("RPC call timed out waiting for a response")]
    Timeout,
    #[error("RPC call aborted because its connection was torn down")]
    Aborted,
}
