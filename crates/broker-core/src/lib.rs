//! Connection registry, subscription index, RPC correlation and envelope routing for the
//! messagebus broker. Transport-agnostic: nothing here knows about HTTP or WebSockets — see the
//! `broker-node` crate for the axum server that drives this core.

pub mod broker;
pub mod codec;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod registry;
pub mod rpc;
pub mod router;
pub mod subscriptions;
pub mod writer;

pub use broker::Broker;
pub use codec::InboundEnvelope;
pub use connection::ConnectionState;
pub use envelope::{OutboundEnvelope, WireMessage};
pub use error::{BrokerError, CodecError, RpcCorrelationError};
pub use identity::AgentId;
pub use registry::{ConnectionRecord, ConnectionRegistry};
pub use rpc::RpcCorrelator;
pub use subscriptions::SubscriptionIndex;
pub use writer::{SendOutcome, WriterHandle};
