//! The broker: owns the connection registry and subscription index under one lock, so the two
//! are never observable out of sync with one another.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BrokerError;
use crate::identity::AgentId;
use crate::metrics;
use crate::registry::{ConnectionRecord, ConnectionRegistry};
use crate::subscriptions::SubscriptionIndex;
use crate::writer::WriterHandle;

#[derive(Default)]
struct BrokerState {
    registry: ConnectionRegistry,
    subscriptions: SubscriptionIndex,
}

/// Process-lifetime broker state, owned by whoever boots the server and handed to connection
/// tasks explicitly — never a mutable global.
pub struct Broker {
    state: Mutex<BrokerState>,
    capacity: usize,
}

impl Default for Broker {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of simultaneously registered identities; a connection attempt past the cap
    /// is rejected the same way a duplicate identity is, before any envelope is sent.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            capacity,
        }
    }

    /// Atomically checks for a duplicate identity and capacity, and if both pass, inserts the
    /// connection record. This is the only path by which "at most one connection per identity" or
    /// "at most `capacity` connections" could be violated, so the checks and the insert happen
    /// under a single lock acquisition.
    pub fn try_register(&self, identity: AgentId, writer: WriterHandle) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if state.registry.contains(identity.as_str()) {
            return Err(BrokerError::DuplicateIdentity(identity.to_string()));
        }
        if state.registry.len() >= self.capacity {
            return Err(BrokerError::CapacityExceeded(self.capacity));
        }
        state
            .registry
            .insert(identity, Arc::new(ConnectionRecord::new(writer)));
        drop(state);
        metrics::connection_opened();
        Ok(())
    }

    /// Tears down a connection's registry and subscription-index presence atomically, and drains
    /// its pending RPC waiters. Safe to call more than once.
    pub fn unregister(&self, identity: &AgentId) {
        let record = {
            let mut state = self.state.lock();
            state.subscriptions.forget(identity);
            state.registry.remove(identity)
        };
        if let Some(record) = record {
            record.rpc.abort_all();
            metrics::connection_closed();
        }
    }

    pub fn subscribe(&self, topic: &str, identity: AgentId) {
        self.state.lock().subscriptions.subscribe(topic, identity);
    }

    pub fn subscribers_of(&self, topic: &str) -> Vec<AgentId> {
        self.state.lock().subscriptions.subscribers_of(topic)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.state.lock().registry.contains(identity)
    }

    pub fn writer_of(&self, identity: &str) -> Option<WriterHandle> {
        self.state.lock().registry.writer_of(identity)
    }

    pub fn connection_of(&self, identity: &str) -> Option<Arc<ConnectionRecord>> {
        self.state.lock().registry.get(identity)
    }

    pub fn open_connection_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Every currently-connected identity, for broker shutdown.
    pub fn all_writers(&self) -> Vec<(AgentId, WriterHandle)> {
        let state = self.state.lock();
        state
            .registry
            .connections_snapshot()
            .into_iter()
            .map(|(id, record)| (id, record.writer.clone()))
            .collect()
    }
}
