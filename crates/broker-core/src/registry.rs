//! Connection registry, part of the router core: `identity -> connection record`.
//!
//! Like [`crate::subscriptions::SubscriptionIndex`], this type holds no lock of its own; it is
//! mutated only from inside [`crate::broker::Broker`] under the same discipline that guards the
//! subscription index, so the registry and subscription index can never be observed out of sync
//! with each other.

use std::collections::HashMap;
use std::sync::Arc;

use crate::identity::AgentId;
use crate::rpc::RpcCorrelator;
use crate::writer::WriterHandle;

/// Everything the broker keeps about one open connection.
pub struct ConnectionRecord {
    pub writer: WriterHandle,
    pub rpc: RpcCorrelator,
}

impl ConnectionRecord {
    pub fn new(writer: WriterHandle) -> Self {
        Self {
            writer,
            rpc: RpcCorrelator::new(),
        }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<AgentId, Arc<ConnectionRecord>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.connections.contains_key(identity)
    }

    pub fn insert(&mut self, identity: AgentId, record: Arc<ConnectionRecord>) {
        self.connections.insert(identity, record);
    }

    pub fn remove(&mut self, identity: &AgentId) -> Option<Arc<ConnectionRecord>> {
        self.connections.remove(identity)
    }

    pub fn get(&self, identity: &str) -> Option<Arc<ConnectionRecord>> {
        self.connections.get(identity).cloned()
    }

    pub fn writer_of(&self, identity: &str) -> Option<WriterHandle> {
        self.connections.get(identity).map(|r| r.writer.clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections_snapshot(&self) -> Vec<(AgentId, Arc<ConnectionRecord>)> {
        self.connections
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup() {
        let mut registry = ConnectionRegistry::new();
        let (writer, _rx) = WriterHandle::channel();
        let id = AgentId::new("a").unwrap();
        registry.insert(id.clone(), Arc::new(ConnectionRecord::new(writer)));
        assert!(registry.contains("a"));
        assert!(registry.writer_of("a").is_some());
        assert!(registry.writer_of("ghost").is_none());
    }

    #[test]
    fn remove_drops_the_record() {
        let mut registry = ConnectionRegistry::new();
        let (writer, _rx) = WriterHandle::channel();
        let id = AgentId::new("a").unwrap();
        registry.insert(id.clone(), Arc::new(ConnectionRecord::new(writer)));
        assert!(registry.remove(&id).is_some());
        assert!(!registry.contains("a"));
    }
}
