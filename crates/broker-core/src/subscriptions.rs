//! Subscription index: `topic -> set of subscriber identities`.
//!
//! This type holds no lock of its own — it is mutated only from inside [`crate::broker::Broker`],
//! which guards it and the connection registry under a single discipline so the two structures
//! are never observably out of sync.

use std::collections::{HashMap, HashSet};

use crate::identity::AgentId;

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    topics: HashMap<String, HashSet<AgentId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: subscribing the same identity to the same topic twice collapses into one
    /// subscription.
    pub fn subscribe(&mut self, topic: &str, identity: AgentId) {
        self.topics.entry(topic.to_string()).or_default().insert(identity);
    }

    /// Removes `identity` from every topic it is subscribed to, pruning topics left with no
    /// subscribers.
    pub fn forget(&mut self, identity: &AgentId) {
        self.topics.retain(|_, subscribers| {
            subscribers.remove(identity);
            !subscribers.is_empty()
        });
    }

    /// A snapshot of current subscribers so fan-out can iterate without holding the broker lock.
    pub fn subscribers_of(&self, topic: &str) -> Vec<AgentId> {
        self.topics
            .get(topic)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
