//! RPC correlator: the broker-side `id -> waiter` table used only for RPCs the broker itself
//! originates (e.g. health checks). Agent-to-agent RPCs carry their own `id` and are correlated
//! by the agents; the broker never looks them up here.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::RpcCorrelationError;

/// Default waiter timeout: 10 seconds.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

type Waiter = oneshot::Sender<Result<Value, RpcCorrelationError>>;

#[derive(Default)]
pub struct RpcCorrelator {
    pending: Mutex<HashMap<String, Waiter>>,
}

impl RpcCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a broker-initiated RPC with the given correlation id and awaits its response (or
    /// timeout). The caller is responsible for actually sending the `rpc` envelope after
    /// registering the waiter, to avoid a response racing ahead of registration.
    pub async fn call(&self, id: String) -> Result<Value, RpcCorrelationError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        match tokio::time::timeout(DEFAULT_RPC_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcCorrelationError::Aborted),
            Err(_) => {
                self.pending.lock().remove(&id);
                crate::metrics::rpc_timed_out();
                Err(RpcCorrelationError::Timeout)
            }
        }
    }

    /// Resolves a pending waiter with the matching `rpc_response`. Returns `true` if a waiter was
    /// found; a waiter resolves exactly once.
    pub fn resolve(&self, id: &str, result: Value) -> bool {
        if let Some(tx) = self.pending.lock().remove(id) {
            let _ = tx.send(Ok(result));
            true
        } else {
            false
        }
    }

    /// Fails every outstanding waiter on connection teardown.
    pub fn abort_all(&self) {
        for (_, tx) in self.pending.lock().drain() {
            let _ = tx.send(Err(RpcCorrelationError::Aborted));
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
