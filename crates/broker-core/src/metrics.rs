//! Operational counters, installed via the `metrics` facade. Purely observational — none of these
//! influence routing decisions.

pub const CONNECTIONS_OPEN: &str = "broker_connections_open";
pub const ENVELOPES_ROUTED: &str = "broker_envelopes_routed_total";
pub const PUBLISH_FANOUT_DROPPED: &str = "broker_publish_fanout_dropped_total";
pub const RPC_FORWARD_DROPPED: &str = "broker_rpc_forward_dropped_total";
pub const RPC_TIMEOUTS: &str = "broker_rpc_timeouts_total";

pub fn connection_opened() {
    metrics::increment_gauge!(CONNECTIONS_OPEN, 1.0);
}

pub fn connection_closed() {
    metrics::decrement_gauge!(CONNECTIONS_OPEN, 1.0);
}

pub fn envelope_routed(kind: &'static str) {
    metrics::increment_counter!(ENVELOPES_ROUTED, "type" => kind);
}

pub fn publish_fanout_dropped() {
    metrics::increment_counter!(PUBLISH_FANOUT_DROPPED);
}

pub fn rpc_forward_dropped() {
    metrics::increment_counter!(RPC_FORWARD_DROPPED);
}

pub fn rpc_timed_out() {
    metrics::increment_counter!(RPC_TIMEOUTS);
}
