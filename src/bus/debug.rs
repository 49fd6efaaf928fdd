//! Read-only introspection snapshots.
//!
//! [`DebugInfo`] is a point-in-time copy assembled under the bus lock; it
//! never aliases live state, so holding one cannot block or observe later
//! mutation. History entries are shared `Arc` clones of the same envelopes
//! subscribers saw.

use std::sync::Arc;

use crate::events::EventEnvelope;

/// Retention stats for one topic's replay buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStats {
    /// Topic the buffer belongs to.
    pub event_type: String,
    /// Envelopes currently retained.
    pub len: usize,
    /// Retention ceiling (grows with the deepest replay request).
    pub max_size: usize,
}

/// Snapshot of bus state, as returned by `EventBus::debug_info()`.
#[derive(Debug)]
pub struct DebugInfo<P> {
    /// Whether verbose per-delivery logging is currently enabled.
    pub debug_mode: bool,
    /// Topics with at least one live subscription, sorted.
    pub active_event_types: Vec<String>,
    /// Live subscriptions across all topics, including all-events handles.
    pub total_subscriptions: usize,
    /// Most recent history entries, oldest first (bounded sample).
    pub recent_events: Vec<Arc<EventEnvelope<P>>>,
    /// Per-topic buffer stats, sorted by topic.
    pub buffers: Vec<BufferStats>,
}
