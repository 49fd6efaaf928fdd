//! # Envelopes carried by the bus.
//!
//! Every publish mints one [`EventEnvelope`]: the caller's payload wrapped
//! with the topic, a wall-clock timestamp, an optional source tag and a
//! correlation id. The bus shares the envelope as `Arc<EventEnvelope<P>>`
//! between subscribers, replay buffers and the history log, so an envelope is
//! never mutated after construction.
//!
//! ## Correlation
//! `correlation_id` is a v4 UUID minted per publish call. It is unique across
//! topics and across arbitrarily many publishes, which lets merged
//! subscriptions deduplicate and lets log lines from different subscribers be
//! tied back to one publish.
//!
//! ## Example
//! ```rust
//! use backplane::EventEnvelope;
//!
//! let env = EventEnvelope::new("auth.signed_in", 42u32).with_source("session-layer");
//!
//! assert_eq!(env.event_type.as_ref(), "auth.signed_in");
//! assert_eq!(env.payload, 42);
//! assert_eq!(env.source.as_deref(), Some("session-layer"));
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// A published event with its delivery metadata.
///
/// - `event_type`: dot-namespaced topic string (e.g. `"auth.signed_in"`)
/// - `at`: wall-clock timestamp taken at publish time
/// - `source`: optional tag naming the publishing component
/// - `correlation_id`: globally unique id for this publish
#[derive(Debug)]
pub struct EventEnvelope<P> {
    /// Topic this envelope was published under.
    pub event_type: Arc<str>,
    /// Caller-supplied payload.
    pub payload: P,
    /// Wall-clock timestamp at publish time.
    pub at: SystemTime,
    /// Optional name of the publishing component.
    pub source: Option<Arc<str>>,
    /// Globally unique id minted for this publish.
    pub correlation_id: Uuid,
}

impl<P> EventEnvelope<P> {
    /// Creates a new envelope with a fresh timestamp and correlation id.
    pub fn new(event_type: impl Into<Arc<str>>, payload: P) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            at: SystemTime::now(),
            source: None,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Attaches the name of the publishing component.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns `true` if this envelope was published under `event_type`.
    #[inline]
    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type.as_ref() == event_type
    }

    /// Timestamp as integer milliseconds since the Unix epoch (compact, for
    /// logs and debug snapshots). Clamps to zero for pre-epoch clocks.
    pub fn timestamp_ms(&self) -> u64 {
        self.at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn new_envelope_carries_topic_and_payload() {
        let env = EventEnvelope::new("cache.invalidated", "users");
        assert_eq!(env.event_type.as_ref(), "cache.invalidated");
        assert_eq!(env.payload, "users");
        assert!(env.source.is_none());
        assert!(env.is_type("cache.invalidated"));
        assert!(!env.is_type("cache"));
    }

    #[test]
    fn with_source_tags_the_publisher() {
        let env = EventEnvelope::new("job.done", 1u8).with_source("worker-pool");
        assert_eq!(env.source.as_deref(), Some("worker-pool"));
    }

    #[test]
    fn timestamp_is_recent() {
        let before = SystemTime::now();
        let env = EventEnvelope::new("tick", ());
        assert!(env.at >= before);
        assert!(env.timestamp_ms() > 0);
    }

    #[test]
    fn correlation_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let env = EventEnvelope::new("t", ());
            assert!(seen.insert(env.correlation_id));
        }
    }
}
