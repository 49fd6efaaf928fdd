//! # EventBus: the routing core.
//!
//! One [`EventBus`] instance owns every channel, buffer and registration.
//! Instances are fully independent; cloning a bus clones a handle to the
//! same core (the clone sees the same subscriptions).
//!
//! ## Architecture
//! ```text
//! publish(topic, payload)
//!     │  mint envelope (timestamp, correlation id, source?)
//!     ▼
//! ┌─ bus state (one mutex) ────────────────────────────────┐
//! │  history ring ──► last HISTORY_CAPACITY envelopes      │
//! │  replay buffer[topic] ──► last max_size envelopes      │
//! │  channel[topic] ──► pipelines, subscription order      │
//! │  all-events channel ──► pipelines, subscription order  │
//! └────────────────────────────────────────────────────────┘
//!     │ offer() per pipeline (filter/debounce/throttle)
//!     ▼
//! subscription queues ──► Subscription::recv / EventStream
//! ```
//!
//! ## Rules
//! - The state mutex is never held across an `.await`; `publish` is fully
//!   synchronous and never blocks on subscribers.
//! - Filters run on the publishing thread, under the bus lock. They must
//!   not call back into the bus.
//! - A publish with zero subscribers still records history and the replay
//!   buffer, and still creates the topic's channel.
//! - `clear()` cancels the epoch token; every pending debounce timer dies
//!   without flushing. Subscription ids keep increasing across `clear()`.

mod channel;
mod debug;

pub use debug::{BufferStats, DebugInfo};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::events::{EventBuffer, EventEnvelope, HistoryLog};
use crate::subscriptions::{
    DeliveryPipeline, RecentCorrelations, SubscribeConfig, Subscription, SubscriptionId,
};
use crate::{DEBUG_HISTORY_SAMPLE, DEDUP_WINDOW, DEFAULT_REPLAY_BUFFER};

use channel::Channel;

/// What one subscription is attached to, for teardown and introspection.
struct SubscriptionRecord {
    topics: Vec<Arc<str>>,
    all_events: bool,
    token: CancellationToken,
}

/// Everything guarded by the bus lock.
struct BusState<P> {
    channels: HashMap<Arc<str>, Channel<P>>,
    all_events: Channel<P>,
    buffers: HashMap<Arc<str>, EventBuffer<P>>,
    history: HistoryLog<P>,
    registry: HashMap<SubscriptionId, SubscriptionRecord>,
    /// Parent of every subscription's cancellation token; replaced on `clear()`.
    epoch: CancellationToken,
}

/// Shared core behind every [`EventBus`] clone and every subscription's
/// weak back-reference.
pub(crate) struct BusCore<P> {
    state: Mutex<BusState<P>>,
    debug_mode: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl<P> BusCore<P> {
    /// Removes one registration. Safe to call twice, or after `clear()`.
    pub(crate) fn detach(&self, id: SubscriptionId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let Some(record) = state.registry.remove(&id) else {
            return;
        };
        record.token.cancel();
        for topic in &record.topics {
            if let Some(channel) = state.channels.get_mut(topic) {
                channel.detach(id);
            }
        }
        if record.all_events {
            state.all_events.detach(id);
        }
        debug!(subscription = %id, "subscription closed");
    }
}

/// In-process publish/subscribe bus, generic over one payload type.
///
/// See the [module docs](self) for the delivery model. Constructed with
/// [`EventBus::new`]; `Clone` shares the same core.
pub struct EventBus<P> {
    core: Arc<BusCore<P>>,
}

impl<P> EventBus<P> {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Arc::new(BusCore {
                state: Mutex::new(BusState {
                    channels: HashMap::new(),
                    all_events: Channel::default(),
                    buffers: HashMap::new(),
                    history: HistoryLog::new(),
                    registry: HashMap::new(),
                    epoch: CancellationToken::new(),
                }),
                debug_mode: Arc::new(AtomicBool::new(false)),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// True iff the topic has at least one live subscription right now.
    /// Buffered or historical envelopes alone never make this true.
    pub fn has_subscribers(&self, event_type: &str) -> bool {
        let Ok(state) = self.core.state.lock() else {
            return false;
        };
        state
            .channels
            .get(event_type)
            .is_some_and(|channel| !channel.is_empty())
    }

    /// Number of live registrations on the topic (all-events handles not
    /// included).
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        let Ok(state) = self.core.state.lock() else {
            return 0;
        };
        state
            .channels
            .get(event_type)
            .map(Channel::len)
            .unwrap_or(0)
    }

    /// Every topic with at least one live subscription, sorted.
    pub fn active_event_types(&self) -> Vec<String> {
        let Ok(state) = self.core.state.lock() else {
            return Vec::new();
        };
        let mut active: Vec<String> = state
            .channels
            .iter()
            .filter(|(_, channel)| !channel.is_empty())
            .map(|(topic, _)| topic.to_string())
            .collect();
        active.sort();
        active
    }

    /// Most recently published envelope for the topic, or `None` if the
    /// topic has never been published.
    pub fn last_event(&self, event_type: &str) -> Option<Arc<EventEnvelope<P>>> {
        let Ok(state) = self.core.state.lock() else {
            return None;
        };
        state
            .buffers
            .get(event_type)
            .and_then(|buffer| buffer.last().cloned())
    }

    /// Drops every subscription, buffer and history entry, and cancels all
    /// pending debounce timers. Handles issued before the call become inert;
    /// their queues end after draining. Ids are not reused afterwards.
    pub fn clear(&self) {
        let Ok(mut state) = self.core.state.lock() else {
            return;
        };
        state.epoch.cancel();
        state.epoch = CancellationToken::new();
        state.channels.clear();
        state.all_events = Channel::default();
        state.buffers.clear();
        state.history.clear();
        state.registry.clear();
        debug!("bus cleared");
    }

    /// Snapshot of active topics, registration count, recent history and
    /// buffer stats.
    pub fn debug_info(&self) -> DebugInfo<P> {
        let debug_mode = self.core.debug_mode.load(AtomicOrdering::Relaxed);
        let Ok(state) = self.core.state.lock() else {
            return DebugInfo {
                debug_mode,
                active_event_types: Vec::new(),
                total_subscriptions: 0,
                recent_events: Vec::new(),
                buffers: Vec::new(),
            };
        };
        let mut active: Vec<String> = state
            .channels
            .iter()
            .filter(|(_, channel)| !channel.is_empty())
            .map(|(topic, _)| topic.to_string())
            .collect();
        active.sort();
        let mut buffers: Vec<BufferStats> = state
            .buffers
            .iter()
            .map(|(topic, buffer)| BufferStats {
                event_type: topic.to_string(),
                len: buffer.len(),
                max_size: buffer.max_size(),
            })
            .collect();
        buffers.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        DebugInfo {
            debug_mode,
            active_event_types: active,
            total_subscriptions: state.registry.len(),
            recent_events: state.history.tail(DEBUG_HISTORY_SAMPLE).cloned().collect(),
            buffers,
        }
    }

    /// Toggles verbose per-delivery logging (`tracing` at debug level).
    /// Delivery semantics are unaffected.
    pub fn set_debug_mode(&self, enabled: bool) {
        self.core.debug_mode.store(enabled, AtomicOrdering::Relaxed);
        debug!(enabled, "debug mode toggled");
    }
}

impl<P: Send + Sync + 'static> EventBus<P> {
    /// Publishes `payload` under `event_type`.
    ///
    /// Synchronous: history, the replay buffer and every matching pipeline
    /// are updated before this returns. Infallible; zero subscribers,
    /// unknown topics and panicking filters are all absorbed.
    pub fn publish(&self, event_type: &str, payload: P) {
        self.publish_inner(event_type, payload, None);
    }

    /// [`publish`](EventBus::publish) with a source tag naming the
    /// publishing component.
    pub fn publish_from(&self, event_type: &str, payload: P, source: &str) {
        self.publish_inner(event_type, payload, Some(source));
    }

    fn publish_inner(&self, event_type: &str, payload: P, source: Option<&str>) {
        let Ok(mut state) = self.core.state.lock() else {
            return;
        };
        let mut envelope = EventEnvelope::new(event_type, payload);
        if let Some(source) = source {
            envelope = envelope.with_source(source);
        }
        let env = Arc::new(envelope);
        let topic = Arc::clone(&env.event_type);

        state.history.record(Arc::clone(&env));
        state
            .buffers
            .entry(Arc::clone(&topic))
            .or_insert_with(|| EventBuffer::new(DEFAULT_REPLAY_BUFFER))
            .push(Arc::clone(&env));

        let channel = state.channels.entry(Arc::clone(&topic)).or_default();
        channel.dispatch(&env);
        let direct = channel.len();
        state.all_events.dispatch(&env);

        trace!(
            topic = %topic,
            correlation_id = %env.correlation_id,
            receivers = direct + state.all_events.len(),
            "event published"
        );
    }

    /// Subscribes to one topic.
    ///
    /// The topic need not have been published before; the channel is created
    /// on the spot. Fails only on invalid `config`.
    pub fn subscribe(
        &self,
        event_type: &str,
        config: SubscribeConfig<P>,
    ) -> Result<Subscription<P>, ConfigError> {
        self.register(&[event_type], false, false, config)
    }

    /// Subscribes to several topics through one merged handle.
    ///
    /// Each topic gets its own pipeline built from the same `config` (replay
    /// applies per topic); the handle deduplicates by correlation id as a
    /// safety net against double registration.
    pub fn subscribe_many(
        &self,
        event_types: &[&str],
        config: SubscribeConfig<P>,
    ) -> Result<Subscription<P>, ConfigError> {
        self.register(event_types, false, true, config)
    }

    /// Subscribes to every topic, current and future. `replay` has no
    /// effect here; filter, debounce and throttle apply as usual.
    pub fn subscribe_all(&self, config: SubscribeConfig<P>) -> Result<Subscription<P>, ConfigError> {
        self.register(&[], true, false, config)
    }

    fn register(
        &self,
        topics: &[&str],
        all_events: bool,
        dedup: bool,
        config: SubscribeConfig<P>,
    ) -> Result<Subscription<P>, ConfigError> {
        config.validate()?;

        let id = SubscriptionId(self.core.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let window = if dedup {
            Some(RecentCorrelations::new(DEDUP_WINDOW))
        } else {
            None
        };
        let topic_arcs: Vec<Arc<str>> = topics.iter().map(|topic| Arc::from(*topic)).collect();
        let (tx, rx) = mpsc::unbounded_channel();

        let Ok(mut state) = self.core.state.lock() else {
            // poisoned bus: a handle that will never receive
            return Ok(Subscription::new(
                id, topic_arcs, all_events, rx, window, Weak::new(),
            ));
        };
        let token = state.epoch.child_token();

        for topic in &topic_arcs {
            let pipeline = DeliveryPipeline::new(
                id,
                Arc::clone(topic),
                &config,
                tx.clone(),
                token.clone(),
                Arc::clone(&self.core.debug_mode),
            );
            if let Some(depth) = config.replay_depth() {
                let buffer = state
                    .buffers
                    .entry(Arc::clone(topic))
                    .or_insert_with(|| EventBuffer::new(depth));
                buffer.raise_ceiling(depth);
                // replay strictly precedes any publish that follows this
                // subscribe: both serialize on the bus lock
                for env in buffer.recent(depth) {
                    pipeline.offer(Arc::clone(env));
                }
            }
            state
                .channels
                .entry(Arc::clone(topic))
                .or_default()
                .attach(id, pipeline);
        }
        if all_events {
            let pipeline = DeliveryPipeline::new(
                id,
                Arc::from("*"),
                &config,
                tx.clone(),
                token.clone(),
                Arc::clone(&self.core.debug_mode),
            );
            state.all_events.attach(id, pipeline);
        }

        state.registry.insert(
            id,
            SubscriptionRecord {
                topics: topic_arcs.clone(),
                all_events,
                token,
            },
        );
        debug!(subscription = %id, topics = ?topics, all_events, "subscription created");

        Ok(Subscription::new(
            id,
            topic_arcs,
            all_events,
            rx,
            window,
            Arc::downgrade(&self.core),
        ))
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<P> std::fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn works_without_async_runtime() {
        let bus: EventBus<u32> = EventBus::new();
        let mut sub = bus.subscribe("tick", SubscribeConfig::new()).unwrap();
        bus.publish("tick", 1);
        assert_eq!(sub.try_recv().map(|e| e.payload), Some(1));
    }

    #[test]
    fn publish_without_subscribers_still_records() {
        let bus: EventBus<u32> = EventBus::new();
        bus.publish("metrics.flushed", 10);
        assert!(!bus.has_subscribers("metrics.flushed"));
        assert_eq!(
            bus.last_event("metrics.flushed").map(|e| e.payload),
            Some(10)
        );
        let info = bus.debug_info();
        assert!(info.active_event_types.is_empty());
        assert_eq!(info.buffers.len(), 1);
        assert_eq!(info.buffers[0].event_type, "metrics.flushed");
    }

    #[test]
    fn last_event_unknown_topic_is_none() {
        let bus: EventBus<u32> = EventBus::new();
        assert!(bus.last_event("never.published").is_none());
        assert_eq!(bus.subscriber_count("never.published"), 0);
    }

    #[test]
    fn subscriber_count_tracks_registrations() {
        let bus: EventBus<u32> = EventBus::new();
        let first = bus.subscribe("t", SubscribeConfig::new()).unwrap();
        let second = bus.subscribe("t", SubscribeConfig::new()).unwrap();
        assert_eq!(bus.subscriber_count("t"), 2);
        drop(first);
        assert_eq!(bus.subscriber_count("t"), 1);
        drop(second);
        assert_eq!(bus.subscriber_count("t"), 0);
        assert!(!bus.has_subscribers("t"));
    }

    #[test]
    fn subscription_ids_increase_across_clear() {
        let bus: EventBus<u32> = EventBus::new();
        let first = bus.subscribe("t", SubscribeConfig::new()).unwrap();
        let first_id = first.id();
        bus.clear();
        let second = bus.subscribe("t", SubscribeConfig::new()).unwrap();
        assert!(second.id() > first_id);
    }

    #[test]
    fn bus_clones_share_state() {
        let bus: EventBus<u32> = EventBus::new();
        let clone = bus.clone();
        let _sub = clone.subscribe("t", SubscribeConfig::new()).unwrap();
        assert!(bus.has_subscribers("t"));
    }

    #[test]
    fn set_debug_mode_is_reflected_in_snapshot() {
        let bus: EventBus<u32> = EventBus::new();
        assert!(!bus.debug_info().debug_mode);
        bus.set_debug_mode(true);
        assert!(bus.debug_info().debug_mode);
        bus.set_debug_mode(false);
        assert!(!bus.debug_info().debug_mode);
    }
}
