//! # backplane
//!
//! **Backplane** is an in-process publish/subscribe event bus for Rust.
//!
//! It provides deterministic multicast delivery over string topics, replay
//! for late subscribers, per-subscription filtering and rate shaping
//! (debounce/throttle), correlation ids for tracing a publish across
//! consumers, and leak-free teardown. It is designed as a building block
//! for decoupling components inside one process.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   publisher A          publisher B            publisher C
//!       │                    │                      │
//!       └────────── publish(topic, payload) ────────┘
//!                            ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  EventBus<P>                                                  │
//! │  - history ring (last HISTORY_CAPACITY envelopes, all topics) │
//! │  - replay buffer per topic (bounded, ceiling only grows)      │
//! │  - channel per topic (pipelines in subscription order)        │
//! │  - all-events channel                                         │
//! └──────┬─────────────────────┬─────────────────────┬────────────┘
//!        ▼                     ▼                     ▼
//! ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//! │ pipeline #1  │      │ pipeline #2  │      │ pipeline #N  │
//! │ filter       │      │ filter       │      │ filter       │
//! │ debounce     │      │ debounce     │      │ debounce     │
//! │ throttle     │      │ throttle     │      │ throttle     │
//! └──────┬───────┘      └──────┬───────┘      └──────┬───────┘
//!        ▼                     ▼                     ▼
//!   queue + handle        queue + handle        queue + handle
//!   Subscription #1       Subscription #2       Subscription #N
//! ```
//!
//! ### Delivery model
//! ```text
//! publish(topic, payload)
//!   ├─► mint EventEnvelope { topic, payload, timestamp, correlation id }
//!   ├─► record in history ring
//!   ├─► append to replay buffer[topic] (created if absent)
//!   ├─► for each pipeline on channel[topic], in subscription order:
//!   │       filter ─► debounce ─► throttle ─► queue
//!   └─► same for every pipeline on the all-events channel
//!
//! subscribe(topic, config)
//!   ├─► validate config
//!   ├─► replay: offer up to buffer_size buffered envelopes through the
//!   │   new pipeline (strictly before any later publish)
//!   └─► attach pipeline; detach via Subscription::close() / drop
//!
//! clear()
//!   └─► cancel all timers, drop all registrations/buffers/history;
//!       old handles become inert, their queues end after draining
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types                                |
//! |-------------------|------------------------------------------------------------------|------------------------------------------|
//! | **Publish**       | Synchronous, infallible multicast with correlation ids.          | [`EventBus`], [`EventEnvelope`]          |
//! | **Subscribe**     | Single-topic, merged multi-topic, or all-events registrations.   | [`Subscription`], [`EventStream`]        |
//! | **Replay**        | Late subscribers receive a bounded prefix of missed envelopes.   | [`SubscribeConfig::with_replay`]         |
//! | **Rate shaping**  | Trailing debounce and leading-edge throttle per subscription.    | [`SubscribeConfig`]                      |
//! | **Filtering**     | Per-subscription predicates with panic isolation.                | [`FilterFn`]                             |
//! | **Introspection** | Live topic/subscriber queries and debug snapshots.               | [`DebugInfo`], [`BufferStats`]           |
//! | **Errors**        | Typed validation errors; everything else is infallible.          | [`ConfigError`]                          |
//!
//! ## Example
//! ```rust
//! use backplane::{EventBus, SubscribeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), backplane::ConfigError> {
//!     let bus: EventBus<String> = EventBus::new();
//!
//!     let mut updates = bus.subscribe("note.updated", SubscribeConfig::new())?;
//!
//!     bus.publish("note.updated", "first draft".to_string());
//!     bus.publish_from("note.updated", "second draft".to_string(), "editor");
//!
//!     while let Some(env) = updates.try_recv() {
//!         println!("[{}] {} ({})", env.timestamp_ms(), env.payload, env.correlation_id);
//!     }
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod events;
mod subscriptions;

// ---- Public re-exports ----

pub use bus::{BufferStats, DebugInfo, EventBus};
pub use error::ConfigError;
pub use events::EventEnvelope;
pub use subscriptions::{EventStream, FilterFn, SubscribeConfig, Subscription, SubscriptionId};

// ---- Tunables ----

/// Envelopes retained by the global history ring, across all topics.
pub const HISTORY_CAPACITY: usize = 1000;

/// History entries included in a [`DebugInfo`] snapshot.
pub const DEBUG_HISTORY_SAMPLE: usize = 10;

/// Initial replay buffer depth for a topic; raised by deeper replay requests.
pub const DEFAULT_REPLAY_BUFFER: usize = 1;

/// Correlation ids remembered by a merged subscription's dedup window.
pub const DEDUP_WINDOW: usize = 128;
