//! # Subscription machinery: config, pipelines, handles.
//!
//! This module owns everything scoped to a single subscription. The bus
//! routes envelopes to channels; each channel entry is a [`DeliveryPipeline`]
//! built here from a [`SubscribeConfig`], feeding the queue drained by a
//! [`Subscription`] handle.
//!
//! ## Architecture
//! ```text
//! Envelope flow (one subscription):
//!   EventBus::publish ──► channel ──► DeliveryPipeline
//!                                        │ filter
//!                                        │ debounce (timer task)
//!                                        │ throttle
//!                                        ▼
//!                                   queue (mpsc, unbounded)
//!                                        │
//!                        Subscription::recv / try_recv / EventStream
//!                                        │ dedup (merged subscriptions)
//!                                        ▼
//!                                   consumer code
//! ```
//!
//! ## Lifecycle
//! - Built by the subscribe operations; one pipeline per registered topic.
//! - Disposed by `Subscription::close()` / drop, or in bulk by
//!   `EventBus::clear()`; both cancel pending timers.

mod config;
mod dedup;
mod pipeline;
mod stream;
mod subscription;

pub use config::{FilterFn, SubscribeConfig};
pub use stream::EventStream;
pub use subscription::{Subscription, SubscriptionId};

pub(crate) use dedup::RecentCorrelations;
pub(crate) use pipeline::DeliveryPipeline;
