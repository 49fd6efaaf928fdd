//! Event data model: envelopes and bounded storage.
//!
//! This module groups what the bus *carries* (as opposed to how it routes,
//! which lives in `bus/`):
//!
//! ## Contents
//! - [`EventEnvelope`] the published payload plus delivery metadata
//! - `EventBuffer` per-topic replay ring (crate-internal)
//! - `HistoryLog` global fixed-capacity ring (crate-internal)
//!
//! ## Quick reference
//! - **Producers**: `EventBus::publish` / `publish_from` mint envelopes.
//! - **Consumers**: subscription pipelines, replay prefixes, `last_event`,
//!   and `debug_info` snapshots all hand out `Arc<EventEnvelope<P>>` clones
//!   of the same allocation.

mod buffers;
mod envelope;

pub use envelope::EventEnvelope;

pub(crate) use buffers::{EventBuffer, HistoryLog};
