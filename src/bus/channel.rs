//! Per-topic registration list.
//!
//! A channel is the ordered set of pipelines attached to one topic (or to
//! the all-events slot). Entry order is subscription order, and dispatch
//! walks it front to back, so delivery order within a channel is
//! deterministic. Channels are created lazily and only destroyed by
//! `EventBus::clear()`; an empty channel is indistinguishable from a missing
//! one through the public API.

use std::sync::Arc;

use crate::events::EventEnvelope;
use crate::subscriptions::{DeliveryPipeline, SubscriptionId};

struct ChannelEntry<P> {
    id: SubscriptionId,
    pipeline: DeliveryPipeline<P>,
}

/// Ordered pipelines registered on one topic.
pub(crate) struct Channel<P> {
    entries: Vec<ChannelEntry<P>>,
}

impl<P> Default for Channel<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> Channel<P> {
    /// Removes every entry registered under `id`.
    pub(crate) fn detach(&mut self, id: SubscriptionId) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<P: Send + Sync + 'static> Channel<P> {
    pub(crate) fn attach(&mut self, id: SubscriptionId, pipeline: DeliveryPipeline<P>) {
        self.entries.push(ChannelEntry { id, pipeline });
    }

    /// Offers the envelope to every pipeline, in subscription order.
    pub(crate) fn dispatch(&self, env: &Arc<EventEnvelope<P>>) {
        for entry in &self.entries {
            entry.pipeline.offer(Arc::clone(env));
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::subscriptions::SubscribeConfig;

    use super::*;
    use std::sync::atomic::AtomicBool;

    fn entry(
        id: u64,
    ) -> (
        DeliveryPipeline<u32>,
        mpsc::UnboundedReceiver<Arc<EventEnvelope<u32>>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = DeliveryPipeline::new(
            SubscriptionId(id),
            Arc::from("t"),
            &SubscribeConfig::new(),
            tx,
            CancellationToken::new(),
            Arc::new(AtomicBool::new(false)),
        );
        (pipeline, rx)
    }

    #[test]
    fn dispatch_walks_entries_in_attach_order() {
        let mut channel = Channel::default();
        let (first, mut rx_first) = entry(1);
        let (second, mut rx_second) = entry(2);
        channel.attach(SubscriptionId(1), first);
        channel.attach(SubscriptionId(2), second);

        channel.dispatch(&Arc::new(EventEnvelope::new("t", 9)));
        assert_eq!(rx_first.try_recv().ok().map(|e| e.payload), Some(9));
        assert_eq!(rx_second.try_recv().ok().map(|e| e.payload), Some(9));
    }

    #[test]
    fn detach_removes_only_that_subscription() {
        let mut channel = Channel::default();
        let (first, mut rx_first) = entry(1);
        let (second, mut rx_second) = entry(2);
        channel.attach(SubscriptionId(1), first);
        channel.attach(SubscriptionId(2), second);
        assert_eq!(channel.len(), 2);

        channel.detach(SubscriptionId(1));
        assert_eq!(channel.len(), 1);
        channel.dispatch(&Arc::new(EventEnvelope::new("t", 3)));
        assert!(rx_first.try_recv().is_err());
        assert_eq!(rx_second.try_recv().ok().map(|e| e.payload), Some(3));
    }
}
