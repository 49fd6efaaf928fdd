//! # Subscription handles returned by the subscribe operations.
//!
//! A [`Subscription`] is the consumer half of a registration: it drains the
//! queue its pipelines feed, and it is the registration's disposer.
//!
//! ## What it guarantees
//! - Envelopes arrive in queue order (publish order, minus shaped drops).
//! - Dropping the handle (or calling [`Subscription::close`]) removes the
//!   registration from every channel it was attached to and cancels any
//!   pending debounce timer.
//! - Disposal after `clear()` is a no-op, never an error.
//! - Merged subscriptions drop duplicate correlation ids (bounded window).
//!
//! ## What it does **not** guarantee
//! - Delivery of envelopes published after disposal began; already-queued
//!   envelopes are still drained by `recv()` until it returns `None`.

use std::fmt;
use std::future::poll_fn;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::bus::BusCore;
use crate::events::EventEnvelope;

use super::dedup::RecentCorrelations;
use super::EventStream;

/// Identifier of one subscription, unique for the lifetime of the process
/// (never reused, not even across `clear()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consumer handle for one registration (single-topic, merged or all-events).
pub struct Subscription<P> {
    id: SubscriptionId,
    topics: Vec<Arc<str>>,
    all_events: bool,
    rx: mpsc::UnboundedReceiver<Arc<EventEnvelope<P>>>,
    dedup: Option<RecentCorrelations>,
    core: Weak<BusCore<P>>,
    detached: bool,
}

impl<P> Subscription<P> {
    pub(crate) fn new(
        id: SubscriptionId,
        topics: Vec<Arc<str>>,
        all_events: bool,
        rx: mpsc::UnboundedReceiver<Arc<EventEnvelope<P>>>,
        dedup: Option<RecentCorrelations>,
        core: Weak<BusCore<P>>,
    ) -> Self {
        Self {
            id,
            topics,
            all_events,
            rx,
            dedup,
            core,
            detached: false,
        }
    }

    /// This subscription's id.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Topics this subscription is registered on (empty for all-events).
    #[inline]
    pub fn event_types(&self) -> &[Arc<str>] {
        &self.topics
    }

    /// True if this handle came from `subscribe_all`.
    #[inline]
    pub fn is_all_events(&self) -> bool {
        self.all_events
    }

    /// Receives the next envelope, or `None` once the subscription is
    /// detached (closed, or the bus was cleared or dropped) and the queue
    /// has drained.
    pub async fn recv(&mut self) -> Option<Arc<EventEnvelope<P>>> {
        poll_fn(|cx| self.poll_recv_admitted(cx)).await
    }

    /// Non-blocking receive: `None` when the queue is currently empty or
    /// the subscription is detached.
    pub fn try_recv(&mut self) -> Option<Arc<EventEnvelope<P>>> {
        loop {
            match self.rx.try_recv() {
                Ok(env) => {
                    if self.admit(&env) {
                        return Some(env);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    /// Converts this handle into a `tokio_stream::Stream` of envelopes.
    pub fn into_stream(self) -> EventStream<P> {
        EventStream::new(self)
    }

    /// Removes the registration. Equivalent to dropping the handle; exists
    /// so disposal reads as an action at call sites.
    pub fn close(mut self) {
        self.detach();
    }

    pub(crate) fn poll_recv_admitted(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Arc<EventEnvelope<P>>>> {
        loop {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(env)) => {
                    if self.admit(&env) {
                        return Poll::Ready(Some(env));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn admit(&mut self, env: &Arc<EventEnvelope<P>>) -> bool {
        match &mut self.dedup {
            None => true,
            Some(window) => window.admit(env.correlation_id),
        }
    }

    fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        if let Some(core) = self.core.upgrade() {
            core.detach(self.id);
        }
    }
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<P> fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .field("all_events", &self.all_events)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(
        dedup: Option<RecentCorrelations>,
    ) -> (
        mpsc::UnboundedSender<Arc<EventEnvelope<u32>>>,
        Subscription<u32>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::new(
            SubscriptionId(7),
            vec![Arc::from("t")],
            false,
            rx,
            dedup,
            Weak::new(),
        );
        (tx, sub)
    }

    #[tokio::test]
    async fn drains_queue_then_ends() {
        let (tx, mut sub) = handle(None);
        tx.send(Arc::new(EventEnvelope::new("t", 1))).ok();
        tx.send(Arc::new(EventEnvelope::new("t", 2))).ok();
        drop(tx);
        assert_eq!(sub.recv().await.map(|e| e.payload), Some(1));
        assert_eq!(sub.recv().await.map(|e| e.payload), Some(2));
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn try_recv_is_non_blocking() {
        let (tx, mut sub) = handle(None);
        assert!(sub.try_recv().is_none());
        tx.send(Arc::new(EventEnvelope::new("t", 5))).ok();
        assert_eq!(sub.try_recv().map(|e| e.payload), Some(5));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn dedup_window_drops_repeated_correlation() {
        let (tx, mut sub) = handle(Some(RecentCorrelations::new(16)));
        let env = Arc::new(EventEnvelope::new("t", 1));
        tx.send(Arc::clone(&env)).ok();
        tx.send(env).ok();
        tx.send(Arc::new(EventEnvelope::new("t", 2))).ok();
        drop(tx);
        assert_eq!(sub.recv().await.map(|e| e.payload), Some(1));
        assert_eq!(sub.recv().await.map(|e| e.payload), Some(2));
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn handle_metadata_is_exposed() {
        let (_tx, sub) = handle(None);
        assert_eq!(sub.id(), SubscriptionId(7));
        assert_eq!(sub.event_types().len(), 1);
        assert!(!sub.is_all_events());
    }
}
