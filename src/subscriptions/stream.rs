//! Stream adapter over a [`Subscription`].
//!
//! Lets a subscription plug into `tokio_stream`/`StreamExt` combinators.
//! The stream ends (`None`) once the subscription is detached and its queue
//! has drained; dropping the stream disposes the underlying registration.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_stream::Stream;

use crate::events::EventEnvelope;

use super::Subscription;

/// `tokio_stream::Stream` view of a subscription's envelopes.
pub struct EventStream<P> {
    inner: Subscription<P>,
}

impl<P> EventStream<P> {
    pub(crate) fn new(inner: Subscription<P>) -> Self {
        Self { inner }
    }

    /// The underlying subscription handle.
    #[inline]
    pub fn as_subscription(&self) -> &Subscription<P> {
        &self.inner
    }
}

impl<P> Stream for EventStream<P> {
    type Item = Arc<EventEnvelope<P>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_recv_admitted(cx)
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::super::SubscriptionId;
    use super::*;
    use std::sync::Weak;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn stream_yields_then_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub: Subscription<u32> = Subscription::new(
            SubscriptionId(3),
            vec![Arc::from("t")],
            false,
            rx,
            None,
            Weak::new(),
        );
        tx.send(Arc::new(EventEnvelope::new("t", 10))).ok();
        tx.send(Arc::new(EventEnvelope::new("t", 20))).ok();
        drop(tx);

        let mut stream = sub.into_stream();
        assert_eq!(stream.next().await.map(|e| e.payload), Some(10));
        assert_eq!(stream.next().await.map(|e| e.payload), Some(20));
        assert!(stream.next().await.is_none());
    }
}
