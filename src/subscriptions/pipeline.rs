//! # DeliveryPipeline: per-subscription stage chain on the publish path.
//!
//! Every registered (subscription, topic) pair owns one [`DeliveryPipeline`].
//! The bus offers each envelope to every pipeline of the matching channel;
//! the pipeline applies its stages and, if the envelope survives, pushes it
//! onto the subscription's queue.
//!
//! ## Stage order (fixed)
//! filter → debounce → throttle → queue
//!
//! ## What it guarantees
//! - `offer()` never blocks and never panics (filter panics are caught).
//! - Filtering and throttling are decided synchronously on the publishing
//!   thread; only debounce defers delivery, through one timer task.
//! - A re-armed debounce replaces the pending envelope; only the last
//!   envelope of a burst is flushed, after the quiet window.
//! - A cancelled or dropped pipeline discards its pending envelope instead
//!   of flushing it.
//!
//! ## What it does **not** guarantee
//! - No delivery once the subscription's receiver is gone (sends onto a
//!   closed queue are silently dropped).
//! - Debounce needs a Tokio runtime on the publishing thread; unshaped
//!   pipelines work from any thread.
//!
//! ## Diagram
//! ```text
//!    offer(Arc<env>)
//!        │
//!        ├─ filter ──(false/panic)──► drop
//!        │
//!        ├─ debounce ──► pending slot ──(timer, quiet window)──┐
//!        │                                                     │
//!        └─ throttle ──(window open?)──► queue ◄───────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::EventEnvelope;

use super::{FilterFn, SubscribeConfig, SubscriptionId};

/// Mutable rate-shaping state, shared with the debounce timer task.
struct ShapeState<P> {
    /// Latest envelope waiting out a debounce window.
    pending: Option<Arc<EventEnvelope<P>>>,
    /// Bumped on every re-arm; a timer only flushes its own generation.
    generation: u64,
    /// Handle of the armed debounce timer, if any.
    timer: Option<JoinHandle<()>>,
    /// When the throttle window last opened.
    window_open: Option<Instant>,
}

impl<P> ShapeState<P> {
    fn new() -> Self {
        Self {
            pending: None,
            generation: 0,
            timer: None,
            window_open: None,
        }
    }
}

/// One subscription's delivery stages over one channel.
pub(crate) struct DeliveryPipeline<P> {
    id: SubscriptionId,
    topic: Arc<str>,
    filter: Option<FilterFn<P>>,
    debounce: Option<Duration>,
    throttle: Option<Duration>,
    state: Arc<Mutex<ShapeState<P>>>,
    tx: mpsc::UnboundedSender<Arc<EventEnvelope<P>>>,
    token: CancellationToken,
    debug: Arc<AtomicBool>,
}

impl<P: Send + Sync + 'static> DeliveryPipeline<P> {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: Arc<str>,
        config: &SubscribeConfig<P>,
        tx: mpsc::UnboundedSender<Arc<EventEnvelope<P>>>,
        token: CancellationToken,
        debug: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            topic,
            filter: config.filter.clone(),
            debounce: config.debounce,
            throttle: config.throttle,
            state: Arc::new(Mutex::new(ShapeState::new())),
            tx,
            token,
            debug,
        }
    }

    /// Runs one envelope through the stages. Never blocks, never panics.
    pub(crate) fn offer(&self, env: Arc<EventEnvelope<P>>) {
        if let Some(filter) = &self.filter {
            let keep =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| filter(env.as_ref())));
            match keep {
                Ok(true) => {}
                Ok(false) => {
                    if self.debug_enabled() {
                        debug!(
                            subscription = %self.id,
                            topic = %self.topic,
                            correlation_id = %env.correlation_id,
                            "filter dropped envelope"
                        );
                    }
                    return;
                }
                Err(_) => {
                    warn!(
                        subscription = %self.id,
                        topic = %self.topic,
                        correlation_id = %env.correlation_id,
                        "filter panicked; envelope dropped for this subscription"
                    );
                    return;
                }
            }
        }

        if let Some(window) = self.debounce {
            self.arm_debounce(env, window);
            return;
        }

        if self.throttle.is_some() {
            let Ok(mut shape) = self.state.lock() else {
                return;
            };
            if throttle_admits(&mut shape, self.throttle) {
                drop(shape);
                self.deliver(env);
            } else if self.debug_enabled() {
                debug!(
                    subscription = %self.id,
                    topic = %self.topic,
                    correlation_id = %env.correlation_id,
                    "throttle dropped envelope"
                );
            }
            return;
        }

        self.deliver(env);
    }

    /// Parks the envelope and (re-)arms the flush timer.
    fn arm_debounce(&self, env: Arc<EventEnvelope<P>>, window: Duration) {
        let Ok(mut shape) = self.state.lock() else {
            return;
        };
        shape.pending = Some(env);
        shape.generation = shape.generation.wrapping_add(1);
        let generation = shape.generation;
        if let Some(timer) = shape.timer.take() {
            timer.abort();
        }
        if self.debug_enabled() {
            debug!(
                subscription = %self.id,
                topic = %self.topic,
                window_ms = window.as_millis() as u64,
                "debounce armed"
            );
        }

        let state = Arc::clone(&self.state);
        let tx = self.tx.clone();
        let token = self.token.clone();
        let throttle = self.throttle;
        let debug = Arc::clone(&self.debug);
        let id = self.id;
        let topic = Arc::clone(&self.topic);
        shape.timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    let Ok(mut shape) = state.lock() else {
                        return;
                    };
                    if shape.generation != generation {
                        return;
                    }
                    let Some(env) = shape.pending.take() else {
                        return;
                    };
                    if throttle_admits(&mut shape, throttle) {
                        drop(shape);
                        if debug.load(AtomicOrdering::Relaxed) {
                            debug!(
                                subscription = %id,
                                topic = %topic,
                                correlation_id = %env.correlation_id,
                                "debounce flushed"
                            );
                        }
                        let _ = tx.send(env);
                    } else if debug.load(AtomicOrdering::Relaxed) {
                        debug!(
                            subscription = %id,
                            topic = %topic,
                            correlation_id = %env.correlation_id,
                            "throttle dropped debounced envelope"
                        );
                    }
                }
            }
        }));
    }

    /// Final stage: push onto the subscription's queue.
    fn deliver(&self, env: Arc<EventEnvelope<P>>) {
        if self.debug_enabled() {
            debug!(
                subscription = %self.id,
                topic = %self.topic,
                correlation_id = %env.correlation_id,
                "envelope delivered"
            );
        }
        let _ = self.tx.send(env);
    }

    #[inline]
    fn debug_enabled(&self) -> bool {
        self.debug.load(AtomicOrdering::Relaxed)
    }
}

impl<P> Drop for DeliveryPipeline<P> {
    fn drop(&mut self) {
        if let Ok(mut shape) = self.state.lock() {
            if let Some(timer) = shape.timer.take() {
                timer.abort();
            }
            shape.pending = None;
        }
    }
}

/// Leading-edge gate: admits when no window is open, or the open window has
/// elapsed; admitting reopens the window.
fn throttle_admits<P>(shape: &mut ShapeState<P>, window: Option<Duration>) -> bool {
    let Some(window) = window else {
        return true;
    };
    let now = Instant::now();
    match shape.window_open {
        Some(opened) if now.saturating_duration_since(opened) < window => false,
        _ => {
            shape.window_open = Some(now);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(
        config: SubscribeConfig<u32>,
    ) -> (
        DeliveryPipeline<u32>,
        mpsc::UnboundedReceiver<Arc<EventEnvelope<u32>>>,
        CancellationToken,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let pipe = DeliveryPipeline::new(
            SubscriptionId(1),
            Arc::from("t"),
            &config,
            tx,
            token.clone(),
            Arc::new(AtomicBool::new(false)),
        );
        (pipe, rx, token)
    }

    fn env(n: u32) -> Arc<EventEnvelope<u32>> {
        Arc::new(EventEnvelope::new("t", n))
    }

    #[tokio::test]
    async fn plain_offer_preserves_order() {
        let (pipe, mut rx, _token) = pipeline(SubscribeConfig::new());
        for n in 1..=3 {
            pipe.offer(env(n));
        }
        for n in 1..=3 {
            assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(n));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn filter_drops_for_this_pipeline_only() {
        let (pipe, mut rx, _token) =
            pipeline(SubscribeConfig::new().with_filter(|e| e.payload % 2 == 0));
        for n in [1, 2, 3, 4] {
            pipe.offer(env(n));
        }
        assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(2));
        assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(4));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn panicking_filter_drops_only_that_envelope() {
        let (pipe, mut rx, _token) = pipeline(SubscribeConfig::new().with_filter(|e| {
            if e.payload == 13 {
                panic!("unlucky");
            }
            true
        }));
        pipe.offer(env(13));
        pipe.offer(env(7));
        assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(7));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_flushes_last_of_burst_after_quiet_window() {
        let (pipe, mut rx, _token) =
            pipeline(SubscribeConfig::new().with_debounce(Duration::from_millis(100)));
        for n in 1..=4 {
            pipe.offer(env(n));
            if n < 4 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        assert!(rx.try_recv().is_err());
        let flushed = rx.recv().await;
        assert_eq!(flushed.map(|e| e.payload), Some(4));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_discards_pending_debounce() {
        let (pipe, mut rx, token) =
            pipeline(SubscribeConfig::new().with_debounce(Duration::from_millis(50)));
        pipe.offer(env(9));
        token.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_pipeline_discards_pending_debounce() {
        let (pipe, mut rx, _token) =
            pipeline(SubscribeConfig::new().with_debounce(Duration::from_millis(50)));
        pipe.offer(env(9));
        drop(pipe);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_admits_leading_edge_and_reopens() {
        let (pipe, mut rx, _token) =
            pipeline(SubscribeConfig::new().with_throttle(Duration::from_millis(100)));
        pipe.offer(env(1));
        pipe.offer(env(2));
        pipe.offer(env(3));
        assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(1));
        assert!(rx.try_recv().is_err());

        // exactly at the window boundary counts as closed-and-reopened
        tokio::time::sleep(Duration::from_millis(100)).await;
        pipe.offer(env(4));
        assert_eq!(rx.try_recv().ok().map(|e| e.payload), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_feeds_throttle() {
        let (pipe, mut rx, _token) = pipeline(
            SubscribeConfig::new()
                .with_debounce(Duration::from_millis(10))
                .with_throttle(Duration::from_millis(1000)),
        );
        pipe.offer(env(1));
        let first = rx.recv().await;
        assert_eq!(first.map(|e| e.payload), Some(1));

        // second flush lands inside the throttle window and is dropped
        pipe.offer(env(2));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }
}
