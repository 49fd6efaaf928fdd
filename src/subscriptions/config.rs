//! # Per-subscription configuration.
//!
//! Provides [`SubscribeConfig`], the options accepted by every subscribe
//! operation, and [`FilterFn`], the predicate type applied before rate
//! shaping.
//!
//! Config is consumed at subscribe time: the bus materializes one delivery
//! pipeline per registered topic from it, so later mutation of a config value
//! never affects an existing subscription.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::events::EventEnvelope;
use crate::DEFAULT_REPLAY_BUFFER;

/// Predicate deciding whether an envelope is delivered to one subscription.
///
/// Runs on the publishing thread, before debounce/throttle. Must not call
/// back into the bus.
pub type FilterFn<P> = Arc<dyn Fn(&EventEnvelope<P>) -> bool + Send + Sync>;

/// Options for a single subscription.
///
/// Defines:
/// - **Replay**: whether the subscription starts with a prefix of buffered
///   envelopes, and how deep that prefix may be
/// - **Filtering**: a predicate dropping envelopes for this subscription only
/// - **Rate shaping**: trailing debounce and/or leading-edge throttle windows
///
/// ## Field semantics
/// - `replay`: deliver up to `buffer_size` most-recent envelopes on subscribe
/// - `buffer_size`: replay prefix depth; also raises the topic buffer's
///   retention ceiling (min 1; `0` is rejected at subscribe time)
/// - `filter`: `None` = deliver everything
/// - `debounce`: `None` = off; `Some(d)` = deliver only the last envelope of
///   a burst, after `d` of silence
/// - `throttle`: `None` = off; `Some(d)` = deliver the first envelope, then
///   drop arrivals for `d`
///
/// Stage order is fixed: replay feeds filter feeds debounce feeds throttle.
pub struct SubscribeConfig<P> {
    /// Deliver a prefix of previously published envelopes on subscribe.
    pub replay: bool,

    /// Replay prefix depth (and minimum buffer retention for the topic).
    pub buffer_size: usize,

    /// Keep only envelopes matching the predicate.
    pub filter: Option<FilterFn<P>>,

    /// Trailing debounce window.
    pub debounce: Option<Duration>,

    /// Leading-edge throttle window.
    pub throttle: Option<Duration>,
}

impl<P> SubscribeConfig<P> {
    /// Creates a configuration with all defaults (see [`Default`]).
    pub fn new() -> Self {
        Self {
            replay: false,
            buffer_size: DEFAULT_REPLAY_BUFFER,
            filter: None,
            debounce: None,
            throttle: None,
        }
    }

    /// Enables replay of up to `buffer_size` most-recent envelopes.
    #[inline]
    pub fn with_replay(mut self, buffer_size: usize) -> Self {
        self.replay = true;
        self.buffer_size = buffer_size;
        self
    }

    /// Attaches a delivery predicate.
    #[inline]
    pub fn with_filter(
        mut self,
        filter: impl Fn(&EventEnvelope<P>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Enables trailing debounce with the given quiet window.
    #[inline]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    /// Enables leading-edge throttle with the given window.
    #[inline]
    pub fn with_throttle(mut self, window: Duration) -> Self {
        self.throttle = Some(window);
        self
    }

    /// Returns the replay prefix depth as an `Option`.
    ///
    /// - `None` → replay disabled
    /// - `Some(n)` → deliver up to `n` buffered envelopes on subscribe
    #[inline]
    pub fn replay_depth(&self) -> Option<usize> {
        if self.replay {
            Some(self.buffer_size)
        } else {
            None
        }
    }

    /// Rejects shapes the bus cannot honor.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }
}

impl<P> Default for SubscribeConfig<P> {
    /// Default configuration:
    ///
    /// - `replay = false` (live events only)
    /// - `buffer_size = 1` ([`DEFAULT_REPLAY_BUFFER`])
    /// - `filter = None` (deliver everything)
    /// - `debounce = None` (off)
    /// - `throttle = None` (off)
    fn default() -> Self {
        Self::new()
    }
}

// Manual impls: derives would demand `P: Clone`/`P: Debug` even though `P`
// only appears behind the filter's `Arc`.
impl<P> Clone for SubscribeConfig<P> {
    fn clone(&self) -> Self {
        Self {
            replay: self.replay,
            buffer_size: self.buffer_size,
            filter: self.filter.clone(),
            debounce: self.debounce,
            throttle: self.throttle,
        }
    }
}

impl<P> fmt::Debug for SubscribeConfig<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeConfig")
            .field("replay", &self.replay)
            .field("buffer_size", &self.buffer_size)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("debounce", &self.debounce)
            .field("throttle", &self.throttle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_live_only() {
        let cfg: SubscribeConfig<u32> = SubscribeConfig::default();
        assert!(!cfg.replay);
        assert_eq!(cfg.buffer_size, DEFAULT_REPLAY_BUFFER);
        assert!(cfg.filter.is_none());
        assert!(cfg.debounce.is_none());
        assert!(cfg.throttle.is_none());
        assert_eq!(cfg.replay_depth(), None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builders_chain() {
        let cfg: SubscribeConfig<u32> = SubscribeConfig::new()
            .with_replay(3)
            .with_filter(|env| env.payload > 10)
            .with_debounce(Duration::from_millis(250))
            .with_throttle(Duration::from_millis(100));
        assert_eq!(cfg.replay_depth(), Some(3));
        assert!(cfg.filter.is_some());
        assert_eq!(cfg.debounce, Some(Duration::from_millis(250)));
        assert_eq!(cfg.throttle, Some(Duration::from_millis(100)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_buffer_size_is_rejected() {
        let cfg: SubscribeConfig<u32> = SubscribeConfig::new().with_replay(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBufferSize));
    }

    #[test]
    fn clone_shares_the_filter() {
        let cfg: SubscribeConfig<u32> = SubscribeConfig::new().with_filter(|_| true);
        let copy = cfg.clone();
        let (a, b) = (cfg.filter.as_ref(), copy.filter.as_ref());
        assert!(a.is_some() && b.is_some());
        if let (Some(a), Some(b)) = (a, b) {
            assert!(Arc::ptr_eq(a, b));
        }
    }
}
