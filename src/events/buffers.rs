//! Bounded envelope storage: per-topic replay buffers and the global history.
//!
//! Both structures are rings over shared envelopes. [`EventBuffer`] backs
//! replay for late subscribers and only ever grows its retention ceiling;
//! [`HistoryLog`] is one fixed-capacity ring across all topics, sampled by
//! debug snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::events::EventEnvelope;
use crate::HISTORY_CAPACITY;

/// Per-topic ring of the most recent envelopes, capped at `max_size`.
///
/// The ceiling starts at whatever the creating site requested (1 when the
/// buffer is created by a publish) and is raised, never lowered, when a
/// replay subscription asks for a deeper prefix.
pub(crate) struct EventBuffer<P> {
    entries: VecDeque<Arc<EventEnvelope<P>>>,
    max_size: usize,
}

impl<P> EventBuffer<P> {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Appends an envelope, dropping the oldest once the ceiling is reached.
    pub(crate) fn push(&mut self, env: Arc<EventEnvelope<P>>) {
        if self.entries.len() == self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(env);
    }

    /// Raises the retention ceiling to at least `max_size`.
    pub(crate) fn raise_ceiling(&mut self, max_size: usize) {
        if max_size > self.max_size {
            self.max_size = max_size;
        }
    }

    /// Most recently pushed envelope.
    pub(crate) fn last(&self) -> Option<&Arc<EventEnvelope<P>>> {
        self.entries.back()
    }

    /// Up to `n` most recent envelopes, oldest first.
    pub(crate) fn recent(&self, n: usize) -> impl Iterator<Item = &Arc<EventEnvelope<P>>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Global ring of the last [`HISTORY_CAPACITY`] envelopes across all topics.
pub(crate) struct HistoryLog<P> {
    entries: VecDeque<Arc<EventEnvelope<P>>>,
}

impl<P> HistoryLog<P> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn record(&mut self, env: Arc<EventEnvelope<P>>) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(env);
    }

    /// Up to `n` most recent envelopes, oldest first.
    pub(crate) fn tail(&self, n: usize) -> impl Iterator<Item = &Arc<EventEnvelope<P>>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
