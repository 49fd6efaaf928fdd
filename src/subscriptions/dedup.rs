//! Bounded recent-correlation-id set used by merged subscriptions.
//!
//! A merged subscription owns one pipeline per registered topic; if the same
//! envelope ever reaches the shared queue twice (e.g. the same topic listed
//! twice), the receiver drops the duplicate here. Bounded by count, not time:
//! the window only needs to span deliveries that can still be in flight.

use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// FIFO-evicting set of the last `capacity` correlation ids seen.
pub(crate) struct RecentCorrelations {
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl RecentCorrelations {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Records `id`; returns `false` if it was already in the window.
    pub(crate) fn admit(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_fresh_rejects_repeat() {
        let mut window = RecentCorrelations::new(8);
        let id = Uuid::new_v4();
        assert!(window.admit(id));
        assert!(!window.admit(id));
        assert!(window.admit(Uuid::new_v4()));
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut window = RecentCorrelations::new(2);
        let first = Uuid::new_v4();
        assert!(window.admit(first));
        assert!(window.admit(Uuid::new_v4()));
        assert!(window.admit(Uuid::new_v4()));
        assert_eq!(window.len(), 2);
        // first fell out of the window, so it reads as fresh again
        assert!(window.admit(first));
    }
}
