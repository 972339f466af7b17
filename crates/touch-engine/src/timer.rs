//! Deadline queue for widget timers.
//!
//! The engine never sleeps itself: the host loop asks for
//! [`TimerQueue::next_deadline`] and calls back into the engine once it has
//! passed.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::WidgetId;

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: BTreeMap<(Instant, TimerId), WidgetId>,
    deadlines: HashMap<TimerId, Instant>,
    next_id: u64,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, widget: WidgetId, deadline: Instant) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.queue.insert((deadline, id), widget);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending timer. Returns `false` if it already fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancel every timer owned by `widget`.
    pub fn cancel_widget(&mut self, widget: WidgetId) -> usize {
        let ids: Vec<TimerId> = self
            .queue
            .iter()
            .filter(|(_, owner)| **owner == widget)
            .map(|(&(_, id), _)| id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        ids.len()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Remove and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, WidgetId, Instant)> {
        let &(deadline, id) = self.queue.keys().next()?;
        if deadline > now {
            return None;
        }
        let widget = self.queue.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some((id, widget, deadline))
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
