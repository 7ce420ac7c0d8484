//! The queue of pending device events.
//!
//! Each device has at most one pending event, keyed by its select
//! code; the priority is the simulated time at which it falls due.
use std::time::Duration;

use tracing::{event, Level};

use base::collections::pq::KeyedEarliestFirstQueue;
use base::prelude::*;

#[derive(Debug, Default)]
pub struct EventQueue {
    items: KeyedEarliestFirstQueue<SelectCode, Duration>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue {
            items: KeyedEarliestFirstQueue::new(),
        }
    }

    /// Schedules an event for device `code` at time `when`,
    /// replacing any event it already had pending.  Returns the due
    /// time of the replaced event.
    pub fn schedule(&mut self, code: SelectCode, when: Duration) -> Option<Duration> {
        let previous = self.items.push(code, when);
        if let Some(prev) = previous {
            event!(
                Level::TRACE,
                "device {:02o} event moved from {:?} to {:?}",
                code,
                prev,
                when
            );
        }
        previous
    }

    pub fn cancel(&mut self, code: SelectCode) -> Option<Duration> {
        self.items.remove(&code)
    }

    /// Removes and returns the earliest event which is due at or
    /// before `now`.
    pub fn next_due(&mut self, now: Duration) -> Option<(SelectCode, Duration)> {
        self.items.pop_if_not_after(&now)
    }

    pub fn due_time(&self, code: SelectCode) -> Option<Duration> {
        self.items.get_priority(&code).copied()
    }

    pub fn next_event_time(&self) -> Option<Duration> {
        self.items.peek().map(|(_, when)| *when)
    }

    pub fn clear(&mut self) {
        while self.items.pop().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::u6;

    #[test]
    fn test_due_order() {
        let mut q = EventQueue::new();
        q.schedule(u6!(0o12), Duration::from_micros(30));
        q.schedule(u6!(0o13), Duration::from_micros(10));
        q.schedule(u6!(0o14), Duration::from_micros(20));
        assert_eq!(q.next_due(Duration::from_micros(5)), None);
        assert_eq!(
            q.next_due(Duration::from_micros(25)),
            Some((u6!(0o13), Duration::from_micros(10)))
        );
        assert_eq!(
            q.next_due(Duration::from_micros(25)),
            Some((u6!(0o14), Duration::from_micros(20)))
        );
        assert_eq!(q.next_due(Duration::from_micros(25)), None);
        assert_eq!(q.next_event_time(), Some(Duration::from_micros(30)));
    }

    #[test]
    fn test_reschedule_replaces() {
        let mut q = EventQueue::new();
        assert_eq!(q.schedule(u6!(0o12), Duration::from_micros(30)), None);
        assert_eq!(
            q.schedule(u6!(0o12), Duration::from_micros(40)),
            Some(Duration::from_micros(30))
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.due_time(u6!(0o12)), Some(Duration::from_micros(40)));
    }

    #[test]
    fn test_cancel() {
        let mut q = EventQueue::new();
        q.schedule(u6!(0o12), Duration::from_micros(30));
        q.schedule(u6!(0o13), Duration::from_micros(40));
        assert_eq!(q.cancel(u6!(0o12)), Some(Duration::from_micros(30)));
        assert_eq!(q.cancel(u6!(0o12)), None);
        assert_eq!(q.next_due(Duration::from_secs(1)).map(|(k, _)| k), Some(u6!(0o13)));
        assert!(q.is_empty());
    }
}
