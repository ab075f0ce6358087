//! Bounded in-memory event ring: an operator-visible diagnostic feed, not an
//! audit log. Nothing here is persisted to disk; on restart the ring starts
//! empty and the `Recovery` pass emits a fresh summary event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A single operator-visible event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

impl Event {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            message: message.into(),
        }
    }
}

/// A fixed-capacity ring of the most recent events. Pushing past capacity
/// evicts the oldest entry. Shared across the scheduler, worker pool, and
/// callback receiver via an `Arc<EventLog>`.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<Event>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append an event, evicting the oldest if the ring is at capacity.
    pub fn push(&self, source: impl Into<String>, message: impl Into<String>) {
        let event = Event::new(source, message);
        tracing::info!(source = %event.source, message = %event.message, "event");
        let mut events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot the ring, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).iter().cloned().collect()
    }

    /// Snapshot only the most recent `n` events, oldest first.
    pub fn tail(&self, n: usize) -> Vec<Event> {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let log = EventLog::new(2);
        log.push("a", "one");
        log.push("a", "two");
        log.push("a", "three");
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "two");
        assert_eq!(snapshot[1].message, "three");
    }

    #[test]
    fn tail_returns_most_recent_n() {
        let log = EventLog::new(200);
        for i in 0..5 {
            log.push("a", format!("event-{i}"));
        }
        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].message, "event-3");
        assert_eq!(tail[1].message, "event-4");
    }
}
