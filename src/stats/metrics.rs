//! Statistics for the routing layer

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared by the broker, producers and sessions
///
/// All counters are relaxed atomics; a [`StatsSnapshot`] is a best-effort
/// point-in-time copy, not a consistent cut.
#[derive(Debug)]
pub struct RouterStats {
    started_at: Instant,
    /// Messages accepted by an exchange
    messages_published: AtomicU64,
    /// Messages placed into at least one queue
    messages_routed: AtomicU64,
    /// Messages with no queue bound to their routing key
    messages_unroutable: AtomicU64,
    /// Messages discarded because a queue was full
    messages_overflowed: AtomicU64,
    /// Events handed to the delivery boundary
    events_delivered: AtomicU64,
    /// Producer tasks currently running
    active_producers: AtomicU64,
    /// Sessions currently streaming
    active_sessions: AtomicU64,
}

impl RouterStats {
    /// Create zeroed stats
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_published: AtomicU64::new(0),
            messages_routed: AtomicU64::new(0),
            messages_unroutable: AtomicU64::new(0),
            messages_overflowed: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            active_producers: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_routed(&self) {
        self.messages_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unroutable(&self) {
        self.messages_unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.messages_overflowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn producer_started(&self) {
        self.active_producers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn producer_exited(&self) {
        self.active_producers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn session_started(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    /// Number of producer tasks currently running
    pub fn active_producers(&self) -> u64 {
        self.active_producers.load(Ordering::Relaxed)
    }

    /// Number of events handed to the delivery boundary so far
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            messages_unroutable: self.messages_unroutable.load(Ordering::Relaxed),
            messages_overflowed: self.messages_overflowed.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            active_producers: self.active_producers.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RouterStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RouterStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub messages_published: u64,
    pub messages_routed: u64,
    pub messages_unroutable: u64,
    pub messages_overflowed: u64,
    pub events_delivered: u64,
    pub active_producers: u64,
    pub active_sessions: u64,
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Fraction of published messages that reached a queue
    pub fn routed_ratio(&self) -> f64 {
        if self.messages_published > 0 {
            self.messages_routed as f64 / self.messages_published as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let stats = RouterStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.messages_published, 0);
        assert_eq!(snap.messages_routed, 0);
        assert_eq!(snap.messages_unroutable, 0);
        assert_eq!(snap.messages_overflowed, 0);
        assert_eq!(snap.events_delivered, 0);
        assert_eq!(snap.active_producers, 0);
        assert_eq!(snap.active_sessions, 0);
    }

    #[test]
    fn test_gauges_go_up_and_down() {
        let stats = RouterStats::new();
        stats.producer_started();
        stats.producer_started();
        stats.producer_exited();
        stats.session_started();

        assert_eq!(stats.active_producers(), 1);
        assert_eq!(stats.snapshot().active_sessions, 1);
    }

    #[test]
    fn test_routed_ratio() {
        let stats = RouterStats::new();
        assert_eq!(stats.snapshot().routed_ratio(), 0.0);

        for _ in 0..4 {
            stats.record_published();
        }
        stats.record_routed();
        stats.record_unroutable();

        let snap = stats.snapshot();
        assert_eq!(snap.routed_ratio(), 0.25);
        assert_eq!(snap.messages_unroutable, 1);
    }
}
