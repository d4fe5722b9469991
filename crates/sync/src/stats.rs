use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Handoff counters for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Ticks moved into staging by the producer.
    pub ticks_produced: u64,
    /// Staged ticks replaced by a newer one before the reader took them.
    pub ticks_dropped: u64,
    /// Staged ticks promoted to the read role.
    pub swaps_published: u64,
    /// Promotions refused by the reader's predicate.
    pub swaps_deferred: u64,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "produced={} published={} dropped={} deferred={}",
            self.ticks_produced, self.swaps_published, self.ticks_dropped, self.swaps_deferred
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    ticks_produced: AtomicU64,
    ticks_dropped: AtomicU64,
    swaps_published: AtomicU64,
    swaps_deferred: AtomicU64,
}

impl Counters {
    pub(crate) fn produced(&self, dropped: bool) {
        self.ticks_produced.fetch_add(1, Ordering::Relaxed);
        if dropped {
            self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn published(&self) {
        self.swaps_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deferred(&self) {
        self.swaps_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        SyncStats {
            ticks_produced: self.ticks_produced.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            swaps_published: self.swaps_published.load(Ordering::Relaxed),
            swaps_deferred: self.swaps_deferred.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-capacity window of recent frame durations.
#[derive(Debug)]
pub struct FrameTimer {
    samples: Vec<Duration>,
    capacity: usize,
    next: usize,
}

impl FrameTimer {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame timer capacity must be positive");
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(dt);
        } else {
            self.samples[self.next] = dt;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Nearest-rank percentile, `p` in `0.0..=100.0`.
    pub fn percentile(&self, p: f64) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let rank = ((p.clamp(0.0, 100.0) / 100.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_snapshot() {
        let c = Counters::default();
        c.produced(false);
        c.produced(true);
        c.published();
        c.deferred();
        c.deferred();
        let s = c.snapshot();
        assert_eq!(
            s,
            SyncStats {
                ticks_produced: 2,
                ticks_dropped: 1,
                swaps_published: 1,
                swaps_deferred: 2,
            }
        );
        assert_eq!(s.to_string(), "produced=2 published=1 dropped=1 deferred=2");
    }

    #[test]
    fn frame_timer_tracks_history() {
        let mut timer = FrameTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
    }

    #[test]
    fn frame_timer_overwrites_oldest() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
        assert_eq!(timer.min(), Duration::from_millis(20));
    }

    #[test]
    fn percentile_nearest_rank() {
        let mut timer = FrameTimer::new(10);
        for ms in 1..=10 {
            timer.record(Duration::from_millis(ms));
        }
        assert_eq!(timer.percentile(50.0), Duration::from_millis(5));
        assert_eq!(timer.percentile(95.0), Duration::from_millis(10));
        assert_eq!(timer.percentile(0.0), Duration::from_millis(1));
        assert_eq!(FrameTimer::new(4).percentile(99.0), Duration::ZERO);
    }
}
