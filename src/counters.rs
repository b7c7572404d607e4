//! Delivery counters shared between the receive loop and observers

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters mutated only by the receive loop.
///
/// Each field is an independent atomic; observers may read while the loop
/// writes. A snapshot is not a consistent cut across fields, only each value is
/// exact at the time it was read.
#[derive(Debug, Default)]
pub struct Counters {
    frames_received: AtomicU64,
    frames_emitted: AtomicU64,
    decode_errors: AtomicU64,
    polls: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages taken off the channel, decodable or not
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Non-empty emissions handed to the sink
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Completed loop iterations
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            frames_received: self.frames_received(),
            frames_emitted: self.frames_emitted(),
            decode_errors: self.decode_errors(),
            polls: self.polls(),
        }
    }

    pub(crate) fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_emitted(&self) {
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub frames_received: u64,
    pub frames_emitted: u64,
    pub decode_errors: u64,
    pub polls: u64,
}

impl CounterSnapshot {
    /// Counts accumulated after `baseline` was taken.
    ///
    /// This is how a display "resets" its counters without the receiver ever
    /// going backwards.
    pub fn since(&self, baseline: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            frames_received: self.frames_received.saturating_sub(baseline.frames_received),
            frames_emitted: self.frames_emitted.saturating_sub(baseline.frames_emitted),
            decode_errors: self.decode_errors.saturating_sub(baseline.decode_errors),
            polls: self.polls.saturating_sub(baseline.polls),
        }
    }

    /// Messages counted as received but never shown
    pub fn frames_dropped(&self) -> u64 {
        self.frames_received.saturating_sub(self.frames_emitted)
    }
}

impl std::fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} emitted={} decode_errors={} polls={}",
            self.frames_received, self.frames_emitted, self.decode_errors, self.polls
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn since_gives_deltas() {
        let counters = Counters::new();
        counters.record_received();
        counters.record_emitted();
        let baseline = counters.snapshot();

        counters.record_received();
        counters.record_received();
        counters.record_decode_error();
        counters.record_poll();

        let delta = counters.snapshot().since(&baseline);
        assert_eq!(
            delta,
            CounterSnapshot { frames_received: 2, frames_emitted: 0, decode_errors: 1, polls: 1 }
        );
        assert_eq!(delta.frames_dropped(), 2);
        assert_eq!(counters.frames_received(), 3);
    }

    #[test]
    fn concurrent_reads_see_monotonic_values() {
        let counters = Arc::new(Counters::new());
        let writer = {
            let counters = counters.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    counters.record_received();
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let now = counters.frames_received();
            assert!(now >= last);
            last = now;
        }
        writer.join().unwrap();
        assert_eq!(counters.frames_received(), 10_000);
    }
}
