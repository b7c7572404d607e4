//! Update rate control for frame display streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate at which a display consumer wants frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every frame the receiver emits
    Native,

    /// Throttled to maximum Hz
    /// If the requested rate meets or exceeds the receiver's poll rate, Native is used
    Max(u32),
}

impl UpdateRate {
    /// Normalize rate against the receiver's poll frequency
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if hz as f64 >= source_hz => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faster_than_source_is_native() {
        assert_eq!(UpdateRate::Max(60).normalize(10.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(10).normalize(10.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(0).normalize(10.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(2).normalize(10.0), UpdateRate::Max(2));
    }

    #[test]
    fn throttle_interval_matches_rate() {
        assert_eq!(UpdateRate::Native.throttle_interval(10.0), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(10.0), Some(Duration::from_millis(250)));
    }
}
