// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Counters for the current (or most recently stopped) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeaterStats {
    /// Frames returned from `read`, fresh and repeated.
    pub frames_delivered: u64,
    pub fresh_frames: u64,
    pub repeated_frames: u64,
    /// Pull requests handed to the background worker.
    pub pulls_issued: u64,
    /// Pull results thrown away because the session had ended.
    pub pulls_discarded: u64,
    /// Times the session went dormant after an idle upstream.
    pub suspensions: u64,
}

impl RepeaterStats {
    /// Share of delivered frames that were repeats, in `[0, 1]`.
    pub fn repeat_ratio(&self) -> f64 {
        if self.frames_delivered == 0 {
            return 0.0;
        }
        self.repeated_frames as f64 / self.frames_delivered as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_ratio() {
        assert_eq!(RepeaterStats::default().repeat_ratio(), 0.0);

        let stats = RepeaterStats {
            frames_delivered: 4,
            fresh_frames: 1,
            repeated_frames: 3,
            ..Default::default()
        };
        assert_eq!(stats.repeat_ratio(), 0.75);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = RepeaterStats {
            frames_delivered: 2,
            fresh_frames: 2,
            pulls_issued: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["frames_delivered"], 2);
        assert_eq!(json["pulls_issued"], 3);
    }
}
