// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide monotonic clock.
//!
//! All frame timestamps live in this clock's domain: microseconds since the
//! first time the clock was touched in this process.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub struct MediaClock;

impl MediaClock {
    fn epoch() -> Instant {
        static START: OnceLock<Instant> = OnceLock::new();
        *START.get_or_init(Instant::now)
    }

    #[inline]
    pub fn now() -> Duration {
        Self::epoch().elapsed()
    }

    #[inline]
    pub fn now_us() -> i64 {
        Self::now().as_micros() as i64
    }

    /// The [`Instant`] at which [`MediaClock::now_us`] reads `timestamp_us`.
    ///
    /// Negative timestamps clamp to the clock epoch. `None` if the instant
    /// lies beyond what the platform can represent.
    pub fn instant_at(timestamp_us: i64) -> Option<Instant> {
        Self::epoch().checked_add(Duration::from_micros(timestamp_us.max(0) as u64))
    }
}
