// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame cadence clock.
//!
//! Maps a frame index to its presentation deadline under a fixed rate. Each
//! deadline is computed from the cumulative product `index * 1e6 / rate` and
//! rounded once, so rounding error never accumulates: frame `k * rate` lands
//! on exactly `k` seconds for integral rates, and on the nearest microsecond
//! otherwise.

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Presentation deadline (µs) of `frame_index` for a session anchored at
/// `start_time_us` and running at `rate_hz`.
#[inline]
pub fn frame_deadline_us(start_time_us: i64, frame_index: u64, rate_hz: f64) -> i64 {
    let offset_us = (frame_index as f64 * MICROS_PER_SECOND / rate_hz).round();
    // Absurdly slow rates saturate at the end of time rather than overflow.
    start_time_us.saturating_add(offset_us as i64)
}

/// A session's cadence: start anchor plus fixed rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCadence {
    start_time_us: i64,
    rate_hz: f64,
}

impl FrameCadence {
    pub fn new(start_time_us: i64, rate_hz: f64) -> Self {
        Self {
            start_time_us,
            rate_hz,
        }
    }

    #[inline]
    pub fn deadline_us(&self, frame_index: u64) -> i64 {
        frame_deadline_us(self.start_time_us, frame_index, self.rate_hz)
    }

    pub fn start_time_us(&self) -> i64 {
        self.start_time_us
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    /// Nominal frame period in microseconds (not rounded).
    pub fn period_us(&self) -> f64 {
        MICROS_PER_SECOND / self.rate_hz
    }
}
