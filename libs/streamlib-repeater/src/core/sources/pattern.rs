// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Synthetic pattern source.
//!
//! Produces frames of a fixed size at a nominal rate, with random per-frame
//! jitter and optional periodic stalls. Useful for exercising a repeater
//! without capture hardware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{
    MediaClock, MediaFrame, PullOptions, RepeaterError, Result, SourceParams, UpstreamSource,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSourceConfig {
    /// Production rate the source aims for.
    pub rate_hz: f64,
    /// Maximum absolute deviation from the nominal period, per frame.
    pub jitter_ms: u64,
    /// Stall every Nth frame (counted from 1).
    pub stall_every: Option<u64>,
    /// Extra delay added to a stalled frame.
    pub stall_ms: u64,
    /// Payload size in bytes.
    pub frame_size: usize,
    /// Report end-of-stream after this many frames.
    pub max_frames: Option<u64>,
    /// Seed for the jitter generator.
    pub seed: u64,
}

impl Default for PatternSourceConfig {
    fn default() -> Self {
        Self {
            rate_hz: 15.0,
            jitter_ms: 0,
            stall_every: None,
            stall_ms: 0,
            frame_size: 1024,
            max_frames: None,
            seed: 0x5eed,
        }
    }
}

impl PatternSourceConfig {
    /// Apply overrides passed through the repeater's `start`.
    fn apply(&mut self, params: &SourceParams) {
        if let Some(rate) = params.get_f64("rate_hz") {
            self.rate_hz = rate;
        }
        if let Some(jitter) = params.get_u64("jitter_ms") {
            self.jitter_ms = jitter;
        }
        if let Some(every) = params.get_u64("stall_every") {
            self.stall_every = Some(every);
        }
        if let Some(stall) = params.get_u64("stall_ms") {
            self.stall_ms = stall;
        }
        if let Some(size) = params.get_u64("frame_size") {
            self.frame_size = size as usize;
        }
        if let Some(max) = params.get_u64("max_frames") {
            self.max_frames = Some(max);
        }
        if let Some(seed) = params.get_u64("seed") {
            self.seed = seed;
        }
    }
}

pub struct PatternSource {
    config: PatternSourceConfig,
    rng: fastrand::Rng,
    produced: u64,
}

impl PatternSource {
    pub fn new(config: PatternSourceConfig) -> Self {
        let rng = fastrand::Rng::with_seed(config.seed);
        Self {
            config,
            rng,
            produced: 0,
        }
    }

    pub fn config(&self) -> &PatternSourceConfig {
        &self.config
    }

    /// How long the next pull takes, including jitter and stalls.
    fn next_delay(&mut self) -> Duration {
        let period_us = (1_000_000.0 / self.config.rate_hz).round() as i64;
        let jitter_us = (self.config.jitter_ms * 1_000) as i64;
        let offset_us = if jitter_us > 0 {
            self.rng.i64(-jitter_us..=jitter_us)
        } else {
            0
        };

        let mut delay_us = (period_us + offset_us).max(0) as u64;
        if let Some(every) = self.config.stall_every {
            if every > 0 && (self.produced + 1) % every == 0 {
                delay_us += self.config.stall_ms * 1_000;
            }
        }
        Duration::from_micros(delay_us)
    }

    fn payload(&self) -> Vec<u8> {
        let fill = (self.produced % 256) as u8;
        vec![fill; self.config.frame_size]
    }
}

impl UpstreamSource for PatternSource {
    fn start(&mut self, params: &SourceParams) -> Result<()> {
        self.config.apply(params);
        if !self.config.rate_hz.is_finite() || self.config.rate_hz <= 0.0 {
            return Err(RepeaterError::SourceStart(format!(
                "pattern rate_hz must be positive, got {}",
                self.config.rate_hz
            )));
        }
        self.rng = fastrand::Rng::with_seed(self.config.seed);
        self.produced = 0;
        tracing::debug!(
            "Pattern source started: {} Hz, jitter {}ms, {} byte frames",
            self.config.rate_hz,
            self.config.jitter_ms,
            self.config.frame_size
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::debug!("Pattern source stopped after {} frames", self.produced);
        Ok(())
    }

    fn pull_next(&mut self, options: &PullOptions) -> Result<MediaFrame> {
        if self.config.max_frames.is_some_and(|max| self.produced >= max) {
            return Err(RepeaterError::EndOfStream);
        }

        let delay = self.next_delay();
        if options.cancel.wait_timeout(delay) {
            return Err(RepeaterError::Stopped);
        }

        let frame = MediaFrame::new(self.payload(), MediaClock::now_us(), self.produced)
            .with_metadata("pattern_index", self.produced as i64);
        self.produced += 1;
        Ok(frame)
    }

    fn format(&self) -> SourceParams {
        SourceParams::new()
            .with("kind", "pattern")
            .with("frame_size", self.config.frame_size as u64)
            .with("frame_rate", self.config.rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CancelToken, MetadataValue};

    fn options() -> PullOptions {
        PullOptions {
            pull_index: 0,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_params_override_config() {
        let mut source = PatternSource::new(PatternSourceConfig::default());
        let params = SourceParams::new()
            .with("rate_hz", 50.0)
            .with("frame_size", 16u64)
            .with("max_frames", 2u64);
        source.start(&params).unwrap();

        assert_eq!(source.config().rate_hz, 50.0);
        assert_eq!(source.config().frame_size, 16);
        assert_eq!(source.format().get_u64("frame_size"), Some(16));
    }

    #[test]
    fn test_produces_until_max_frames() {
        let mut source = PatternSource::new(PatternSourceConfig {
            rate_hz: 1_000.0,
            frame_size: 4,
            max_frames: Some(3),
            ..Default::default()
        });
        source.start(&SourceParams::new()).unwrap();

        for expected in 0..3u64 {
            let frame = source.pull_next(&options()).unwrap();
            assert_eq!(frame.frame_number, expected);
            assert_eq!(frame.payload().as_ref(), &[expected as u8; 4]);
            assert_eq!(
                frame.metadata("pattern_index").and_then(MetadataValue::as_int),
                Some(expected as i64)
            );
        }
        assert_eq!(
            source.pull_next(&options()).unwrap_err(),
            RepeaterError::EndOfStream
        );
    }

    #[test]
    fn test_stall_extends_delay() {
        let mut source = PatternSource::new(PatternSourceConfig {
            rate_hz: 100.0,
            stall_every: Some(2),
            stall_ms: 40,
            ..Default::default()
        });
        source.produced = 1;
        assert_eq!(source.next_delay(), Duration::from_millis(50));
        source.produced = 2;
        assert_eq!(source.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut source = PatternSource::new(PatternSourceConfig {
            rate_hz: 50.0,
            jitter_ms: 5,
            ..Default::default()
        });
        for _ in 0..200 {
            let delay = source.next_delay();
            assert!(delay >= Duration::from_millis(15));
            assert!(delay <= Duration::from_millis(25));
        }
    }

    #[test]
    fn test_rejects_invalid_rate() {
        let mut source = PatternSource::new(PatternSourceConfig::default());
        let err = source
            .start(&SourceParams::new().with("rate_hz", 0.0))
            .unwrap_err();
        assert!(matches!(err, RepeaterError::SourceStart(_)));
    }
}
