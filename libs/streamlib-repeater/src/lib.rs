// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Constant-rate frame repeater.
//!
//! [`RepeaterSource`] sits between a downstream consumer that needs frames at a
//! fixed cadence and an [`UpstreamSource`] that produces them at its own pace.
//! When no fresh frame is ready by the next deadline, the last frame is handed
//! out again with a timestamp taken from the cadence clock.
//!
//! ```rust,ignore
//! use streamlib_repeater::{RepeaterConfig, RepeaterSource, ReadOptions, SourceParams};
//!
//! let repeater = RepeaterSource::new(camera, RepeaterConfig::with_rate(30.0))?;
//! repeater.start(&SourceParams::new())?;
//! loop {
//!     let frame = repeater.read(&ReadOptions::default())?;
//!     encoder.push(frame.payload(), frame.timestamp_us);
//! }
//! ```

// Timestamps are i64 microseconds; rate math goes through f64.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

pub mod core;

pub use core::{
    frame_deadline_us, CancelToken, ChannelSource, FrameCadence, MediaClock, MediaFrame,
    MetadataValue, PatternSource, PatternSourceConfig, PullOptions, ReadOptions, RepeaterConfig,
    RepeaterError, RepeaterSettings, RepeaterSource, RepeaterStats, Result, ScriptProbe,
    ScriptStep, ScriptedSource, SourceParams, UpstreamSource,
};
