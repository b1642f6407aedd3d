// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod channel;
pub mod pattern;
pub mod scripted;
pub mod upstream;

pub use channel::ChannelSource;
pub use pattern::{PatternSource, PatternSourceConfig};
pub use scripted::{ScriptProbe, ScriptStep, ScriptedSource};
pub use upstream::{CancelToken, PullOptions, UpstreamSource};
