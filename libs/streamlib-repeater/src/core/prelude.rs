// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Everything a typical repeater consumer or source implementation needs.

pub use crate::core::{
    CancelToken, MediaFrame, PullOptions, ReadOptions, RepeaterConfig, RepeaterError,
    RepeaterSource, Result, SourceParams, UpstreamSource,
};
