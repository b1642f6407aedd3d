// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod clocks;
pub mod config;
pub mod error;
pub mod frames;
pub mod media_clock;
pub mod prelude;
pub mod repeater;
pub mod sources;

pub use clocks::*;
pub use config::*;
pub use error::*;
pub use frames::*;
pub use media_clock::MediaClock;
pub use repeater::*;
pub use sources::*;
