// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod engine;
mod state;
mod stats;
mod worker;

pub use engine::{ReadOptions, RepeaterSource};
pub use stats::RepeaterStats;
