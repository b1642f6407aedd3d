// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod cadence_clock;

pub use cadence_clock::{frame_deadline_us, FrameCadence};
