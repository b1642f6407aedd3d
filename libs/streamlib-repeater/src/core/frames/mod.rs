// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod media_frame;
pub mod metadata;

pub use media_frame::MediaFrame;
pub use metadata::MetadataValue;
