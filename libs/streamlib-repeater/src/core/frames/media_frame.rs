// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use super::metadata::MetadataValue;

/// A media frame: opaque payload plus a presentation timestamp.
///
/// The payload is immutable and reference counted. Cloning a frame, or
/// repeating it, never copies or mutates the bytes; each clone is an
/// independent value whose timestamp can differ from the original's.
#[derive(Clone, Debug)]
pub struct MediaFrame {
    payload: Bytes,

    /// Presentation timestamp in microseconds (monotonic clock domain).
    pub timestamp_us: i64,

    /// Sequential frame number. Sources number what they produce; the
    /// repeater renumbers delivered frames with their cadence index.
    pub frame_number: u64,

    /// Timestamp the upstream source assigned, kept when the repeater
    /// restamps the frame onto its own cadence.
    source_timestamp_us: i64,

    repeated: bool,

    metadata: Option<Arc<HashMap<String, MetadataValue>>>,
}

impl MediaFrame {
    pub fn new(payload: impl Into<Bytes>, timestamp_us: i64, frame_number: u64) -> Self {
        Self {
            payload: payload.into(),
            timestamp_us,
            frame_number,
            source_timestamp_us: timestamp_us,
            repeated: false,
            metadata: None,
        }
    }

    /// Attach a metadata entry. Intended for sources building a frame.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        let map = Arc::make_mut(self.metadata.get_or_insert_with(Default::default));
        map.insert(key.into(), value.into());
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    pub fn source_timestamp_us(&self) -> i64 {
        self.source_timestamp_us
    }

    /// True when this frame is a re-delivery of an earlier payload.
    pub fn is_repeat(&self) -> bool {
        self.repeated
    }

    /// True when both frames reference the same payload allocation.
    pub fn shares_payload_with(&self, other: &MediaFrame) -> bool {
        self.payload.as_ptr() == other.payload.as_ptr() && self.payload.len() == other.payload.len()
    }

    /// Move a freshly pulled frame onto the output cadence.
    pub(crate) fn restamp(mut self, timestamp_us: i64, frame_number: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self.frame_number = frame_number;
        self.repeated = false;
        self
    }

    /// A new frame sharing this payload, stamped for a later cadence slot.
    pub(crate) fn repeat_at(&self, timestamp_us: i64, frame_number: u64) -> Self {
        Self {
            payload: self.payload.clone(),
            timestamp_us,
            frame_number,
            source_timestamp_us: self.source_timestamp_us,
            repeated: true,
            metadata: self.metadata.clone(),
        }
    }
}
