// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Scalar annotations a source can attach to its frames.

/// Metadata value attached to a frame by its source.
///
/// The repeater never interprets these; they travel with the payload and
/// are carried unchanged onto every repeat.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_value_conversions() {
        assert_eq!(MetadataValue::from("keyframe"), MetadataValue::String("keyframe".into()));
        assert_eq!(MetadataValue::from(42i64), MetadataValue::Int(42));
        assert_eq!(MetadataValue::from(2.5f64), MetadataValue::Float(2.5));
        assert_eq!(MetadataValue::from(true), MetadataValue::Bool(true));
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(MetadataValue::from("h264").as_str(), Some("h264"));
        assert_eq!(MetadataValue::from(7i64).as_int(), Some(7));
        assert_eq!(MetadataValue::from(7i64).as_str(), None);
        assert_eq!(MetadataValue::from(false).as_int(), None);
    }
}
