// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Repeater configuration and the `repeater.toml` settings file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{RepeaterError, Result};

/// Configuration fixed for the lifetime of a [`RepeaterSource`].
///
/// [`RepeaterSource`]: crate::core::RepeaterSource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterConfig {
    /// Label used in log lines and as the default worker thread name.
    pub name: String,

    /// Output cadence in frames per second. Must be finite and positive.
    pub rate_hz: f64,

    /// Hold fresh frames until their cadence deadline instead of returning
    /// them as soon as they arrive.
    pub pace_fresh_frames: bool,

    /// Go dormant when no fresh frame has arrived for this long: stop
    /// repeating, drop the cached frame, and re-anchor the cadence on the
    /// next fresh frame. `None` repeats indefinitely.
    pub suspend_after_idle_ms: Option<u64>,

    /// Name for the background pull thread. Defaults to `"{name}-pull"`.
    pub worker_thread_name: Option<String>,
}

impl RepeaterConfig {
    pub fn with_rate(rate_hz: f64) -> Self {
        Self {
            rate_hz,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(RepeaterError::Configuration(format!(
                "rate_hz must be a positive finite number, got {}",
                self.rate_hz
            )));
        }
        if self.suspend_after_idle_ms == Some(0) {
            return Err(RepeaterError::Configuration(
                "suspend_after_idle_ms must be greater than zero (omit it to disable suspension)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn suspend_after_idle(&self) -> Option<Duration> {
        self.suspend_after_idle_ms.map(Duration::from_millis)
    }

    pub fn thread_name(&self) -> String {
        self.worker_thread_name
            .clone()
            .unwrap_or_else(|| format!("{}-pull", self.name))
    }
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            name: "repeater".to_string(),
            rate_hz: 30.0,
            pace_fresh_frames: false,
            suspend_after_idle_ms: None,
            worker_thread_name: None,
        }
    }
}

/// Opaque parameters forwarded verbatim to the upstream source's `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceParams(Map<String, Value>);

impl SourceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Contents of a `repeater.toml` file.
///
/// ```toml
/// [repeater]
/// rate_hz = 30.0
/// suspend_after_idle_ms = 1000
///
/// [source]
/// device = "/dev/video0"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterSettings {
    pub repeater: RepeaterConfig,
    pub source: SourceParams,
}

impl RepeaterSettings {
    /// Conventional settings file name.
    pub const FILE_NAME: &'static str = "repeater.toml";

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| RepeaterError::Configuration(format!("Failed to parse settings: {}", e)))?;
        settings.repeater.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file. Errors if the file is missing,
    /// malformed, or carries an invalid repeater section.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RepeaterError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let settings = Self::from_toml_str(&content).map_err(|e| match e {
            RepeaterError::Configuration(msg) => {
                RepeaterError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        tracing::info!("Loaded repeater settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}
