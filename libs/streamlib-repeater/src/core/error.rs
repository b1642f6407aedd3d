// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepeaterError {
    #[error("Upstream source failed to start: {0}")]
    SourceStart(String),

    #[error("End of stream")]
    EndOfStream,

    #[error("Upstream source error: {0}")]
    Source(String),

    #[error("Repeater is stopped")]
    Stopped,

    #[error("Repeater already started")]
    AlreadyStarted,

    #[error("Read timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl RepeaterError {
    /// Errors that end a session: no frame, fresh or repeated, follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Source(_))
    }

    /// Normalize an error returned by an upstream pull.
    ///
    /// Anything that is not end-of-stream is reported as a source failure.
    pub(crate) fn into_pull_failure(self) -> Self {
        match self {
            Self::EndOfStream | Self::Source(_) => self,
            other => Self::Source(other.to_string()),
        }
    }

    /// Normalize an error returned by an upstream `start`.
    pub(crate) fn into_start_failure(self) -> Self {
        match self {
            Self::SourceStart(_) => self,
            other => Self::SourceStart(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepeaterError>;
