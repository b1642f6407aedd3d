// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Scripted source: plays back a fixed sequence of pull outcomes.
//!
//! Each step describes how long a pull takes and what it yields. Once the
//! script runs out, every further pull reports end-of-stream. A shared
//! [`ScriptProbe`] lets the owner observe pulls after the source has been
//! moved into a repeater.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::core::{
    MediaClock, MediaFrame, PullOptions, RepeaterError, Result, SourceParams, UpstreamSource,
};

/// One scripted pull outcome.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Frame { delay: Duration, payload: Bytes },
    EndOfStream { delay: Duration },
    Error { delay: Duration, message: String },
    /// Block until the pull is cancelled.
    Stall,
}

/// Counters shared between a [`ScriptedSource`] and its owner.
#[derive(Debug, Default)]
pub struct ScriptProbe {
    pulls_started: AtomicU64,
    pulls_completed: AtomicU64,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl ScriptProbe {
    pub fn pulls_started(&self) -> u64 {
        self.pulls_started.load(Ordering::SeqCst)
    }

    pub fn pulls_completed(&self) -> u64 {
        self.pulls_completed.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    start_error: Option<String>,
    format: SourceParams,
    next_frame_number: u64,
    probe: Arc<ScriptProbe>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(self, payload: impl Into<Bytes>) -> Self {
        self.frame_after(Duration::ZERO, payload)
    }

    pub fn frame_after(mut self, delay: Duration, payload: impl Into<Bytes>) -> Self {
        self.steps.push_back(ScriptStep::Frame {
            delay,
            payload: payload.into(),
        });
        self
    }

    pub fn end_of_stream(self) -> Self {
        self.end_of_stream_after(Duration::ZERO)
    }

    pub fn end_of_stream_after(mut self, delay: Duration) -> Self {
        self.steps.push_back(ScriptStep::EndOfStream { delay });
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Error {
            delay: Duration::ZERO,
            message: message.into(),
        });
        self
    }

    pub fn stall(mut self) -> Self {
        self.steps.push_back(ScriptStep::Stall);
        self
    }

    /// Make `start` fail with the given reason.
    pub fn failing_start(mut self, reason: impl Into<String>) -> Self {
        self.start_error = Some(reason.into());
        self
    }

    pub fn with_format(mut self, format: SourceParams) -> Self {
        self.format = format;
        self
    }

    pub fn probe(&self) -> Arc<ScriptProbe> {
        Arc::clone(&self.probe)
    }
}

impl UpstreamSource for ScriptedSource {
    fn start(&mut self, _params: &SourceParams) -> Result<()> {
        if let Some(reason) = &self.start_error {
            return Err(RepeaterError::SourceStart(reason.clone()));
        }
        self.probe.started.store(true, Ordering::SeqCst);
        self.probe.stopped.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.probe.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pull_next(&mut self, options: &PullOptions) -> Result<MediaFrame> {
        self.probe.pulls_started.fetch_add(1, Ordering::SeqCst);

        let step = self.steps.pop_front().unwrap_or(ScriptStep::EndOfStream {
            delay: Duration::ZERO,
        });

        let result = match step {
            ScriptStep::Stall => {
                while !options.cancel.wait_timeout(Duration::from_secs(1)) {}
                Err(RepeaterError::Stopped)
            }
            ScriptStep::Frame { delay, payload } => {
                if options.cancel.wait_timeout(delay) {
                    Err(RepeaterError::Stopped)
                } else {
                    let frame = MediaFrame::new(payload, MediaClock::now_us(), self.next_frame_number);
                    self.next_frame_number += 1;
                    Ok(frame)
                }
            }
            ScriptStep::EndOfStream { delay } => {
                if options.cancel.wait_timeout(delay) {
                    Err(RepeaterError::Stopped)
                } else {
                    Err(RepeaterError::EndOfStream)
                }
            }
            ScriptStep::Error { delay, message } => {
                if options.cancel.wait_timeout(delay) {
                    Err(RepeaterError::Stopped)
                } else {
                    Err(RepeaterError::Source(message))
                }
            }
        };

        self.probe.pulls_completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn format(&self) -> SourceParams {
        self.format.clone()
    }
}
