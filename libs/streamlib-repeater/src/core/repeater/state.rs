// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session state shared between `read` and the pull worker.
//!
//! Everything here lives behind the single session mutex in [`Shared`]; the
//! condvar is notified whenever a pull completes or the session ends.

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

use crate::core::{FrameCadence, MediaFrame, RepeaterError, Result};

use super::stats::RepeaterStats;

pub(crate) struct Shared {
    pub state: Mutex<SessionState>,
    pub wake: Condvar,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            wake: Condvar::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionPhase {
    /// Never started, or stopped.
    Idle,
    Running,
    /// Ended by end-of-stream or a source failure; every read returns it.
    Finished(RepeaterError),
}

/// Outcome of the most recent pull.
#[derive(Debug)]
pub(crate) enum PullState {
    /// No pull outstanding.
    Idle,
    InFlight,
    Ready(Result<MediaFrame>),
}

impl PullState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PullState::Ready(_))
    }

    pub fn is_ready_frame(&self) -> bool {
        matches!(self, PullState::Ready(Ok(_)))
    }

    pub fn take_ready(&mut self) -> Option<Result<MediaFrame>> {
        match std::mem::replace(self, PullState::Idle) {
            PullState::Ready(result) => Some(result),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// A request for the worker to pull one frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PullRequest {
    pub pull_index: u64,
}

pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub pull: PullState,
    /// Most recent fresh frame; the source of repeats.
    pub cached: Option<MediaFrame>,
    /// Anchored when the first frame of a session (or after dormancy) is
    /// delivered.
    pub cadence: Option<FrameCadence>,
    /// Frames delivered since the cadence was anchored, repeats included.
    pub frame_count: u64,
    /// Clock reading at the last fresh delivery, or at the last wake-up.
    pub last_fresh_us: Option<i64>,
    /// Idle for too long: the cached frame is kept but not repeated until a
    /// fresh frame arrives or the session is woken.
    pub dormant: bool,
    /// Request channel of the running session's worker.
    pub requests: Option<Sender<PullRequest>>,
    pub stats: RepeaterStats,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            pull: PullState::Idle,
            cached: None,
            cadence: None,
            frame_count: 0,
            last_fresh_us: None,
            dormant: false,
            requests: None,
            stats: RepeaterStats::default(),
        }
    }

    pub fn begin(&mut self, requests: Sender<PullRequest>) {
        *self = Self::new();
        self.phase = SessionPhase::Running;
        self.requests = Some(requests);
    }

    /// Drop all session data. Stats are kept for inspection after stop.
    pub fn end(&mut self) {
        let stats = self.stats;
        *self = Self::new();
        self.stats = stats;
    }

    pub fn finish(&mut self, err: RepeaterError) {
        self.phase = SessionPhase::Finished(err);
        self.pull = PullState::Idle;
        self.cached = None;
    }

    /// Stop repeating. The cached frame is retained; the cadence is
    /// re-anchored by the next fresh frame or after [`Self::wake`].
    pub fn go_dormant(&mut self) {
        self.cadence = None;
        self.frame_count = 0;
        self.last_fresh_us = None;
        self.dormant = true;
        self.stats.suspensions += 1;
    }

    /// Leave dormancy so the retained frame is repeated again. Returns
    /// `false` if the session was not dormant.
    pub fn wake(&mut self, now_us: i64) -> bool {
        if !self.dormant || self.cached.is_none() {
            return false;
        }
        self.dormant = false;
        self.last_fresh_us = Some(now_us);
        true
    }

    /// Woken from dormancy and waiting for the cadence to be re-anchored.
    pub fn is_resumable(&self) -> bool {
        !self.dormant && self.cadence.is_none() && self.cached.is_some()
    }

    /// Deadline of the next delivery, once the cadence is anchored.
    pub fn next_deadline_us(&self) -> Option<i64> {
        self.cadence.map(|c| c.deadline_us(self.frame_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_ready_only_consumes_results() {
        let mut pull = PullState::InFlight;
        assert!(pull.take_ready().is_none());
        assert!(matches!(pull, PullState::InFlight));

        let mut pull = PullState::Ready(Err(RepeaterError::EndOfStream));
        assert!(pull.is_ready());
        assert!(!pull.is_ready_frame());
        assert!(matches!(
            pull.take_ready(),
            Some(Err(RepeaterError::EndOfStream))
        ));
        assert!(matches!(pull, PullState::Idle));
    }

    #[test]
    fn test_end_keeps_stats() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut state = SessionState::new();
        state.begin(tx);
        state.stats.frames_delivered = 5;
        state.cadence = Some(FrameCadence::new(0, 10.0));
        state.frame_count = 5;

        state.end();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(state.requests.is_none());
        assert_eq!(state.frame_count, 0);
        assert_eq!(state.stats.frames_delivered, 5);
    }

    #[test]
    fn test_next_deadline_tracks_frame_count() {
        let mut state = SessionState::new();
        assert_eq!(state.next_deadline_us(), None);

        state.cadence = Some(FrameCadence::new(1_000, 10.0));
        state.frame_count = 2;
        assert_eq!(state.next_deadline_us(), Some(201_000));

        state.go_dormant();
        assert_eq!(state.next_deadline_us(), None);
        assert_eq!(state.stats.suspensions, 1);
    }

    #[test]
    fn test_dormancy_keeps_cached_frame_until_woken() {
        let mut state = SessionState::new();
        assert!(!state.wake(0));

        state.cached = Some(MediaFrame::new(vec![9u8], 0, 0));
        state.cadence = Some(FrameCadence::new(0, 10.0));
        state.frame_count = 12;
        state.last_fresh_us = Some(0);
        assert!(!state.wake(1_000), "not dormant yet");

        state.go_dormant();
        assert!(state.cached.is_some());
        assert!(state.dormant);
        assert!(!state.is_resumable());

        assert!(state.wake(2_000_000));
        assert!(!state.dormant);
        assert_eq!(state.last_fresh_us, Some(2_000_000));
        assert_eq!(state.frame_count, 0);
        assert!(state.is_resumable());
        assert!(!state.wake(2_000_001));
    }
}
