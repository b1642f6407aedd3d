// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame-rate repeater engine.
//!
//! Delivers frames to a consumer on a fixed cadence. A background worker
//! pulls from the upstream source one frame at a time into a single-slot
//! cache. Each `read` returns either the freshly pulled frame or, when the
//! next cadence deadline passes first, a repeat of the cached frame. Either
//! way the returned timestamp is the cadence deadline for the frame's index,
//! never the upstream's own timestamp.
//!
//! ## Threads
//!
//! - **Caller**: `start` / `read` / `stop`. `stop` may run on another thread
//!   while a `read` is blocked; the read returns [`RepeaterError::Stopped`].
//! - **Pull worker**: blocks in [`UpstreamSource::pull_next`]. At most one
//!   pull is outstanding; the next is issued only once `read` consumes the
//!   previous result.
//!
//! Lock order is lifecycle, then session state, then source.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::{
    FrameCadence, MediaClock, MediaFrame, RepeaterConfig, RepeaterError, Result, SourceParams,
    UpstreamSource,
};

use super::state::{PullRequest, PullState, SessionPhase, SessionState, Shared};
use super::stats::RepeaterStats;
use super::worker::{PullWorker, SharedSource};

/// Options for a single [`RepeaterSource::read`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Give up with [`RepeaterError::TimedOut`] if nothing can be delivered
    /// within this long. Layered on top of the cadence: a repeat that falls
    /// due before the timeout is still delivered.
    pub timeout: Option<Duration>,
}

impl ReadOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

struct RunningSession {
    worker: PullWorker,
    format: SourceParams,
}

/// Constant-rate frame source built on top of an irregular upstream.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use streamlib_repeater::{ReadOptions, RepeaterConfig, RepeaterSource, ScriptedSource, SourceParams};
///
/// let upstream = ScriptedSource::new()
///     .frame(vec![0u8; 16])
///     .frame_after(Duration::from_secs(5), vec![1u8; 16]);
/// let repeater = RepeaterSource::new(upstream, RepeaterConfig::with_rate(100.0))?;
/// repeater.start(&SourceParams::new())?;
///
/// let first = repeater.read(&ReadOptions::default())?;
/// let second = repeater.read(&ReadOptions::default())?;
/// assert!(second.is_repeat());
/// assert_eq!(second.timestamp_us - first.timestamp_us, 10_000);
///
/// repeater.stop()?;
/// # Ok::<(), streamlib_repeater::RepeaterError>(())
/// ```
pub struct RepeaterSource {
    config: RepeaterConfig,
    source: SharedSource,
    shared: Arc<Shared>,
    lifecycle: Mutex<Option<RunningSession>>,
}

impl RepeaterSource {
    pub fn new(source: impl UpstreamSource + 'static, config: RepeaterConfig) -> Result<Self> {
        config.validate()?;
        let source: Box<dyn UpstreamSource> = Box::new(source);
        Ok(Self {
            config,
            source: Arc::new(Mutex::new(source)),
            shared: Arc::new(Shared::new()),
            lifecycle: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RepeaterConfig {
        &self.config
    }

    pub fn rate_hz(&self) -> f64 {
        self.config.rate_hz
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().phase == SessionPhase::Running
    }

    /// Start the upstream source and the pull worker.
    ///
    /// Either both are running when this returns `Ok`, or neither is.
    pub fn start(&self, params: &SourceParams) -> Result<()> {
        let name = &self.config.name;
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.is_some() {
            return Err(RepeaterError::AlreadyStarted);
        }

        let format = {
            let mut source = self.source.lock();
            source
                .start(params)
                .map_err(RepeaterError::into_start_failure)?;
            source.format()
        };

        let worker = match PullWorker::spawn(
            name,
            self.config.thread_name(),
            Arc::clone(&self.source),
            Arc::clone(&self.shared),
        ) {
            Ok(worker) => worker,
            Err(e) => {
                if let Err(stop_err) = self.source.lock().stop() {
                    tracing::warn!("[{}] Source stop after failed start: {}", name, stop_err);
                }
                return Err(e);
            }
        };

        self.shared.state.lock().begin(worker.requests());
        *lifecycle = Some(RunningSession { worker, format });

        tracing::info!("[{}] Started at {} Hz", name, self.config.rate_hz);
        Ok(())
    }

    /// Stop the session. Idempotent.
    ///
    /// A blocked `read` wakes immediately with [`RepeaterError::Stopped`].
    /// This call then waits for the in-flight pull, if any, to return; that
    /// is prompt for sources that honour [`PullOptions::cancel`].
    ///
    /// [`PullOptions::cancel`]: crate::core::PullOptions::cancel
    pub fn stop(&self) -> Result<()> {
        let name = &self.config.name;
        let mut lifecycle = self.lifecycle.lock();
        let Some(session) = lifecycle.take() else {
            return Ok(());
        };

        let stats = {
            let mut state = self.shared.state.lock();
            state.end();
            self.shared.wake.notify_all();
            state.stats
        };

        session.worker.shutdown();
        let result = self.source.lock().stop();

        tracing::info!(
            "[{}] Stopped after {} frames ({} fresh, {} repeated)",
            name,
            stats.frames_delivered,
            stats.fresh_frames,
            stats.repeated_frames
        );
        result
    }

    /// Resume repeating after the session went dormant.
    ///
    /// A dormant session keeps its last frame but delivers nothing until a
    /// fresh one arrives. Waking it re-anchors the cadence at the next
    /// `read`, which repeats the retained frame; a blocked `read` returns at
    /// once. The idle timer restarts from now, so an upstream that stays
    /// silent sends the session dormant again. No-op unless dormant.
    pub fn wake_up(&self) {
        let mut state = self.shared.state.lock();
        if state.phase == SessionPhase::Running && state.wake(MediaClock::now_us()) {
            tracing::debug!("[{}] Woken up, resuming repeats", self.config.name);
            self.shared.wake.notify_all();
        }
    }

    /// Upstream format as reported at `start`, with `frame_rate` set to the
    /// output rate. `None` while stopped.
    pub fn format(&self) -> Option<SourceParams> {
        self.lifecycle.lock().as_ref().map(|session| {
            session
                .format
                .clone()
                .with("frame_rate", self.config.rate_hz)
        })
    }

    pub fn stats(&self) -> RepeaterStats {
        self.shared.state.lock().stats
    }

    /// Block until the next frame is due and return it.
    ///
    /// Returns a fresh frame as soon as the upstream delivers one, or a
    /// repeat of the cached frame once the cadence deadline passes. The
    /// first frame of a session is always fresh, however long it takes.
    pub fn read(&self, options: &ReadOptions) -> Result<MediaFrame> {
        // A timeout too large to represent is no limit at all.
        let give_up = options
            .timeout
            .and_then(|t| Instant::now().checked_add(t).map(|at| (t, at)));
        let mut state = self.shared.state.lock();

        loop {
            match &state.phase {
                SessionPhase::Idle => return Err(RepeaterError::Stopped),
                SessionPhase::Finished(err) => return Err(err.clone()),
                SessionPhase::Running => {}
            }

            if matches!(state.pull, PullState::Idle) {
                self.issue_pull(&mut state)?;
            }

            let now_us = MediaClock::now_us();
            let due_us = state.next_deadline_us();

            if state.pull.is_ready() {
                let hold = state.pull.is_ready_frame()
                    && self.config.pace_fresh_frames
                    && due_us.is_some_and(|due| now_us < due);
                if !hold {
                    if let Some(result) = state.pull.take_ready() {
                        return match result {
                            Ok(frame) => Ok(self.deliver_fresh(&mut state, frame, now_us)),
                            Err(err) => Err(self.end_of_session(&mut state, err)),
                        };
                    }
                }
            }

            if due_us.is_none() && state.is_resumable() {
                tracing::debug!("[{}] Re-anchoring cadence on retained frame", self.config.name);
                state.cadence = Some(FrameCadence::new(now_us, self.config.rate_hz));
                continue;
            }

            if let Some(due) = due_us.filter(|due| now_us >= *due) {
                if self.idle_too_long(&state, now_us) {
                    tracing::debug!(
                        "[{}] No fresh frame for {:?}, going dormant",
                        self.config.name,
                        self.config.suspend_after_idle()
                    );
                    state.go_dormant();
                    continue;
                }
                if let Some(frame) = self.deliver_repeat(&mut state, due) {
                    return Ok(frame);
                }
            }

            let wake_at = due_us.and_then(MediaClock::instant_at);
            let wake_at = match (wake_at, give_up) {
                (Some(due), Some((_, limit))) => Some(due.min(limit)),
                (due, limit) => due.or(limit.map(|(_, at)| at)),
            };

            if let Some((timeout, limit)) = give_up {
                if Instant::now() >= limit {
                    return Err(RepeaterError::TimedOut(timeout));
                }
            }

            match wake_at {
                Some(at) => {
                    self.shared.wake.wait_until(&mut state, at);
                }
                None => self.shared.wake.wait(&mut state),
            }
        }
    }

    fn issue_pull(&self, state: &mut SessionState) -> Result<()> {
        let Some(requests) = state.requests.as_ref() else {
            return Err(RepeaterError::Stopped);
        };
        let pull_index = state.stats.pulls_issued;
        requests
            .send(PullRequest { pull_index })
            .map_err(|_| RepeaterError::Runtime("Pull worker is gone".to_string()))?;
        state.pull = PullState::InFlight;
        state.stats.pulls_issued += 1;
        Ok(())
    }

    fn deliver_fresh(&self, state: &mut SessionState, frame: MediaFrame, now_us: i64) -> MediaFrame {
        let rate_hz = self.config.rate_hz;
        let cadence = *state
            .cadence
            .get_or_insert_with(|| FrameCadence::new(now_us, rate_hz));
        let index = state.frame_count;
        let frame = frame.restamp(cadence.deadline_us(index), index);

        state.cached = Some(frame.clone());
        state.frame_count += 1;
        state.last_fresh_us = Some(now_us);
        state.dormant = false;
        state.stats.frames_delivered += 1;
        state.stats.fresh_frames += 1;

        tracing::trace!(
            "[{}] Fresh frame #{} @ {}us",
            self.config.name,
            index,
            frame.timestamp_us
        );

        // Keep one pull in flight; a failure here resurfaces on the next read.
        if let Err(e) = self.issue_pull(state) {
            tracing::warn!("[{}] Could not request next frame: {}", self.config.name, e);
        }
        frame
    }

    fn deliver_repeat(&self, state: &mut SessionState, due_us: i64) -> Option<MediaFrame> {
        let index = state.frame_count;
        let frame = state.cached.as_ref()?.repeat_at(due_us, index);

        state.frame_count += 1;
        state.stats.frames_delivered += 1;
        state.stats.repeated_frames += 1;

        tracing::trace!("[{}] Repeat frame #{} @ {}us", self.config.name, index, due_us);
        Some(frame)
    }

    fn end_of_session(&self, state: &mut SessionState, err: RepeaterError) -> RepeaterError {
        match &err {
            RepeaterError::EndOfStream => {
                tracing::debug!("[{}] Upstream reached end of stream", self.config.name)
            }
            other => tracing::warn!("[{}] Upstream failed: {}", self.config.name, other),
        }
        state.finish(err.clone());
        err
    }

    fn idle_too_long(&self, state: &SessionState, now_us: i64) -> bool {
        match (self.config.suspend_after_idle(), state.last_fresh_us) {
            (Some(limit), Some(last_fresh_us)) => {
                now_us - last_fresh_us > limit.as_micros() as i64
            }
            _ => false,
        }
    }
}

impl Drop for RepeaterSource {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("[{}] Stop on drop failed: {}", self.config.name, e);
        }
    }
}
