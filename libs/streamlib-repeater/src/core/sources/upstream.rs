// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The upstream side of the repeater.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::{MediaFrame, Result, SourceParams};

/// A pull-based frame producer.
///
/// `start` and `stop` are called from the thread driving the repeater;
/// `pull_next` is only ever called from the repeater's background pull
/// thread, one call at a time, and may block for as long as it needs.
///
/// A pull returns `Err(RepeaterError::EndOfStream)` when the source is
/// exhausted. Any other error is treated as an unrecoverable source failure.
///
/// [`RepeaterError::EndOfStream`]: crate::core::RepeaterError::EndOfStream
pub trait UpstreamSource: Send {
    fn start(&mut self, params: &SourceParams) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Produce the next frame, blocking until one exists.
    ///
    /// Long waits should watch `options.cancel` and return early once it
    /// fires; the repeater's `stop` cannot finish before this call returns.
    fn pull_next(&mut self, options: &PullOptions) -> Result<MediaFrame>;

    /// Description of what this source produces (dimensions, codec, ...).
    fn format(&self) -> SourceParams {
        SourceParams::new()
    }
}

impl<S: UpstreamSource + ?Sized> UpstreamSource for Box<S> {
    fn start(&mut self, params: &SourceParams) -> Result<()> {
        (**self).start(params)
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn pull_next(&mut self, options: &PullOptions) -> Result<MediaFrame> {
        (**self).pull_next(options)
    }

    fn format(&self) -> SourceParams {
        (**self).format()
    }
}

/// Per-pull context handed to [`UpstreamSource::pull_next`].
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Zero-based count of pulls issued in the current session.
    pub pull_index: u64,

    /// Fires when the repeater is stopping.
    pub cancel: CancelToken,
}

/// One-shot cancellation signal that blocking sources can wait on.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `timeout` unless cancelled first. Returns `true` if the
    /// token fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .condvar
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                break;
            }
        }
        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_elapses_without_cancel() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = std::thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait_timeout(Duration::from_secs(10));
            (cancelled, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (cancelled, elapsed) = handle.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.wait_timeout(Duration::from_secs(10)));
    }
}
