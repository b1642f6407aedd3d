// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Background pull thread.
//!
//! Services one pull request at a time: blocks in the upstream source's
//! `pull_next`, then posts the result into the session state and wakes any
//! reader. Results that arrive after the session ended are dropped.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::core::{CancelToken, MediaFrame, PullOptions, RepeaterError, Result, UpstreamSource};

use super::state::{PullRequest, PullState, SessionPhase, Shared};

pub(crate) type SharedSource = Arc<Mutex<Box<dyn UpstreamSource>>>;

pub(crate) struct PullWorker {
    requests: Sender<PullRequest>,
    shutdown: Sender<()>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl PullWorker {
    pub fn spawn(
        name: &str,
        thread_name: String,
        source: SharedSource,
        shared: Arc<Shared>,
    ) -> Result<Self> {
        let (requests, request_rx) = crossbeam_channel::unbounded();
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);
        let cancel = CancelToken::new();

        let label = name.to_string();
        let thread_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                run_pull_loop(&label, source, shared, request_rx, shutdown_rx, thread_cancel)
            })
            .map_err(|e| RepeaterError::Runtime(format!("Failed to spawn pull worker: {}", e)))?;

        Ok(Self {
            requests,
            shutdown,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn requests(&self) -> Sender<PullRequest> {
        self.requests.clone()
    }

    /// Cancel any in-flight pull and wait for the thread to exit.
    ///
    /// Returns once the source's `pull_next` has returned; sources that
    /// ignore the cancel token make this wait for the pull to finish.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Pull worker panicked");
            }
        }
    }
}

fn run_pull_loop(
    name: &str,
    source: SharedSource,
    shared: Arc<Shared>,
    request_rx: Receiver<PullRequest>,
    shutdown_rx: Receiver<()>,
    cancel: CancelToken,
) {
    tracing::debug!("[{}] Pull worker started", name);

    loop {
        crossbeam_channel::select! {
            recv(shutdown_rx) -> _ => break,
            recv(request_rx) -> msg => {
                let Ok(request) = msg else { break };

                let options = PullOptions {
                    pull_index: request.pull_index,
                    cancel: cancel.clone(),
                };
                tracing::trace!("[{}] Pulling #{}", name, request.pull_index);
                let result = pull_once(name, &source, &options);

                let mut state = shared.state.lock();
                if state.phase == SessionPhase::Running && matches!(state.pull, PullState::InFlight) {
                    if let Err(e) = &result {
                        tracing::debug!("[{}] Pull #{} failed: {}", name, request.pull_index, e);
                    }
                    state.pull = PullState::Ready(result);
                    shared.wake.notify_all();
                } else {
                    state.stats.pulls_discarded += 1;
                    tracing::trace!(
                        "[{}] Discarding pull #{} result, session no longer running",
                        name,
                        request.pull_index
                    );
                }
            }
        }
    }

    tracing::debug!("[{}] Pull worker stopped", name);
}

/// Run one upstream pull. A panicking source fails the pull instead of
/// taking the worker down with it.
fn pull_once(name: &str, source: &SharedSource, options: &PullOptions) -> Result<MediaFrame> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        source.lock().pull_next(options)
    }));

    match result {
        Ok(inner_result) => inner_result.map_err(RepeaterError::into_pull_failure),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!("[{}] Pull #{} PANIC: {}", name, options.pull_index, panic_msg);
            Err(RepeaterError::Source(format!(
                "Upstream pull panicked: {}",
                panic_msg
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceParams;

    struct PanickingSource;

    impl UpstreamSource for PanickingSource {
        fn start(&mut self, _params: &SourceParams) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            Ok(())
        }

        fn pull_next(&mut self, _options: &PullOptions) -> Result<MediaFrame> {
            panic!("decoder state corrupted");
        }
    }

    #[test]
    fn test_panicking_pull_becomes_source_error() {
        let source: SharedSource = Arc::new(Mutex::new(Box::new(PanickingSource)));
        let options = PullOptions {
            pull_index: 3,
            cancel: CancelToken::new(),
        };

        let err = pull_once("test", &source, &options).unwrap_err();
        assert_eq!(
            err,
            RepeaterError::Source("Upstream pull panicked: decoder state corrupted".into())
        );

        // The source lock is released and usable after the panic.
        assert!(source.lock().stop().is_ok());
    }
}
