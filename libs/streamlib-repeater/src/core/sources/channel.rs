// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Adapts a push-based producer to the pull contract.
//!
//! The producer keeps the [`Sender`] half and pushes frames whenever it has
//! them; the repeater pulls from the receiving half. Dropping every sender
//! ends the stream.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::core::{MediaFrame, PullOptions, RepeaterError, Result, SourceParams, UpstreamSource};

/// How often a blocked pull re-checks its cancel token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct ChannelSource {
    receiver: Receiver<MediaFrame>,
    format: SourceParams,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<MediaFrame>) -> Self {
        Self {
            receiver,
            format: SourceParams::new(),
        }
    }

    /// A bounded channel and the source reading from it.
    pub fn bounded(capacity: usize) -> (Sender<MediaFrame>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (tx, Self::new(rx))
    }

    pub fn with_format(mut self, format: SourceParams) -> Self {
        self.format = format;
        self
    }
}

impl UpstreamSource for ChannelSource {
    fn start(&mut self, _params: &SourceParams) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // Frames queued while stopped would be stale on restart.
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            tracing::debug!("Channel source dropped {} queued frames on stop", dropped);
        }
        Ok(())
    }

    fn pull_next(&mut self, options: &PullOptions) -> Result<MediaFrame> {
        loop {
            if options.cancel.is_cancelled() {
                return Err(RepeaterError::Stopped);
            }
            match self.receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(frame) => return Ok(frame),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(RepeaterError::EndOfStream),
            }
        }
    }

    fn format(&self) -> SourceParams {
        self.format.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CancelToken;

    fn options() -> PullOptions {
        PullOptions {
            pull_index: 0,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_pulls_pushed_frames_in_order() {
        let (tx, mut source) = ChannelSource::bounded(4);
        tx.send(MediaFrame::new(vec![1u8], 10, 0)).unwrap();
        tx.send(MediaFrame::new(vec![2u8], 20, 1)).unwrap();

        assert_eq!(source.pull_next(&options()).unwrap().timestamp_us, 10);
        assert_eq!(source.pull_next(&options()).unwrap().timestamp_us, 20);
    }

    #[test]
    fn test_disconnect_is_end_of_stream() {
        let (tx, mut source) = ChannelSource::bounded(1);
        drop(tx);
        assert_eq!(
            source.pull_next(&options()).unwrap_err(),
            RepeaterError::EndOfStream
        );
    }

    #[test]
    fn test_cancel_interrupts_blocked_pull() {
        let (_tx, mut source) = ChannelSource::bounded(1);
        let opts = options();
        let cancel = opts.cancel.clone();
        let handle = std::thread::spawn(move || source.pull_next(&opts));

        std::thread::sleep(Duration::from_millis(30));
        cancel.cancel();
        assert_eq!(handle.join().unwrap().unwrap_err(), RepeaterError::Stopped);
    }

    #[test]
    fn test_stop_drains_queue() {
        let (tx, mut source) = ChannelSource::bounded(4);
        tx.send(MediaFrame::new(vec![1u8], 10, 0)).unwrap();
        source.stop().unwrap();
        assert!(tx.is_empty());
    }
}
