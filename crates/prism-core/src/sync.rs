// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cancellation and completion primitives for bounded waits.
//!
//! These replace unbounded spin loops: every wait takes a timeout and a
//! [`CancellationToken`], and reports why it gave up.

use flume::{Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single sleep while waiting, so cancellation is noticed promptly.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// A shared flag that asks long-running waits to give up.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a bounded wait returned without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The timeout elapsed before every job completed.
    Timeout {
        /// Jobs that did complete.
        completed: usize,
        /// Jobs that were expected.
        expected: usize,
    },
    /// The wait was cancelled.
    Cancelled,
    /// Some tokens were dropped without completing, so the wait can never succeed.
    Abandoned {
        /// Jobs that did complete.
        completed: usize,
        /// Jobs that were expected.
        expected: usize,
    },
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout {
                completed,
                expected,
            } => write!(f, "Timed out with {completed}/{expected} jobs done"),
            WaitError::Cancelled => write!(f, "Wait was cancelled"),
            WaitError::Abandoned {
                completed,
                expected,
            } => write!(
                f,
                "{} of {expected} jobs were dropped before completing",
                expected - completed
            ),
        }
    }
}

impl std::error::Error for WaitError {}

/// Reports the completion of one job to its [`CompletionGroup`].
///
/// Dropping a token without calling [`complete`](Self::complete) marks the
/// job as abandoned.
#[derive(Debug)]
pub struct CompletionToken {
    sender: Sender<()>,
}

impl CompletionToken {
    /// Marks the job as done.
    pub fn complete(self) {
        // The group may already have given up; nobody is left to notify then.
        let _ = self.sender.send(());
    }
}

/// Waits for a set of jobs, each holding one [`CompletionToken`].
#[derive(Debug)]
pub struct CompletionGroup {
    sender: Sender<()>,
    receiver: Receiver<()>,
    expected: usize,
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            expected: 0,
        }
    }

    /// Registers one more job and returns its token.
    pub fn token(&mut self) -> CompletionToken {
        self.expected += 1;
        CompletionToken {
            sender: self.sender.clone(),
        }
    }

    /// Number of registered jobs.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Blocks until every registered job has completed, the timeout elapses,
    /// `cancel` fires, or a token is dropped without completing.
    pub fn wait(self, timeout: Duration, cancel: &CancellationToken) -> Result<(), WaitError> {
        let CompletionGroup {
            sender,
            receiver,
            expected,
        } = self;
        // Only the tokens may keep the channel alive from here on.
        drop(sender);

        let deadline = Instant::now() + timeout;
        let mut completed = 0;
        while completed < expected {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    completed,
                    expected,
                });
            }
            let slice = (deadline - now).min(CANCEL_CHECK_INTERVAL);
            match receiver.recv_timeout(slice) {
                Ok(()) => completed += 1,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WaitError::Abandoned {
                        completed,
                        expected,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_returns_after_all_tokens_complete() {
        let mut group = CompletionGroup::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let token = group.token();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5 * i));
                    token.complete();
                })
            })
            .collect();
        assert_eq!(
            group.wait(Duration::from_secs(5), &CancellationToken::new()),
            Ok(())
        );
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn empty_group_returns_immediately() {
        let group = CompletionGroup::new();
        assert!(group.wait(Duration::ZERO, &CancellationToken::new()).is_ok());
    }

    #[test]
    fn one_missing_completion_times_out() {
        let mut group = CompletionGroup::new();
        let a = group.token();
        let b = group.token();
        let _stuck = group.token();
        a.complete();
        b.complete();
        let result = group.wait(Duration::from_millis(30), &CancellationToken::new());
        assert_eq!(
            result,
            Err(WaitError::Timeout {
                completed: 2,
                expected: 3
            })
        );
    }

    #[test]
    fn dropped_token_is_reported_as_abandoned() {
        let mut group = CompletionGroup::new();
        group.token().complete();
        drop(group.token());
        let result = group.wait(Duration::from_secs(5), &CancellationToken::new());
        assert_eq!(
            result,
            Err(WaitError::Abandoned {
                completed: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn cancellation_stops_the_wait() {
        let mut group = CompletionGroup::new();
        let _pending = group.token();
        let cancel = CancellationToken::new();
        let remote = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.cancel();
        });
        assert_eq!(
            group.wait(Duration::from_secs(10), &cancel),
            Err(WaitError::Cancelled)
        );
        canceller.join().unwrap();
    }
}
