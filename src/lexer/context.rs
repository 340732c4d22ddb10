//! Cancellation signal for a lexer run.
//!
//! A `Context` fires when its `Canceller` is cancelled or dropped, or when
//! its deadline passes. The lexer checks it at every token emission.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::errors::errors::CancelCause;

#[derive(Debug, Clone)]
pub struct Context {
    done: Receiver<()>,
    deadline: Option<Instant>,
}

/// Fires its `Context` on `cancel()` or when dropped.
#[derive(Debug)]
pub struct Canceller {
    _signal: Sender<()>,
}

impl Canceller {
    pub fn cancel(self) {
        drop(self);
    }
}

impl Context {
    /// A context that never fires.
    pub fn background() -> Self {
        Context {
            done: channel::never(),
            deadline: None,
        }
    }

    pub fn with_cancel() -> (Self, Canceller) {
        // nothing is ever sent; dropping the sender disconnects `done`
        let (signal, done) = channel::bounded(0);
        (
            Context {
                done,
                deadline: None,
            },
            Canceller { _signal: signal },
        )
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Context::background().deadline_at(deadline)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Context::with_deadline(Instant::now() + timeout)
    }

    /// Adds a deadline, keeping an earlier one if already set.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Becomes ready (disconnected) once the context is cancelled.
    pub(crate) fn done(&self) -> &Receiver<()> {
        &self.done
    }

    /// Why the context fired, or `None` while it is live.
    pub fn err(&self) -> Option<CancelCause> {
        if let Err(TryRecvError::Disconnected) = self.done.try_recv() {
            return Some(CancelCause::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}
