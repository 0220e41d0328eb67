//! # Progress and Cancellation
//!
//! Long operations (import, subdivision, slicing) report progress through a
//! shared [`Progress`] handle. Observers on other threads read the tick
//! counters without locking and may request cancellation; workers poll the
//! flag at their own safe points via [`Progress::checkpoint`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AmfError, AmfResult};

#[derive(Debug, Default)]
struct ProgressCells {
    cancel: AtomicBool,
    current: AtomicU64,
    max: AtomicU64,
    status: RwLock<String>,
}

/// Cloneable handle to the progress cells of one worker.
///
/// ```
/// use amf_doc::Progress;
///
/// let progress = Progress::new();
/// let observer = progress.clone();
///
/// progress.begin(10, "Importing");
/// progress.advance(3);
/// assert_eq!(observer.snapshot().current, 3);
///
/// observer.cancel();
/// assert!(progress.checkpoint().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Progress {
    cells: Arc<ProgressCells>,
}

/// A point-in-time copy of the progress cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub max: u64,
    pub status: String,
    pub cancelled: bool,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new unit of work: resets the current tick, sets the maximum
    /// and the status message. The cancellation flag is left alone so a
    /// cancel issued before the call is still honoured.
    pub fn begin(&self, max: u64, status: impl Into<String>) {
        self.cells.current.store(0, Ordering::Release);
        self.cells.max.store(max, Ordering::Release);
        *self.cells.status.write() = status.into();
    }

    /// Adds `ticks` to the current tick.
    pub fn advance(&self, ticks: u64) {
        self.cells.current.fetch_add(ticks, Ordering::AcqRel);
    }

    /// Requests cancellation of the running operation.
    pub fn cancel(&self) {
        self.cells.cancel.store(true, Ordering::Release);
    }

    /// Clears a previous cancellation request.
    pub fn reset_cancel(&self) {
        self.cells.cancel.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cells.cancel.load(Ordering::Acquire)
    }

    /// Safe point: fails with [`AmfError::Cancelled`] once cancellation has
    /// been requested.
    pub fn checkpoint(&self) -> AmfResult<()> {
        if self.is_cancelled() {
            Err(AmfError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn current(&self) -> u64 {
        self.cells.current.load(Ordering::Acquire)
    }

    pub fn max(&self) -> u64 {
        self.cells.max.load(Ordering::Acquire)
    }

    pub fn status(&self) -> String {
        self.cells.status.read().clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            current: self.current(),
            max: self.max(),
            status: self.status(),
            cancelled: self.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_begin_resets_ticks() {
        let progress = Progress::new();
        progress.begin(5, "a");
        progress.advance(5);
        progress.begin(8, "b");
        let snap = progress.snapshot();
        assert_eq!(snap.current, 0);
        assert_eq!(snap.max, 8);
        assert_eq!(snap.status, "b");
    }

    #[test]
    fn test_checkpoint_follows_cancel_flag() {
        let progress = Progress::new();
        progress.begin(3, "work");
        assert!(progress.checkpoint().is_ok());
        progress.cancel();
        assert_eq!(progress.checkpoint(), Err(AmfError::Cancelled));
        assert!(progress.snapshot().cancelled);
        progress.reset_cancel();
        assert!(progress.checkpoint().is_ok());
    }

    #[test]
    fn test_observed_from_another_thread() {
        let progress = Progress::new();
        progress.begin(1000, "counting");
        let worker = progress.clone();
        let handle = thread::spawn(move || {
            for _ in 0..1000 {
                worker.advance(1);
            }
        });
        handle.join().unwrap();
        assert_eq!(progress.current(), 1000);
    }
}
