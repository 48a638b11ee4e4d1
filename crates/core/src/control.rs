//! Cooperative pause/resume/cancel for long-running operations.
//!
//! An [`OperationControl`] is created per operation and shared (via `Arc`)
//! between the worker running it and whoever services user requests. The
//! worker calls [`OperationControl::checkpoint`] before each item; that is the
//! only place an operation can stop or suspend.
//!
//! # States
//!
//! ```text
//!            pause()              cancel()
//!  Running ----------> Paused -------------> Canceled
//!     ^                  |                      ^
//!     +---- resume() ----+                      |
//!     +-----------------------------------------+
//!                      cancel()
//! ```
//!
//! Cancel wakes a paused worker, so a paused-then-canceled operation never
//! deadlocks. Canceled is terminal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct ControlState {
    paused: bool,
    canceled: bool,
}

/// Pause/cancel signal pair for one operation.
#[derive(Debug, Default)]
pub struct OperationControl {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl OperationControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // State is two flags; a panicking holder cannot leave it inconsistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request suspension at the next checkpoint. No effect once canceled.
    pub fn pause(&self) {
        let mut state = self.lock();
        if !state.canceled {
            state.paused = true;
        }
    }

    /// Release a paused worker.
    pub fn resume(&self) {
        let mut state = self.lock();
        state.paused = false;
        self.wake.notify_all();
    }

    /// Request termination at the next checkpoint, waking a paused worker.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.canceled = true;
        state.paused = false;
        self.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_canceled(&self) -> bool {
        self.lock().canceled
    }

    /// Block while paused; fail with [`Error::Canceled`] once canceled.
    pub fn checkpoint(&self) -> Result<()> {
        let mut state = self.lock();
        if state.paused && !state.canceled {
            debug!("operation paused");
            while state.paused && !state.canceled {
                state = self
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if !state.canceled {
                debug!("operation resumed");
            }
        }
        if state.canceled {
            return Err(Error::Canceled);
        }
        Ok(())
    }
}

/// Removes files an operation created unless the operation commits.
///
/// Every exit path that does not reach [`OutputGuard::commit`] (error,
/// cancellation, panic unwinding) deletes the tracked paths on drop.
#[derive(Debug, Default)]
pub struct OutputGuard {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    committed: bool,
}

impl OutputGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal. Call before creating the file.
    ///
    /// Tracking the same path twice is a no-op.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.seen.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Keep every tracked file.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.paths.iter().rev() {
            remove_partial(path);
        }
    }
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => warn!("removed partial output {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove partial output {}: {}", path.display(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_checkpoint_running() {
        let control = OperationControl::new();
        assert!(control.checkpoint().is_ok());
        assert!(!control.is_paused());
        assert!(!control.is_canceled());
    }

    #[test]
    fn test_cancel_is_terminal() {
        let control = OperationControl::new();
        control.cancel();
        assert!(control.checkpoint().unwrap_err().is_canceled());
        control.resume();
        assert!(control.checkpoint().is_err());
        control.pause();
        assert!(!control.is_paused());
    }

    #[test]
    fn test_pause_blocks_until_resume() {
        let control = Arc::new(OperationControl::new());
        control.pause();

        let passed = Arc::new(AtomicBool::new(false));
        let worker = {
            let control = Arc::clone(&control);
            let passed = Arc::clone(&passed);
            thread::spawn(move || {
                let result = control.checkpoint();
                passed.store(true, Ordering::SeqCst);
                result
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!passed.load(Ordering::SeqCst));

        control.resume();
        assert!(worker.join().unwrap().is_ok());
        assert!(passed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_wakes_paused_worker() {
        let control = Arc::new(OperationControl::new());
        control.pause();

        let worker = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.checkpoint())
        };

        thread::sleep(Duration::from_millis(20));
        control.cancel();
        let result = worker.join().unwrap();
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[test]
    fn test_guard_removes_uncommitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        {
            let mut guard = OutputGuard::new();
            guard.track(&path);
            fs::write(&path, b"half").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_keeps_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.bin");
        let mut guard = OutputGuard::new();
        guard.track(&path);
        guard.track(&path);
        assert_eq!(guard.paths().len(), 1);
        fs::write(&path, b"whole").unwrap();
        guard.commit();
        assert!(path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = OutputGuard::new();
        guard.track(dir.path().join("never-created"));
        drop(guard);
    }
}
