//! Post-commit notifications.
//!
//! Stores call their observers after a write has landed on disk. Observers
//! run on the writer's thread, so implementations must hand slow work
//! (network calls) off elsewhere and must not panic. Nothing an observer
//! does can change the outcome of the write that triggered it.

use parking_lot::Mutex;

/// A successfully committed document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// File name of the document (e.g. `guestbook.json`).
    pub document: String,
    /// The exact bytes now stored on disk.
    pub contents: Vec<u8>,
    /// Human-readable description of the change.
    pub message: String,
}

/// Receives notifications for committed writes.
pub trait CommitObserver: Send + Sync {
    /// Called once per successful write, after the file has been replaced.
    fn on_commit(&self, commit: &Commit);
}

/// An observer that records every commit in memory.
///
/// Useful for testing.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    commits: Mutex<Vec<Commit>>,
}

impl MemoryObserver {
    /// Creates a new, empty observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded commits, oldest first.
    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().clone()
    }

    /// Returns the number of recorded commits.
    pub fn len(&self) -> usize {
        self.commits.lock().len()
    }

    /// Returns true if no commits were recorded.
    pub fn is_empty(&self) -> bool {
        self.commits.lock().is_empty()
    }
}

impl CommitObserver for MemoryObserver {
    fn on_commit(&self, commit: &Commit) {
        self.commits.lock().push(commit.clone());
    }
}
