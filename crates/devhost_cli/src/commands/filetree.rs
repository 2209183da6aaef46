//! Filetree command implementation.

use devhost_store::{BuildMarker, SnapshotStore, StoreResult, TreeNode, TreeOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Builds walk options from the default excludes plus `extra`.
pub fn options(extra: Vec<String>) -> TreeOptions {
    TreeOptions::default().with_excludes(extra)
}

/// Validates a polling interval given in seconds.
pub fn interval(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("interval must be a positive number of seconds, got {seconds}").into());
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Runs the filetree command once.
pub fn run(root: &Path, options: &TreeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::in_root(root);
    let marker = store.generate_full(root, options)?;
    println!("Wrote {} (build {})", store.path().display(), marker.build);
    Ok(())
}

/// Rewrites the snapshot whenever the tree changes, until interrupted.
pub fn watch(
    root: &Path,
    options: &TreeOptions,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut watcher = TreeWatcher::new(root, options.clone());
    println!(
        "Watching {} every {:.1}s (Ctrl-C to stop)",
        root.display(),
        interval.as_secs_f64()
    );

    loop {
        match watcher.poll() {
            Ok(Some(marker)) => println!("Wrote {} (build {})", watcher.store.path().display(), marker.build),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to write snapshot"),
        }
        thread::sleep(interval);
    }
}

/// Polls a directory and rewrites its snapshot only when the tree differs
/// from the last one written.
pub struct TreeWatcher {
    root: PathBuf,
    options: TreeOptions,
    store: SnapshotStore,
    last: Option<TreeNode>,
}

impl TreeWatcher {
    /// Creates a watcher for `root`. The first poll always writes.
    pub fn new(root: &Path, options: TreeOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            options,
            store: SnapshotStore::in_root(root),
            last: None,
        }
    }

    /// Scans once, writing a new snapshot if anything changed.
    pub fn poll(&mut self) -> StoreResult<Option<BuildMarker>> {
        let tree = self.store.scan(&self.root, &self.options);
        if self.last.as_ref() == Some(&tree) {
            return Ok(None);
        }

        let marker = self.store.write_tree(&tree)?;
        tracing::debug!(build = marker.build, files = tree.file_count(), "tree changed");
        self.last = Some(tree);
        Ok(Some(marker))
    }
}
