//! Reset-build command implementation.

use devhost_store::SnapshotStore;
use std::path::Path;

/// Runs the reset-build command.
pub fn run(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::in_root(root);
    let marker = store.reset_build_marker()?;
    println!(
        "Reset {} to build {} at {}",
        store.path().display(),
        marker.build,
        marker.build_time
    );
    Ok(())
}
