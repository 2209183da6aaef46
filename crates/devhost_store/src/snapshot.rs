//! File-tree snapshot store.
//!
//! The snapshot is a JSON object (normally the root [`TreeNode`]) with two
//! reserved keys forming the build marker:
//!
//! - `build`: positive integer, 1 on the first generation, +1 on every
//!   later generation, forced back to 1 by a reset
//! - `buildTime`: epoch milliseconds of the last mutation
//!
//! Everything else in the object is opaque to the store. A reset only
//! touches the two reserved keys, and a raw upload is written verbatim.

use crate::clock::now_millis;
use crate::document::{DocumentFile, DocumentState};
use crate::error::{StoreError, StoreResult};
use crate::tree::{self, TreeNode, TreeOptions};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default snapshot file name, relative to the project root.
pub const FILETREE_FILE: &str = "filetree.json";

const BUILD_KEY: &str = "build";
const BUILD_TIME_KEY: &str = "buildTime";

/// The `build`/`buildTime` pair embedded in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMarker {
    /// Build counter.
    pub build: u64,
    /// Epoch milliseconds of the last mutation.
    #[serde(rename = "buildTime")]
    pub build_time: i64,
}

impl BuildMarker {
    fn stamp(self, document: &mut Map<String, Value>) {
        document.insert(BUILD_KEY.to_string(), Value::from(self.build));
        document.insert(BUILD_TIME_KEY.to_string(), Value::from(self.build_time));
    }
}

/// Returns the positive `build` of a previous snapshot, if it has one.
fn previous_build(state: DocumentState<Value>) -> Option<u64> {
    state
        .into_present()?
        .get(BUILD_KEY)?
        .as_u64()
        .filter(|&build| build > 0)
}

/// The snapshot file.
///
/// Mutations run under an internal mutex; see [`crate::GuestbookStore`]
/// for the same arrangement.
#[derive(Debug)]
pub struct SnapshotStore {
    file: DocumentFile,
    lock: Mutex<()>,
}

impl SnapshotStore {
    /// Creates a store for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: DocumentFile::new(path),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store for `filetree.json` inside `root`.
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(FILETREE_FILE))
    }

    /// Returns the path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads the current build marker, if the snapshot has a valid one.
    pub fn marker(&self) -> StoreResult<Option<BuildMarker>> {
        let Some(document) = self.file.read_state::<Value>()?.into_present() else {
            return Ok(None);
        };
        let build = document.get(BUILD_KEY).and_then(Value::as_u64);
        let build_time = document.get(BUILD_TIME_KEY).and_then(Value::as_i64);
        Ok(match (build, build_time) {
            (Some(build), Some(build_time)) if build > 0 => Some(BuildMarker { build, build_time }),
            _ => None,
        })
    }

    /// Walks `root` without writing anything.
    ///
    /// The snapshot file's own name is always excluded, on top of
    /// `options`.
    pub fn scan(&self, root: &Path, options: &TreeOptions) -> TreeNode {
        match self.file.file_name() {
            Some(own) if !options.is_excluded(own) => {
                tree::walk(root, &options.clone().with_exclude(own))
            }
            _ => tree::walk(root, options),
        }
    }

    /// Walks `root` and writes a fresh snapshot with the next build number.
    pub fn generate_full(&self, root: &Path, options: &TreeOptions) -> StoreResult<BuildMarker> {
        let tree = self.scan(root, options);
        self.write_tree(&tree)
    }

    /// Writes `tree` as a fresh snapshot with the next build number.
    ///
    /// The next build is the previous snapshot's positive integer `build`
    /// plus one, or 1 if there is no usable previous value.
    pub fn write_tree(&self, tree: &TreeNode) -> StoreResult<BuildMarker> {
        let Value::Object(mut document) = serde_json::to_value(tree)? else {
            return Err(StoreError::Encode("tree did not encode as an object".into()));
        };

        let _guard = self.lock.lock();
        let build = previous_build(self.file.read_state()?).map_or(1, |build| build.saturating_add(1));
        let marker = BuildMarker {
            build,
            build_time: now_millis(),
        };
        marker.stamp(&mut document);
        self.file.write_pretty(&document)?;

        tracing::info!(path = %self.path().display(), build, files = tree.file_count(), "snapshot written");
        Ok(marker)
    }

    /// Sets `build` to 1 and `buildTime` to now, keeping every other key.
    ///
    /// A snapshot that does not parse as a JSON object is treated as an
    /// empty object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the snapshot file does not exist.
    pub fn reset_build_marker(&self) -> StoreResult<BuildMarker> {
        let _guard = self.lock.lock();
        let mut document = match self.file.read_state::<Value>()? {
            DocumentState::Missing => {
                return Err(StoreError::NotFound {
                    path: self.path().to_path_buf(),
                });
            }
            DocumentState::Present(Value::Object(document)) => document,
            DocumentState::Present(_) => {
                tracing::warn!(path = %self.path().display(), "snapshot is not an object, resetting to empty");
                Map::new()
            }
            DocumentState::Corrupt => Map::new(),
        };

        let marker = BuildMarker {
            build: 1,
            build_time: now_millis(),
        };
        marker.stamp(&mut document);
        self.file.write_pretty(&document)?;

        tracing::info!(path = %self.path().display(), "build marker reset");
        Ok(marker)
    }

    /// Overwrites the snapshot with `raw`, byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `raw` is not valid JSON.
    pub fn replace(&self, raw: &[u8]) -> StoreResult<()> {
        serde_json::from_slice::<serde::de::IgnoredAny>(raw)
            .map_err(|e| StoreError::validation(format!("invalid JSON: {e}")))?;

        let _guard = self.lock.lock();
        self.file.write_raw(raw)?;
        tracing::info!(path = %self.path().display(), bytes = raw.len(), "snapshot uploaded");
        Ok(())
    }
}
