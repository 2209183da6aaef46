//! # devhost Store
//!
//! JSON document stores for devhost.
//!
//! This crate provides:
//! - [`DocumentFile`]: tolerant load-or-default reads and atomic
//!   write-then-rename replacement of a whole JSON file
//! - [`GuestbookStore`]: append/remove/replace on the guestbook array
//! - [`SnapshotStore`]: generate/reset/replace on the file-tree snapshot
//!   and its build marker
//! - [`CommitObserver`]: post-commit notifications for guestbook writes
//!
//! ## Key Invariants
//!
//! - Documents are read and written whole; readers never see a partial file
//! - A corrupt document reads as the empty/default state, never as an error
//! - Read-modify-write sequences are serialized per store
//! - `build` is a positive integer once the snapshot exists
//!
//! ## Example
//!
//! ```rust,no_run
//! use devhost_store::{GuestbookStore, NewEntry};
//! use std::path::Path;
//!
//! let store = GuestbookStore::in_root(Path::new("."));
//! let entry = store.append(NewEntry::new("Ann", "hi")).unwrap();
//! assert_eq!(entry.name, "Ann");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod clock;
mod document;
mod error;
mod guestbook;
mod observer;
mod snapshot;
mod tree;

pub use clock::now_millis;
pub use document::{DocumentFile, DocumentState};
pub use error::{StoreError, StoreResult};
pub use guestbook::{EntryId, GuestbookEntry, GuestbookStore, NewEntry, DEFAULT_NAME, GUESTBOOK_FILE};
pub use observer::{Commit, CommitObserver, MemoryObserver};
pub use snapshot::{BuildMarker, SnapshotStore, FILETREE_FILE};
pub use tree::{walk, TreeNode, TreeOptions, DEFAULT_EXCLUDES};
