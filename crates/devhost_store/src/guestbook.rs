//! Guestbook document store.
//!
//! The guestbook is a JSON array persisted in full on every mutation.
//! Entries appended through [`GuestbookStore::append`] always have the
//! [`GuestbookEntry`] shape, but [`GuestbookStore::replace`] accepts any
//! array, so the collection is handled as raw JSON values.
//!
//! Ids are not required to be unique. Duplicates supplied by a client are
//! kept as-is, and [`GuestbookStore::remove`] drops every entry carrying
//! the given id.

use crate::clock::now_millis;
use crate::document::DocumentFile;
use crate::error::{StoreError, StoreResult};
use crate::observer::{Commit, CommitObserver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default guestbook file name, relative to the project root.
pub const GUESTBOOK_FILE: &str = "guestbook.json";

/// Name used when a submission carries no `name`.
pub const DEFAULT_NAME: &str = "Guest";

/// A stored guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookEntry {
    /// Entry id, unique by convention only.
    pub id: String,
    /// Author name.
    pub name: String,
    /// Message body.
    pub msg: String,
    /// Creation time in epoch milliseconds.
    pub t: i64,
}

/// An id supplied by a client, either as a string or a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// A string id.
    Text(String),
    /// A numeric id, stored in its decimal form.
    Number(serde_json::Number),
}

impl EntryId {
    fn into_string(self) -> String {
        match self {
            EntryId::Text(text) => text,
            EntryId::Number(number) => number.to_string(),
        }
    }
}

/// A guestbook submission. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewEntry {
    /// Author name.
    #[serde(default)]
    pub name: Option<String>,
    /// Message body.
    #[serde(default)]
    pub msg: Option<String>,
    /// Client-chosen id.
    #[serde(default)]
    pub id: Option<EntryId>,
    /// Client-chosen timestamp in epoch milliseconds.
    #[serde(default)]
    pub t: Option<i64>,
}

impl NewEntry {
    /// Creates a submission with a name and a message.
    pub fn new(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Sets the client-chosen id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(EntryId::Text(id.into()));
        self
    }

    /// Sets the client-chosen timestamp.
    pub fn with_time(mut self, t: i64) -> Self {
        self.t = Some(t);
        self
    }

    /// Decodes a submission from a request body.
    ///
    /// An empty body is an empty submission. Anything that is not a JSON
    /// object with string `name`/`msg` fields is a validation error.
    pub fn from_json(body: &[u8]) -> StoreResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| StoreError::validation(format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(StoreError::validation("expected a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| StoreError::validation(e.to_string()))
    }

    fn has_content(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.name) || filled(&self.msg)
    }

    /// Resolves defaults against the current time.
    fn into_entry(self, now: i64) -> GuestbookEntry {
        let id = self
            .id
            .map(EntryId::into_string)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| now.to_string());
        let t = self.t.filter(|&t| t != 0).unwrap_or(now);

        GuestbookEntry {
            id,
            name: self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            msg: self.msg.unwrap_or_default(),
            t,
        }
    }
}

/// Returns the id of a stored element in the form used for comparisons.
///
/// Strings compare as-is and numbers in decimal form. Elements without a
/// usable id (non-objects, missing or non-scalar ids) never match.
fn element_id(element: &Value) -> Option<String> {
    match element.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// The guestbook collection file.
///
/// # Thread Safety
///
/// Each read-modify-write runs under an internal mutex, so concurrent
/// requests within one process never lose each other's updates. Writers in
/// other processes still race with last-write-wins.
pub struct GuestbookStore {
    file: DocumentFile,
    lock: Mutex<()>,
    observers: Vec<Arc<dyn CommitObserver>>,
}

impl GuestbookStore {
    /// Creates a store for the guestbook at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: DocumentFile::new(path),
            lock: Mutex::new(()),
            observers: Vec::new(),
        }
    }

    /// Creates a store for `guestbook.json` inside `root`.
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(GUESTBOOK_FILE))
    }

    /// Registers an observer notified after every committed write.
    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Returns the path of the guestbook file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the current collection (empty if missing or corrupt).
    pub fn entries(&self) -> StoreResult<Vec<Value>> {
        self.file.load_or_default()
    }

    /// Appends a submission and returns the stored entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if both `name` and `msg` are
    /// absent or empty. The collection is left unchanged in that case.
    pub fn append(&self, submission: NewEntry) -> StoreResult<GuestbookEntry> {
        if !submission.has_content() {
            return Err(StoreError::validation("name or msg is required"));
        }

        let _guard = self.lock.lock();
        let mut entries: Vec<Value> = self.file.load_or_default()?;
        let entry = submission.into_entry(now_millis());
        entries.push(serde_json::to_value(&entry)?);

        self.commit(&entries, format!("guestbook: add entry {} from {}", entry.id, entry.name))?;
        Ok(entry)
    }

    /// Removes every entry whose id equals `id`.
    ///
    /// Always succeeds, and returns how many entries were dropped. The file
    /// is rewritten even when nothing matched, but observers are only
    /// notified when the collection actually changed.
    pub fn remove(&self, id: &str) -> StoreResult<usize> {
        let _guard = self.lock.lock();
        let entries: Vec<Value> = self.file.load_or_default()?;
        let before = entries.len();
        let kept: Vec<Value> = entries
            .into_iter()
            .filter(|element| element_id(element).as_deref() != Some(id))
            .collect();
        let removed = before - kept.len();

        if removed == 0 {
            self.file.write_pretty(&kept)?;
            tracing::debug!(id, "guestbook remove matched nothing");
        } else {
            self.commit(&kept, format!("guestbook: remove entry {id}"))?;
        }
        Ok(removed)
    }

    /// Overwrites the collection with a raw JSON array.
    ///
    /// Returns the number of elements written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `raw` is not a JSON array.
    pub fn replace(&self, raw: &[u8]) -> StoreResult<usize> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| StoreError::validation(format!("invalid JSON: {e}")))?;
        let Value::Array(entries) = value else {
            return Err(StoreError::validation("expected array"));
        };

        let _guard = self.lock.lock();
        self.commit(&entries, format!("guestbook: replace with {} entries", entries.len()))?;
        Ok(entries.len())
    }

    /// Writes the collection and notifies observers. Callers hold the lock.
    fn commit(&self, entries: &[Value], message: String) -> StoreResult<()> {
        let contents = serde_json::to_vec_pretty(entries)?;
        self.file.write_raw(&contents)?;
        tracing::debug!(path = %self.path().display(), entries = entries.len(), %message, "guestbook committed");

        if self.observers.is_empty() {
            return Ok(());
        }
        let commit = Commit {
            document: self.file.file_name().unwrap_or(GUESTBOOK_FILE).to_string(),
            contents,
            message,
        };
        for observer in &self.observers {
            observer.on_commit(&commit);
        }
        Ok(())
    }
}

impl std::fmt::Debug for GuestbookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestbookStore")
            .field("path", &self.file.path())
            .field("observers", &self.observers.len())
            .finish()
    }
}
