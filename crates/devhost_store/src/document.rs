//! Whole-file JSON documents.
//!
//! Both stores persist their state as a single JSON file that is read in
//! full and replaced in full. This module owns the two halves of that:
//!
//! - **Loading** is tolerant. A missing file and a file that does not parse
//!   as the expected shape are reported separately by
//!   [`DocumentFile::read_state`], and [`DocumentFile::load_or_default`]
//!   folds both into the type's default value.
//! - **Writing** is atomic. Data goes to a temporary file in the same
//!   directory, is synced, and is then renamed over the target, so a
//!   concurrent reader sees either the old document or the new one.

use crate::error::StoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Outcome of reading a document from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentState<T> {
    /// The file does not exist.
    Missing,
    /// The file exists but does not decode as `T`.
    Corrupt,
    /// The file decoded successfully.
    Present(T),
}

impl<T> DocumentState<T> {
    /// Returns true if the file exists on disk, parseable or not.
    pub fn exists(&self) -> bool {
        !matches!(self, DocumentState::Missing)
    }

    /// Returns the decoded value, if any.
    pub fn into_present(self) -> Option<T> {
        match self {
            DocumentState::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// A JSON document stored as one flat file.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    /// Creates a handle for the document at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name of the document, if the path has one.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Returns true if the document exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads and decodes the document.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn read_state<T: DeserializeOwned>(&self) -> StoreResult<DocumentState<T>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(DocumentState::Missing);
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&data) {
            Ok(value) => Ok(DocumentState::Present(value)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "document does not parse, treating as empty"
                );
                Ok(DocumentState::Corrupt)
            }
        }
    }

    /// Reads the document, falling back to `T::default()` when it is
    /// missing or corrupt.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> StoreResult<T> {
        Ok(self.read_state()?.into_present().unwrap_or_default())
    }

    /// Serializes `value` with two-space indentation and replaces the file.
    pub fn write_pretty<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<usize> {
        let data = serde_json::to_vec_pretty(value)?;
        self.write_raw(&data)?;
        Ok(data.len())
    }

    /// Replaces the file contents with `data` verbatim.
    ///
    /// Uses write-then-rename for atomicity:
    /// 1. Write to a temporary file next to the target
    /// 2. Sync the temporary file
    /// 3. Rename it over the target
    /// 4. Sync the directory so the rename is durable
    ///
    /// An existing file keeps its permissions. A new one gets the mode a
    /// plain create would give it.
    pub fn write_raw(&self, data: &[u8]) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let existing = match fs::metadata(&self.path) {
            Ok(meta) => Some(meta.permissions()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let mut temp = create_temp(dir)?;
        temp.write_all(data)?;
        if let Some(permissions) = existing {
            temp.as_file().set_permissions(permissions)?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        sync_directory(dir)?;

        tracing::debug!(path = %self.path.display(), bytes = data.len(), "document written");
        Ok(())
    }
}

#[cfg(unix)]
fn create_temp(dir: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    // Subject to the umask, like `File::create`.
    Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn create_temp(dir: &Path) -> io::Result<NamedTempFile> {
    Builder::new().tempfile_in(dir)
}

/// Syncs directory entries after a rename.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

/// NTFS journals metadata; there is no directory handle to sync.
#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}
