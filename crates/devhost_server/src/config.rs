//! Server configuration.

use devhost_store::{FILETREE_FILE, GUESTBOOK_FILE};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Project root: static files are served from here and both documents
    /// live here.
    pub root: PathBuf,
    /// Guestbook file name, relative to `root`.
    pub guestbook_file: String,
    /// Snapshot file name, relative to `root`.
    pub filetree_file: String,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Creates a configuration serving `root` on the default address.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            root: root.into(),
            guestbook_file: GUESTBOOK_FILE.to_string(),
            filetree_file: FILETREE_FILE.to_string(),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the full path of the guestbook file.
    pub fn guestbook_path(&self) -> PathBuf {
        self.root.join(&self.guestbook_file)
    }

    /// Returns the full path of the snapshot file.
    pub fn filetree_path(&self) -> PathBuf {
        self.root.join(&self.filetree_file)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
