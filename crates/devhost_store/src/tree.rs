//! Directory tree walker for file-tree snapshots.

use crate::clock::system_time_millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Names skipped by default when walking a project.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "node_modules"];

/// A node of a snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    /// A directory and its (sorted) children.
    Directory {
        /// Entry name (`"."` for the walk root).
        name: String,
        /// Path relative to the walk root, `/`-separated.
        path: String,
        /// Child nodes, directories first, then case-insensitive name order.
        children: Vec<TreeNode>,
    },
    /// A regular file.
    File {
        /// Entry name.
        name: String,
        /// Path relative to the walk root, `/`-separated.
        path: String,
        /// Size in bytes.
        size: u64,
        /// Modification time in epoch milliseconds.
        mtime: i64,
    },
}

impl TreeNode {
    /// Returns the node's name.
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Directory { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    /// Returns the node's relative path.
    pub fn path(&self) -> &str {
        match self {
            TreeNode::Directory { path, .. } | TreeNode::File { path, .. } => path,
        }
    }

    /// Returns true for directory nodes.
    pub fn is_directory(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    /// Returns the children of a directory node (empty for files).
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Directory { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }

    /// Counts the files below (and including) this node.
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::Directory { children, .. } => children.iter().map(TreeNode::file_count).sum(),
            TreeNode::File { .. } => 1,
        }
    }
}

/// Options controlling a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Entry names skipped entirely, subtrees included.
    pub excludes: BTreeSet<String>,
}

impl TreeOptions {
    /// Creates options with no excludes at all.
    pub fn empty() -> Self {
        Self {
            excludes: BTreeSet::new(),
        }
    }

    /// Adds a name to skip.
    pub fn with_exclude(mut self, name: impl Into<String>) -> Self {
        self.excludes.insert(name.into());
        self
    }

    /// Adds several names to skip.
    pub fn with_excludes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Returns true if entries with this name are skipped.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excludes.contains(name)
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::empty().with_excludes(DEFAULT_EXCLUDES.iter().copied())
    }
}

/// Walks `root` and returns its tree.
///
/// Symlinks and special files are skipped. Files whose metadata cannot be
/// read are skipped. A directory that cannot be listed becomes a childless
/// node instead of failing the walk.
pub fn walk(root: &Path, options: &TreeOptions) -> TreeNode {
    walk_dir(root, ".".to_string(), ".".to_string(), options)
}

fn walk_dir(dir: &Path, name: String, rel: String, options: &TreeOptions) -> TreeNode {
    let mut children = Vec::new();

    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(err) => {
            tracing::debug!(path = %dir.display(), error = %err, "cannot list directory");
            return TreeNode::Directory {
                name,
                path: rel,
                children,
            };
        }
    };

    for entry in listing.flatten() {
        let Ok(child_name) = entry.file_name().into_string() else {
            tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 name");
            continue;
        };
        if options.is_excluded(&child_name) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let child_rel = if rel == "." {
            child_name.clone()
        } else {
            format!("{rel}/{child_name}")
        };

        if file_type.is_dir() {
            children.push(walk_dir(&entry.path(), child_name, child_rel, options));
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(meta) => children.push(TreeNode::File {
                    name: child_name,
                    path: child_rel,
                    size: meta.len(),
                    mtime: meta.modified().map(system_time_millis).unwrap_or(0),
                }),
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "skipping unreadable file");
                }
            }
        }
    }

    children.sort_by(|a, b| {
        b.is_directory()
            .cmp(&a.is_directory())
            .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
    });

    TreeNode::Directory {
        name,
        path: rel,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children().iter().map(TreeNode::name).collect()
    }

    #[test]
    fn directories_first_then_case_insensitive() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("A.txt"), b"aa").unwrap();
        fs::create_dir(root.join("zeta")).unwrap();
        fs::create_dir(root.join("Alpha")).unwrap();

        let tree = walk(root, &TreeOptions::empty());
        assert_eq!(names(&tree), vec!["Alpha", "zeta", "A.txt", "b.txt"]);
        assert_eq!(tree.name(), ".");
        assert_eq!(tree.path(), ".");
    }

    #[test]
    fn nested_paths_are_relative() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src").join("bin")).unwrap();
        fs::write(root.join("src").join("bin").join("main.rs"), b"fn main() {}").unwrap();

        let tree = walk(root, &TreeOptions::empty());
        let src = &tree.children()[0];
        assert_eq!(src.path(), "src");
        let bin = &src.children()[0];
        assert_eq!(bin.path(), "src/bin");
        match &bin.children()[0] {
            TreeNode::File { path, size, mtime, .. } => {
                assert_eq!(path, "src/bin/main.rs");
                assert_eq!(*size, 12);
                assert!(*mtime > 0);
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn excluded_names_skip_subtrees() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".git").join("objects")).unwrap();
        fs::create_dir_all(root.join("node_modules").join("pkg")).unwrap();
        fs::write(root.join("keep.md"), b"#").unwrap();
        fs::write(root.join("skip.json"), b"{}").unwrap();

        let options = TreeOptions::default().with_exclude("skip.json");
        let tree = walk(root, &options);
        assert_eq!(names(&tree), vec!["keep.md"]);
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn missing_root_is_childless() {
        let temp = tempdir().unwrap();
        let tree = walk(&temp.path().join("nope"), &TreeOptions::default());
        assert!(tree.is_directory());
        assert!(tree.children().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        use std::os::unix::fs::symlink;

        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real").join("a.txt"), b"a").unwrap();
        symlink(root.join("real"), root.join("dir-link")).unwrap();
        symlink(root.join("real").join("a.txt"), root.join("file-link")).unwrap();
        symlink(root.join("gone"), root.join("dangling")).unwrap();

        let tree = walk(root, &TreeOptions::default());
        assert_eq!(names(&tree), vec!["real"]);
        assert_eq!(tree.file_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_directory_is_childless() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret.txt"), b"s").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can list it anyway.
        let listable = fs::read_dir(&locked).is_ok();
        let tree = walk(temp.path(), &TreeOptions::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(names(&tree), vec!["locked"]);
        assert!(tree.children()[0].is_directory());
        if !listable {
            assert!(tree.children()[0].children().is_empty());
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let node = TreeNode::File {
            name: "a".into(),
            path: "a".into(),
            size: 1,
            mtime: 2,
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["size"], 1);

        let dir = TreeNode::Directory {
            name: ".".into(),
            path: ".".into(),
            children: vec![node],
        };
        let value = serde_json::to_value(&dir).unwrap();
        assert_eq!(value["type"], "directory");
        assert_eq!(value["children"][0]["name"], "a");
    }
}
