//! Filesystem abstractions used by the tree analyzers.

use std::ffi::OsString;
use std::fs::FileType;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Kind of a walked tree entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Dir,
}

/// An entry discovered below a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Build a file entry.
    pub fn file(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            kind: EntryKind::File,
        }
    }

    /// Build a directory entry.
    pub fn dir(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
            kind: EntryKind::Dir,
        }
    }

    /// Whether the entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Lower-cased file name of the entry.
    pub fn file_name_lower(&self) -> String {
        self.relative
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Parent directory relative to the walk root, `/`-separated.
    pub fn parent_display(&self) -> String {
        self.relative
            .parent()
            .map(slash_path)
            .unwrap_or_default()
    }
}

/// Abstraction over filesystem access for testability.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// Walk the tree below `root`, pruning directories whose name starts with a dot.
    ///
    /// Entries of a directory are returned in name order, files and
    /// directories of a directory before anything nested inside them.
    fn walk(&self, root: &Path) -> Result<Vec<TreeEntry>>;
    /// Read a file, replacing invalid UTF-8 sequences.
    fn read_lossy(&self, path: &Path) -> Result<String>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a new standard filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn walk(&self, root: &Path) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        walk_dir(root, Path::new(""), &mut entries)?;
        Ok(entries)
    }

    fn read_lossy(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn walk_dir(root: &Path, relative: &Path, out: &mut Vec<TreeEntry>) -> Result<()> {
    let children = read_children(&root.join(relative))?;
    push_children(root, relative, children, out);
    Ok(())
}

// Only the walk root is fatal; unreadable subdirectories are skipped.
fn push_children(
    root: &Path,
    relative: &Path,
    children: Vec<(OsString, FileType)>,
    out: &mut Vec<TreeEntry>,
) {
    let mut subdirs = Vec::new();
    for (name, file_type) in children {
        let child = relative.join(&name);
        if file_type.is_dir() {
            if is_hidden(&child) {
                continue;
            }
            out.push(TreeEntry::dir(child.clone()));
            subdirs.push(child);
        } else if file_type.is_file() {
            out.push(TreeEntry::file(child));
        }
    }

    for dir in subdirs {
        match read_children(&root.join(&dir)) {
            Ok(children) => push_children(root, &dir, children, out),
            Err(err) => log::warn!("skipping unreadable directory {}: {err}", dir.display()),
        }
    }
}

fn read_children(dir: &Path) -> io::Result<Vec<(OsString, FileType)>> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        children.push((entry.file_name(), entry.file_type()?));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

/// Whether the final component of `path` starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Render a relative path with `/` separators.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
