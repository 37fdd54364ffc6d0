//! Read-only filesystem seam for the cache layer.
//!
//! Consumers hand the caches a [`BuildFs`]; the engine never touches the
//! filesystem directly. [`RealFs`] is the production backend; [`MemoryFs`]
//! backs unit tests and embedders that overlay a virtual tree.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::paths;

/// File-type tag from lstat-style metadata. Symlinks are reported as
/// symlinks, never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Dir,
    Symlink,
    Other,
}

impl FileMode {
    pub fn is_regular(self) -> bool {
        self == FileMode::Regular
    }

    pub fn is_dir(self) -> bool {
        self == FileMode::Dir
    }

    pub fn is_symlink(self) -> bool {
        self == FileMode::Symlink
    }
}

/// A single directory entry: basename plus type tag.
#[derive(Debug, Clone)]
pub struct FsEntry {
    pub name: String,
    pub mode: FileMode,
}

/// Read-only filesystem abstraction rooted at the session's scan root.
///
/// Paths are canonical slash-separated strings relative to that root;
/// `"."` (or the empty string) names the root itself. Listings are
/// returned in backend order; callers sort.
#[async_trait]
pub trait BuildFs: Send + Sync {
    /// List the basenames in a directory.
    async fn read_dir_names(&self, dir: &str) -> io::Result<Vec<String>>;

    /// List a directory with lstat-style type tags.
    async fn list_dir(&self, dir: &str) -> io::Result<Vec<FsEntry>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// RealFs
// ═══════════════════════════════════════════════════════════════════════════

/// Real-filesystem backend rooted at a directory.
pub struct RealFs {
    root: PathBuf,
}

impl RealFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        if dir.is_empty() || dir == "." {
            self.root.clone()
        } else {
            self.root.join(dir)
        }
    }
}

#[async_trait]
impl BuildFs for RealFs {
    async fn read_dir_names(&self, dir: &str) -> io::Result<Vec<String>> {
        let mut rd = tokio::fs::read_dir(self.resolve(dir)).await?;
        let mut names = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn list_dir(&self, dir: &str) -> io::Result<Vec<FsEntry>> {
        let mut rd = tokio::fs::read_dir(self.resolve(dir)).await?;
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            // DirEntry::file_type does not follow symlinks.
            let ft = entry.file_type().await?;
            let mode = if ft.is_symlink() {
                FileMode::Symlink
            } else if ft.is_dir() {
                FileMode::Dir
            } else if ft.is_file() {
                FileMode::Regular
            } else {
                FileMode::Other
            };
            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                mode,
            });
        }
        Ok(entries)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MemoryFs
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory filesystem keyed by cleaned relative path.
///
/// Thread-safe via an internal `RwLock`; all data is lost on drop. The
/// builder methods create parent directories implicitly, so tests read as
/// a flat list of paths.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: RwLock<BTreeMap<String, FileMode>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file, creating parent directories.
    pub fn add_file(&self, path: &str) {
        self.add(path, FileMode::Regular);
    }

    /// Add a directory, creating parent directories.
    pub fn add_dir(&self, path: &str) {
        self.add(path, FileMode::Dir);
    }

    /// Add a symlink entry. The target is irrelevant: this engine never
    /// follows links, it only observes that one exists.
    pub fn add_symlink(&self, path: &str) {
        self.add(path, FileMode::Symlink);
    }

    fn add(&self, path: &str, mode: FileMode) {
        let path = paths::clean(path);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut parent = paths::dir_name(&path);
        while parent != "." && parent != "/" {
            entries.entry(parent.to_string()).or_insert(FileMode::Dir);
            parent = paths::dir_name(parent);
        }
        entries.insert(path, mode);
    }

    fn list(&self, dir: &str) -> io::Result<Vec<FsEntry>> {
        let dir = paths::clean(dir);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        if dir != "." {
            match entries.get(&dir) {
                Some(FileMode::Dir) => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {dir}"),
                    ))
                }
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("not found: {dir}"),
                    ))
                }
            }
        }
        let mut out = Vec::new();
        for (path, mode) in entries.iter() {
            if paths::dir_name(path) == dir {
                out.push(FsEntry {
                    name: paths::base_name(path).to_string(),
                    mode: *mode,
                });
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl BuildFs for MemoryFs {
    async fn read_dir_names(&self, dir: &str) -> io::Result<Vec<String>> {
        Ok(self.list(dir)?.into_iter().map(|e| e.name).collect())
    }

    async fn list_dir(&self, dir: &str) -> io::Result<Vec<FsEntry>> {
        self.list(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fs_lists_by_parent() {
        let fs = MemoryFs::new();
        fs.add_file("src/main.c");
        fs.add_file("src/lib.c");
        fs.add_file("README");
        fs.add_dir("src/sub");

        let mut top = fs.read_dir_names(".").await.unwrap();
        top.sort();
        assert_eq!(top, vec!["README", "src"]);

        let mut src = fs.list_dir("src").await.unwrap();
        src.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<_> = src.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["lib.c", "main.c", "sub"]);
        assert!(src[2].mode.is_dir());
    }

    #[tokio::test]
    async fn memory_fs_missing_dir_errors() {
        let fs = MemoryFs::new();
        fs.add_file("a/x");
        assert!(fs.read_dir_names("nope").await.is_err());
        assert!(fs.list_dir("a/x").await.is_err());
    }

    #[tokio::test]
    async fn memory_fs_symlink_mode() {
        let fs = MemoryFs::new();
        fs.add_symlink("a/link");
        let entries = fs.list_dir("a").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].mode.is_symlink());
    }
}
