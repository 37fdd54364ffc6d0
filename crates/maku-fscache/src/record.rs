//! Snapshot records and their ordering contracts.

use std::cmp::Ordering;

use crate::fs::FileMode;
use crate::paths;

/// One scanned filesystem entry: canonical slash-separated path relative to
/// the scan root, plus its type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub mode: FileMode,
}

/// The two immutable captures published by a successful scan.
///
/// Both sequences cover the same walk, in different orders, because the
/// queries need different access patterns and re-sorting in place would
/// race with concurrent readers:
///
/// - `files`: every visited entry, sorted lexicographically by path, for
///   prefix-range subtree lookups.
/// - `leaves`: entries matching a configured leaf basename plus one
///   synthesized directory record per distinct leaf ancestor, sorted by
///   [`leaf_order`] for breadth-first traversal without re-walking.
///
/// Once published behind an `Arc`, a snapshot is never mutated; readers
/// need no further synchronization.
#[derive(Debug)]
pub struct Snapshots {
    pub files: Vec<FileRecord>,
    pub leaves: Vec<FileRecord>,
}

/// Ordering contract of the leaf snapshot: depth ascending, then parent
/// directory (slash-terminated) ascending, then files before directories,
/// then path ascending.
///
/// Depth-first grouping puts every directory's own leaf candidates ahead of
/// anything deeper, which is what lets the leaf query expand a directory
/// with one binary search and a short forward scan.
pub(crate) fn leaf_order(a: &FileRecord, b: &FileRecord) -> Ordering {
    paths::slash_depth(&a.path)
        .cmp(&paths::slash_depth(&b.path))
        .then_with(|| paths::cmp_with_slash(paths::dir_name(&a.path), paths::dir_name(&b.path)))
        .then_with(|| a.mode.is_dir().cmp(&b.mode.is_dir()))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, mode: FileMode) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            mode,
        }
    }

    #[test]
    fn leaf_order_depth_first() {
        let shallow = rec("z/Android.mk", FileMode::Regular);
        let deep = rec("a/b/Android.mk", FileMode::Regular);
        assert_eq!(leaf_order(&shallow, &deep), Ordering::Less);
    }

    #[test]
    fn leaf_order_groups_by_parent() {
        let a = rec("a/x/Android.mk", FileMode::Regular);
        let b = rec("a/y/Android.mk", FileMode::Regular);
        assert_eq!(leaf_order(&a, &b), Ordering::Less);
    }

    #[test]
    fn leaf_order_files_before_dirs() {
        let file = rec("a/Android.mk", FileMode::Regular);
        let dir = rec("a/zz", FileMode::Dir);
        // Same depth, same parent: the file sorts first even though its
        // path is lexicographically smaller than the dir's.
        assert_eq!(leaf_order(&file, &dir), Ordering::Less);
        let dir_small = rec("a/aa", FileMode::Dir);
        assert_eq!(leaf_order(&file, &dir_small), Ordering::Less);
    }

    #[test]
    fn leaf_order_parent_uses_slash_termination() {
        // Parent "a.b" precedes parent "a" once slash-terminated is the
        // comparison key ('.' < '/'), even though "a" < "a.b" as strings.
        let under_adotb = rec("a.b/Android.mk", FileMode::Regular);
        let under_a = rec("a/Android.mk", FileMode::Regular);
        assert_eq!(leaf_order(&under_adotb, &under_a), Ordering::Less);
    }
}
