//! The four find-emulation queries over published snapshots.
//!
//! Each operation replicates one `find`/`ls` idiom that build scripts
//! depend on, down to its exclusions and early exits. All four are pure
//! reads: they binary-search into a snapshot and scan forward, never
//! touching the filesystem.

use std::collections::VecDeque;

use crate::index::FindCache;
use crate::paths;
use crate::record::FileRecord;
use crate::sink::WordSink;
use crate::CacheError;

/// Visitor verdict for one record during a subtree walk.
enum Flow {
    Continue,
    /// Skip everything under this directory record.
    SkipDir,
    /// Abandon the walk entirely.
    Stop,
}

/// Visit every record of the full snapshot inside `dir`, in path order.
///
/// Binary-searches for the start of the subtree range, then scans forward
/// while the `dir + "/"` prefix holds, honoring an active skip-prefix list
/// for `Flow::SkipDir`. A record equal to `dir` itself is visited first.
fn walk_subtree<F>(files: &[FileRecord], dir: &str, mut visit: F)
where
    F: FnMut(usize, &FileRecord) -> Flow,
{
    let start = files.partition_point(|rec| rec.path.as_str() < dir);
    let prefix = format!("{dir}/");
    let mut skipdirs: Vec<String> = Vec::new();
    'records: for (i, rec) in files.iter().enumerate().skip(start) {
        if rec.path == dir {
            match visit(i, rec) {
                Flow::Continue => continue,
                Flow::SkipDir | Flow::Stop => return,
            }
        }
        if !rec.path.starts_with(dir) {
            return;
        }
        if !rec.path.starts_with(&prefix) {
            continue;
        }
        for skip in &skipdirs {
            if rec.path.starts_with(skip) {
                continue 'records;
            }
        }
        match visit(i, rec) {
            Flow::Continue => {}
            Flow::SkipDir => skipdirs.push(format!("{}/", rec.path)),
            Flow::Stop => return,
        }
    }
}

impl FindCache {
    /// `find ./ -not -name '.*' -and -type f -and -not -type l` under `dir`.
    ///
    /// Hidden basenames, directories, and symlinks are excluded; matches
    /// are emitted as `./`-relative suffixes in snapshot (path) order.
    pub async fn find_all_under(
        &self,
        sink: &mut dyn WordSink,
        dir: &str,
    ) -> Result<(), CacheError> {
        let snaps = self.snapshots().await?;
        let dir = paths::clean(dir);
        tracing::debug!(dir = %dir, "find: all plain files under");
        let prefix = format!("{dir}/");
        walk_subtree(&snaps.files, &dir, |_, rec| {
            if paths::base_name(&rec.path).starts_with('.') {
                return Flow::Continue;
            }
            if !rec.mode.is_regular() {
                return Flow::Continue;
            }
            let name = rec.path.strip_prefix(&prefix).unwrap_or(&rec.path);
            sink.write_word(&format!("./{name}"));
            Flow::Continue
        });
        Ok(())
    }

    /// `find -L <root> -name "*<ext>" -and -not -name ".*"` run from
    /// `chdir`, where `ext` carries its leading dot.
    ///
    /// The snapshot cannot tell where a symlink leads, so a symlink
    /// anywhere in the subtree refuses the whole query: the caller falls
    /// back to a cycle-safe enumeration. Nothing is emitted unless the
    /// subtree is clean.
    pub async fn find_extension_under(
        &self,
        sink: &mut dyn WordSink,
        chdir: &str,
        root: &str,
        ext: &str,
    ) -> Result<(), CacheError> {
        let snaps = self.snapshots().await?;
        let chdir = paths::clean(chdir);
        let dir = paths::clean(&paths::join(&chdir, root));
        tracing::debug!(dir = %dir, ext = %ext, "find: by extension under");

        let mut symlink: Option<String> = None;
        let mut matched: Vec<usize> = Vec::new();
        walk_subtree(&snaps.files, &dir, |i, rec| {
            if rec.mode.is_symlink() {
                symlink = Some(rec.path.clone());
                return Flow::Stop;
            }
            matched.push(i);
            Flow::Continue
        });
        if let Some(path) = symlink {
            tracing::warn!(path = %path, "find: symlink in subtree, refusing indexed answer");
            return Err(CacheError::SymlinkFound(path));
        }

        let prefix = format!("{chdir}/");
        for &i in &matched {
            let rec = &snaps.files[i];
            let base = paths::base_name(&rec.path);
            if paths::ext_of(base) != ext {
                continue;
            }
            if base.starts_with('.') {
                continue;
            }
            let name = rec.path.strip_prefix(&prefix).unwrap_or(&rec.path);
            sink.write_word(name);
        }
        Ok(())
    }

    /// The resource-group idiom: every plain file under `dir` except
    /// sources and editor/OS droppings, pruning `.svn` metadata
    /// directories.
    ///
    /// Excluded basenames: `*.java`, `package.html`, `overview.html`,
    /// `.*.swp`, `.DS_Store`, and `*~`.
    pub async fn find_java_resources(
        &self,
        sink: &mut dyn WordSink,
        dir: &str,
    ) -> Result<(), CacheError> {
        let snaps = self.snapshots().await?;
        let dir = paths::clean(dir);
        tracing::debug!(dir = %dir, "find: java resource group under");
        let prefix = format!("{dir}/");
        walk_subtree(&snaps.files, &dir, |_, rec| {
            let base = paths::base_name(&rec.path);
            if rec.mode.is_dir() && base == ".svn" {
                return Flow::SkipDir;
            }
            if !rec.mode.is_regular() {
                return Flow::Continue;
            }
            if paths::ext_of(base) == ".java"
                || base == "package.html"
                || base == "overview.html"
                || (base.starts_with('.') && base.ends_with(".swp"))
                || base == ".DS_Store"
                || base.ends_with('~')
            {
                return Flow::Continue;
            }
            let name = rec.path.strip_prefix(&prefix).unwrap_or(&rec.path);
            sink.write_word(&format!("./{name}"));
            Flow::Continue
        });
        Ok(())
    }

    /// Breadth-first leaf search: the first `name` file found in a
    /// directory ends that directory's scan, and because files sort ahead
    /// of sub-directories in the leaf order, nothing beneath a matched
    /// directory is expanded. A match only counts at
    /// `depth >= topdepth + mindepth`; `mindepth < 0` lifts the
    /// constraint. Matches are sorted lexicographically before emission,
    /// the only query that re-sorts.
    ///
    /// `prunes` is accepted for parity with the uncached helper; pruned
    /// directories never entered the snapshot in the first place.
    pub async fn find_leaves(
        &self,
        sink: &mut dyn WordSink,
        dir: &str,
        name: &str,
        _prunes: &[String],
        mindepth: i32,
    ) -> Result<(), CacheError> {
        let snaps = self.snapshots().await?;
        let leaves = &snaps.leaves;
        let start = paths::clean(dir);
        tracing::debug!(dir = %start, name = %name, mindepth, "find: leaves under");
        let topdepth = paths::slash_depth(&start) as i32;

        let mut found: Vec<String> = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::from([start]);
        while let Some(d) = queue.pop_front() {
            let mut dirp = paths::clean(&d);
            dirp.push('/');
            if dirp == "./" {
                dirp.clear();
            }
            let depth = paths::slash_depth(&dirp) as i32;
            // The entries of this directory form one contiguous group in
            // the leaf order: same depth, same parent, files first.
            let begin = leaves.partition_point(|rec| {
                let di = paths::slash_depth(&rec.path) as i32;
                if di != depth {
                    return di < depth;
                }
                let parent = format!("{}/", paths::dir_name(&rec.path));
                if parent != dirp {
                    return parent < dirp;
                }
                rec.path.as_str() < dirp.as_str()
            });
            for rec in &leaves[begin..] {
                if paths::slash_depth(&rec.path) as i32 != depth {
                    break;
                }
                if dirp.is_empty() {
                    if rec.path.contains('/') {
                        break;
                    }
                } else if paths::dir_name(&rec.path) != &dirp[..dirp.len() - 1] {
                    break;
                }
                if mindepth < 0 || depth >= topdepth + mindepth {
                    if !rec.mode.is_dir() && paths::base_name(&rec.path) == name {
                        found.push(format!("./{}", rec.path));
                        break;
                    }
                }
                if rec.mode.is_dir() {
                    queue.push_back(rec.path.clone());
                }
            }
        }

        found.sort();
        for f in &found {
            sink.write_word(f);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::index::{FindCache, FindCacheConfig};
    use std::sync::Arc;

    fn cache_over(fs: MemoryFs, prunes: &[&str]) -> FindCache {
        FindCache::new(
            Arc::new(fs),
            FindCacheConfig {
                enabled: true,
                prunes: prunes.iter().map(|s| s.to_string()).collect(),
                leaf_names: vec![],
            },
        )
    }

    async fn all_under(cache: &FindCache, dir: &str) -> Vec<String> {
        let mut sink: Vec<String> = Vec::new();
        cache.find_all_under(&mut sink, dir).await.unwrap();
        sink
    }

    #[tokio::test]
    async fn find_all_under_skips_hidden_and_non_regular() {
        let fs = MemoryFs::new();
        fs.add_file("a/x.txt");
        fs.add_file("a/.hidden");
        fs.add_symlink("a/sub");
        fs.add_dir("a/realdir");
        fs.add_file("a/realdir/y.txt");
        fs.add_file("b/unrelated.txt");

        let cache = cache_over(fs, &[]);
        assert_eq!(
            all_under(&cache, "a").await,
            vec!["./realdir/y.txt", "./x.txt"]
        );
    }

    #[tokio::test]
    async fn find_all_under_cleans_query_dir() {
        let fs = MemoryFs::new();
        fs.add_file("a/x.txt");
        let cache = cache_over(fs, &[]);
        assert_eq!(all_under(&cache, "./a/").await, vec!["./x.txt"]);
    }

    #[tokio::test]
    async fn find_all_under_empty_subtree_is_success() {
        let fs = MemoryFs::new();
        fs.add_file("a/x.txt");
        let cache = cache_over(fs, &[]);
        assert_eq!(all_under(&cache, "missing").await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn find_all_under_does_not_cross_sibling_prefix() {
        // "ab" shares the string prefix "a" but is not inside "a".
        let fs = MemoryFs::new();
        fs.add_file("a/x.txt");
        fs.add_file("ab/y.txt");
        let cache = cache_over(fs, &[]);
        assert_eq!(all_under(&cache, "a").await, vec!["./x.txt"]);
    }

    #[tokio::test]
    async fn find_extension_under_filters_and_relativizes() {
        let fs = MemoryFs::new();
        fs.add_file("proj/src/Main.java");
        fs.add_file("proj/src/util/Helper.java");
        fs.add_file("proj/src/.Hidden.java");
        fs.add_file("proj/src/notes.txt");

        let cache = cache_over(fs, &[]);
        let mut sink: Vec<String> = Vec::new();
        cache
            .find_extension_under(&mut sink, "proj", "src", ".java")
            .await
            .unwrap();
        assert_eq!(sink, vec!["src/Main.java", "src/util/Helper.java"]);
    }

    #[tokio::test]
    async fn find_extension_under_refuses_any_symlink() {
        let fs = MemoryFs::new();
        fs.add_file("proj/src/Main.java");
        // The symlink is unrelated to .java files, but still poisons the
        // subtree.
        fs.add_symlink("proj/src/docs-link");

        let cache = cache_over(fs, &[]);
        let mut sink: Vec<String> = Vec::new();
        let err = cache
            .find_extension_under(&mut sink, "proj", "src", ".java")
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::SymlinkFound(_)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn find_extension_under_symlink_outside_subtree_is_fine() {
        let fs = MemoryFs::new();
        fs.add_file("proj/src/Main.java");
        fs.add_symlink("proj/other/link");

        let cache = cache_over(fs, &[]);
        let mut sink: Vec<String> = Vec::new();
        cache
            .find_extension_under(&mut sink, "proj", "src", ".java")
            .await
            .unwrap();
        assert_eq!(sink, vec!["src/Main.java"]);
    }

    #[tokio::test]
    async fn find_java_resources_denylist() {
        let fs = MemoryFs::new();
        fs.add_file("res/Main.java");
        fs.add_file("res/package.html");
        fs.add_file("res/overview.html");
        fs.add_file("res/.config.swp");
        fs.add_file("res/.DS_Store");
        fs.add_file("res/backup~");
        fs.add_file("res/logo.png");
        fs.add_file("res/strings.xml");
        fs.add_file("res/.svn/entries");
        fs.add_dir("res/sub/.svn");
        fs.add_file("res/sub/.svn/props");
        fs.add_file("res/sub/data.bin");

        let cache = cache_over(fs, &[]);
        let mut sink: Vec<String> = Vec::new();
        cache.find_java_resources(&mut sink, "res").await.unwrap();
        assert_eq!(
            sink,
            vec!["./logo.png", "./strings.xml", "./sub/data.bin"]
        );
    }

    fn leaf_cache(fs: MemoryFs) -> FindCache {
        FindCache::new(
            Arc::new(fs),
            FindCacheConfig {
                enabled: true,
                prunes: vec![],
                leaf_names: vec!["Android.mk".to_string()],
            },
        )
    }

    async fn leaves_of(cache: &FindCache, dir: &str, mindepth: i32) -> Vec<String> {
        let mut sink: Vec<String> = Vec::new();
        cache
            .find_leaves(&mut sink, dir, "Android.mk", &[], mindepth)
            .await
            .unwrap();
        sink
    }

    #[tokio::test]
    async fn find_leaves_mindepth_boundaries() {
        let fs = MemoryFs::new();
        fs.add_file("x/Android.mk");
        fs.add_file("a/b/c/Android.mk");
        fs.add_file("x/unrelated.c");

        let cache = leaf_cache(fs);
        assert_eq!(
            leaves_of(&cache, ".", -1).await,
            vec!["./a/b/c/Android.mk", "./x/Android.mk"]
        );
        assert_eq!(
            leaves_of(&cache, ".", 2).await,
            vec!["./a/b/c/Android.mk"]
        );
        assert_eq!(leaves_of(&cache, ".", 4).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn find_leaves_mindepth_relative_to_query_root() {
        let fs = MemoryFs::new();
        fs.add_file("a/b/c/Android.mk");
        let cache = leaf_cache(fs);
        // topdepth of "a/b" is 1; the match at depth 3 needs mindepth <= 2.
        assert_eq!(
            leaves_of(&cache, "a/b", 2).await,
            vec!["./a/b/c/Android.mk"]
        );
        assert_eq!(leaves_of(&cache, "a/b", 3).await, Vec::<String>::new());
    }

    #[tokio::test]
    async fn find_leaves_first_match_prunes_subtree() {
        let fs = MemoryFs::new();
        fs.add_file("pkg/Android.mk");
        fs.add_file("pkg/nested/Android.mk");
        fs.add_file("other/nested/Android.mk");

        let cache = leaf_cache(fs);
        // The match in "pkg" ends its scan before "pkg/nested" is
        // enqueued; the unmatched "other" subtree is still descended.
        assert_eq!(
            leaves_of(&cache, ".", -1).await,
            vec!["./other/nested/Android.mk", "./pkg/Android.mk"]
        );
    }

    #[tokio::test]
    async fn find_leaves_match_is_per_directory_not_global() {
        let fs = MemoryFs::new();
        fs.add_file("a/Android.mk");
        fs.add_file("b/Android.mk");
        fs.add_file("c/deep/Android.mk");

        let cache = leaf_cache(fs);
        assert_eq!(
            leaves_of(&cache, ".", -1).await,
            vec![
                "./a/Android.mk",
                "./b/Android.mk",
                "./c/deep/Android.mk"
            ]
        );
    }

    #[tokio::test]
    async fn find_leaves_ignores_leaf_named_directories() {
        let fs = MemoryFs::new();
        fs.add_dir("weird/Android.mk");
        fs.add_file("weird/Android.mk/Android.mk");

        let cache = leaf_cache(fs);
        // The directory record does not match; the file beneath it does.
        assert_eq!(
            leaves_of(&cache, ".", -1).await,
            vec!["./weird/Android.mk/Android.mk"]
        );
    }

    #[tokio::test]
    async fn queries_from_subdirectory_root() {
        let fs = MemoryFs::new();
        fs.add_file("top/pkg/Android.mk");
        fs.add_file("top/pkg/sub/Android.mk");
        let cache = leaf_cache(fs);
        assert_eq!(
            leaves_of(&cache, "top/pkg", -1).await,
            vec!["./top/pkg/Android.mk"]
        );
        assert_eq!(
            leaves_of(&cache, "top/pkg/sub", -1).await,
            vec!["./top/pkg/sub/Android.mk"]
        );
    }
}
