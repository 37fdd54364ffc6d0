//! Lazy per-directory entry cache backing `$(wildcard ...)` expansion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use maku_glob::{contains_meta, match_pattern, unescape, PatternError};

use crate::fs::BuildFs;
use crate::paths;
use crate::sink::WordSink;

/// Memoized directory listings plus glob expansion over them.
///
/// Each distinct directory is read from the filesystem at most once per
/// session; the sorted listing (or an empty listing for an unreadable
/// directory) is cached forever after. The internal mutex is held only
/// across map access, never across a filesystem call, so a slow first read
/// of one directory does not serialize globs over other directories.
pub struct WildcardCache {
    fs: Arc<dyn BuildFs>,
    dirents: Mutex<HashMap<String, Arc<[String]>>>,
}

impl WildcardCache {
    pub fn new(fs: Arc<dyn BuildFs>) -> Self {
        Self {
            fs,
            dirents: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct directories read so far.
    pub fn dir_count(&self) -> usize {
        self.dirents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Total cached entry names across all directories.
    pub fn entry_count(&self) -> usize {
        self.dirents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|names| names.len())
            .sum()
    }

    /// Expand a wildcard pattern into matching paths, in listing order.
    ///
    /// An unreadable directory contributes an empty match set (cached, not
    /// retried); the only reported failure is a malformed pattern.
    pub async fn glob(&self, pattern: &str) -> Result<Vec<String>, PatternError> {
        let pat = unescape(pattern);
        let (dir, file) = split_pattern(&pat);
        let dirs = if contains_meta(dir) {
            self.expand_dirs(dir).await?
        } else {
            vec![dir.to_string()]
        };
        let mut matches = Vec::new();
        for d in &dirs {
            self.glob_in_dir(d, file, &mut matches).await?;
        }
        Ok(matches)
    }

    /// Expand a pattern and write each match to the evaluator's sink.
    pub async fn wildcard(
        &self,
        sink: &mut dyn WordSink,
        pattern: &str,
    ) -> Result<(), PatternError> {
        for path in self.glob(pattern).await? {
            sink.write_word(&path);
        }
        Ok(())
    }

    /// Resolve the directory portion of a pattern to concrete directories,
    /// segment by segment. Literal segments are appended without a
    /// directory read; only segments with metacharacters consult listings.
    async fn expand_dirs(&self, pattern: &str) -> Result<Vec<String>, PatternError> {
        let mut dirs = vec![if pattern.starts_with('/') {
            "/".to_string()
        } else {
            String::new()
        }];
        for seg in pattern.split('/').filter(|s| !s.is_empty()) {
            if !contains_meta(seg) {
                for d in &mut dirs {
                    *d = paths::join(d, seg);
                }
                continue;
            }
            let mut next = Vec::new();
            for d in &dirs {
                let names = self.dir_names(d).await;
                for name in names.iter() {
                    if match_pattern(seg, name)? {
                        next.push(paths::join(d, name));
                    }
                }
            }
            if next.is_empty() {
                return Ok(next);
            }
            dirs = next;
        }
        Ok(dirs)
    }

    /// Match `pattern` against one directory's listing, appending matches
    /// with the directory prefix re-attached.
    async fn glob_in_dir(
        &self,
        dir: &str,
        pattern: &str,
        matches: &mut Vec<String>,
    ) -> Result<(), PatternError> {
        let names = self.dir_names(dir).await;
        for name in names.iter() {
            if match_pattern(pattern, name)? {
                matches.push(paths::join(dir, name));
            }
        }
        Ok(())
    }

    /// Cached, sorted listing of one directory. An unreadable directory is
    /// cached as empty so the failed read is never repeated.
    async fn dir_names(&self, dir: &str) -> Arc<[String]> {
        let key = paths::clean(dir);
        {
            let dirents = self.dirents.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(names) = dirents.get(&key) {
                return names.clone();
            }
        }
        let names = match self.fs.read_dir_names(&key).await {
            Ok(mut names) => {
                names.sort();
                names
            }
            Err(err) => {
                tracing::debug!(dir = %key, %err, "wildcard: unreadable directory");
                Vec::new()
            }
        };
        let names: Arc<[String]> = names.into();
        let mut dirents = self.dirents.lock().unwrap_or_else(|e| e.into_inner());
        // First writer wins on a racing read; the listing is identical.
        dirents.entry(key).or_insert(names).clone()
    }
}

/// Split an unescaped pattern at its last separator into directory and
/// file parts. No separator yields an empty directory (the session root);
/// a leading separator alone yields the filesystem root.
fn split_pattern(pat: &str) -> (&str, &str) {
    match pat.rfind('/') {
        None => ("", pat),
        Some(0) => ("/", &pat[1..]),
        Some(i) => (&pat[..i], &pat[i + 1..]),
    }
}
