//! String-level helpers over canonical slash-separated paths.
//!
//! Snapshot records and cache keys are plain `String`s relative to the scan
//! root, so these helpers operate on `&str` instead of `std::path::Path`
//! and are deliberately byte-cheap: the index orderings call them inside
//! sort comparators and binary searches.

use std::cmp::Ordering;

/// Normalize a path for use as a cache key or query root.
///
/// Iterative over segments: collapses duplicate separators, drops `.`
/// segments, strips any trailing separator, and maps the empty path to
/// `"."`. `..` segments are kept: folding them lexically would be wrong
/// across symlinks.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut out = String::with_capacity(path.len());
    if rooted {
        out.push('/');
    }
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            seg => {
                if out.len() > usize::from(rooted) {
                    out.push('/');
                }
                out.push_str(seg);
            }
        }
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// The directory portion of a path: everything before the last `/`,
/// `"."` when there is none.
pub fn dir_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// The basename of a path: everything after the last `/`.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// The extension of a basename, including the leading dot; `""` when the
/// name has no dot.
pub fn ext_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) => &name[i..],
        None => "",
    }
}

/// Number of separators in a path; the depth key of the leaf ordering.
pub fn slash_depth(path: &str) -> usize {
    path.bytes().filter(|&b| b == b'/').count()
}

/// Join a directory prefix and an entry name the way glob results are
/// spelled: no separator after the empty prefix or the root.
pub fn join(dir: &str, name: &str) -> String {
    match dir {
        "" => name.to_string(),
        "/" => format!("/{name}"),
        _ => format!("{dir}/{name}"),
    }
}

/// Compare `a + "/"` against `b + "/"` without allocating.
///
/// The leaf ordering keys directories by their slash-terminated spelling,
/// which orders `"a/"` after `"a.b/"` even though `"a"` precedes `"a.b"`.
pub fn cmp_with_slash(a: &str, b: &str) -> Ordering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let n = ab.len().min(bb.len());
    match ab[..n].cmp(&bb[..n]) {
        Ordering::Equal => {
            if ab.len() == bb.len() {
                Ordering::Equal
            } else if ab.len() < bb.len() {
                b'/'.cmp(&bb[n]).then(Ordering::Less)
            } else {
                ab[n].cmp(&b'/').then(Ordering::Greater)
            }
        }
        ord => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_basics() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("."), ".");
        assert_eq!(clean("./"), ".");
        assert_eq!(clean("a/b"), "a/b");
        assert_eq!(clean("./a/b"), "a/b");
        assert_eq!(clean("a//b"), "a/b");
        assert_eq!(clean("a/./b"), "a/b");
        assert_eq!(clean("a/b/"), "a/b");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("/a/b"), "/a/b");
    }

    #[test]
    fn clean_keeps_dotdot() {
        assert_eq!(clean("a/../b"), "a/../b");
        assert_eq!(clean(".."), "..");
        assert_eq!(clean("../a"), "../a");
    }

    #[test]
    fn dir_and_base() {
        assert_eq!(dir_name("a/b/c"), "a/b");
        assert_eq!(dir_name("a"), ".");
        assert_eq!(dir_name("/a"), "/");
        assert_eq!(base_name("a/b/c"), "c");
        assert_eq!(base_name("a"), "a");
    }

    #[test]
    fn extensions() {
        assert_eq!(ext_of("main.c"), ".c");
        assert_eq!(ext_of("archive.tar.gz"), ".gz");
        assert_eq!(ext_of("Makefile"), "");
        assert_eq!(ext_of(".hidden"), ".hidden");
    }

    #[test]
    fn depth_counts_separators() {
        assert_eq!(slash_depth("a"), 0);
        assert_eq!(slash_depth("a/b"), 1);
        assert_eq!(slash_depth("a/b/c/"), 3);
        assert_eq!(slash_depth(""), 0);
    }

    #[test]
    fn join_spellings() {
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("/", "x"), "/x");
        assert_eq!(join("a/b", "x"), "a/b/x");
    }

    #[test]
    fn cmp_with_slash_matches_allocating_form() {
        let cases = [
            ("a", "a"),
            ("a", "a.b"),
            ("a.b", "a"),
            ("a", "ab"),
            ("a/b", "a"),
            ("src", "src-old"),
            ("", "a"),
        ];
        for (a, b) in cases {
            let expected = format!("{a}/").cmp(&format!("{b}/"));
            assert_eq!(cmp_with_slash(a, b), expected, "{a:?} vs {b:?}");
        }
    }
}
