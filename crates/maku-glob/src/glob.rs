//! Pattern matching for directory-entry names.
//!
//! - `*` matches any run of characters except `/`
//! - `?` matches exactly one character except `/`
//! - `[abc]` matches any character in the set
//! - `[a-z]` matches any character in the range
//! - `[!abc]` or `[^abc]` matches any character NOT in the set
//! - `\x` matches `x` literally

use std::cell::Cell;

use crate::PatternError;

/// Maximum number of recursive calls for glob matching. Protects against
/// adversarial patterns like `*a*a*a*...*a` that cause O(n^k) backtracking.
/// Counted as total work (calls), not stack depth, to bound actual CPU cost.
const MAX_MATCH_CALLS: usize = 100_000;

/// Check if a string contains glob metacharacters (`*`, `?`, `[`).
///
/// The wildcard expander uses this to decide whether a path segment needs
/// directory matching or can be taken literally.
///
/// ```
/// use maku_glob::contains_meta;
/// assert!(contains_meta("*.c"));
/// assert!(contains_meta("src/[ab]*.h"));
/// assert!(!contains_meta("src/main.c"));
/// ```
pub fn contains_meta(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

/// Make-level unescaping of a wildcard argument.
///
/// The build language lets a backslash protect any character from its own
/// tokenizer. A backslash before a non-metacharacter is consumed here; the
/// pairs `\*`, `\?`, `\[`, and `\\` are kept intact so [`match_pattern`]
/// still sees them as literal escapes.
///
/// ```
/// use maku_glob::unescape;
/// assert_eq!(unescape(r"a\b"), "ab");
/// assert_eq!(unescape(r"a\*b"), r"a\*b");
/// ```
pub fn unescape(pat: &str) -> String {
    let mut out = String::with_capacity(pat.len());
    let mut chars = pat.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('*' | '?' | '[' | '\\') => out.push('\\'),
                Some(_) => {}
                None => out.push('\\'),
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Match a directory-entry name against a pattern.
///
/// Returns true if the pattern matches the entire name. Wildcards never
/// cross a `/`, so a single pattern segment cannot match into a
/// subdirectory.
///
/// # Examples
/// ```
/// use maku_glob::match_pattern;
///
/// assert!(match_pattern("*.c", "main.c").unwrap());
/// assert!(match_pattern("test?", "test1").unwrap());
/// assert!(match_pattern("[abc]", "b").unwrap());
/// assert!(!match_pattern("*.h", "main.c").unwrap());
/// assert!(match_pattern("[a-", "a").is_err());
/// ```
pub fn match_pattern(pattern: &str, name: &str) -> Result<bool, PatternError> {
    let pat: Vec<char> = pattern.chars().collect();
    validate(&pat)?;
    let input: Vec<char> = name.chars().collect();
    let calls = Cell::new(0usize);
    Ok(match_valid(&pat, 0, &input, 0, &calls))
}

/// Check pattern syntax up front, independent of any input.
///
/// A mismatch must never hide a malformed pattern, so syntax is not
/// discovered lazily during backtracking.
fn validate(pattern: &[char]) -> Result<(), PatternError> {
    let mut pi = 0;
    while pi < pattern.len() {
        match pattern[pi] {
            '\\' => {
                if pi + 1 >= pattern.len() {
                    return Err(PatternError::TrailingEscape);
                }
                pi += 2;
            }
            '[' => {
                let (_, consumed) = scan_class(pattern, pi, None)?;
                pi += consumed;
            }
            _ => pi += 1,
        }
    }
    Ok(())
}

/// Work-bounded recursive matching with backtracking for `*`.
///
/// Returns `false` (non-match) if total recursive calls exceed
/// `MAX_MATCH_CALLS`, preventing ReDoS from adversarial patterns.
/// The pattern must already have passed [`validate`].
fn match_valid(pattern: &[char], pi: usize, input: &[char], ii: usize, calls: &Cell<usize>) -> bool {
    let count = calls.get() + 1;
    calls.set(count);
    if count > MAX_MATCH_CALLS {
        return false;
    }

    // Both exhausted - match!
    if pi >= pattern.len() && ii >= input.len() {
        return true;
    }

    // Pattern exhausted but input remains - no match
    if pi >= pattern.len() {
        return false;
    }

    match pattern[pi] {
        '*' => {
            // Skip consecutive stars
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }

            // Star at end matches everything remaining, up to a separator
            if next_pi >= pattern.len() {
                return input[ii..].iter().all(|&c| c != '/');
            }

            // Try matching star with 0, 1, 2, ... characters
            let mut skip = 0;
            loop {
                if match_valid(pattern, next_pi, input, ii + skip, calls) {
                    return true;
                }
                // Star cannot consume a separator
                if ii + skip >= input.len() || input[ii + skip] == '/' {
                    return false;
                }
                skip += 1;
            }
        }

        '?' => {
            if ii >= input.len() || input[ii] == '/' {
                return false;
            }
            match_valid(pattern, pi + 1, input, ii + 1, calls)
        }

        '[' => {
            if ii >= input.len() || input[ii] == '/' {
                return false;
            }
            match scan_class(pattern, pi, Some(input[ii])) {
                Ok((true, consumed)) => match_valid(pattern, pi + consumed, input, ii + 1, calls),
                _ => false,
            }
        }

        // Escape next character
        '\\' if pi + 1 < pattern.len() => {
            if ii >= input.len() {
                return false;
            }
            if pattern[pi + 1] == input[ii] {
                match_valid(pattern, pi + 2, input, ii + 1, calls)
            } else {
                false
            }
        }

        c => {
            // Literal character match
            if ii >= input.len() {
                return false;
            }
            if c == input[ii] {
                match_valid(pattern, pi + 1, input, ii + 1, calls)
            } else {
                false
            }
        }
    }
}

/// Scan a bracket class starting at `pi`, which must point at `[`.
///
/// With `probe = Some(c)`, also reports whether the class matches `c`.
/// Returns `(matched, chars_consumed)`. This is the single definition of
/// the class grammar, shared by validation and matching: a class is
/// non-empty, `]` and `-` inside it must be escaped, ranges must be
/// complete and ascending, and the class must be closed.
fn scan_class(
    pattern: &[char],
    pi: usize,
    probe: Option<char>,
) -> Result<(bool, usize), PatternError> {
    let mut idx = pi + 1;
    let mut negate = false;
    if matches!(pattern.get(idx), Some('!' | '^')) {
        negate = true;
        idx += 1;
    }

    let mut matched = false;
    let mut nitems = 0usize;
    loop {
        match pattern.get(idx) {
            None => return Err(PatternError::MalformedBracket),
            Some(']') if nitems > 0 => {
                idx += 1;
                break;
            }
            Some(_) => {
                let (lo, next) = class_char(pattern, idx)?;
                idx = next;
                if pattern.get(idx) == Some(&'-') {
                    let (hi, next) = class_char(pattern, idx + 1)?;
                    idx = next;
                    if hi < lo {
                        return Err(PatternError::MalformedBracket);
                    }
                    if let Some(c) = probe {
                        if c >= lo && c <= hi {
                            matched = true;
                        }
                    }
                } else if probe == Some(lo) {
                    matched = true;
                }
                nitems += 1;
            }
        }
    }

    let matched = if negate { !matched } else { matched };
    Ok((matched, idx - pi))
}

/// Read one class member character, honoring `\x` escapes.
///
/// A bare `]` or `-` is not a valid member (escape it), and an escape must
/// have something to escape.
fn class_char(pattern: &[char], idx: usize) -> Result<(char, usize), PatternError> {
    match pattern.get(idx) {
        None | Some(']' | '-') => Err(PatternError::MalformedBracket),
        Some('\\') => match pattern.get(idx + 1) {
            Some(&c) => Ok((c, idx + 2)),
            None => Err(PatternError::MalformedBracket),
        },
        Some(&c) => Ok((c, idx + 1)),
    }
}
