//! maku-glob: shell-style pattern matching for wildcard expansion.
//!
//! Provides:
//! - **match_pattern**: match a directory-entry name against a pattern
//! - **contains_meta**: detect whether a string is a pattern at all
//! - **unescape**: make-level unescaping of literal metacharacters
//!
//! The pattern dialect is the one the build language's `$(wildcard ...)`
//! accepts: `*`, `?`, and `[...]` bracket classes with backslash escapes.
//! There is no brace expansion, no `**`, and no `~` expansion. A malformed
//! bracket expression or a trailing backslash is an error rather than a
//! silent non-match, because the surrounding evaluator reports it to the
//! build-script author.

mod glob;

pub use glob::{contains_meta, match_pattern, unescape};

use thiserror::Error;

/// Errors from pattern compilation or matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("malformed bracket expression")]
    MalformedBracket,
    #[error("trailing escape at end of pattern")]
    TrailingEscape,
}
