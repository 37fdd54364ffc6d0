//! maku-fscache: the filesystem-pattern engine of the maku build tool.
//!
//! Large build descriptions enumerate thousands of source directories with
//! `$(wildcard ...)` and `$(shell find ...)` idioms. This crate turns that
//! repeated pattern-based enumeration into cached and indexed lookups:
//!
//! - **WildcardCache**: per-directory entry listings, populated lazily and
//!   never invalidated, backing glob expansion
//! - **FindCache**: a one-time parallel filesystem scan producing two
//!   immutable, differently-sorted snapshots, plus four read-only query
//!   operations that each replicate one build-script `find`/`ls` idiom
//!   bit-for-bit (hidden-file exclusion, symlink refusal, pruning, depth
//!   limits, early exit)
//! - **BuildFs**: the read-only filesystem seam, with a real backend and an
//!   in-memory backend for tests and embedders
//! - **WordSink**: the evaluator-supplied output channel; every matched path
//!   becomes one whitespace-tokenized word
//!
//! Both caches are plain session-owned objects: the evaluator constructs
//! them once per build and passes them by reference to consumers. Snapshots
//! are point-in-time captures; there is no change notification and no
//! cross-run persistence.

pub mod fs;
pub mod index;
pub mod paths;
pub mod record;
pub mod sink;
pub mod wildcard;

mod query;
mod scan;

pub use fs::{BuildFs, FileMode, FsEntry, MemoryFs, RealFs};
pub use index::{FindCache, FindCacheConfig};
pub use record::{FileRecord, Snapshots};
pub use sink::WordSink;
pub use wildcard::WildcardCache;

use thiserror::Error;

/// Errors reported by the indexed find operations.
///
/// Every variant means "this answer cannot come from the index"; the caller
/// degrades to direct, uncached filesystem access.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The indexed subsystem is switched off by configuration.
    #[error("find cache disabled")]
    Disabled,
    /// The scan failed; no snapshot will be published this session.
    #[error("find cache unavailable")]
    Unavailable,
    /// A symlink was found in a subtree that must be cycle-safe.
    #[error("symlink under queried subtree: {0}")]
    SymlinkFound(String),
}
