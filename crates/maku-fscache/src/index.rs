//! The find-emulation index: configuration, lifecycle, and snapshot access.

use std::sync::Arc;

use tokio::sync::watch;

use crate::fs::BuildFs;
use crate::record::Snapshots;
use crate::scan::{self, ScanPlan};
use crate::CacheError;

/// Leaf basenames used when the configuration does not name any: the
/// conventional build-unit marker files.
pub const DEFAULT_LEAF_NAMES: &[&str] = &["CleanSpec.mk", "Android.mk"];

/// One-time configuration of the indexed subsystem, supplied before first
/// use.
///
/// `enabled` gates everything: when false, every query reports
/// [`CacheError::Disabled`] and the caller enumerates the filesystem
/// directly. `prunes` are directory basenames whose subtrees are excluded
/// from the scan (version-control metadata and the like); `leaf_names`
/// mark build units and feed the leaf snapshot.
#[derive(Debug, Clone, Default)]
pub struct FindCacheConfig {
    pub enabled: bool,
    pub prunes: Vec<String>,
    pub leaf_names: Vec<String>,
}

/// Index lifecycle. Transitions happen exactly once per session:
/// `NotStarted -> Scanning -> Ready | Failed`, with the terminal states
/// never left again. A failed scan never yields a partial snapshot.
#[derive(Debug, Clone)]
enum IndexState {
    NotStarted,
    Scanning,
    Ready(Arc<Snapshots>),
    Failed,
}

/// Session-owned index over one point-in-time filesystem capture.
///
/// The first caller that needs snapshots triggers the scan; every
/// concurrent and later caller blocks on the same run via the state
/// channel. There is no invalidation, no retry, and no persistence: a
/// session scans at most once and a failure is terminal.
pub struct FindCache {
    fs: Arc<dyn BuildFs>,
    config: FindCacheConfig,
    state: Arc<watch::Sender<IndexState>>,
}

impl FindCache {
    pub fn new(fs: Arc<dyn BuildFs>, mut config: FindCacheConfig) -> Self {
        if config.leaf_names.is_empty() {
            config.leaf_names = DEFAULT_LEAF_NAMES.iter().map(|s| s.to_string()).collect();
        }
        let (tx, _rx) = watch::channel(IndexState::NotStarted);
        Self {
            fs,
            config,
            state: Arc::new(tx),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Kick off the scan in the background without waiting for it.
    ///
    /// Optional: the first query triggers the same single-flight scan; this
    /// just lets a session overlap the walk with unrelated evaluation.
    pub fn start(&self) {
        if self.config.enabled {
            self.trigger_scan();
        }
    }

    /// The published snapshots, scanning first if this session has not yet.
    ///
    /// Blocks until the index is `Ready` or `Failed`. Exactly one scan runs
    /// no matter how many callers arrive here concurrently.
    pub async fn snapshots(&self) -> Result<Arc<Snapshots>, CacheError> {
        if !self.config.enabled {
            return Err(CacheError::Disabled);
        }
        let mut rx = self.state.subscribe();
        self.trigger_scan();
        let state = rx
            .wait_for(|s| matches!(s, IndexState::Ready(_) | IndexState::Failed))
            .await
            .map_err(|_| CacheError::Unavailable)?;
        match &*state {
            IndexState::Ready(snaps) => Ok(snaps.clone()),
            _ => Err(CacheError::Unavailable),
        }
    }

    /// Win the `NotStarted -> Scanning` transition, or observe that someone
    /// else already did. The winner runs the scan on its own task so an
    /// abandoned caller cannot strand the state machine mid-transition.
    fn trigger_scan(&self) {
        let mut won = false;
        self.state.send_if_modified(|s| {
            if matches!(s, IndexState::NotStarted) {
                *s = IndexState::Scanning;
                won = true;
                true
            } else {
                false
            }
        });
        if !won {
            return;
        }
        let fs = self.fs.clone();
        let plan = Arc::new(ScanPlan {
            prunes: self.config.prunes.iter().cloned().collect(),
            leaf_names: self.config.leaf_names.iter().cloned().collect(),
        });
        let state = self.state.clone();
        tokio::spawn(async move {
            let next = match scan::run_scan(fs, plan).await {
                Ok(snaps) => IndexState::Ready(Arc::new(snaps)),
                Err(err) => {
                    tracing::warn!(%err, "find cache scan failed; queries fall back");
                    IndexState::Failed
                }
            };
            state.send_replace(next);
        });
    }
}
