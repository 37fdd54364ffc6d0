//! One-time parallel filesystem walk feeding the find cache.
//!
//! Worker tasks drain a queue of top-level subtrees and walk each one with
//! an explicit stack; two aggregator tasks concurrently drain the output
//! streams into the two differently-ordered snapshots. The walk is
//! all-or-nothing: any filesystem error anywhere aborts the whole scan and
//! nothing is published.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::fs::{BuildFs, FileMode};
use crate::paths;
use crate::record::{leaf_order, FileRecord, Snapshots};

/// Pruning and leaf configuration, shared across workers.
pub(crate) struct ScanPlan {
    pub prunes: HashSet<String>,
    pub leaf_names: HashSet<String>,
}

/// Walk the whole tree under the filesystem root once, in parallel, and
/// build both snapshots.
#[tracing::instrument(level = "info", skip_all)]
pub(crate) async fn run_scan(fs: Arc<dyn BuildFs>, plan: Arc<ScanPlan>) -> io::Result<Snapshots> {
    let started = Instant::now();

    // The seed listing failing means there is nothing to scan at all.
    let top = fs.list_dir(".").await?;

    let (work_tx, work_rx) = mpsc::unbounded_channel::<(String, FileMode)>();
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (files_tx, files_rx) = mpsc::unbounded_channel::<FileRecord>();
    let (leaves_tx, leaves_rx) = mpsc::unbounded_channel::<FileRecord>();
    let cancel = Arc::new(AtomicBool::new(false));

    let files_task = tokio::spawn(aggregate_files(files_rx));
    let leaves_task = tokio::spawn(aggregate_leaves(leaves_rx));

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1);
    let mut join: JoinSet<io::Result<()>> = JoinSet::new();
    for _ in 0..workers {
        let fs = fs.clone();
        let plan = plan.clone();
        let work_rx = work_rx.clone();
        let files_tx = files_tx.clone();
        let leaves_tx = leaves_tx.clone();
        let cancel = cancel.clone();
        join.spawn(async move {
            loop {
                let item = { work_rx.lock().await.recv().await };
                let Some((path, mode)) = item else {
                    return Ok(());
                };
                walk_subtree(&*fs, &plan, &files_tx, &leaves_tx, &cancel, path, mode).await?;
            }
        });
    }
    // The workers hold the only remaining stream senders; the aggregators
    // finish once the last worker exits.
    drop(files_tx);
    drop(leaves_tx);

    for entry in top {
        // Seed send cannot fail while the worker tasks hold the receiver.
        let _ = work_tx.send((entry.name, entry.mode));
    }
    drop(work_tx);

    let mut first_err: Option<io::Error> = None;
    while let Some(res) = join.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                cancel.store(true, Ordering::Relaxed);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
            Err(join_err) => {
                cancel.store(true, Ordering::Relaxed);
                if first_err.is_none() {
                    first_err = Some(io::Error::other(join_err));
                }
            }
        }
    }

    let files = files_task.await.map_err(io::Error::other)?;
    let leaves = leaves_task.await.map_err(io::Error::other)?;

    if let Some(err) = first_err {
        return Err(err);
    }

    tracing::info!(
        files = files.len(),
        leaves = leaves.len(),
        elapsed = ?started.elapsed(),
        "filesystem scan complete"
    );
    Ok(Snapshots { files, leaves })
}

/// Walk one subtree with an explicit stack, emitting every visited entry.
///
/// A directory whose basename is in the prune set is skipped whole: no
/// descent, no record. Entries matching a leaf basename additionally go to
/// the leaves stream, whatever their type.
async fn walk_subtree(
    fs: &dyn BuildFs,
    plan: &ScanPlan,
    files_tx: &mpsc::UnboundedSender<FileRecord>,
    leaves_tx: &mpsc::UnboundedSender<FileRecord>,
    cancel: &AtomicBool,
    path: String,
    mode: FileMode,
) -> io::Result<()> {
    let mut stack = vec![(path, mode)];
    while let Some((path, mode)) = stack.pop() {
        if cancel.load(Ordering::Relaxed) {
            // Another worker already failed the scan; bail quietly.
            return Ok(());
        }
        let name = paths::base_name(&path);
        if mode.is_dir() && plan.prunes.contains(name) {
            tracing::debug!(path = %path, "scan: pruned subtree");
            continue;
        }
        if plan.leaf_names.contains(name) {
            let _ = leaves_tx.send(FileRecord {
                path: path.clone(),
                mode,
            });
        }
        let _ = files_tx.send(FileRecord {
            path: path.clone(),
            mode,
        });
        if mode.is_dir() {
            let mut entries = fs.list_dir(&path).await?;
            // Deterministic traversal order, as in the interactive walker;
            // reverse push so the alphabetically-first entry pops first.
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            entries.reverse();
            for entry in entries {
                stack.push((paths::join(&path, &entry.name), entry.mode));
            }
        }
    }
    Ok(())
}

/// Drain the files stream and sort it into the full snapshot's path order.
async fn aggregate_files(mut rx: mpsc::UnboundedReceiver<FileRecord>) -> Vec<FileRecord> {
    let mut files = Vec::new();
    while let Some(record) = rx.recv().await {
        files.push(record);
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Drain the leaves stream, synthesize one directory record per distinct
/// leaf ancestor, and sort into the leaf order.
async fn aggregate_leaves(mut rx: mpsc::UnboundedReceiver<FileRecord>) -> Vec<FileRecord> {
    let mut leaves = Vec::new();
    let mut seen_dirs: HashSet<String> = HashSet::new();
    let mut nleaves = 0usize;
    while let Some(record) = rx.recv().await {
        nleaves += 1;
        let mut dir = paths::dir_name(&record.path).to_string();
        if record.mode.is_dir() {
            // A directory bearing a leaf name doubles as its own ancestor
            // record; never synthesize a second one for it.
            if seen_dirs.insert(record.path.clone()) {
                leaves.push(record);
            }
        } else {
            leaves.push(record);
        }
        while dir != "." {
            if !seen_dirs.insert(dir.clone()) {
                // This ancestor chain is already synthesized.
                break;
            }
            leaves.push(FileRecord {
                path: dir.clone(),
                mode: FileMode::Dir,
            });
            let parent = paths::dir_name(&dir).to_string();
            dir = parent;
        }
    }
    leaves.sort_by(leaf_order);
    tracing::debug!(
        leaves = nleaves,
        dirs = seen_dirs.len(),
        "leaf snapshot aggregated"
    );
    leaves
}
