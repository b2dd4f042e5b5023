//! Debounced repository status tracking.
//!
//! [`StatusTracker`] binds to one opened repository, watches its metadata
//! directory (plus `.gitignore` when present), coalesces event bursts
//! through a trailing-edge debounce, rescans working-tree status, and
//! emits a [`RepoEvent`] only when something observable changed.

pub mod git;
pub mod watcher;

pub use git::{CheckoutError, FileStatusEntry, FileStatusKind, StatusSnapshot};

use crate::config::TrackerConfig;
use crate::events::{EventBroadcaster, RepoEvent};
use anyhow::{Context, Result};
use git2::Repository;
use notify::RecommendedWatcher;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock, Weak},
    time::Duration,
};
use tokio::sync::{broadcast, mpsc, mpsc::error::TryRecvError};
use tracing::{debug, error, info, warn};

// ─── Shared state ────────────────────────────────────────────────────────────

/// State shared between the tracker handle and the debounce actor.
struct TrackerState {
    /// git2 repositories are Send but not Sync; every backend call goes
    /// through this lock.
    repo: Mutex<Repository>,
    /// Latest published snapshot. Consumers hold clones of the `Arc`, so
    /// a recomputation never mutates anything a reader can see.
    snapshot: RwLock<Arc<StatusSnapshot>>,
    /// Branch name as of the last resolve — only here to make
    /// `BranchChanged` edge-triggered.
    branch: Mutex<String>,
    broadcaster: EventBroadcaster,
    include_untracked: bool,
}

impl TrackerState {
    /// Idempotent branch-name set: emits `BranchChanged` only when the
    /// resolved name differs from the stored one.
    fn set_branch(&self, name: String) {
        let mut current = self.branch.lock().unwrap();
        if *current != name {
            *current = name.clone();
            drop(current);
            self.broadcaster.emit(RepoEvent::BranchChanged { name });
        }
    }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Watches one repository and republishes debounced status/branch changes.
///
/// Construction needs a tokio runtime (the debounce actor is a spawned
/// task). Nothing is scanned until the first watcher event or
/// [`StatusTracker::request_update`] call, so a consumer that wants an
/// initial population subscribes first and then requests an update.
pub struct StatusTracker {
    state: Arc<TrackerState>,
    trigger: Option<mpsc::UnboundedSender<()>>,
    workdir: PathBuf,
    // Keep subscriptions alive — dropping them is the cancellation.
    meta_watcher: Option<RecommendedWatcher>,
    ignore_watcher: Option<RecommendedWatcher>,
}

impl StatusTracker {
    /// Bind to an already-open repository and start watching it.
    ///
    /// Watch-setup failures are non-fatal: the tracker degrades to
    /// manually triggered updates and logs a warning.
    pub fn new(repo: Repository, config: TrackerConfig) -> Result<Self> {
        let workdir = repo
            .workdir()
            .context("repository has no working directory")?
            .to_path_buf();
        let meta_dir = repo.path().to_path_buf();

        let state = Arc::new(TrackerState {
            repo: Mutex::new(repo),
            snapshot: RwLock::new(Arc::new(StatusSnapshot::new())),
            branch: Mutex::new(String::new()),
            broadcaster: EventBroadcaster::new(),
            include_untracked: config.include_untracked,
        });

        let (trigger, trigger_rx) = mpsc::unbounded_channel();

        // notify fires callbacks on its own OS thread; the unbounded send
        // is nonblocking there and wakes the actor on the runtime.
        // The metadata directory covers branch switches, commits, index
        // updates and merges.
        let meta_watcher = {
            let tx = trigger.clone();
            match watcher::watch_directory(&meta_dir, move || {
                let _ = tx.send(());
            }) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(path = %meta_dir.display(), err = %e,
                        "metadata watch failed — status updates must be requested manually");
                    None
                }
            }
        };

        // Ignore rules change which paths the scan reports. A project
        // without the file never pays for the subscription.
        let ignore_path = workdir.join(".gitignore");
        let ignore_watcher = if ignore_path.exists() {
            let tx = trigger.clone();
            match watcher::watch_file(&ignore_path, move || {
                let _ = tx.send(());
            }) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(path = %ignore_path.display(), err = %e, "ignore-file watch failed");
                    None
                }
            }
        } else {
            None
        };

        tokio::spawn(debounce_loop(
            trigger_rx,
            Arc::downgrade(&state),
            config.debounce(),
        ));

        info!(workdir = %workdir.display(), "repository status tracker started");
        Ok(Self {
            state,
            trigger: Some(trigger),
            workdir,
            meta_watcher,
            ignore_watcher,
        })
    }

    /// Ask for a status recomputation.
    ///
    /// Calls landing inside the debounce window coalesce: the scan runs
    /// once, after the window has gone quiet.
    pub fn request_update(&self) {
        if let Some(tx) = &self.trigger {
            let _ = tx.send(());
        }
    }

    /// Root of the checked-out file tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The snapshot published by the latest recomputation.
    pub fn status_snapshot(&self) -> Arc<StatusSnapshot> {
        self.state.snapshot.read().unwrap().clone()
    }

    /// Classified view of the snapshot, sorted by path for stable display.
    pub fn status_entries(&self) -> Vec<FileStatusEntry> {
        let snapshot = self.status_snapshot();
        let mut entries: Vec<FileStatusEntry> = snapshot
            .iter()
            .map(|(path, flags)| FileStatusEntry {
                path: path.clone(),
                status: git::classify(*flags),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Currently checked-out branch name; empty on detached HEAD or
    /// resolution failure.
    pub fn current_branch(&self) -> String {
        let repo = self.state.repo.lock().unwrap();
        git::head_branch_name(&repo)
    }

    /// Local branch names in backend order; empty on enumeration failure.
    pub fn list_branches(&self) -> Vec<String> {
        let repo = self.state.repo.lock().unwrap();
        git::local_branches(&repo)
    }

    /// Check out the named local branch.
    ///
    /// The only operation here that surfaces backend failure: a missing
    /// branch or failed HEAD update must reach the user instead of
    /// silently leaving the branch unchanged.
    pub fn checkout_branch(&self, name: &str) -> Result<(), CheckoutError> {
        let resolved = {
            let repo = self.state.repo.lock().unwrap();
            git::checkout_branch(&repo, name)?;
            git::head_branch_name(&repo)
        };
        self.state.set_branch(resolved);
        Ok(())
    }

    /// Subscribe to branch/status change events.
    pub fn subscribe(&self) -> broadcast::Receiver<RepoEvent> {
        self.state.broadcaster.subscribe()
    }

    /// Cancel both filesystem subscriptions and stop the debounce actor.
    ///
    /// Synchronous and idempotent; `Drop` takes the same path. An armed
    /// timer elapsing afterwards observes the closed trigger channel and
    /// performs no recomputation.
    pub fn close(&mut self) {
        self.meta_watcher.take();
        self.ignore_watcher.take();
        self.trigger.take();
    }
}

impl Drop for StatusTracker {
    fn drop(&mut self) {
        self.close();
    }
}

// ─── Debounce actor ──────────────────────────────────────────────────────────

/// Trailing-edge debounce.
///
/// IDLE: parked on `recv`; a trigger arms the timer. ARMED: when the
/// window elapses, triggers that arrived meanwhile are drained and the
/// timer re-arms for a full window without recomputing; a quiet window
/// recomputes exactly once and returns to IDLE. Channel disconnect at
/// any point means the tracker was disposed — exit without touching it.
async fn debounce_loop(
    mut rx: mpsc::UnboundedReceiver<()>,
    state: Weak<TrackerState>,
    window: Duration,
) {
    while rx.recv().await.is_some() {
        'armed: loop {
            tokio::time::sleep(window).await;

            let mut refire = false;
            loop {
                match rx.try_recv() {
                    Ok(()) => refire = true,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if refire {
                // Burst still in progress — no work this tick.
                continue 'armed;
            }
            break 'armed;
        }

        let Some(state) = state.upgrade() else { return };
        recompute(state).await;
    }
}

/// One recomputation cycle: re-resolve the branch, rescan status, diff
/// against the previous snapshot, publish, and notify on a real change.
async fn recompute(state: Arc<TrackerState>) {
    let scan = {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || {
            let repo = state.repo.lock().unwrap();
            let branch = git::head_branch_name(&repo);
            let snapshot = git::scan_status(&repo, state.include_untracked);
            (branch, snapshot)
        })
        .await
    };

    let (branch, scan) = match scan {
        Ok(parts) => parts,
        Err(e) => {
            error!(err = %e, "status recomputation task panicked");
            return;
        }
    };

    state.set_branch(branch);

    let fresh = match scan {
        Ok(map) => map,
        Err(e) => {
            // The backend itself is broken; keep the previous snapshot.
            error!(err = %e, "status scan failed");
            return;
        }
    };

    let changed = {
        let mut slot = state.snapshot.write().unwrap();
        let changed = snapshot_changed(&slot, &fresh);
        *slot = Arc::new(fresh);
        changed
    };

    debug!(changed, "status recomputation complete");
    if changed {
        state.broadcaster.emit(RepoEvent::StatusChanged);
    }
}

/// A cycle is observable when any path's flags differ from the previous
/// snapshot or the path count differs (covers paths reverting to clean
/// and paths newly appearing).
fn snapshot_changed(previous: &StatusSnapshot, fresh: &StatusSnapshot) -> bool {
    if previous.len() != fresh.len() {
        return true;
    }
    fresh
        .iter()
        .any(|(path, flags)| previous.get(path) != Some(flags))
}
