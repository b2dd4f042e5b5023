use anyhow::{Context, Result};
use git2::{BranchType, Repository, Status, StatusOptions};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Non-clean working-tree paths and their raw status flags.
///
/// Invariant: a path whose status is plain "current" is never present —
/// the scan records only deviating paths.
pub type StatusSnapshot = HashMap<String, Status>;

/// Failure of the one user-initiated mutating operation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("branch not found: {0}")]
    BranchNotFound(String),
    #[error(transparent)]
    Git(#[from] git2::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusEntry {
    pub path: String,
    pub status: FileStatusKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatusKind {
    Conflict,
    Untracked,
    Staged,
    Renamed,
    Modified,
    Deleted,
    Ignored,
}

/// Collapse a raw flag set into the kind shown to file-list consumers.
pub fn classify(s: Status) -> FileStatusKind {
    if s.is_conflicted() {
        FileStatusKind::Conflict
    } else if s.is_ignored() {
        FileStatusKind::Ignored
    } else if s.is_wt_new() {
        FileStatusKind::Untracked
    } else if s.is_wt_renamed() || s.is_index_renamed() {
        FileStatusKind::Renamed
    } else if s.is_wt_deleted() || s.is_index_deleted() {
        FileStatusKind::Deleted
    } else if s.is_index_new() || s.is_index_modified() {
        FileStatusKind::Staged
    } else {
        FileStatusKind::Modified
    }
}

// ─── Branch operations ───────────────────────────────────────────────────────

/// Resolve the checked-out branch name.
///
/// Detached HEAD, unborn HEAD and backend failures all yield the empty
/// string — this runs on event paths with no caller to report to.
pub fn head_branch_name(repo: &Repository) -> String {
    match repo.head() {
        Ok(head) if head.is_branch() => head.shorthand().unwrap_or("").to_string(),
        Ok(_) => String::new(),
        Err(e) => {
            warn!(err = %e, "failed to resolve HEAD");
            String::new()
        }
    }
}

/// Local branch names in the order the backend yields them.
///
/// Enumeration failure degrades to an empty list; refs without a valid
/// branch name are skipped.
pub fn local_branches(repo: &Repository) -> Vec<String> {
    let branches = match repo.branches(Some(BranchType::Local)) {
        Ok(iter) => iter,
        Err(e) => {
            warn!(err = %e, "branch enumeration failed");
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    for entry in branches {
        let Ok((branch, _)) = entry else { continue };
        if let Ok(Some(name)) = branch.name() {
            names.push(name.to_string());
        }
    }
    names
}

/// Point HEAD at the named local branch.
///
/// Unlike the read paths above, failures propagate: checkout is
/// user-initiated and the UI must be able to report it.
pub fn checkout_branch(repo: &Repository, name: &str) -> Result<(), CheckoutError> {
    let branch = match repo.find_branch(name, BranchType::Local) {
        Ok(b) => b,
        Err(e) if e.code() == git2::ErrorCode::NotFound => {
            return Err(CheckoutError::BranchNotFound(name.to_string()))
        }
        Err(e) => return Err(CheckoutError::Git(e)),
    };
    let refname = branch
        .get()
        .name()
        .ok_or_else(|| CheckoutError::BranchNotFound(name.to_string()))?;
    repo.set_head(refname)?;
    Ok(())
}

// ─── Status scan ─────────────────────────────────────────────────────────────

/// Scan working-directory status into a fresh snapshot.
///
/// Workdir-only (not against a second commit), untracked dirs recursed,
/// ignored files excluded.
pub fn scan_status(repo: &Repository, include_untracked: bool) -> Result<StatusSnapshot> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(include_untracked)
        .include_ignored(false)
        .recurse_untracked_dirs(true)
        .exclude_submodules(false);

    let statuses = repo
        .statuses(Some(&mut opts))
        .context("working-directory status scan failed")?;

    let mut snapshot = StatusSnapshot::with_capacity(statuses.len());
    for entry in statuses.iter() {
        let flags = entry.status();
        if flags.is_empty() {
            continue;
        }
        // Skip non-UTF-8 paths rather than lossy-rename them.
        let Some(path) = entry.path() else { continue };
        snapshot.insert(path.to_string(), flags);
    }
    Ok(snapshot)
}
