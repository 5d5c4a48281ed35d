//! # Git Module
//!
//! Branch name via gix, staged/unstaged line and file counts via
//! `git diff --numstat`. Any failure yields `GitStatus::default()` so the
//! statusline never depends on repository state being available.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::models::{ChangeCounts, GitStatus};
use crate::utils::run_with_timeout;

pub fn read_git_status(start_dir: &Path, timeout: Duration) -> GitStatus {
    let Some(branch) = read_branch(start_dir) else {
        tracing::debug!(dir = %start_dir.display(), "not a git repository");
        return GitStatus::default();
    };

    let staged = diff_counts(start_dir, true, timeout).unwrap_or_default();
    let unstaged = diff_counts(start_dir, false, timeout).unwrap_or_default();

    GitStatus {
        branch,
        has_changes: staged.files > 0 || unstaged.files > 0,
        staged,
        unstaged,
    }
}

/// Short name of the checked-out branch; empty when HEAD is detached
fn read_branch(start_dir: &Path) -> Option<String> {
    let repo = gix::discover(start_dir).ok()?;
    let head = repo.head().ok()?;
    Some(
        head.referent_name()
            .map(|name| name.shorten().to_string())
            .unwrap_or_default(),
    )
}

fn diff_counts(dir: &Path, cached: bool, timeout: Duration) -> Option<ChangeCounts> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(["diff", "--numstat"]);
    if cached {
        cmd.arg("--cached");
    }
    let output = run_with_timeout(&mut cmd, timeout)?;
    if !output.status.success() {
        tracing::debug!(cached, status = ?output.status, "git diff failed");
        return None;
    }
    Some(parse_numstat(&String::from_utf8_lossy(&output.stdout)))
}

/// Sum `git diff --numstat` output. Binary files (`-\t-\tpath`) count as
/// changed files with no line changes.
pub fn parse_numstat(output: &str) -> ChangeCounts {
    let mut counts = ChangeCounts::default();
    for line in output.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        counts.files += 1;
        counts.added += added.parse::<u64>().unwrap_or(0);
        counts.deleted += deleted.parse::<u64>().unwrap_or(0);
    }
    counts
}
