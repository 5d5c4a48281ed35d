//! # Statusline Module
//!
//! One render: persist the session record, gather the independent data
//! sources concurrently, then hand everything to the line assembler.

use anyhow::{Context, Result, bail};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::ccusage::{ccusage_path, get_ccusage_data};
use crate::config::StatuslineConfig;
use crate::context::estimate_context;
use crate::db;
use crate::display::{LineInputs, build_lines, format_branch};
use crate::models::{GitStatus, HookJson};
use crate::usage_api::get_usage_limits;
use crate::utils::format_path;

const GIT_TIMEOUT: Duration = Duration::from_secs(2);
const CCUSAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn parse_hook(stdin: &[u8]) -> Result<HookJson> {
    if stdin.iter().all(|b| b.is_ascii_whitespace()) {
        bail!("no input received on stdin");
    }
    serde_json::from_slice(stdin).context("parse hook json")
}

fn record_session(hook: &HookJson) {
    match db::record_session(hook) {
        Ok(record) => {
            tracing::debug!(session = %record.session_id, cost = record.cost_usd, "session recorded");
            match db::spend_summary(&Local::now().format("%Y-%m-%d").to_string()) {
                Ok(summary) => tracing::debug!(
                    total_cost = summary.total_cost,
                    sessions = summary.sessions_count,
                    "today's spend"
                ),
                Err(err) => tracing::debug!(%err, "spend summary unavailable"),
            }
        }
        Err(err) => tracing::debug!(error = %format!("{err:#}"), "failed to record session"),
    }
}

fn read_git(dir: &Path) -> GitStatus {
    #[cfg(feature = "git")]
    {
        crate::git::read_git_status(dir, GIT_TIMEOUT)
    }
    #[cfg(not(feature = "git"))]
    {
        let _ = (dir, GIT_TIMEOUT);
        GitStatus::default()
    }
}

/// Gather every data source and build the output lines.
pub fn render(hook: &HookJson, cfg: &StatuslineConfig, claude_paths: &[PathBuf]) -> Vec<String> {
    record_session(hook);

    let workdir = Path::new(&hook.workspace.current_dir);
    let transcript = Path::new(&hook.transcript_path);
    let ccusage_bin = ccusage_path();

    // The sources are independent; run them side by side to bound latency
    let (git, context, usage_limits, ccusage) = thread::scope(|s| {
        let git = s.spawn(|| read_git(workdir));
        let context = s.spawn(|| estimate_context(transcript, &cfg.context));
        let limits = s.spawn(|| get_usage_limits(claude_paths, hook.version.as_deref()));
        let ccusage = s.spawn(|| get_ccusage_data(&ccusage_bin, CCUSAGE_TIMEOUT));
        (
            git.join().unwrap_or_default(),
            context.join().unwrap_or_default(),
            limits.join().unwrap_or_default(),
            ccusage.join().unwrap_or_default(),
        )
    });

    tracing::debug!(?git, ?context, ?usage_limits, ?ccusage, "data sources collected");

    let inputs = LineInputs {
        branch: format_branch(&git, &cfg.git),
        dir_path: format_path(&hook.workspace.current_dir, cfg.path_display_mode),
        model_name: hook.model.display_name.clone(),
        session_cost: hook.cost.total_cost_usd,
        context,
        usage_limits,
        ccusage,
    };
    build_lines(&inputs, cfg)
}
