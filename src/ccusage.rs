//! ccusage integration
//!
//! Runs `ccusage blocks --active --json` and extracts the active billing
//! block's cost and projected minutes left. The tool is optional: any
//! failure yields `CcusageData::default()`.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::models::ccusage::{CcusageBlocks, CcusageData};
use crate::utils::run_with_timeout;

pub const DEFAULT_CCUSAGE_PATH: &str = "/usr/local/bin/ccusage";

/// Binary location, overridable with `CLAUDE_STATUSLINE_CCUSAGE_PATH`
pub fn ccusage_path() -> PathBuf {
    env::var("CLAUDE_STATUSLINE_CCUSAGE_PATH")
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CCUSAGE_PATH))
}

pub fn get_ccusage_data(path: &Path, timeout: Duration) -> CcusageData {
    let Some(output) = run_with_timeout(
        Command::new(path).args(["blocks", "--active", "--json"]),
        timeout,
    ) else {
        tracing::debug!(path = %path.display(), "ccusage unavailable");
        return CcusageData::default();
    };

    if !output.status.success() {
        tracing::debug!(status = ?output.status, "ccusage exited with failure");
        return CcusageData::default();
    }

    parse_blocks(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_blocks(raw: &str) -> CcusageData {
    let blocks = match serde_json::from_str::<CcusageBlocks>(raw) {
        Ok(parsed) => parsed.into_blocks(),
        Err(err) => {
            tracing::debug!(%err, "malformed ccusage output");
            return CcusageData::default();
        }
    };

    let Some(active) = blocks.into_iter().find(|b| b.is_active) else {
        return CcusageData::default();
    };

    let remaining_minutes = active
        .projection
        .map(|p| p.remaining_minutes.round())
        .filter(|m| m.is_finite() && *m > 0.0)
        .map(|m| m as u64);

    CcusageData {
        block_cost: Some(active.cost_usd.unwrap_or(0.0)),
        remaining_minutes,
    }
}
