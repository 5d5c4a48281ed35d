//! # Context Module
//!
//! Estimates context-window usage from the session transcript (JSONL).
//! The latest main-thread assistant message with usage reflects the whole
//! prompt that was sent, so its token fields are summed rather than the
//! entire history.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::ContextConfig;
use crate::models::{ContextData, TranscriptLine};

/// Tokens reported by the most recent assistant message, 0 when none
pub fn transcript_tokens(transcript_path: &Path) -> u64 {
    let file = match File::open(transcript_path) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %transcript_path.display(), %err, "transcript unavailable");
            return 0;
        }
    };

    let mut latest: u64 = 0;
    // Stream line-by-line; a partially written trailing line simply fails to parse
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            continue;
        };
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<TranscriptLine>(t) else {
            continue;
        };
        if parsed.r#type.as_deref() != Some("assistant") || parsed.is_sidechain {
            continue;
        }
        let total = parsed
            .message
            .and_then(|m| m.usage)
            .map(|u| u.total())
            .unwrap_or(0);
        if total > 0 {
            latest = total;
        }
    }
    latest
}

/// Token count plus overhead and its integer percentage of the context budget
pub fn context_usage(tokens: u64, cfg: &ContextConfig) -> ContextData {
    let adjusted = tokens.saturating_add(cfg.overhead_tokens);
    let budget = cfg.budget();
    let percentage = if budget == 0 {
        if adjusted == 0 { 0 } else { 100 }
    } else {
        ((adjusted as f64 / budget as f64) * 100.0).round() as u32
    };
    ContextData {
        tokens: adjusted,
        percentage: percentage.min(100),
    }
}

pub fn estimate_context(transcript_path: &Path, cfg: &ContextConfig) -> ContextData {
    context_usage(transcript_tokens(transcript_path), cfg)
}
