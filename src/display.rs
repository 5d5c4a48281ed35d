//! # Display Module
//!
//! Color-composing formatters and the two-line assembler. Every segment
//! builder returns `None` (or an empty string) when it has nothing to show so
//! that joining never leaves a dangling separator.

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;

use crate::config::{BarColorMode, GitConfig, LimitsConfig, SessionConfig, StatuslineConfig};
use crate::models::{CcusageData, ContextData, GitStatus};
use crate::usage_api::UsageLimits;
use crate::utils::{
    format_cost, format_remaining_minutes, format_reset_time, scale_tokens,
};

/// Named ANSI color codes used by every segment
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub green: &'static str,
    pub red: &'static str,
    pub purple: &'static str,
    pub yellow: &'static str,
    pub orange: &'static str,
    pub gray: &'static str,
    pub light_gray: &'static str,
    pub reset: &'static str,
}

pub const COLORS: Palette = Palette {
    green: "\x1b[0;32m",
    red: "\x1b[0;31m",
    purple: "\x1b[0;35m",
    yellow: "\x1b[0;33m",
    orange: "\x1b[38;5;208m",
    gray: "\x1b[0;90m",
    light_gray: "\x1b[0;37m",
    reset: "\x1b[0m",
};

const FILLED_CELL: &str = "█";
const EMPTY_CELL: &str = "░";

static ANSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

/// Remove color escape sequences (used when `NO_COLOR` is set)
pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// `NO_COLOR` disables color only when set to a non-empty value
pub fn color_disabled() -> bool {
    env::var("NO_COLOR").is_ok_and(|v| !v.is_empty())
}

/// Token count with the unit suffix dimmed
pub fn format_tokens_colored(n: u64, show_decimals: bool) -> String {
    let (number, unit) = scale_tokens(n, show_decimals);
    if unit.is_empty() {
        number
    } else {
        format!("{number}{}{unit}{}", COLORS.gray, COLORS.light_gray)
    }
}

fn bar_color(pct: f64, mode: BarColorMode) -> &'static str {
    match mode {
        BarColorMode::Progressive => {
            if pct < 50.0 {
                COLORS.gray
            } else if pct < 70.0 {
                COLORS.yellow
            } else if pct < 90.0 {
                COLORS.orange
            } else {
                COLORS.red
            }
        }
        BarColorMode::Green => COLORS.green,
        BarColorMode::Yellow => COLORS.yellow,
        BarColorMode::Red => COLORS.red,
    }
}

/// Number of filled cells for a percentage
pub fn filled_cells(pct: f64, length: usize) -> usize {
    let filled = (pct / 100.0 * length as f64).round();
    if filled.is_nan() || filled <= 0.0 {
        0
    } else {
        (filled as usize).min(length)
    }
}

pub fn format_progress_bar(pct: f64, length: usize, mode: BarColorMode) -> String {
    let filled = filled_cells(pct, length);
    format!(
        "{}{}{}{}{}",
        bar_color(pct, mode),
        FILLED_CELL.repeat(filled),
        COLORS.gray,
        EMPTY_CELL.repeat(length - filled),
        COLORS.reset
    )
}

pub fn format_branch(git: &GitStatus, cfg: &GitConfig) -> String {
    let mut result = String::new();
    if cfg.show_branch {
        result.push_str(&git.branch);
    }
    if !git.has_changes {
        return result;
    }

    if cfg.show_dirty_indicator {
        result.push_str(&format!("{}*{}", COLORS.purple, COLORS.reset));
    }

    let mut changes: Vec<String> = Vec::new();
    if cfg.show_changes {
        let added = git.total_added();
        let deleted = git.total_deleted();
        if added > 0 {
            changes.push(format!("{}+{added}{}", COLORS.green, COLORS.reset));
        }
        if deleted > 0 {
            changes.push(format!("{}-{deleted}{}", COLORS.red, COLORS.reset));
        }
    }
    if cfg.show_staged && git.staged.files > 0 {
        changes.push(format!("{}~{}{}", COLORS.gray, git.staged.files, COLORS.reset));
    }
    if cfg.show_unstaged && git.unstaged.files > 0 {
        changes.push(format!(
            "{}~{}{}",
            COLORS.yellow, git.unstaged.files, COLORS.reset
        ));
    }

    if !changes.is_empty() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(&changes.join(" "));
    }
    result
}

pub fn format_session(
    cost: f64,
    tokens_used: u64,
    tokens_max: u64,
    percentage: u32,
    cfg: &SessionConfig,
) -> String {
    let mut items: Vec<String> = Vec::new();
    if cfg.show_cost {
        items.push(format!("${}", format_cost(cost)));
    }
    if cfg.show_tokens {
        let used = format_tokens_colored(tokens_used, cfg.show_token_decimals);
        if cfg.show_max_tokens {
            let max = format_tokens_colored(tokens_max, cfg.show_token_decimals);
            items.push(format!("{used}{}/{max}{}", COLORS.gray, COLORS.light_gray));
        } else {
            items.push(used);
        }
    }
    if cfg.show_percentage {
        items.push(format!("{percentage}{}%{}", COLORS.gray, COLORS.light_gray));
    }

    if items.is_empty() {
        return String::new();
    }

    let info_sep = match cfg.info_separator {
        Some(sep) => format!(" {}{sep}{} ", COLORS.gray, COLORS.light_gray),
        None => " ".to_string(),
    };
    format!("{}S:{} {}", COLORS.gray, COLORS.light_gray, items.join(&info_sep))
}

/// Everything the assembler needs from the data sources
#[derive(Debug, Clone, Default)]
pub struct LineInputs {
    pub branch: String,
    pub dir_path: String,
    pub model_name: String,
    pub session_cost: f64,
    pub context: ContextData,
    pub usage_limits: UsageLimits,
    pub ccusage: CcusageData,
}

fn section_separator(cfg: &StatuslineConfig) -> String {
    format!("{}{}{}", COLORS.gray, cfg.separator, COLORS.light_gray)
}

fn is_default_model(model_name: &str) -> bool {
    model_name.to_lowercase().contains("sonnet")
}

pub fn build_first_line(inputs: &LineInputs, cfg: &StatuslineConfig) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !inputs.branch.is_empty() {
        parts.push(&inputs.branch);
    }
    if !inputs.dir_path.is_empty() {
        parts.push(&inputs.dir_path);
    }
    let show_model = cfg.show_sonnet_model || !is_default_model(&inputs.model_name);
    if show_model && !inputs.model_name.is_empty() {
        parts.push(&inputs.model_name);
    }
    let sep = format!(" {} ", section_separator(cfg));
    format!("{}{}{}", COLORS.light_gray, parts.join(&sep), COLORS.reset)
}

fn limits_segment(limits: &UsageLimits, cfg: &LimitsConfig) -> Option<String> {
    let window = limits.five_hour.as_ref()?;
    let utilization = window.utilization?;
    let resets_at = window.resets_at.as_deref()?;
    let reset = format_reset_time(resets_at);
    let pct = utilization.round();

    Some(if cfg.show_progress_bar {
        let bar = format_progress_bar(utilization, cfg.progress_bar_length.cells(), cfg.color);
        format!(
            "{}L: {bar} {}{pct}{}% ({reset} left)",
            COLORS.gray, COLORS.light_gray, COLORS.gray
        )
    } else {
        format!(
            "{}L:{} {pct}{}% ({reset} left)",
            COLORS.gray, COLORS.light_gray, COLORS.gray
        )
    })
}

fn block_segment(data: &CcusageData) -> Option<String> {
    let cost = data.block_cost?;
    let mut segment = format!(
        "{}B:{} ${}",
        COLORS.gray,
        COLORS.light_gray,
        format_cost(cost)
    );
    if let Some(minutes) = data.remaining_minutes.filter(|m| *m > 0) {
        segment.push_str(&format!(
            " {}({} left)",
            COLORS.gray,
            format_remaining_minutes(minutes)
        ));
    }
    Some(segment)
}

/// Present second-line segments in display order
fn second_line_segments(inputs: &LineInputs, cfg: &StatuslineConfig) -> Vec<String> {
    [
        Some(format_session(
            inputs.session_cost,
            inputs.context.tokens,
            cfg.context.max_context_tokens,
            inputs.context.percentage,
            &cfg.session,
        ))
        .filter(|s| !s.is_empty()),
        limits_segment(&inputs.usage_limits, &cfg.limits),
        block_segment(&inputs.ccusage),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn join_segments(segments: &[String], cfg: &StatuslineConfig) -> String {
    let sep = format!(" {}{} ", COLORS.gray, cfg.separator);
    format!("{}{}", segments.join(&sep), COLORS.reset)
}

pub fn build_second_line(inputs: &LineInputs, cfg: &StatuslineConfig) -> String {
    join_segments(&second_line_segments(inputs, cfg), cfg)
}

/// Output lines for a successful render
pub fn build_lines(inputs: &LineInputs, cfg: &StatuslineConfig) -> Vec<String> {
    let first = build_first_line(inputs, cfg);
    let segments = second_line_segments(inputs, cfg);
    if cfg.one_line {
        let line = if segments.is_empty() {
            first
        } else if strip_ansi(&first).is_empty() {
            join_segments(&segments, cfg)
        } else {
            let sep = format!(" {} ", section_separator(cfg));
            format!("{first}{sep}{}", join_segments(&segments, cfg))
        };
        vec![line, String::new()]
    } else {
        vec![first, join_segments(&segments, cfg)]
    }
}

/// Two-line fallback shown when the pipeline fails
pub fn render_error(message: &str) -> Vec<String> {
    vec![
        format!(
            "{}Error:{} {message}{}",
            COLORS.red, COLORS.light_gray, COLORS.reset
        ),
        format!(
            "{}Check statusline configuration{}",
            COLORS.gray, COLORS.reset
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeCounts;
    use crate::usage_api::FiveHourLimit;
    use chrono::{TimeDelta, Utc};

    fn plain(s: &str) -> String {
        strip_ansi(s)
    }

    fn dirty_git() -> GitStatus {
        GitStatus {
            branch: "main".to_string(),
            has_changes: true,
            staged: ChangeCounts {
                added: 10,
                deleted: 2,
                files: 1,
            },
            unstaged: ChangeCounts {
                added: 5,
                deleted: 0,
                files: 3,
            },
        }
    }

    #[test]
    fn progress_bar_tiers() {
        let low = format_progress_bar(45.0, 5, BarColorMode::Progressive);
        assert!(low.starts_with(COLORS.gray));
        let mid = format_progress_bar(65.0, 5, BarColorMode::Progressive);
        assert!(mid.starts_with(COLORS.yellow));
        let high = format_progress_bar(85.0, 5, BarColorMode::Progressive);
        assert!(high.starts_with(COLORS.orange));
        let full = format_progress_bar(95.0, 5, BarColorMode::Progressive);
        assert!(full.starts_with(COLORS.red));
        let green = format_progress_bar(95.0, 5, BarColorMode::Green);
        assert!(green.starts_with(COLORS.green));
    }

    #[test]
    fn progress_bar_cells() {
        assert_eq!(filled_cells(40.0, 10), 4);
        assert_eq!(filled_cells(0.0, 5), 0);
        assert_eq!(filled_cells(150.0, 5), 5);
        assert_eq!(filled_cells(-3.0, 5), 0);
        let bar = plain(&format_progress_bar(40.0, 10, BarColorMode::Red));
        assert_eq!(bar, "████░░░░░░");
    }

    #[test]
    fn branch_with_all_flags() {
        let cfg = GitConfig {
            show_changes: true,
            ..GitConfig::default()
        };
        assert_eq!(plain(&format_branch(&dirty_git(), &cfg)), "main* +15 -2 ~1 ~3");
    }

    #[test]
    fn branch_default_flags() {
        assert_eq!(
            plain(&format_branch(&dirty_git(), &GitConfig::default())),
            "main* ~1 ~3"
        );
    }

    #[test]
    fn branch_clean_repo_has_no_markers() {
        let git = GitStatus {
            branch: "dev".to_string(),
            ..GitStatus::default()
        };
        assert_eq!(format_branch(&git, &GitConfig::default()), "dev");
    }

    #[test]
    fn branch_all_flags_off_is_empty() {
        let cfg = GitConfig {
            show_branch: false,
            show_dirty_indicator: false,
            show_changes: false,
            show_staged: false,
            show_unstaged: false,
        };
        assert_eq!(format_branch(&dirty_git(), &cfg), "");
    }

    #[test]
    fn branch_hidden_changes_only_has_no_leading_space() {
        let cfg = GitConfig {
            show_branch: false,
            show_dirty_indicator: false,
            ..GitConfig::default()
        };
        assert_eq!(plain(&format_branch(&dirty_git(), &cfg)), "~1 ~3");
    }

    #[test]
    fn session_default_flags() {
        let out = format_session(1.5, 120_000, 200_000, 77, &SessionConfig::default());
        assert_eq!(plain(&out), "S: 120k 77%");
    }

    #[test]
    fn session_with_cost_max_and_separator() {
        let cfg = SessionConfig {
            info_separator: Some(crate::config::Separator::Pipe),
            show_cost: true,
            show_tokens: true,
            show_max_tokens: true,
            show_token_decimals: true,
            show_percentage: true,
        };
        let out = format_session(1.5, 192_100, 200_000, 96, &cfg);
        assert_eq!(plain(&out), "S: $1.50 | 192.1k/200.0k | 96%");
    }

    #[test]
    fn session_all_flags_off_is_empty() {
        let cfg = SessionConfig {
            info_separator: None,
            show_cost: false,
            show_tokens: false,
            show_max_tokens: false,
            show_token_decimals: false,
            show_percentage: false,
        };
        assert_eq!(format_session(1.0, 10, 100, 10, &cfg), "");
    }

    fn inputs() -> LineInputs {
        LineInputs {
            branch: "main".to_string(),
            dir_path: "/app/src".to_string(),
            model_name: "Sonnet 4.5".to_string(),
            session_cost: 0.42,
            context: ContextData {
                tokens: 50_000,
                percentage: 32,
            },
            ..LineInputs::default()
        }
    }

    #[test]
    fn first_line_hides_default_model() {
        let cfg = StatuslineConfig::default();
        assert_eq!(plain(&build_first_line(&inputs(), &cfg)), "main • /app/src");

        let cfg = StatuslineConfig {
            show_sonnet_model: true,
            ..StatuslineConfig::default()
        };
        assert_eq!(
            plain(&build_first_line(&inputs(), &cfg)),
            "main • /app/src • Sonnet 4.5"
        );

        let opus = LineInputs {
            model_name: "Opus 4.1".to_string(),
            ..inputs()
        };
        assert_eq!(
            plain(&build_first_line(&opus, &StatuslineConfig::default())),
            "main • /app/src • Opus 4.1"
        );
    }

    #[test]
    fn first_line_without_branch_has_no_dangling_separator() {
        let no_branch = LineInputs {
            branch: String::new(),
            ..inputs()
        };
        assert_eq!(
            plain(&build_first_line(&no_branch, &StatuslineConfig::default())),
            "/app/src"
        );
    }

    #[test]
    fn second_line_with_limits_and_block() {
        let reset = (Utc::now() + TimeDelta::minutes(150)).to_rfc3339();
        let data = LineInputs {
            usage_limits: UsageLimits {
                five_hour: Some(FiveHourLimit {
                    utilization: Some(42.0),
                    resets_at: Some(reset),
                }),
            },
            ccusage: CcusageData {
                block_cost: Some(3.5),
                remaining_minutes: Some(95),
            },
            ..inputs()
        };
        let line = plain(&build_second_line(&data, &StatuslineConfig::default()));
        assert!(line.starts_with("S: 50k 32% • L: ██░░░ 42% ("), "{line}");
        assert!(line.contains(" left) • B: $3.50 (1h35m left)"), "{line}");
    }

    #[test]
    fn second_line_limits_without_bar() {
        let reset = (Utc::now() - TimeDelta::minutes(1)).to_rfc3339();
        let mut cfg = StatuslineConfig::default();
        cfg.limits.show_progress_bar = false;
        let data = LineInputs {
            usage_limits: UsageLimits {
                five_hour: Some(FiveHourLimit {
                    utilization: Some(12.4),
                    resets_at: Some(reset),
                }),
            },
            ..inputs()
        };
        let line = plain(&build_second_line(&data, &cfg));
        assert_eq!(line, "S: 50k 32% • L: 12% (now left)");
    }

    #[test]
    fn second_line_skips_zero_remaining_minutes() {
        let data = LineInputs {
            ccusage: CcusageData {
                block_cost: Some(1.0),
                remaining_minutes: Some(0),
            },
            ..inputs()
        };
        let line = plain(&build_second_line(&data, &StatuslineConfig::default()));
        assert_eq!(line, "S: 50k 32% • B: $1.00");
    }

    #[test]
    fn second_line_without_session_items_has_no_leading_separator() {
        let mut cfg = StatuslineConfig::default();
        cfg.session.show_tokens = false;
        cfg.session.show_percentage = false;
        let data = LineInputs {
            ccusage: CcusageData {
                block_cost: Some(2.0),
                remaining_minutes: None,
            },
            ..inputs()
        };
        assert_eq!(plain(&build_second_line(&data, &cfg)), "B: $2.00");

        let empty = LineInputs::default();
        assert_eq!(plain(&build_second_line(&empty, &cfg)), "");
    }

    #[test]
    fn one_line_mode_emits_trailing_blank_line() {
        let lines = build_lines(&inputs(), &StatuslineConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(plain(&lines[0]), "main • /app/src • S: 50k 32%");
        assert!(lines[1].is_empty());
    }

    #[test]
    fn one_line_mode_without_second_line_segments() {
        let mut cfg = StatuslineConfig::default();
        cfg.session.show_tokens = false;
        cfg.session.show_percentage = false;
        let lines = build_lines(&inputs(), &cfg);
        assert_eq!(plain(&lines[0]), "main • /app/src");
        assert!(lines[0].ends_with(COLORS.reset));

        let no_first = LineInputs {
            branch: String::new(),
            dir_path: String::new(),
            ..inputs()
        };
        let lines = build_lines(&no_first, &StatuslineConfig::default());
        assert_eq!(plain(&lines[0]), "S: 50k 32%");
    }

    #[test]
    fn limits_label_is_gray_without_session_segment() {
        let mut cfg = StatuslineConfig::default();
        cfg.session.show_tokens = false;
        cfg.session.show_percentage = false;
        let data = LineInputs {
            usage_limits: UsageLimits {
                five_hour: Some(FiveHourLimit {
                    utilization: Some(20.0),
                    resets_at: Some((Utc::now() + TimeDelta::minutes(30)).to_rfc3339()),
                }),
            },
            ..inputs()
        };
        let line = build_second_line(&data, &cfg);
        assert!(line.starts_with(&format!("{}L: ", COLORS.gray)), "{line:?}");

        cfg.limits.show_progress_bar = false;
        let line = build_second_line(&data, &cfg);
        assert!(line.starts_with(&format!("{}L:", COLORS.gray)), "{line:?}");
    }

    #[test]
    fn two_line_mode() {
        let cfg = StatuslineConfig {
            one_line: false,
            ..StatuslineConfig::default()
        };
        let lines = build_lines(&inputs(), &cfg);
        assert_eq!(lines.len(), 2);
        assert_eq!(plain(&lines[0]), "main • /app/src");
        assert_eq!(plain(&lines[1]), "S: 50k 32%");
    }

    #[test]
    #[serial_test::serial]
    fn empty_no_color_keeps_colors() {
        // SAFETY: Test runs serially, no concurrent env access
        unsafe { env::set_var("NO_COLOR", "") };
        assert!(!color_disabled());
        unsafe { env::set_var("NO_COLOR", "1") };
        assert!(color_disabled());
        unsafe { env::remove_var("NO_COLOR") };
        assert!(!color_disabled());
    }

    #[test]
    fn error_fallback_shape() {
        let lines = render_error("boom");
        assert_eq!(lines.len(), 2);
        assert_eq!(plain(&lines[0]), "Error: boom");
        assert_eq!(plain(&lines[1]), "Check statusline configuration");
    }
}
