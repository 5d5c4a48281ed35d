use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::PathDisplayMode;

/// Fallback shown when a reset timestamp cannot be parsed
pub const RESET_TIME_FALLBACK: &str = "N/A";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn claude_paths(override_env: Option<&str>) -> Vec<PathBuf> {
    let mut paths = vec![];
    if let Some(list) = override_env {
        let list = list.trim();
        if !list.is_empty() {
            for p in list.split(',') {
                let p = p.trim();
                if p.is_empty() {
                    continue;
                }
                let pb = PathBuf::from(p);
                if pb.is_dir() {
                    paths.push(pb);
                }
            }
            if !paths.is_empty() {
                return paths;
            }
        }
    }
    let basedirs = directories::BaseDirs::new();
    let home = basedirs
        .as_ref()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~"));
    let xdg_config = basedirs
        .as_ref()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| home.join(".config"));
    // Prefer ~/.claude, then XDG config
    for base in [home.join(".claude"), xdg_config.join("claude")].into_iter() {
        if base.is_dir() {
            paths.push(base);
        }
    }
    paths
}

pub fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

fn home_dir() -> Option<String> {
    directories::BaseDirs::new().map(|b| b.home_dir().to_string_lossy().into_owned())
}

pub fn format_path(path: &str, mode: PathDisplayMode) -> String {
    format_path_with_home(path, mode, home_dir().as_deref())
}

/// `format_path` with an explicit home directory for `~` substitution
pub fn format_path_with_home(path: &str, mode: PathDisplayMode, home: Option<&str>) -> String {
    let with_tilde = match home {
        Some(h) if !h.is_empty() && path.starts_with(h) => format!("~{}", &path[h.len()..]),
        _ => path.to_owned(),
    };

    match mode {
        PathDisplayMode::Basename => path
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()
            .unwrap_or(path)
            .to_owned(),
        PathDisplayMode::Truncated => {
            let segments: Vec<&str> = with_tilde.split('/').filter(|s| !s.is_empty()).collect();
            if segments.len() > 2 {
                format!("/{}", segments[segments.len() - 2..].join("/"))
            } else {
                with_tilde
            }
        }
        PathDisplayMode::Full => with_tilde,
    }
}

pub fn format_cost(v: f64) -> String {
    format!("{v:.2}")
}

/// Split a token count into its scaled number and unit suffix (`m`, `k` or none)
pub fn scale_tokens(n: u64, show_decimals: bool) -> (String, &'static str) {
    let scaled = |value: f64| {
        if show_decimals {
            format!("{value:.1}")
        } else {
            format!("{}", value.round() as u64)
        }
    };
    if n >= 1_000_000 {
        (scaled(n as f64 / 1e6), "m")
    } else if n >= 1_000 {
        (scaled(n as f64 / 1e3), "k")
    } else {
        (n.to_string(), "")
    }
}

pub fn format_tokens(n: u64, show_decimals: bool) -> String {
    let (number, unit) = scale_tokens(n, show_decimals);
    format!("{number}{unit}")
}

pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Minutes left in a billing block, e.g. `2h5m` or `45m`
pub fn format_remaining_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h{mins}m")
    } else {
        format!("{mins}m")
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some upstreams omit the offset; treat those as UTC
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_reset_time(resets_at: &str) -> String {
    format_reset_time_at(resets_at, Utc::now())
}

pub fn format_reset_time_at(resets_at: &str, now: DateTime<Utc>) -> String {
    let Some(reset) = parse_timestamp(resets_at) else {
        return RESET_TIME_FALLBACK.to_string();
    };
    let diff_ms = (reset - now).num_milliseconds();
    if diff_ms <= 0 {
        return "now".to_string();
    }
    let hours = diff_ms / 3_600_000;
    let minutes = (diff_ms % 3_600_000) / 60_000;
    if hours > 0 {
        format!("{hours}h{minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run a command, capturing stdout, and kill it once `timeout` elapses.
///
/// Returns `None` when the command cannot be spawned or does not finish in
/// time. Stderr is discarded.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Option<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    // Drain stdout concurrently so a chatty child cannot block on a full pipe
    let mut stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(?timeout, program = ?cmd.get_program(), "command timed out");
                return None;
            }
            Err(err) => {
                tracing::debug!(%err, "failed to poll child process");
                return None;
            }
        }
    };

    let stdout = reader.join().ok()?;
    Some(Output {
        status,
        stdout,
        stderr: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(0, true), "0");
        assert_eq!(format_tokens(999, true), "999");
        assert_eq!(format_tokens(999, false), "999");
        assert_eq!(format_tokens(1500, true), "1.5k");
        assert_eq!(format_tokens(1500, false), "2k");
        assert_eq!(format_tokens(192_100, true), "192.1k");
        assert_eq!(format_tokens(2_500_000, true), "2.5m");
        assert_eq!(format_tokens(2_500_000, false), "3m");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59_999), "0m");
        assert_eq!(format_duration(45 * 60_000), "45m");
        assert_eq!(format_duration(125 * 60_000), "2h 5m");
    }

    #[test]
    fn test_format_remaining_minutes() {
        assert_eq!(format_remaining_minutes(45), "45m");
        assert_eq!(format_remaining_minutes(125), "2h5m");
    }

    #[test]
    fn test_format_reset_time() {
        let now = Utc::now();
        let ninety = (now + TimeDelta::minutes(90)).to_rfc3339();
        assert_eq!(format_reset_time_at(&ninety, now), "1h30m");

        let twenty = (now + TimeDelta::minutes(20)).to_rfc3339();
        assert_eq!(format_reset_time_at(&twenty, now), "20m");

        let past = (now - TimeDelta::minutes(5)).to_rfc3339();
        assert_eq!(format_reset_time_at(&past, now), "now");
        assert_eq!(format_reset_time(&past), "now");

        assert_eq!(format_reset_time("not-a-date"), RESET_TIME_FALLBACK);
    }

    #[test]
    fn test_parse_timestamp_without_offset() {
        let parsed = parse_timestamp("2025-10-18T10:00:00.000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-10-18T10:00:00+00:00");
    }

    #[test]
    fn test_format_path_modes() {
        let p = "/home/alice/projects/app/src";
        let home = Some("/home/alice");
        assert_eq!(
            format_path_with_home(p, PathDisplayMode::Truncated, home),
            "/app/src"
        );
        assert_eq!(
            format_path_with_home(p, PathDisplayMode::Basename, home),
            "src"
        );
        assert_eq!(
            format_path_with_home(p, PathDisplayMode::Full, home),
            "~/projects/app/src"
        );
        assert_eq!(
            format_path_with_home(p, PathDisplayMode::Truncated, None),
            "/app/src"
        );
    }

    #[test]
    fn test_format_path_ignores_empty_segments() {
        assert_eq!(
            format_path_with_home("/srv//app///src/", PathDisplayMode::Truncated, None),
            "/app/src"
        );
        assert_eq!(
            format_path_with_home("/srv//app///src/", PathDisplayMode::Basename, None),
            "src"
        );
        // Two segments or fewer are left alone
        assert_eq!(
            format_path_with_home("/home/alice", PathDisplayMode::Truncated, Some("/home/alice")),
            "~"
        );
        assert_eq!(
            format_path_with_home("/", PathDisplayMode::Basename, None),
            "/"
        );
    }

    #[test]
    fn test_run_with_timeout_kills_slow_command() {
        let started = Instant::now();
        let out = run_with_timeout(
            Command::new("sleep").arg("5"),
            Duration::from_millis(100),
        );
        assert!(out.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_run_with_timeout_captures_stdout() {
        let out = run_with_timeout(
            Command::new("echo").arg("hello"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn test_run_with_timeout_missing_binary() {
        let out = run_with_timeout(
            &mut Command::new("/nonexistent/definitely-not-here"),
            Duration::from_secs(1),
        );
        assert!(out.is_none());
    }
}
