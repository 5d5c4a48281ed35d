//! Five-hour rate-limit utilization from the Claude OAuth usage endpoint.
//!
//! Every failure path (disabled, no token, network error, bad payload)
//! resolves to `UsageLimits::default()`; the statusline renders without the
//! limits segment in that case.

use chrono::Utc;
use directories::BaseDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::db;

const DEFAULT_USER_AGENT: &str = "claude-code";
const USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";
const CACHE_TTL_SECONDS: i64 = 60;
const ANTHROPIC_BETA: &str = "oauth-2025-04-20";
const API_CACHE_KEY: &str = "oauth_usage_limits";
const USER_AGENT_CACHE_KEY: &str = "user_agent_header";
const USER_AGENT_CACHE_TTL_SECONDS: i64 = 86_400;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+(?:-[A-Za-z0-9.]+)?)").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiveHourLimit {
    pub utilization: Option<f64>,
    /// RFC 3339 reset timestamp as reported upstream
    pub resets_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub five_hour: Option<FiveHourLimit>,
}

#[derive(Debug, Deserialize)]
struct UsageLimitDto {
    utilization: Option<f64>,
    resets_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageResponseDto {
    #[serde(default)]
    five_hour: Option<UsageLimitDto>,
}

impl From<UsageResponseDto> for UsageLimits {
    fn from(dto: UsageResponseDto) -> Self {
        UsageLimits {
            five_hour: dto.five_hour.map(|limit| FiveHourLimit {
                utilization: limit.utilization,
                resets_at: limit.resets_at,
            }),
        }
    }
}

/// `claude-code/<version>` header value.
///
/// Precedence: explicit env agent, env version, the version reported in the
/// hook payload, the cached value, then `claude --version`.
fn resolve_user_agent(hook_version: Option<&str>) -> String {
    if let Some(explicit) = env_user_agent_override() {
        persist_user_agent(&explicit);
        return explicit;
    }

    let version_override = env_version_override().or_else(|| {
        hook_version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    });

    if version_override.is_none()
        && let Some(cached) = cached_user_agent()
    {
        return cached;
    }

    if let Some(version) = version_override.or_else(cli_version) {
        let agent = format!("claude-code/{version}");
        persist_user_agent(&agent);
        return agent;
    }

    let fallback = DEFAULT_USER_AGENT.to_string();
    persist_user_agent(&fallback);
    fallback
}

fn cached_user_agent() -> Option<String> {
    match db::load_metadata(USER_AGENT_CACHE_KEY) {
        Ok(Some(entry)) => {
            if let Some(ts) = entry.updated_at {
                let age = Utc::now().timestamp().saturating_sub(ts);
                if age > USER_AGENT_CACHE_TTL_SECONDS {
                    return None;
                }
            }
            Some(entry.value)
        }
        _ => None,
    }
}

fn persist_user_agent(value: &str) {
    if let Err(err) = db::store_metadata(USER_AGENT_CACHE_KEY, value) {
        tracing::debug!(%err, "failed to cache user agent");
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_user_agent_override() -> Option<String> {
    non_empty_env("CLAUDE_STATUSLINE_USER_AGENT")
}

fn env_version_override() -> Option<String> {
    ["CLAUDE_STATUSLINE_CLAUDE_VERSION", "CLAUDE_CODE_VERSION"]
        .into_iter()
        .find_map(non_empty_env)
}

fn cli_version() -> Option<String> {
    let output =
        crate::utils::run_with_timeout(Command::new("claude").arg("--version"), REQUEST_TIMEOUT)?;
    if !output.status.success() {
        return None;
    }
    extract_version(&String::from_utf8_lossy(&output.stdout))
}

fn extract_version(text: &str) -> Option<String> {
    VERSION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `CLAUDE_STATUSLINE_FETCH_USAGE` set to a falsy value disables the call
pub fn fetch_enabled() -> bool {
    match env::var("CLAUDE_STATUSLINE_FETCH_USAGE") {
        Ok(val) => {
            let trimmed = val.trim();
            trimmed.is_empty()
                || matches!(
                    trimmed.to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
        }
        Err(_) => true,
    }
}

pub fn get_usage_limits(claude_paths: &[PathBuf], hook_version: Option<&str>) -> UsageLimits {
    if !fetch_enabled() {
        tracing::debug!("usage limit fetch disabled");
        return UsageLimits::default();
    }

    match db::get_api_cache(API_CACHE_KEY) {
        Ok(Some(cached_json)) => {
            if let Ok(limits) = serde_json::from_str::<UsageLimits>(&cached_json) {
                return limits;
            }
        }
        Ok(None) => {}
        Err(err) => tracing::debug!(%err, "usage cache unavailable"),
    }

    let Some(limits) = fetch_usage_limits(claude_paths, hook_version) else {
        return UsageLimits::default();
    };

    if let Ok(json) = serde_json::to_string(&limits)
        && let Err(err) = db::set_api_cache(API_CACHE_KEY, &json, CACHE_TTL_SECONDS)
    {
        tracing::debug!(%err, "failed to cache usage limits");
    }

    limits
}

fn fetch_usage_limits(
    claude_paths: &[PathBuf],
    hook_version: Option<&str>,
) -> Option<UsageLimits> {
    let Some(token) = find_oauth_token(claude_paths) else {
        tracing::debug!("no OAuth token found; skipping usage limits");
        return None;
    };

    let user_agent = resolve_user_agent(hook_version);
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .into();

    let mut response = match agent
        .get(USAGE_ENDPOINT)
        .header("Authorization", &format!("Bearer {token}"))
        .header("User-Agent", user_agent.as_str())
        .header("Accept", "application/json")
        .header("anthropic-beta", ANTHROPIC_BETA)
        .call()
    {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(%err, "usage limit request failed");
            return None;
        }
    };

    if response.status() != 200 {
        tracing::debug!(status = %response.status(), "unexpected usage limit status");
        return None;
    }

    match response.body_mut().read_json::<UsageResponseDto>() {
        Ok(dto) => Some(dto.into()),
        Err(err) => {
            tracing::debug!(%err, "malformed usage limit payload");
            None
        }
    }
}

fn access_token_from_credentials(raw: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(raw).ok()?;
    let access = json
        .get("claudeAiOauth")
        .and_then(|v| v.get("accessToken"))
        .and_then(|v| v.as_str())?
        .trim();
    if access.is_empty() {
        None
    } else {
        Some(access.to_string())
    }
}

fn find_oauth_token(claude_paths: &[PathBuf]) -> Option<String> {
    if let Some(token) = ["CLAUDE_CODE_OAUTH_TOKEN", "ANTHROPIC_AUTH_TOKEN"]
        .into_iter()
        .find_map(non_empty_env)
    {
        return Some(token);
    }

    // macOS stores credentials in the Keychain rather than a file
    #[cfg(target_os = "macos")]
    {
        if let Some(token) = read_from_macos_keychain() {
            return Some(token);
        }
    }

    let mut candidates: Vec<PathBuf> = claude_paths
        .iter()
        .map(|base| base.join(".credentials.json"))
        .collect();
    if let Some(base_dirs) = BaseDirs::new() {
        candidates.push(
            base_dirs
                .home_dir()
                .join(".claude")
                .join(".credentials.json"),
        );
    }

    candidates
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .find_map(|raw| access_token_from_credentials(&raw))
}

#[cfg(target_os = "macos")]
fn read_from_macos_keychain() -> Option<String> {
    use sha2::{Digest, Sha256};

    let username = env::var("USER").ok()?;

    // "Claude Code-credentials", suffixed with 8 hex chars of SHA-256 when CLAUDE_CONFIG_DIR is set
    let mut service_name = "Claude Code-credentials".to_string();
    if let Ok(config_dir) = env::var("CLAUDE_CONFIG_DIR") {
        let mut hasher = Sha256::new();
        hasher.update(config_dir.as_bytes());
        let hash = hasher.finalize();
        let suffix = format!("{:x}", hash).chars().take(8).collect::<String>();
        service_name.push('-');
        service_name.push_str(&suffix);
    }

    let output = crate::utils::run_with_timeout(
        Command::new("security").args([
            "find-generic-password",
            "-a",
            username.as_str(),
            "-s",
            service_name.as_str(),
            "-w",
        ]),
        REQUEST_TIMEOUT,
    )?;
    if !output.status.success() {
        return None;
    }

    let json_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    access_token_from_credentials(&json_str)
}
