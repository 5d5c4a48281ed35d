//! SQLite-backed persistence shared by concurrent statusline invocations.
//!
//! This module provides:
//! - The session history (one row per session, overwritten on every render)
//! - Per-day spend aggregation over that history
//! - A small TTL cache for the usage-limits API
//! - Key/value metadata (cached user agent)
//!
//! WAL mode plus a busy timeout make the read-modify-write of concurrent
//! renders atomic without explicit locking.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::models::{HookJson, SessionRecord, SpendSummary};

/// Metadata value with optional timestamp
#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub value: String,
    pub updated_at: Option<i64>,
}

/// Get the database file path
///
/// Checks `CLAUDE_STATUSLINE_DB_PATH` environment variable first,
/// falls back to `~/.claude/statusline.db`
fn get_db_path() -> Result<PathBuf> {
    if let Ok(custom_path) = env::var("CLAUDE_STATUSLINE_DB_PATH") {
        return Ok(PathBuf::from(custom_path));
    }

    let base_dirs = directories::BaseDirs::new().context("Failed to find home directory")?;
    let claude_dir = base_dirs.home_dir().join(".claude");

    if !claude_dir.exists() {
        fs::create_dir_all(&claude_dir)?;
    }

    Ok(claude_dir.join("statusline.db"))
}

/// Open database connection with WAL mode and retry logic
///
/// Retries "database locked" errors with a linear backoff.
fn open_db() -> Result<Connection> {
    let db_path = get_db_path()?;

    let mut attempts = 0;
    let max_attempts = 3;

    loop {
        match Connection::open(&db_path).and_then(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            init_schema(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => return Ok(conn),
            Err(e) if e.to_string().contains("locked") && attempts < max_attempts => {
                attempts += 1;
                thread::sleep(Duration::from_millis(100 * attempts));
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to open database: {}", db_path.display()));
            }
        }
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS session_history (
            session_id TEXT PRIMARY KEY,
            cost_usd REAL NOT NULL,
            duration_ms INTEGER NOT NULL,
            date TEXT NOT NULL,
            cwd TEXT NOT NULL,
            model TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_session_history_date ON session_history(date);
        CREATE TABLE IF NOT EXISTS api_cache (
            cache_key TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_expires_at ON api_cache(expires_at);
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER
        );
        INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', '1');",
    )?;
    Ok(())
}

/// Fetch metadata value by key (opens a short-lived connection)
pub fn load_metadata(key: &str) -> Result<Option<MetadataEntry>> {
    let conn = open_db()?;
    get_metadata(&conn, key)
}

/// Persist metadata value by key (opens a short-lived connection)
pub fn store_metadata(key: &str, value: &str) -> Result<()> {
    let conn = open_db()?;
    set_metadata(&conn, key, value)
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<MetadataEntry>> {
    let mut stmt = conn.prepare("SELECT value, updated_at FROM metadata WHERE key = ?1")?;
    let result = stmt
        .query_row(params![key], |row| {
            let value: String = row.get(0)?;
            let updated_at: Option<i64> = row.get::<_, Option<i64>>(1).unwrap_or(None);
            Ok(MetadataEntry { value, updated_at })
        })
        .optional()?;
    Ok(result)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().timestamp();
    conn.execute(
        "INSERT INTO metadata (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;
    Ok(())
}

fn upsert_session(conn: &Connection, record: &SessionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO session_history (session_id, cost_usd, duration_ms, date, cwd, model, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(session_id) DO UPDATE SET
             cost_usd = excluded.cost_usd,
             duration_ms = excluded.duration_ms,
             date = excluded.date,
             cwd = excluded.cwd,
             model = excluded.model,
             updated_at = excluded.updated_at",
        params![
            record.session_id,
            record.cost_usd,
            record.duration_ms as i64,
            record.date,
            record.cwd,
            record.model,
            record.updated_at
        ],
    )?;
    Ok(())
}

/// Build the history record for the current hook payload
pub fn session_record_from_hook(hook: &HookJson) -> SessionRecord {
    SessionRecord {
        session_id: hook.session_key().to_string(),
        cost_usd: hook.cost.total_cost_usd,
        duration_ms: hook.cost.total_duration_ms,
        date: Local::now().format("%Y-%m-%d").to_string(),
        cwd: hook.workspace.current_dir.clone(),
        model: hook.model.display_name.clone(),
        updated_at: Utc::now().timestamp(),
    }
}

/// Insert or overwrite the history row for this session
pub fn record_session(hook: &HookJson) -> Result<SessionRecord> {
    let conn = open_db()?;
    let record = session_record_from_hook(hook);
    upsert_session(&conn, &record)?;
    Ok(record)
}

pub fn load_session(session_id: &str) -> Result<Option<SessionRecord>> {
    let conn = open_db()?;
    let record = conn
        .query_row(
            "SELECT session_id, cost_usd, duration_ms, date, cwd, model, updated_at
             FROM session_history WHERE session_id = ?1",
            params![session_id],
            |row| {
                Ok(SessionRecord {
                    session_id: row.get(0)?,
                    cost_usd: row.get(1)?,
                    duration_ms: row.get::<_, i64>(2)?.max(0) as u64,
                    date: row.get(3)?,
                    cwd: row.get(4)?,
                    model: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Total cost and duration of every session last updated on `date` (YYYY-MM-DD)
pub fn spend_summary(date: &str) -> Result<SpendSummary> {
    let conn = open_db()?;
    let summary = conn.query_row(
        "SELECT COALESCE(SUM(cost_usd), 0.0), COALESCE(SUM(duration_ms), 0), COUNT(*)
         FROM session_history WHERE date = ?1",
        params![date],
        |row| {
            Ok(SpendSummary {
                total_cost: row.get(0)?,
                total_duration_ms: row.get::<_, i64>(1)?.max(0) as u64,
                sessions_count: row.get::<_, i64>(2)? as usize,
            })
        },
    )?;
    Ok(summary)
}

/// Get cached API data if still valid
pub fn get_api_cache(cache_key: &str) -> Result<Option<String>> {
    let conn = open_db()?;
    let now = Utc::now().timestamp();

    let result = conn
        .query_row(
            "SELECT data FROM api_cache WHERE cache_key = ? AND expires_at > ?",
            params![cache_key, now],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    Ok(result)
}

/// Store API response in cache with expiration
///
/// Stores the data and opportunistically removes expired entries.
pub fn set_api_cache(cache_key: &str, data: &str, ttl_seconds: i64) -> Result<()> {
    let conn = open_db()?;
    let now = Utc::now().timestamp();
    let expires_at = now + ttl_seconds;

    conn.execute(
        "INSERT INTO api_cache (cache_key, data, fetched_at, expires_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(cache_key) DO UPDATE SET
             data = excluded.data,
             fetched_at = excluded.fetched_at,
             expires_at = excluded.expires_at",
        params![cache_key, data, now, expires_at],
    )?;

    conn.execute("DELETE FROM api_cache WHERE expires_at <= ?", params![now])?;

    Ok(())
}
