use serde::{Deserialize, Serialize};

/// Persisted cost/duration snapshot of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub cost_usd: f64,
    pub duration_ms: u64,
    /// Local date (YYYY-MM-DD) of the last update
    pub date: String,
    pub cwd: String,
    pub model: String,
    pub updated_at: i64,
}

/// Aggregate of all sessions recorded on one local date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpendSummary {
    pub total_cost: f64,
    pub total_duration_ms: u64,
    pub sessions_count: usize,
}
