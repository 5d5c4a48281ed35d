use serde::{Deserialize, Deserializer};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HookModel {
    pub display_name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HookWorkspace {
    pub current_dir: String,
}

/// Cost summary provided by Claude Code's statusLine input
#[derive(Deserialize, Debug, Clone, Default)]
pub struct HookCost {
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default, deserialize_with = "millis_from_number")]
    pub total_duration_ms: u64,
}

/// Accept any JSON number (or null) for a millisecond count
fn millis_from_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if value.is_finite() && value > 0.0 {
        Ok(value.round() as u64)
    } else {
        Ok(0)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HookJson {
    pub session_id: Option<String>,
    pub transcript_path: String,
    pub model: HookModel,
    pub workspace: HookWorkspace,
    /// Claude Code version, used for the usage API user agent
    pub version: Option<String>,
    #[serde(default)]
    pub cost: HookCost,
}

impl HookJson {
    /// Identity used for the persisted session record.
    pub fn session_key(&self) -> &str {
        match self.session_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => &self.transcript_path,
        }
    }
}
