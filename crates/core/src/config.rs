use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AlarmError;
use crate::time::Zone;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Default data directory: `<platform data dir>/alarmd`, or `./data`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("alarmd"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Directory holding alarms, snoozes, and published next-alarm state.
    pub data_dir: PathBuf,
    /// Zone alarm wall-clock times are interpreted in, as written (`local`,
    /// `utc`, `+02:00`).
    pub zone: String,
    /// Render times as `19:05` rather than `7:05 PM`.
    pub use_24_hour: bool,
    /// Default snooze length in minutes.
    pub snooze_minutes: u32,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ALARMD_PROFILE`. When set (e.g. `TEST`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ALARMD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            data_dir: profiled_env_opt(p, "ALARMD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            zone: profiled_env_opt(p, "ALARMD_ZONE").unwrap_or_else(|| "local".to_string()),
            use_24_hour: profiled_env_bool(p, "ALARMD_24H", true),
            snooze_minutes: profiled_env_u32(p, "ALARMD_SNOOZE_MINUTES", 10),
        }
    }

    /// Parse the configured zone.
    pub fn zone(&self) -> Result<Zone, AlarmError> {
        self.zone.parse()
    }

    pub fn alarms_path(&self) -> PathBuf {
        self.data_dir.join("alarms.json")
    }

    pub fn snoozes_path(&self) -> PathBuf {
        self.data_dir.join("snoozes.json")
    }

    pub fn wake_path(&self) -> PathBuf {
        self.data_dir.join("wake.json")
    }

    pub fn next_alarm_path(&self) -> PathBuf {
        self.data_dir.join("next_alarm")
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  data_dir:       {}", self.data_dir.display());
        tracing::info!("  zone:           {}", self.zone);
        tracing::info!("  24h:            {}", self.use_24_hour);
        tracing::info!("  snooze_minutes: {}", self.snooze_minutes);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            data_dir: default_data_dir(),
            zone: "local".to_string(),
            use_24_hour: true,
            snooze_minutes: 10,
        }
    }
}
