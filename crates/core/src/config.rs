use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

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

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref() {
        Some("true") | Some("1") | Some("yes") => true,
        Some("false") | Some("0") | Some("no") => false,
        _ => default,
    }
}

/// Parse a comma-separated list of hour offsets into an ascending,
/// de-duplicated sequence.
fn parse_hours_list(raw: &str) -> Vec<u32> {
    let mut hours: Vec<u32> = raw
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env(),
            policy: PolicyConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  storage: data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  policy:  thresholds={:?}h, grace={}h, booster_bonus={}h",
            self.policy.reminder_thresholds,
            self.policy.grace_period_hours,
            self.policy.booster_bonus_hours,
        );
        tracing::info!(
            "  safety:  removal_enabled={}, dry_run={}",
            self.policy.removal_enabled,
            self.policy.dry_run,
        );
        tracing::info!(
            "  sweep:   interval={}min",
            self.policy.sweep_interval_minutes,
        );
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
        }
    }
}

// ── Enforcement policy (global; per-tenant wiring lives in the store) ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Ascending hour offsets at which reminders fire.
    pub reminder_thresholds: Vec<u32>,
    /// Base hours a subject has to introduce themselves before removal.
    pub grace_period_hours: u32,
    /// Extra grace hours granted to boosting subjects (0 = no bonus).
    pub booster_bonus_hours: u32,
    /// How often the sweep loop runs.
    pub sweep_interval_minutes: u64,
    /// Master switch: when false, removals degrade to log-only.
    pub removal_enabled: bool,
    /// When true, removals degrade to log-only regardless of the master switch.
    pub dry_run: bool,
    /// Minimum introduction length in characters (None = not validated).
    pub min_intro_length: Option<u32>,
    /// Keywords an introduction must contain, any-case (empty = not validated).
    pub required_keywords: Vec<String>,
}

impl PolicyConfig {
    fn from_env() -> Self {
        Self {
            reminder_thresholds: parse_hours_list(&env_or("REMINDER_THRESHOLD_HOURS", "24,48")),
            grace_period_hours: env_u32("GRACE_PERIOD_HOURS", 72),
            booster_bonus_hours: env_u32("BOOSTER_BONUS_HOURS", 0),
            sweep_interval_minutes: env_u64("SWEEP_INTERVAL_MINUTES", 60),
            removal_enabled: env_bool("REMOVAL_ENABLED", true),
            dry_run: env_bool("DRY_RUN", false),
            min_intro_length: env_opt("MIN_INTRO_LENGTH").and_then(|v| v.parse().ok()),
            required_keywords: env_opt("REQUIRED_KEYWORDS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reminder_thresholds: vec![24, 48],
            grace_period_hours: 72,
            booster_bonus_hours: 0,
            sweep_interval_minutes: 60,
            removal_enabled: true,
            dry_run: false,
            min_intro_length: None,
            required_keywords: Vec::new(),
        }
    }
}
