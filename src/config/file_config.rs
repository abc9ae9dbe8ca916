use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub push_endpoint: Option<String>,
    pub push_timeout_sec: Option<u64>,
    pub dispatch_timeout_sec: Option<u64>,

    pub purge: Option<PurgeConfig>,
}

/// `[purge]` section.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PurgeConfig {
    pub enabled: Option<bool>,
    pub retention_days: Option<u64>,
    /// Wall-clock time of the daily run, "HH:MM".
    pub run_at: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    /// Run every N minutes instead of daily. Drains a large backlog faster.
    pub interval_minutes: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
