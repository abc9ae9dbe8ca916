mod file_config;

pub use file_config::{FileConfig, PurgeConfig};

use crate::purge::DEFAULT_RETENTION_DAYS;
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PUSH_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_DISPATCH_TIMEOUT_SEC: u64 = 540;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub push_endpoint: Option<String>,
    pub push_timeout_sec: u64,
    pub dispatch_timeout_sec: u64,
    pub retention_days: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Provider batch endpoint. None means pushes are only logged.
    pub push_endpoint: Option<String>,
    pub push_timeout_sec: u64,
    pub dispatch_timeout_sec: u64,

    pub purge: PurgeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeSettings {
    pub enabled: bool,
    pub retention_days: u64,
    pub run_at: NaiveTime,
    pub utc_offset: FixedOffset,
    /// When set, the purge runs at this interval and `run_at` is ignored.
    pub interval: Option<Duration>,
}

impl Default for PurgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: DEFAULT_RETENTION_DAYS,
            run_at: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN),
            utc_offset: Utc.fix(),
            interval: None,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let push_endpoint = file
            .push_endpoint
            .or_else(|| cli.push_endpoint.clone())
            .filter(|url| !url.trim().is_empty());
        if let Some(url) = &push_endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("push_endpoint must be an http(s) URL, got {:?}", url);
            }
        }

        let push_timeout_sec = file.push_timeout_sec.unwrap_or(cli.push_timeout_sec);
        let dispatch_timeout_sec = file
            .dispatch_timeout_sec
            .unwrap_or(cli.dispatch_timeout_sec);
        if dispatch_timeout_sec == 0 {
            bail!("dispatch_timeout_sec must be greater than zero");
        }

        let purge = resolve_purge(cli, file.purge.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            push_endpoint,
            push_timeout_sec,
            dispatch_timeout_sec,
            purge,
        })
    }

    pub fn directory_db_path(&self) -> PathBuf {
        self.db_dir.join("directory.db")
    }

    pub fn records_db_path(&self) -> PathBuf {
        self.db_dir.join("records.db")
    }
}

fn resolve_purge(cli: &CliConfig, file: PurgeConfig) -> Result<PurgeSettings> {
    let defaults = PurgeSettings::default();

    let retention_days = file
        .retention_days
        .or(cli.retention_days)
        .unwrap_or(defaults.retention_days);
    if retention_days == 0 {
        bail!("purge.retention_days must be at least 1");
    }

    let run_at = match file.run_at {
        Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
            .map_err(|_| anyhow!("purge.run_at must be HH:MM, got {:?}", s))?,
        None => defaults.run_at,
    };

    let utc_offset = match file.utc_offset_minutes {
        Some(minutes) => FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| anyhow!("purge.utc_offset_minutes out of range: {}", minutes))?,
        None => defaults.utc_offset,
    };

    let interval = match file.interval_minutes {
        Some(0) => bail!("purge.interval_minutes must be at least 1"),
        Some(minutes) => Some(Duration::from_secs(minutes.saturating_mul(60))),
        None => defaults.interval,
    };

    Ok(PurgeSettings {
        enabled: file.enabled.unwrap_or(defaults.enabled),
        retention_days,
        run_at,
        utc_offset,
        interval,
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
