use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabdeck_core::StrategyKind;
use tabdeck_core::shortcut::Shortcut;

use crate::scheduler::SchedulerTiming;

/// Top-level daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TabdeckConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub shortcut: Shortcut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_wait_ms: default_max_wait_ms(),
            strategy: StrategyKind::default(),
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

impl EngineSettings {
    pub fn timing(&self) -> SchedulerTiming {
        let debounce = Duration::from_millis(self.debounce_ms);
        SchedulerTiming {
            debounce,
            // A cap below the debounce would fire before the burst settles.
            max_wait: Duration::from_millis(self.max_wait_ms).max(debounce),
        }
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    #[serde(default = "default_annotations_path")]
    pub annotations_path: String,
    #[serde(default = "default_true")]
    pub watch: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            annotations_path: default_annotations_path(),
            watch: true,
        }
    }
}

impl SourceSettings {
    pub fn snapshot_file(&self) -> Result<PathBuf> {
        resolve_path(&self.snapshot_path)
    }

    pub fn annotations_file(&self) -> Result<PathBuf> {
        resolve_path(&self.annotations_path)
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_max_wait_ms() -> u64 {
    1000
}

fn default_notice_ttl_ms() -> u64 {
    2000
}

fn default_snapshot_path() -> String {
    "~/.config/tabdeck/snapshot.json".to_string()
}

fn default_annotations_path() -> String {
    "~/.config/tabdeck/annotations.json".to_string()
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home))
}

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("tabdeck"))
}

/// Get the config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("tabdeck.toml"))
}

/// Load config from `path`, or from the default location. A missing file
/// yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<TabdeckConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        return Ok(TabdeckConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config: TabdeckConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(config)
}

fn resolve_path(path: &str) -> Result<PathBuf> {
    if path.starts_with("~/") {
        Ok(PathBuf::from(shellexpand(path, &home_dir()?)))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Simple ~ expansion
fn shellexpand(path: &str, home: &Path) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", home.display(), rest)
    } else {
        path.to_string()
    }
}
