use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub policies: PoliciesConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str::<CoreConfig>(text)?)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.storage.db_path = absolutize(root, &self.storage.db_path);
        self.logbook.path = absolutize(root, &self.logbook.path);
        self.logbook.actions = absolutize(root, &self.logbook.actions);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_db_path")]
    pub db_path: PathBuf,
}

impl StorageConfig {
    fn default_db_path() -> PathBuf {
        PathBuf::from("cache/wordbank.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: Self::default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// Trailing window for the recent-activity report.
    #[serde(default = "ActivityConfig::default_window_minutes")]
    pub window_minutes: i64,
}

impl ActivityConfig {
    fn default_window_minutes() -> i64 {
        10
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window_minutes: Self::default_window_minutes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
    #[serde(default = "LogbookConfig::default_actions")]
    pub actions: PathBuf,
}

impl LogbookConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("logbook")
    }

    fn default_actions() -> PathBuf {
        PathBuf::from("logbook/actions.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            actions: Self::default_actions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "ServicesConfig::default_true")]
    pub audit_enabled: bool,
}

impl ServicesConfig {
    fn default_true() -> bool {
        true
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default = "PoliciesConfig::default_log_preview_len")]
    pub log_preview_len: usize,
}

impl PoliciesConfig {
    fn default_log_preview_len() -> usize {
        160
    }
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            log_preview_len: Self::default_log_preview_len(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
