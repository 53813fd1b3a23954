//! Workspace configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lexis_core::scheduler::{Scheduler, SchedulerConfig};

/// Name of the config file looked up in the current directory.
pub const CONFIG_FILE: &str = "lexis.toml";

/// Top-level lexis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexisConfig {
    /// Directory holding one progress document per learner.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding the topic JSON files.
    #[serde(default = "default_topics_dir")]
    pub topics_dir: PathBuf,
    /// Learner used when a command is given no `--learner`.
    #[serde(default)]
    pub default_learner: Option<String>,
    /// Scheduling constants.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./users")
}
fn default_topics_dir() -> PathBuf {
    PathBuf::from("./topics")
}

impl Default for LexisConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            topics_dir: default_topics_dir(),
            default_learner: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl LexisConfig {
    /// Build a scheduler from the `[scheduler]` table, rejecting bad constants.
    pub fn scheduler(&self) -> Result<Scheduler> {
        Scheduler::new(self.scheduler.clone()).context("invalid [scheduler] configuration")
    }

    /// Resolve the learner to act for: an explicit name wins over the default.
    pub fn learner(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.default_learner.clone())
            .context("no learner given: pass --learner or set default_learner in lexis.toml")
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let value = lookup(&result[start + 2..start + len]).unwrap_or_default();
        result.replace_range(start..start + len + 1, &value);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path, lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy(), lookup))
}

/// Apply `LEXIS_DATA_DIR` / `LEXIS_TOPICS_DIR` overrides and `${VAR}` expansion.
fn apply_environment(mut config: LexisConfig, lookup: &dyn Fn(&str) -> Option<String>) -> LexisConfig {
    if let Some(dir) = lookup("LEXIS_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = lookup("LEXIS_TOPICS_DIR") {
        config.topics_dir = PathBuf::from(dir);
    }
    config.data_dir = resolve_path(&config.data_dir, lookup);
    config.topics_dir = resolve_path(&config.topics_dir, lookup);
    config
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without an explicit path:
/// 1. `lexis.toml` in the current directory
/// 2. `~/.config/lexis/config.toml`
///
/// Environment variable overrides: `LEXIS_DATA_DIR`, `LEXIS_TOPICS_DIR`.
pub fn load_config_from(path: Option<&Path>) -> Result<LexisConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => LexisConfig::default(),
    };

    let config = apply_environment(config, &env_lookup);
    config
        .scheduler
        .validate()
        .context("invalid [scheduler] configuration")?;
    Ok(config)
}

/// Parse config TOML (useful for testing).
pub fn parse_config(content: &str) -> Result<LexisConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lexis"))
}
