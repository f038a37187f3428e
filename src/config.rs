use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ActorId;
use crate::error::{Result, TsmError};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub actor: ActorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit file (argument or `TSM_CONFIG`) replaces the layered
    /// lookup; otherwise the global file is applied, then `<root>/config.toml`.
    /// `TSM_*` environment overrides always apply last.
    pub fn load(explicit_path: Option<&Path>, tsm_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("TSM_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                TsmError::Config(format!("config file {} does not exist", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(tsm_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Absolute database path; relative paths are taken from `tsm_root`.
    #[must_use]
    pub fn database_path(&self, tsm_root: &Path) -> PathBuf {
        let path = expand_path(&self.database.path);
        if path.is_absolute() {
            path
        } else {
            tsm_root.join(path)
        }
    }

    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    #[must_use]
    pub const fn system_actor(&self) -> ActorId {
        ActorId(self.actor.system_actor_id)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| TsmError::Config(format!("serialize config: {err}")))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("tsm").join(CONFIG_FILE))
    }

    fn load_project(tsm_root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&tsm_root.join(CONFIG_FILE))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| TsmError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| TsmError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.actor {
            self.actor.merge(patch);
        }
        if let Some(patch) = patch.logging {
            self.logging.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(&|key: &str| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("TSM_DB_PATH") {
            self.database.path = value;
        }
        if let Some(value) = env_u64(lookup, "TSM_DB_BUSY_TIMEOUT_MS")? {
            self.database.busy_timeout_ms = value;
        }
        if let Some(value) = env_u32(lookup, "TSM_SYSTEM_ACTOR_ID")? {
            self.actor.system_actor_id = value;
        }
        if let Some(value) = env_bool(lookup, "TSM_LOG_JSON") {
            self.logging.json = value;
        }
        if let Some(value) = lookup("TSM_LOG_FILTER") {
            self.logging.filter = Some(value);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tsm.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
        if let Some(value) = patch.busy_timeout_ms {
            self.busy_timeout_ms = value;
        }
    }
}

/// Attribution for automated transitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorConfig {
    #[serde(default)]
    pub system_actor_id: u32,
}

impl ActorConfig {
    fn merge(&mut self, patch: ActorPatch) {
        if let Some(value) = patch.system_actor_id {
            self.system_actor_id = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingConfig {
    fn merge(&mut self, patch: LoggingPatch) {
        if let Some(value) = patch.json {
            self.json = value;
        }
        if let Some(value) = patch.filter {
            self.filter = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub actor: Option<ActorPatch>,
    pub logging: Option<LoggingPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabasePatch {
    pub path: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ActorPatch {
    pub system_actor_id: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingPatch {
    pub json: Option<bool>,
    pub filter: Option<String>,
}

pub fn expand_path(input: &str) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(input)
}

fn env_bool(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    lookup(key).map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<u32>> {
    match lookup(key) {
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|err| TsmError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

fn env_u64(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match lookup(key) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| TsmError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
