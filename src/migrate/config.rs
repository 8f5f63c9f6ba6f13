use crate::error::MigrateError;
use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_BRIDGE_TIMEOUT_SECS: u64 = 86_400;

/// What an import run does after an unexpected collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Prompt,
    Continue,
    Stop,
}

impl OnError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Continue => "continue",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnError {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(Self::Prompt),
            "continue" => Ok(Self::Continue),
            "stop" => Ok(Self::Stop),
            other => Err(anyhow!(
                "invalid on_error mode `{other}`: use `prompt`, `continue` or `stop`"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default = "default_embed_metadata")]
    pub embed_metadata: bool,
    #[serde(default)]
    pub albums_as_keywords: bool,
    #[serde(default)]
    pub dedupe_keywords: bool,
}

fn default_embed_metadata() -> bool {
    true
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            embed_metadata: true,
            albums_as_keywords: false,
            dedupe_keywords: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub on_error: OnError,
    /// Seconds before a bridge call is abandoned; 0 waits forever.
    #[serde(default)]
    pub bridge_timeout_secs: u64,
}

impl ExecutionConfig {
    pub fn bridge_timeout(&self) -> Option<u64> {
        (self.bridge_timeout_secs > 0).then_some(self.bridge_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrateConfig {
    pub planning: PlanningConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMigrateConfig {
    planning: Option<PlanningConfig>,
    execution: Option<ExecutionConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn validate(cfg: &MigrateConfig) -> Result<()> {
    if cfg.execution.bridge_timeout_secs > MAX_BRIDGE_TIMEOUT_SECS {
        return Err(MigrateError::InvalidConfig(format!(
            "bridge_timeout_secs must be <= {MAX_BRIDGE_TIMEOUT_SECS}"
        ))
        .into());
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("PHOTO_MIGRATE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".config").join("photo-migrate").join("config.toml"))
}

fn merge_file_config(base: &mut MigrateConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .map_err(|err| MigrateError::InvalidConfig(format!("{}: {err}", path.display())))?;
    let parsed: PartialMigrateConfig = toml::from_str(&raw)
        .map_err(|err| MigrateError::InvalidConfig(format!("{}: {err}", path.display())))?;
    if let Some(planning) = parsed.planning {
        base.planning = planning;
    }
    if let Some(execution) = parsed.execution {
        base.execution = execution;
    }
    Ok(())
}

pub fn load_config() -> Result<MigrateConfig> {
    let mut cfg = MigrateConfig::default();
    if let Some(path) = resolve_config_path() {
        merge_file_config(&mut cfg, &path)?;
    }

    cfg.planning.embed_metadata =
        env_or_bool("PHOTO_MIGRATE_EMBED_METADATA", cfg.planning.embed_metadata);
    cfg.planning.albums_as_keywords = env_or_bool(
        "PHOTO_MIGRATE_ALBUMS_AS_KEYWORDS",
        cfg.planning.albums_as_keywords,
    );
    cfg.planning.dedupe_keywords =
        env_or_bool("PHOTO_MIGRATE_DEDUPE_KEYWORDS", cfg.planning.dedupe_keywords);
    if let Ok(mode) = env::var("PHOTO_MIGRATE_ON_ERROR") {
        if !mode.trim().is_empty() {
            cfg.execution.on_error = mode
                .parse()
                .map_err(|err: anyhow::Error| MigrateError::InvalidConfig(err.to_string()))?;
        }
    }
    cfg.execution.bridge_timeout_secs = env_or_u64(
        "PHOTO_MIGRATE_BRIDGE_TIMEOUT_SECS",
        cfg.execution.bridge_timeout_secs,
    );

    validate(&cfg)?;
    Ok(cfg)
}
