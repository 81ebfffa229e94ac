//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{BisectError, Result};
use crate::core::paths::is_plain_file_name;

/// Default name of the persisted index inside the working directory.
pub const DEFAULT_INDEX_FILE_NAME: &str = "file-bisect-index.toml";

/// Default prefix for freshly allocated quarantine directories.
pub const DEFAULT_QUARANTINE_PREFIX: &str = "file-bisect-";

/// Full file-bisect configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Name of the index file kept in the working directory.
    pub index_file_name: String,
    /// Prefix used when allocating a quarantine directory under the system temp dir.
    pub quarantine_prefix: String,
    /// Pin the partition shuffle. `None` seeds from the wall clock.
    pub seed: Option<u64>,
    pub journal: JournalConfig,
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Activity journal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
            quarantine_prefix: DEFAULT_QUARANTINE_PREFIX.to_string(),
            seed: None,
            journal: JournalConfig::default(),
            config_file: Self::default_path(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: home_dir()
                .join(".local")
                .join("share")
                .join("file-bisect")
                .join("journal.jsonl"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[FB-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir()
            .join(".config")
            .join("file-bisect")
            .join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| BisectError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(BisectError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FILE_BISECT_INDEX_FILE") {
            self.index_file_name = raw;
        }
        if let Some(raw) = lookup("FILE_BISECT_QUARANTINE_PREFIX") {
            self.quarantine_prefix = raw;
        }
        if let Some(raw) = lookup("FILE_BISECT_SEED") {
            self.seed = Some(parse_env_u64("FILE_BISECT_SEED", &raw)?);
        }
        if let Some(raw) = lookup("FILE_BISECT_JOURNAL_ENABLED") {
            self.journal.enabled = parse_env_bool("FILE_BISECT_JOURNAL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("FILE_BISECT_JOURNAL_PATH") {
            self.journal.path = PathBuf::from(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !is_plain_file_name(&self.index_file_name) {
            return Err(BisectError::InvalidConfig {
                details: format!(
                    "index_file_name must be a plain file name, got {:?}",
                    self.index_file_name
                ),
            });
        }

        if self.quarantine_prefix.is_empty() || !is_plain_file_name(&self.quarantine_prefix) {
            return Err(BisectError::InvalidConfig {
                details: format!(
                    "quarantine_prefix must be non-empty and contain no separators, got {:?}",
                    self.quarantine_prefix
                ),
            });
        }

        if self.journal.enabled && self.journal.path.as_os_str().is_empty() {
            return Err(BisectError::InvalidConfig {
                details: "journal.path must be set when journal.enabled=true".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| BisectError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| BisectError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
