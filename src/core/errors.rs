//! FB-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, BisectError>;

/// Top-level error type for file-bisect.
#[derive(Debug, Error)]
pub enum BisectError {
    #[error("[FB-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FB-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FB-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FB-2001] invalid file status for {name}: {value:?}")]
    InvalidStatus { name: String, value: String },

    #[error("[FB-2002] file {name} is in neither the working directory nor quarantine")]
    FileUnreachable { name: String },

    #[error("[FB-2003] failed to move {name} from {from} to {to}: {details}")]
    MoveFailed {
        name: String,
        from: PathBuf,
        to: PathBuf,
        details: String,
    },

    #[error("[FB-2004] {name} is not in the index")]
    NotFound { name: String },

    #[error("[FB-2005] no quarantine directory recorded; run `index` first")]
    NotIndexed,

    #[error("[FB-2006] index key {name:?} is not a plain file name")]
    InvalidKey { name: String },

    #[error("[FB-3001] index persistence failure at {path}: {details}")]
    Persistence { path: PathBuf, details: String },

    #[error("[FB-3002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FB-3101] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BisectError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FB-1001",
            Self::MissingConfig { .. } => "FB-1002",
            Self::ConfigParse { .. } => "FB-1003",
            Self::InvalidStatus { .. } => "FB-2001",
            Self::FileUnreachable { .. } => "FB-2002",
            Self::MoveFailed { .. } => "FB-2003",
            Self::NotFound { .. } => "FB-2004",
            Self::NotIndexed => "FB-2005",
            Self::InvalidKey { .. } => "FB-2006",
            Self::Persistence { .. } => "FB-3001",
            Self::Serialization { .. } => "FB-3002",
            Self::Io { .. } => "FB-3101",
        }
    }

    /// Whether the failure concerns a single file record rather than the
    /// whole invocation. Record-level errors are reported and the batch
    /// continues; everything else aborts the command.
    #[must_use]
    pub const fn is_record_level(&self) -> bool {
        matches!(
            self,
            Self::InvalidStatus { .. }
                | Self::InvalidKey { .. }
                | Self::FileUnreachable { .. }
                | Self::MoveFailed { .. }
                | Self::NotFound { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for BisectError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for BisectError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for BisectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
