//! Load and save of the persisted index (`file-bisect-index.toml`).
//!
//! Saves go through a temporary sibling and an atomic rename, so a failed
//! save never leaves a truncated index behind.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::bisect::index::Index;
use crate::core::errors::{BisectError, Result};
use crate::core::paths::resolve_absolute_path;

/// Name of the temporary file a save writes before renaming it into place.
#[must_use]
pub fn save_temp_name(index_file_name: &str) -> String {
    Path::new(index_file_name)
        .with_extension("tmp")
        .to_string_lossy()
        .into_owned()
}

/// File-backed storage for one working directory's index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    working_dir: PathBuf,
    path: PathBuf,
}

impl IndexStore {
    /// Bind to `working_dir`, which must be an existing directory.
    pub fn open(working_dir: &Path, index_file_name: &str) -> Result<Self> {
        let working_dir = resolve_absolute_path(working_dir);
        if !working_dir.is_dir() {
            return Err(BisectError::io(
                &working_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        let path = working_dir.join(index_file_name);
        Ok(Self { working_dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the persisted index, or start an empty one if none exists yet.
    pub fn load_or_create(&self) -> Result<Index> {
        if self.exists() {
            self.load()
        } else {
            Ok(Index::new(self.working_dir.clone()))
        }
    }

    pub fn load(&self) -> Result<Index> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.persistence(&e))?;
        let mut index: Index = toml::from_str(&raw).map_err(|e| self.persistence(&e))?;
        index.attach(self.working_dir.clone());
        Ok(index)
    }

    /// Persist `index` using atomic rename for crash safety.
    pub fn save(&self, index: &Index) -> Result<()> {
        let data = toml::to_string(index).map_err(|e| self.persistence(&e))?;
        let tmp_path = self.path.with_extension("tmp");

        if let Err(err) = fs::write(&tmp_path, data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.persistence(&err));
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.persistence(&err));
        }
        Ok(())
    }

    fn persistence(&self, err: &dyn std::fmt::Display) -> BisectError {
        BisectError::Persistence {
            path: self.path.clone(),
            details: err.to_string(),
        }
    }
}
