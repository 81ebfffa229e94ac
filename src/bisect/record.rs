//! A single tracked file: classification status, tie-break counter and
//! physical whereabouts.
//!
//! Records are keyed by file name inside an [`Index`](super::index::Index).
//! Only `status`, `status_original`, `bad_count` and `dependencies` are
//! persisted; name and location are re-derived on every load by
//! [`FileRecord::validate`] and [`FileRecord::locate`].

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bisect::relocate::relocate;
use crate::core::errors::{BisectError, Result};
use crate::core::paths::is_plain_file_name;

// ──────────────────── status ────────────────────

/// Classification of a tracked file.
///
/// Persisted as a lowercase string. Values outside the five recognised
/// members survive deserialization as [`FileStatus::Unrecognized`] so that a
/// single corrupt entry is reported by [`FileRecord::validate`] instead of
/// failing the whole index load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    #[default]
    Unknown,
    Good,
    Bad,
    Ignored,
    Errored,
    Unrecognized(String),
}

impl FileStatus {
    /// Canonical persisted spelling.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Ignored => "ignored",
            Self::Errored => "errored",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Parse a persisted status. The empty string means `unknown`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" | "unknown" => Self::Unknown,
            "good" => Self::Good,
            "bad" => Self::Bad,
            "ignored" => Self::Ignored,
            "errored" => Self::Errored,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Statuses allowed to be parked in quarantine between rounds.
    #[must_use]
    pub const fn may_be_quarantined(&self) -> bool {
        matches!(self, Self::Unknown | Self::Bad)
    }
}

impl From<String> for FileStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FileStatus> for String {
    fn from(value: FileStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────── record ────────────────────

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// One tracked file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub status: FileStatus,
    #[serde(
        rename = "status-original",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub status_original: String,
    #[serde(rename = "bad-count", default, skip_serializing_if = "is_zero")]
    pub bad_count: u32,
    /// Reserved; carried through load/save untouched.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(skip)]
    name: String,
    #[serde(skip)]
    current_location: Option<PathBuf>,
    #[serde(skip)]
    in_quarantine: bool,
}

impl FileRecord {
    /// Fresh `unknown` record for a file just discovered in the working directory.
    #[must_use]
    pub fn discovered(name: &str, location: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            current_location: Some(location),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the file sits right now, if it was found.
    #[must_use]
    pub fn current_location(&self) -> Option<&Path> {
        self.current_location.as_deref()
    }

    #[must_use]
    pub const fn in_quarantine(&self) -> bool {
        self.in_quarantine
    }

    /// Bind the record to its index key and check the key and the persisted status.
    ///
    /// Must run once per record per load, before anything else touches it.
    /// A key that is not a plain file name would resolve outside the working
    /// and quarantine directories and is rejected with `InvalidKey`.
    pub fn validate(&mut self, name: &str) -> Result<()> {
        self.name = name.to_string();
        if !is_plain_file_name(name) {
            return Err(BisectError::InvalidKey {
                name: self.name.clone(),
            });
        }
        match &self.status {
            FileStatus::Unrecognized(raw) => Err(BisectError::InvalidStatus {
                name: self.name.clone(),
                value: raw.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Look for the file on disk, preferring the working directory.
    ///
    /// Quarantine is only consulted for `unknown` and `bad` records; every
    /// other status is expected to stay in the working directory. On failure
    /// the location is cleared and the caller must mark the record errored.
    pub fn locate(&mut self, working_dir: &Path, quarantine_dir: &Path) -> bool {
        if !is_plain_file_name(&self.name) {
            self.current_location = None;
            self.in_quarantine = false;
            return false;
        }

        let in_working = working_dir.join(&self.name);
        if in_working.is_file() {
            self.current_location = Some(in_working);
            self.in_quarantine = false;
            return true;
        }

        if !quarantine_dir.as_os_str().is_empty() && self.status.may_be_quarantined() {
            let in_quarantine = quarantine_dir.join(&self.name);
            if in_quarantine.is_file() {
                self.current_location = Some(in_quarantine);
                self.in_quarantine = true;
                return true;
            }
        }

        self.current_location = None;
        self.in_quarantine = false;
        false
    }

    /// Force the record into `errored`, remembering what it was before.
    ///
    /// A record that is already errored keeps its original status.
    pub fn mark_errored(&mut self) {
        if self.status != FileStatus::Errored {
            self.status_original = self.status.as_str().to_string();
            self.status = FileStatus::Errored;
        }
    }

    /// Undo an `errored` transition once the file is back where it belongs.
    ///
    /// Returns the restored status. `status_original` is kept for diagnosis.
    pub fn restore_from_errored(&mut self) -> Option<FileStatus> {
        if self.status != FileStatus::Errored {
            return None;
        }
        match FileStatus::parse(&self.status_original) {
            FileStatus::Errored | FileStatus::Unrecognized(_) => None,
            restored => {
                self.status = restored.clone();
                Some(restored)
            }
        }
    }

    /// Move the file into `quarantine_dir`. No-op if already there.
    pub fn move_to_quarantine(&mut self, quarantine_dir: &Path) -> Result<()> {
        if self.in_quarantine {
            return Ok(());
        }
        let destination = quarantine_dir.join(&self.name);
        self.relocate_to(destination, true)
    }

    /// Move the file back into `working_dir`. No-op if already there.
    pub fn move_to_working(&mut self, working_dir: &Path) -> Result<()> {
        if !self.in_quarantine {
            return Ok(());
        }
        let destination = working_dir.join(&self.name);
        self.relocate_to(destination, false)
    }

    fn relocate_to(&mut self, destination: PathBuf, into_quarantine: bool) -> Result<()> {
        let Some(source) = self.current_location.clone() else {
            return Err(BisectError::FileUnreachable {
                name: self.name.clone(),
            });
        };

        relocate(&source, &destination).map_err(|details| BisectError::MoveFailed {
            name: self.name.clone(),
            from: source.clone(),
            to: destination.clone(),
            details,
        })?;

        self.current_location = Some(destination);
        self.in_quarantine = into_quarantine;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Dirs {
        _root: tempfile::TempDir,
        working: PathBuf,
        quarantine: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = tempfile::tempdir().unwrap();
        let working = root.path().join("work");
        let quarantine = root.path().join("quarantine");
        fs::create_dir_all(&working).unwrap();
        fs::create_dir_all(&quarantine).unwrap();
        Dirs {
            _root: root,
            working,
            quarantine,
        }
    }

    fn record(status: FileStatus) -> FileRecord {
        FileRecord {
            status,
            ..FileRecord::default()
        }
    }

    #[test]
    fn status_parse_covers_members_and_empty() {
        assert_eq!(FileStatus::parse(""), FileStatus::Unknown);
        assert_eq!(FileStatus::parse("unknown"), FileStatus::Unknown);
        assert_eq!(FileStatus::parse("good"), FileStatus::Good);
        assert_eq!(FileStatus::parse("bad"), FileStatus::Bad);
        assert_eq!(FileStatus::parse("ignored"), FileStatus::Ignored);
        assert_eq!(FileStatus::parse("errored"), FileStatus::Errored);
        assert_eq!(
            FileStatus::parse("Good"),
            FileStatus::Unrecognized("Good".to_string())
        );
    }

    #[test]
    fn validate_binds_name_and_rejects_unrecognized() {
        let mut ok = record(FileStatus::Good);
        ok.validate("a.jar").unwrap();
        assert_eq!(ok.name(), "a.jar");

        let mut broken = record(FileStatus::Unrecognized("suspicious".to_string()));
        let err = broken.validate("b.jar").unwrap_err();
        assert!(matches!(
            err,
            BisectError::InvalidStatus { ref name, ref value }
                if name == "b.jar" && value == "suspicious"
        ));
        assert_eq!(broken.name(), "b.jar");
    }

    #[test]
    fn validate_rejects_keys_that_leave_the_directory() {
        let d = dirs();
        let outside = d.working.parent().unwrap().join("outside.txt");
        fs::write(&outside, b"x").unwrap();

        for key in [outside.to_str().unwrap(), "../outside.txt", "sub/a.jar", ".."] {
            let mut rec = record(FileStatus::Unknown);
            let err = rec.validate(key).unwrap_err();
            assert!(matches!(err, BisectError::InvalidKey { .. }), "{key}");
            assert!(!rec.locate(&d.working, &d.quarantine), "{key}");
            assert!(rec.current_location().is_none());
        }
    }

    #[test]
    fn locate_prefers_working_directory() {
        let d = dirs();
        fs::write(d.working.join("a.jar"), b"w").unwrap();
        fs::write(d.quarantine.join("a.jar"), b"q").unwrap();

        let mut rec = record(FileStatus::Unknown);
        rec.validate("a.jar").unwrap();
        assert!(rec.locate(&d.working, &d.quarantine));
        assert!(!rec.in_quarantine());
        assert_eq!(rec.current_location(), Some(d.working.join("a.jar").as_path()));
    }

    #[test]
    fn bad_record_found_in_quarantine() {
        let d = dirs();
        fs::write(d.quarantine.join("a.jar"), b"q").unwrap();

        let mut rec = record(FileStatus::Bad);
        rec.validate("a.jar").unwrap();
        assert!(rec.locate(&d.working, &d.quarantine));
        assert!(rec.in_quarantine());
    }

    #[test]
    fn good_record_in_quarantine_is_not_located() {
        let d = dirs();
        fs::write(d.quarantine.join("a.jar"), b"q").unwrap();

        let mut rec = record(FileStatus::Good);
        rec.validate("a.jar").unwrap();
        assert!(!rec.locate(&d.working, &d.quarantine));
        assert!(rec.current_location().is_none());

        rec.mark_errored();
        assert_eq!(rec.status, FileStatus::Errored);
        assert_eq!(rec.status_original, "good");
    }

    #[test]
    fn empty_quarantine_dir_is_never_checked() {
        let d = dirs();
        let mut rec = record(FileStatus::Unknown);
        rec.validate("a.jar").unwrap();
        assert!(!rec.locate(&d.working, Path::new("")));
    }

    #[test]
    fn directory_is_not_a_file() {
        let d = dirs();
        fs::create_dir(d.working.join("a.jar")).unwrap();
        let mut rec = record(FileStatus::Unknown);
        rec.validate("a.jar").unwrap();
        assert!(!rec.locate(&d.working, &d.quarantine));
    }

    #[test]
    fn mark_errored_twice_keeps_first_original() {
        let mut rec = record(FileStatus::Bad);
        rec.mark_errored();
        rec.mark_errored();
        assert_eq!(rec.status_original, "bad");
    }

    #[test]
    fn restore_from_errored_uses_original() {
        let mut rec = record(FileStatus::Good);
        rec.mark_errored();
        assert_eq!(rec.restore_from_errored(), Some(FileStatus::Good));
        assert_eq!(rec.status, FileStatus::Good);
        assert_eq!(rec.status_original, "good");

        let mut junk = FileRecord {
            status: FileStatus::Errored,
            status_original: "weird".to_string(),
            ..FileRecord::default()
        };
        assert_eq!(junk.restore_from_errored(), None);
        assert_eq!(junk.status, FileStatus::Errored);
    }

    #[test]
    fn moves_round_trip() {
        let d = dirs();
        fs::write(d.working.join("a.jar"), b"payload").unwrap();

        let mut rec = record(FileStatus::Unknown);
        rec.validate("a.jar").unwrap();
        assert!(rec.locate(&d.working, &d.quarantine));

        rec.move_to_quarantine(&d.quarantine).unwrap();
        assert!(rec.in_quarantine());
        assert!(!d.working.join("a.jar").exists());
        assert_eq!(fs::read(d.quarantine.join("a.jar")).unwrap(), b"payload");

        // Already there.
        rec.move_to_quarantine(&d.quarantine).unwrap();

        rec.move_to_working(&d.working).unwrap();
        assert!(!rec.in_quarantine());
        assert!(!d.quarantine.join("a.jar").exists());
        assert_eq!(fs::read(d.working.join("a.jar")).unwrap(), b"payload");
    }

    #[test]
    fn failed_move_keeps_location() {
        let d = dirs();
        fs::write(d.working.join("a.jar"), b"payload").unwrap();

        let mut rec = record(FileStatus::Unknown);
        rec.validate("a.jar").unwrap();
        assert!(rec.locate(&d.working, &d.quarantine));

        let missing = d.quarantine.join("does").join("not").join("exist");
        let err = rec.move_to_quarantine(&missing).unwrap_err();
        assert_eq!(err.code(), "FB-2003");
        assert!(!rec.in_quarantine());
        assert_eq!(rec.current_location(), Some(d.working.join("a.jar").as_path()));
        assert!(d.working.join("a.jar").exists());
    }

    #[test]
    fn unlocated_record_cannot_move() {
        let d = dirs();
        let mut rec = record(FileStatus::Unknown);
        rec.validate("ghost.jar").unwrap();
        let err = rec.move_to_quarantine(&d.quarantine).unwrap_err();
        assert!(matches!(err, BisectError::FileUnreachable { .. }));
    }

    #[test]
    fn persisted_shape_omits_defaults() {
        let rec = record(FileStatus::Unknown);
        let raw = toml::to_string(&rec).unwrap();
        assert!(raw.contains("status = \"unknown\""), "{raw}");
        assert!(raw.contains("dependencies = []"), "{raw}");
        assert!(!raw.contains("bad-count"), "{raw}");
        assert!(!raw.contains("status-original"), "{raw}");

        let counted = FileRecord {
            status: FileStatus::Errored,
            status_original: "bad".to_string(),
            bad_count: 3,
            ..FileRecord::default()
        };
        let raw = toml::to_string(&counted).unwrap();
        assert!(raw.contains("bad-count = 3"), "{raw}");
        assert!(raw.contains("status-original = \"bad\""), "{raw}");
    }

    #[test]
    fn missing_status_loads_as_unknown() {
        let rec: FileRecord = toml::from_str("dependencies = []").unwrap();
        assert_eq!(rec.status, FileStatus::Unknown);
    }
}
