//! The bisection index: every tracked file plus the quarantine directory,
//! and the verbs that drive one round of bisection.
//!
//! Each process invocation loads the index, calls [`Index::init`], runs a
//! single verb and persists the result. Nothing survives in memory between
//! invocations; the user re-runs their own check in between.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bisect::partition::{Candidate, plan_split};
use crate::bisect::record::{FileRecord, FileStatus};
use crate::bisect::store::save_temp_name;
use crate::core::config::{Config, DEFAULT_INDEX_FILE_NAME, DEFAULT_QUARANTINE_PREFIX};
use crate::core::errors::{BisectError, Result};

// ──────────────────── reports ────────────────────

/// Result of [`Index::init`].
#[derive(Debug, Default)]
pub struct InitReport {
    pub checked: usize,
    /// `InvalidStatus` and `FileUnreachable` findings. Each affected record is now errored.
    pub problems: Vec<BisectError>,
    /// Errored records whose file turned up again, with the status they got back.
    pub restored: Vec<(String, FileStatus)>,
}

/// Result of [`Index::refresh`].
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Set when a new quarantine directory had to be allocated.
    pub quarantine_created: Option<PathBuf>,
    pub added: Vec<String>,
    /// Entries that could not be tracked (non UTF-8 names).
    pub skipped: Vec<String>,
}

/// The user's judgement of the last check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Bad,
}

/// Result of a [`Index::good`] or [`Index::bad`] round.
#[derive(Debug)]
pub struct RoundReport {
    pub verdict: Verdict,
    /// Unknown files that were in the working directory when the verdict was given.
    pub tested: Vec<String>,
    /// Set when a bad verdict left exactly one suspect.
    pub offender: Option<String>,
    pub kept: Vec<String>,
    pub quarantined: Vec<String>,
    pub move_failures: Vec<BisectError>,
    /// No unknown files remain.
    pub done: bool,
}

impl RoundReport {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            tested: Vec::new(),
            offender: None,
            kept: Vec::new(),
            quarantined: Vec::new(),
            move_failures: Vec::new(),
            done: false,
        }
    }
}

/// Result of [`Index::reset`].
#[derive(Debug, Default)]
pub struct ResetReport {
    pub reset: Vec<String>,
    /// Files brought back from quarantine.
    pub returned: Vec<String>,
    pub move_failures: Vec<BisectError>,
}

/// Per-status counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unknown: usize,
    pub good: usize,
    pub bad: usize,
    pub ignored: usize,
    pub errored: usize,
    pub quarantined: usize,
}

/// Which directory entries `refresh` must never track, and how to name a
/// new quarantine directory.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub index_file_name: String,
    pub quarantine_prefix: String,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
            quarantine_prefix: DEFAULT_QUARANTINE_PREFIX.to_string(),
        }
    }
}

impl From<&Config> for RefreshOptions {
    fn from(config: &Config) -> Self {
        Self {
            index_file_name: config.index_file_name.clone(),
            quarantine_prefix: config.quarantine_prefix.clone(),
        }
    }
}

impl RefreshOptions {
    fn is_own_file(&self, name: &str) -> bool {
        name == self.index_file_name || name == save_temp_name(&self.index_file_name)
    }
}

// ──────────────────── index ────────────────────

/// All tracked files of one working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "temp-directory", default)]
    quarantine_dir: PathBuf,
    #[serde(default)]
    files: BTreeMap<String, FileRecord>,

    #[serde(skip)]
    working_dir: PathBuf,
}

impl Index {
    /// Empty index for `working_dir`, as used when nothing was persisted yet.
    #[must_use]
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Self::default()
        }
    }

    pub(crate) fn attach(&mut self, working_dir: PathBuf) {
        self.working_dir = working_dir;
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Recorded quarantine directory; empty until the first `refresh`.
    #[must_use]
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.files.get(name)
    }

    /// Records in name order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.files.iter().map(|(name, rec)| (name.as_str(), rec))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Validate every record and re-derive where its file is.
    ///
    /// Never fails: a record with a bad key, a bad status or a missing file is forced to
    /// `errored` and the finding is reported, and the rest of the set is
    /// still processed. An errored record whose file is back in the working
    /// directory gets its pre-error status back.
    pub fn init(&mut self) -> InitReport {
        let mut report = InitReport::default();
        let working_dir = &self.working_dir;
        let quarantine_dir = &self.quarantine_dir;

        for (name, rec) in &mut self.files {
            report.checked += 1;

            if let Err(err) = rec.validate(name) {
                let bad_key = matches!(err, BisectError::InvalidKey { .. });
                report.problems.push(err);
                rec.mark_errored();
                // A key that escapes the directory is never looked up on disk.
                if bad_key {
                    continue;
                }
            }

            if rec.locate(working_dir, quarantine_dir) {
                if let Some(restored) = rec.restore_from_errored() {
                    report.restored.push((name.clone(), restored));
                }
            } else {
                rec.mark_errored();
                report
                    .problems
                    .push(BisectError::FileUnreachable { name: name.clone() });
            }
        }

        report
    }

    /// Track every flat file of the working directory that is not tracked yet.
    ///
    /// Allocates a quarantine directory when none is recorded or the recorded
    /// one is gone. Only ever adds records.
    pub fn refresh(&mut self, options: &RefreshOptions) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();

        if self.quarantine_dir.as_os_str().is_empty() || !self.quarantine_dir.is_dir() {
            let dir = tempfile::Builder::new()
                .prefix(&options.quarantine_prefix)
                .tempdir()
                .map_err(|e| BisectError::io(std::env::temp_dir(), e))?;
            self.quarantine_dir = dir.keep();
            report.quarantine_created = Some(self.quarantine_dir.clone());
        }

        let entries =
            fs::read_dir(&self.working_dir).map_err(|e| BisectError::io(&self.working_dir, e))?;

        let tracked: HashSet<PathBuf> = self
            .files
            .values()
            .filter_map(|rec| rec.current_location().map(Path::to_path_buf))
            .collect();

        let mut discovered = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BisectError::io(&self.working_dir, e))?;
            let path = entry.path();
            // Directories break every assumption of the move logic.
            if path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                report
                    .skipped
                    .push(entry.file_name().to_string_lossy().into_owned());
                continue;
            };
            if options.is_own_file(&name)
                || tracked.contains(&path)
                || self.files.contains_key(&name)
            {
                continue;
            }
            discovered.push((name, path));
        }

        discovered.sort();
        for (name, path) in discovered {
            self.files
                .insert(name.clone(), FileRecord::discovered(&name, path));
            report.added.push(name);
        }

        Ok(report)
    }

    /// The check passed: every unknown file in the working directory is innocent.
    pub fn good<R>(&mut self, rng: &mut R) -> Result<RoundReport>
    where
        R: Rng + ?Sized,
    {
        self.require_indexed()?;
        let mut report = RoundReport::new(Verdict::Good);

        for (name, rec) in &mut self.files {
            if rec.status == FileStatus::Unknown && !rec.in_quarantine() {
                rec.status = FileStatus::Good;
                rec.bad_count = 0;
                report.tested.push(name.clone());
            }
        }

        self.partition(rng, &mut report);
        Ok(report)
    }

    /// The check failed: something in the working directory is responsible.
    ///
    /// Every unknown file present gets its bad-count bumped; if it was the
    /// only one, it is the offender.
    pub fn bad<R>(&mut self, rng: &mut R) -> Result<RoundReport>
    where
        R: Rng + ?Sized,
    {
        self.require_indexed()?;
        let mut report = RoundReport::new(Verdict::Bad);

        for (name, rec) in &mut self.files {
            if rec.status == FileStatus::Unknown && !rec.in_quarantine() {
                rec.bad_count = rec.bad_count.saturating_add(1);
                report.tested.push(name.clone());
            }
        }

        if let [only] = report.tested.as_slice() {
            if let Some(rec) = self.files.get_mut(only) {
                rec.status = FileStatus::Bad;
            }
            report.offender = Some(only.clone());
        }

        self.partition(rng, &mut report);
        Ok(report)
    }

    /// Exclude `name` from bisection for good. Returns `false` if it is not indexed.
    pub fn ignore(&mut self, name: &str) -> bool {
        match self.files.get_mut(name) {
            Some(rec) => {
                rec.status = FileStatus::Ignored;
                true
            }
            None => false,
        }
    }

    /// Start bisecting again: good and bad files become unknown, bad-counts
    /// are cleared and everything in quarantine comes back.
    ///
    /// Ignored and errored records keep their status.
    pub fn reset(&mut self) -> Result<ResetReport> {
        self.require_indexed()?;
        let mut report = ResetReport::default();
        let working_dir = &self.working_dir;

        for (name, rec) in &mut self.files {
            let was_classified = matches!(rec.status, FileStatus::Good | FileStatus::Bad);
            if was_classified || (rec.status == FileStatus::Unknown && rec.bad_count > 0) {
                rec.status = FileStatus::Unknown;
                rec.bad_count = 0;
                report.reset.push(name.clone());
            }

            if rec.in_quarantine() {
                match rec.move_to_working(working_dir) {
                    Ok(()) => report.returned.push(name.clone()),
                    Err(err) => report.move_failures.push(err),
                }
            }
        }

        Ok(report)
    }

    /// Per-status counts.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.files.len(),
            ..Summary::default()
        };
        for rec in self.files.values() {
            match rec.status {
                FileStatus::Unknown => summary.unknown += 1,
                FileStatus::Good => summary.good += 1,
                FileStatus::Bad => summary.bad += 1,
                FileStatus::Ignored => summary.ignored += 1,
                FileStatus::Errored | FileStatus::Unrecognized(_) => summary.errored += 1,
            }
            if rec.in_quarantine() {
                summary.quarantined += 1;
            }
        }
        summary
    }

    fn require_indexed(&self) -> Result<()> {
        if self.quarantine_dir.as_os_str().is_empty() {
            return Err(BisectError::NotIndexed);
        }
        Ok(())
    }

    /// Re-split every unknown record between working directory and quarantine.
    ///
    /// A failed move is recorded and the round carries on; bookkeeping done
    /// by the caller before this point stays committed either way.
    fn partition<R>(&mut self, rng: &mut R, report: &mut RoundReport)
    where
        R: Rng + ?Sized,
    {
        let candidates: Vec<Candidate> = self
            .files
            .iter()
            .filter(|(_, rec)| rec.status == FileStatus::Unknown)
            .map(|(name, rec)| Candidate {
                name: name.clone(),
                bad_count: rec.bad_count,
            })
            .collect();

        if candidates.is_empty() {
            report.done = true;
            return;
        }

        let plan = plan_split(candidates, rng);

        if !plan.quarantine.is_empty() && !self.quarantine_dir.is_dir() {
            // A failure here surfaces below as one MoveFailed per file.
            let _ = fs::create_dir_all(&self.quarantine_dir);
        }

        let working_dir = &self.working_dir;
        let quarantine_dir = &self.quarantine_dir;

        for name in plan.keep {
            if let Some(rec) = self.files.get_mut(&name) {
                if let Err(err) = rec.move_to_working(working_dir) {
                    report.move_failures.push(err);
                }
            }
            report.kept.push(name);
        }

        for name in plan.quarantine {
            if let Some(rec) = self.files.get_mut(&name) {
                if let Err(err) = rec.move_to_quarantine(quarantine_dir) {
                    report.move_failures.push(err);
                }
            }
            report.quarantined.push(name);
        }
    }
}
