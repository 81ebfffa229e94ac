//! JSONL journal: append-only line-delimited JSON record of every bisection step.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a concurrent `tail -f` never sees half a line.
//!
//! Three-level degradation chain:
//! 1. Journal file
//! 2. stderr with `[FB-JOURNAL]` prefix
//! 3. Silent discard (a journal failure must never fail a bisection step)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{BisectError, Result};

/// Severity level for journal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Journal event types matching the bisection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IndexRefreshed,
    QuarantineCreated,
    FileAdded,
    FileSkipped,
    InvalidStatus,
    FileErrored,
    StatusRestored,
    VerdictGood,
    VerdictBad,
    OffenderFound,
    FileMoved,
    MoveFailed,
    FileIgnored,
    Reset,
    BisectionDone,
}

/// A single journal line — all fields optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Working directory the step ran in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// File name (index key) concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Number of files involved, for aggregate events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// FB error code if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JournalEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            working_dir: None,
            file: None,
            from: None,
            to: None,
            count: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>) -> Self {
        self.file = Some(name.into());
        self
    }

    #[must_use]
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a failure: sets `ok = false` plus code and message.
    #[must_use]
    pub fn error(mut self, err: &BisectError) -> Self {
        self.ok = Some(false);
        self.error_code = Some(err.code().to_string());
        self.error_message = Some(err.to_string());
        self
    }
}

/// Degradation state of the journal writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Configuration for the journal writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Maximum file size before rotation (bytes). Default: 8 MiB.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep. Default: 3.
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            max_size_bytes: 8 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Append-only journal writer with rotation and graceful degradation.
pub struct JournalWriter {
    config: Option<JsonlConfig>,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
    /// Stamped on every entry that does not carry its own working dir.
    working_dir: Option<String>,
}

impl JournalWriter {
    /// Open the journal file. Falls through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config: Some(config),
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
            working_dir: None,
        };
        w.try_open_primary();
        w
    }

    /// A writer that drops everything (journal disabled in config).
    pub fn disabled() -> Self {
        Self {
            config: None,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
            working_dir: None,
        }
    }

    pub fn set_working_dir(&mut self, dir: &Path) {
        self.working_dir = Some(dir.to_string_lossy().into_owned());
    }

    /// Write a single entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &JournalEntry) {
        let stamped;
        let entry = if entry.working_dir.is_none() && self.working_dir.is_some() {
            let mut copy = entry.clone();
            copy.working_dir.clone_from(&self.working_dir);
            stamped = copy;
            &stamped
        } else {
            entry
        };

        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[FB-JOURNAL] serialize error: {e}");
                return;
            }
        };

        self.write_line(&line);
    }

    pub fn write_all(&mut self, entries: &[JournalEntry]) {
        for entry in entries {
            self.write_entry(entry);
        }
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        let max_size = self.config.as_ref().map_or(u64::MAX, |c| c.max_size_bytes);
        if self.state == WriterState::Normal && self.bytes_written + line.len() as u64 > max_size
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line);
                        return;
                    }
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                let _ = write!(io::stderr(), "[FB-JOURNAL] {line}");
            }
            WriterState::Discard => {}
        }
    }

    fn try_open_primary(&mut self) {
        let Some(config) = &self.config else {
            return;
        };
        match open_append(&config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
                self.bytes_written = size;
            }
            Err(e) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(io::stderr(), "[FB-JOURNAL] {e}; journaling to stderr");
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => {
                let _ = writeln!(io::stderr(), "[FB-JOURNAL] write failed, using stderr");
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let Some(config) = self.config.clone() else {
            return;
        };
        let base = &config.path;

        // Shift existing rotations: .3→delete, .2→.3, .1→.2, current→.1
        for i in (1..config.max_rotated_files).rev() {
            let _ = rename(rotated_name(base, i), rotated_name(base, i + 1));
        }
        if config.max_rotated_files == 0 {
            let _ = fs::remove_file(base);
        } else {
            let _ = rename(base, rotated_name(base, 1));
        }

        match open_append(base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| BisectError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| BisectError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `journal.jsonl` → `journal.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
