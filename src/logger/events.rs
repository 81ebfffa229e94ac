//! Mapping of index reports onto journal entries.

#![allow(missing_docs)]

use crate::bisect::index::{InitReport, RefreshReport, ResetReport, RoundReport, Verdict};
use crate::core::errors::BisectError;
use crate::logger::jsonl::{EventType, JournalEntry, Severity};

/// Entries for the problems and repairs found while loading the index.
pub fn init_entries(report: &InitReport) -> Vec<JournalEntry> {
    let mut entries: Vec<JournalEntry> = report.problems.iter().map(problem_entry).collect();
    for (name, status) in &report.restored {
        entries.push(
            JournalEntry::new(EventType::StatusRestored, Severity::Info)
                .file(name.as_str())
                .details(status.as_str()),
        );
    }
    entries
}

pub fn refresh_entries(report: &RefreshReport) -> Vec<JournalEntry> {
    let mut entries = Vec::new();
    if let Some(dir) = &report.quarantine_created {
        let mut entry = JournalEntry::new(EventType::QuarantineCreated, Severity::Info);
        entry.to = Some(dir.to_string_lossy().into_owned());
        entries.push(entry);
    }
    for name in &report.added {
        entries.push(JournalEntry::new(EventType::FileAdded, Severity::Info).file(name.as_str()));
    }
    for name in &report.skipped {
        entries.push(
            JournalEntry::new(EventType::FileSkipped, Severity::Warning)
                .file(name.as_str())
                .details("name is not valid UTF-8"),
        );
    }
    entries.push(
        JournalEntry::new(EventType::IndexRefreshed, Severity::Info).count(report.added.len()),
    );
    entries
}

pub fn round_entries(report: &RoundReport) -> Vec<JournalEntry> {
    let event = match report.verdict {
        Verdict::Good => EventType::VerdictGood,
        Verdict::Bad => EventType::VerdictBad,
    };
    let mut entries = vec![JournalEntry::new(event, Severity::Info).count(report.tested.len())];

    if let Some(offender) = &report.offender {
        entries.push(
            JournalEntry::new(EventType::OffenderFound, Severity::Warning).file(offender.as_str()),
        );
    }

    let failed: Vec<&str> = report.move_failures.iter().filter_map(moved_name).collect();
    for name in &report.quarantined {
        if !failed.contains(&name.as_str()) {
            let mut entry =
                JournalEntry::new(EventType::FileMoved, Severity::Info).file(name.as_str());
            entry.to = Some("quarantine".to_string());
            entries.push(entry);
        }
    }
    entries.extend(report.move_failures.iter().map(problem_entry));

    if report.done {
        entries.push(JournalEntry::new(EventType::BisectionDone, Severity::Info));
    }
    entries
}

pub fn reset_entries(report: &ResetReport) -> Vec<JournalEntry> {
    let mut entries =
        vec![JournalEntry::new(EventType::Reset, Severity::Info).count(report.reset.len())];
    for name in &report.returned {
        let mut entry = JournalEntry::new(EventType::FileMoved, Severity::Info).file(name.as_str());
        entry.to = Some("working".to_string());
        entries.push(entry);
    }
    entries.extend(report.move_failures.iter().map(problem_entry));
    entries
}

pub fn ignore_entry(name: &str) -> JournalEntry {
    JournalEntry::new(EventType::FileIgnored, Severity::Info).file(name)
}

/// One entry for a record-level error, carrying its code.
pub fn problem_entry(err: &BisectError) -> JournalEntry {
    let (event, name) = match err {
        BisectError::InvalidStatus { name, .. } => (EventType::InvalidStatus, Some(name)),
        BisectError::FileUnreachable { name } | BisectError::InvalidKey { name } => {
            (EventType::FileErrored, Some(name))
        }
        BisectError::MoveFailed { name, .. } => (EventType::MoveFailed, Some(name)),
        BisectError::NotFound { name } => (EventType::FileIgnored, Some(name)),
        _ => (EventType::FileErrored, None),
    };
    let mut entry = JournalEntry::new(event, Severity::Warning).error(err);
    entry.file = name.cloned();
    if let BisectError::MoveFailed { from, to, .. } = err {
        entry.from = Some(from.to_string_lossy().into_owned());
        entry.to = Some(to.to_string_lossy().into_owned());
    }
    entry
}

fn moved_name(err: &BisectError) -> Option<&str> {
    match err {
        BisectError::MoveFailed { name, .. } => Some(name.as_str()),
        _ => None,
    }
}
