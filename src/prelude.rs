//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use file_bisect::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, DEFAULT_INDEX_FILE_NAME, DEFAULT_QUARANTINE_PREFIX};
pub use crate::core::errors::{BisectError, Result};

// Bisection
pub use crate::bisect::index::{
    Index, InitReport, RefreshOptions, RefreshReport, ResetReport, RoundReport, Summary, Verdict,
};
pub use crate::bisect::partition::{Candidate, SplitPlan, plan_split};
pub use crate::bisect::record::{FileRecord, FileStatus};
pub use crate::bisect::store::IndexStore;

// Journal
pub use crate::logger::jsonl::{JournalEntry, JournalWriter, JsonlConfig};
