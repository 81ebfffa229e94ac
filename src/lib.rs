#![forbid(unsafe_code)]

//! file-bisect: delta debugging over the files of one directory.
//!
//! When some file in a directory breaks a build, a game or a test run, and
//! nobody knows which, `file-bisect` narrows it down by moving roughly half
//! of the suspects into a quarantine directory, letting the user re-run their
//! check and report `good` or `bad`, and repeating until one file is left.
//!
//! State lives in a TOML index next to the files, so each step is a separate
//! process invocation.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use file_bisect::prelude::*;
//! use rand::SeedableRng;
//!
//! let store = IndexStore::open(std::path::Path::new("."), DEFAULT_INDEX_FILE_NAME)?;
//! let mut index = store.load_or_create()?;
//! index.init();
//! index.refresh(&RefreshOptions::default())?;
//! let report = index.bad(&mut rand::rngs::StdRng::seed_from_u64(7))?;
//! store.save(&index)?;
//! println!("{} file(s) quarantined", report.quarantined.len());
//! # Ok::<(), BisectError>(())
//! ```

pub mod prelude;

pub mod bisect;
pub mod core;
pub mod logger;
