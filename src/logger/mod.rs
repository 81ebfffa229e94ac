//! Activity journal: JSONL append-only with graceful degradation.

pub mod events;
pub mod jsonl;
