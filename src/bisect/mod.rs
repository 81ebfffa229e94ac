//! Bisection engine: file records, the index, split planning and persistence.

pub mod index;
pub mod partition;
pub mod record;
pub mod relocate;
pub mod store;
