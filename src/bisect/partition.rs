//! Split planning for one bisection round.
//!
//! The planner is pure: it sees only names and bad-counts and an injected
//! random source, and returns which names stay in the working directory and
//! which go to quarantine. Applying the plan is the index's job.

#![allow(missing_docs)]

use rand::Rng;
use rand::seq::SliceRandom;

/// An `unknown` record eligible for this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub bad_count: u32,
}

/// Outcome of [`plan_split`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan {
    /// Names that stay in (or return to) the working directory.
    pub keep: Vec<String>,
    /// Names that move to quarantine.
    pub quarantine: Vec<String>,
}

impl SplitPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.quarantine.is_empty()
    }
}

/// Order candidates and cut them in two.
///
/// Candidates are shuffled, then stable-sorted by ascending bad-count, so
/// files that survived more inconclusive rounds drift towards quarantine and
/// ties are broken at random. A lone candidate stays; otherwise the first
/// `len / 2` stay and the rest are quarantined.
///
/// `candidates` must arrive in a deterministic order (the index passes them
/// sorted by name) for a seeded `rng` to reproduce a split.
pub fn plan_split<R>(mut candidates: Vec<Candidate>, rng: &mut R) -> SplitPlan
where
    R: Rng + ?Sized,
{
    candidates.shuffle(rng);
    candidates.sort_by_key(|c| c.bad_count);

    let keep_len = match candidates.len() {
        1 => 1,
        n => n / 2,
    };
    let quarantined = candidates.split_off(keep_len);

    SplitPlan {
        keep: candidates.into_iter().map(|c| c.name).collect(),
        quarantine: quarantined.into_iter().map(|c| c.name).collect(),
    }
}
