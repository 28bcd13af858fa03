//! Candidate Ranker
//!
//! Admission filters and deterministic ordering for fallen angel candidates.

pub mod ranker;

pub use ranker::{compare_candidates, potential_gain, CandidateRanker, RankOutcome, RankerParams};
