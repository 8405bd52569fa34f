//! Room-presence estimation algorithms

pub mod anchor;
pub mod coordinator;

pub use anchor::{Anchor, RatedCandidate};
pub use coordinator::{CandidateScore, Coordinator, WinnerSelection};
