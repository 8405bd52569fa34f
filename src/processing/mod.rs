//! Sample bookkeeping and payload processing

pub mod sample;
pub mod entity;
pub mod parser;

pub use sample::DistanceSample;
pub use entity::{EntityStore, TrackedEntity};
pub use parser::{DistanceReport, ParseError, PayloadParser};
