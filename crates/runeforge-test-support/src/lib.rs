//! Shared test mocks and utilities for the Runeforge rules engine.

mod clock;
mod index;
mod repository;
mod rng;

pub use clock::FixedClock;
pub use index::{FailingActiveIndex, RecordingActiveIndex};
pub use repository::{EmptyEventRepository, FailingEventRepository, RecordingEventRepository};
pub use rng::{MockRng, SequenceRng};
