//! Shared test doubles and utilities for Bedrock.

mod clock;
mod handler;
mod rng;

pub use clock::FixedClock;
pub use handler::{FailingHandler, RecordingHandler};
pub use rng::{MockRng, SequenceRng};
