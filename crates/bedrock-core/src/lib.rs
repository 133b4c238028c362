//! Bedrock Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that all bounded
//! contexts depend on, plus the in-process event dispatcher used to carry
//! side effects from one context into another. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod rng;
