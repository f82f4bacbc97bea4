//! Mock implementations for testing.
//!
//! This module provides test doubles for observing the engine: a tracing
//! layer capturing log events and a predicate counting its evaluations.

pub mod layer;
pub mod predicate;

pub use layer::MockCaptureLayer;
pub use predicate::CountingPredicate;
