//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Storage implementations (sharded maps)
//! - Document pruning and byte-level encoding (serde_json, quick-xml)
//! - Filtered mapper construction
//! - The filtering engine entry point

pub mod encoder;
pub mod engine;
pub mod mapper;
pub mod storage;
pub(crate) mod visitor;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides test doubles for asserting on log
/// output and predicate evaluation.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// field-filter = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
