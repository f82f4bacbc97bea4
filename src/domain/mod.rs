//! Domain layer - pure filtering concepts with no I/O.
//!
//! This layer contains the core concepts and invariants of field filtering:
//! - Media types and wire formats
//! - Call contexts and their fingerprints
//! - Field predicates and per-type filter metadata
//! - Exclusion sets and mapper configurations
//!
//! All types in this layer are pure and easily testable.

pub mod context;
pub mod descriptor;
pub mod filter_set;
pub mod fingerprint;
pub mod mapper_config;
pub mod media_type;
pub mod predicate;
