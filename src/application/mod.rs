//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Descriptor registry (per-type filter metadata)
//! - Filter rule resolver (per-field decisions)
//! - Filter configuration (base mappers, kill switch, options)
//! - Mapper cache (one filtered mapper per filtering context)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cache;
pub mod configuration;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod resolver;
