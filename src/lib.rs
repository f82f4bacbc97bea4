//! # field-filter
//!
//! Request-context-aware field filtering for JSON and XML responses.
//!
//! Response objects are serialized once per endpoint type, but which fields
//! end up on the wire can depend on the call: a password is never written,
//! a salary only for callers holding a role, and a `fields=id,name` query
//! parameter narrows the output further. This crate decides per field
//! whether it is serialized and caches a configured mapper per distinct
//! filtering context, so the decision is made once and reused.
//!
//! ## Quick Start
//!
//! ```rust
//! use field_filter::{
//!     Argument, CallContext, FieldDescriptor, FilterEngine, MediaType, MethodId, Predicate,
//!     Principal, TypeDescriptor,
//! };
//! use serde_json::json;
//!
//! let engine = FilterEngine::builder()
//!     .with_descriptor(
//!         TypeDescriptor::new("User")
//!             .plain_fields(["id", "name"])
//!             .field(FieldDescriptor::new("password").always_exclude())
//!             .field(FieldDescriptor::new("email").include_when(Predicate::has_role("ADMIN"))),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let ctx = CallContext::new(
//!     MethodId::new("UserController", "get_user"),
//!     "User",
//!     MediaType::application_json(),
//! )
//! .with_argument(Argument::ignored("request_id", "8f2c"))
//! .with_principal(Principal::new(["USER"]));
//!
//! let user = json!({"id": 1, "name": "ann", "email": "ann@example.com", "password": "x"});
//! assert_eq!(engine.write(&user, &ctx).unwrap(), br#"{"id":1,"name":"ann"}"#);
//! ```
//!
//! ## Field Rules
//!
//! Each type is described once by a [`TypeDescriptor`], registered by hand
//! or through the [`Filterable`] trait. Per field, in priority order:
//! - **Always exclude**: the field is never written
//! - **Conditional**: the field is written only when every [`Predicate`]
//!   holds (role checks, list membership, custom closures)
//! - **Dynamic lists**: arguments marked as include or exclude lists narrow
//!   the fields of the root type, or of any named type with
//!   [`Argument::for_type`]
//!
//! Nested fields declare their type with [`FieldDescriptor::nested`]; the
//! rules apply to every reachable type, arrays element-wise. Cyclic type
//! graphs are fine.
//!
//! ## Filtering Contexts
//!
//! A [`ContextFingerprint`] identifies a filtering context: the method, the
//! negotiated media type, the principal's roles and the value of every
//! filter-relevant argument. Arguments marked [`Argument::ignored`] never
//! split the cache, and [`Argument::with_relevant_keys`] limits which keys of
//! an object argument count.
//!
//! ```rust
//! use field_filter::{Argument, CallContext, MediaType, MethodId};
//!
//! let base = CallContext::new(MethodId::new("Users", "list"), "User", MediaType::application_json());
//! let a = base.clone().with_argument(Argument::ignored("trace", "a"));
//! let b = base.clone().with_argument(Argument::ignored("trace", "b"));
//! assert_eq!(a.fingerprint(), b.fingerprint());
//!
//! let full = base.clone().with_argument(Argument::relevant("view", "full"));
//! assert_ne!(full.fingerprint(), a.fingerprint());
//! ```
//!
//! ## Configuration
//!
//! [`FilterConfiguration`] holds one [`BaseMapperConfig`] per media type and
//! can be changed while requests are served. Mappers cached from a replaced
//! configuration are rebuilt on their next use.
//!
//! ```rust
//! use field_filter::{BaseMapperConfig, FilterEngine, MediaType, NamingStrategy};
//!
//! let engine = FilterEngine::new();
//! engine
//!     .configuration()
//!     .set_mapper(
//!         MediaType::application_json(),
//!         BaseMapperConfig::json().with_naming(NamingStrategy::CamelCase),
//!     )
//!     .unwrap();
//!
//! // Kill switch: write everything unfiltered.
//! engine.configuration().set_enabled(false);
//! ```
//!
//! ## Fail-Open Operation
//!
//! Filtering never breaks a response. If a filtered mapper cannot be built
//! (no configuration for the media type, a panicking predicate) the object is
//! written unfiltered, a `WARN` event is logged and the
//! [`fallbacks`](Metrics::fallbacks) metric is incremented.
//!
//! ## Observability
//!
//! ```rust
//! # use field_filter::FilterEngine;
//! # let engine = FilterEngine::new();
//! let snapshot = engine.metrics().snapshot();
//! println!("Cache hit rate: {:.2}%", snapshot.hit_rate() * 100.0);
//! println!("Mappers built: {}", snapshot.mappers_built);
//! ```
//!
//! ## Features
//! - `xml` (default): XML output through `quick-xml`
//! - `test-helpers`: test doubles in [`infrastructure::mocks`]

// Domain layer - pure filtering concepts
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - encoders, storage and the engine
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    context::{Argument, CallContext, ListTarget, MethodId, Principal, Relevance},
    descriptor::{FieldDescriptor, Filterable, TypeDescriptor},
    filter_set::FieldFilterSet,
    fingerprint::ContextFingerprint,
    mapper_config::{BaseMapperConfig, NamingStrategy, NullHandling, SerializationConfig},
    media_type::{MediaType, MediaTypeError, WireFormat},
    predicate::{
        CustomPredicate, FieldDecision, FieldPredicate, ListMembership, Predicate, RoleCheck,
        RoleMatch,
    },
};

pub use application::{
    cache::{CachedMapper, MapperCache},
    configuration::{default_media_types, ConfigError, Converter, FilterConfiguration},
    error::{EncodeError, FilterError},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Mapper, MapperExt, Storage},
    registry::DescriptorRegistry,
    resolver::FilterRuleResolver,
};

pub use infrastructure::{
    engine::{FilterEngine, FilterEngineBuilder},
    mapper::{ConfiguredSerializer, MapperBuilder},
    storage::ShardedStorage,
};
