//! The filtering engine: entry point tying configuration, metadata and the
//! mapper cache together.
//!
//! The engine is an explicit context object; nothing is global. Clones share
//! the same configuration, registry and cache.
//!
//! Filtering fails open. When a filtered mapper cannot be produced for a
//! call (no base configuration, a panicking predicate, an encoding error)
//! the engine logs a warning and writes the object unfiltered.

use crate::application::cache::MapperCache;
use crate::application::configuration::{ConfigError, Converter, FilterConfiguration};
use crate::application::error::FilterError;
use crate::application::metrics::Metrics;
use crate::application::ports::Mapper;
use crate::application::registry::DescriptorRegistry;
use crate::application::resolver::FilterRuleResolver;
use crate::domain::context::CallContext;
use crate::domain::descriptor::{Filterable, TypeDescriptor};
use crate::domain::mapper_config::{BaseMapperConfig, SerializationConfig};
use crate::domain::media_type::MediaType;
use crate::infrastructure::mapper::ConfiguredSerializer;
use serde::Serialize;
use std::panic;
use std::sync::Arc;
use tracing::{trace, warn};

/// Builder for constructing a [`FilterEngine`].
#[derive(Debug)]
pub struct FilterEngineBuilder {
    configuration: Option<Arc<FilterConfiguration>>,
    registry: DescriptorRegistry,
    default_mappers: bool,
    mappers: Vec<(MediaType, BaseMapperConfig)>,
    serialization: Option<SerializationConfig>,
    enabled: Option<bool>,
    converters: Vec<Converter>,
}

impl FilterEngineBuilder {
    /// Share an existing configuration instead of creating one.
    pub fn with_configuration(mut self, configuration: Arc<FilterConfiguration>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Register the descriptor of a [`Filterable`] type.
    pub fn with_type<T: Filterable + 'static>(self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Register a descriptor built by hand.
    pub fn with_descriptor(self, descriptor: TypeDescriptor) -> Self {
        self.registry.register_descriptor(descriptor);
        self
    }

    /// Register a base configuration for a media type.
    ///
    /// Validated when `build()` is called.
    pub fn with_mapper(mut self, media_type: MediaType, config: BaseMapperConfig) -> Self {
        self.mappers.push((media_type, config));
        self
    }

    /// Start from an empty configuration instead of the default JSON and
    /// XML registrations. Ignored when a configuration is supplied.
    pub fn without_default_mappers(mut self) -> Self {
        self.default_mappers = false;
        self
    }

    /// Set the process-wide serialization options.
    pub fn with_serialization_config(mut self, options: SerializationConfig) -> Self {
        self.serialization = Some(options);
        self
    }

    /// Enable or disable filtering.
    ///
    /// Default: enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Register a custom converter.
    ///
    /// Validated when `build()` is called.
    pub fn with_custom_converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Returns `ConfigError` if a mapper registration or custom converter is
    /// invalid.
    pub fn build(self) -> Result<FilterEngine, ConfigError> {
        let configuration = match self.configuration {
            Some(configuration) => configuration,
            None if self.default_mappers => Arc::new(FilterConfiguration::new()),
            None => Arc::new(FilterConfiguration::empty()),
        };

        for (media_type, config) in self.mappers {
            configuration.set_mapper(media_type, config)?;
        }
        for converter in self.converters {
            configuration.with_custom_converter(converter)?;
        }
        if let Some(options) = self.serialization {
            configuration.set_serialization_config(options);
        }
        if let Some(enabled) = self.enabled {
            configuration.set_enabled(enabled);
        }

        Ok(FilterEngine::from_parts(configuration, self.registry))
    }
}

/// Context-aware field filtering engine.
///
/// # Example
/// ```
/// use field_filter::{
///     Argument, CallContext, FieldDescriptor, FilterEngine, MediaType, MethodId, TypeDescriptor,
/// };
/// use serde_json::json;
///
/// let engine = FilterEngine::builder()
///     .with_descriptor(
///         TypeDescriptor::new("User")
///             .plain_fields(["id", "name"])
///             .field(FieldDescriptor::new("password").always_exclude()),
///     )
///     .build()
///     .unwrap();
///
/// let ctx = CallContext::new(MethodId::new("Users", "get"), "User", MediaType::application_json())
///     .with_argument(Argument::ignored("request_id", "r-1"));
///
/// let user = json!({"id": 1, "name": "ann", "password": "secret"});
/// let bytes = engine.write(&user, &ctx).unwrap();
/// assert_eq!(bytes, br#"{"id":1,"name":"ann"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct FilterEngine {
    configuration: Arc<FilterConfiguration>,
    registry: DescriptorRegistry,
    cache: Arc<MapperCache>,
}

impl FilterEngine {
    /// Create a builder for configuring the engine.
    ///
    /// Defaults:
    /// - Configuration: JSON and XML mappers for the common media types
    /// - Filtering: enabled
    /// - Registered types: none
    pub fn builder() -> FilterEngineBuilder {
        FilterEngineBuilder {
            configuration: None,
            registry: DescriptorRegistry::new(),
            default_mappers: true,
            mappers: Vec::new(),
            serialization: None,
            enabled: None,
            converters: Vec::new(),
        }
    }

    /// Create an engine with default settings and no registered types.
    pub fn new() -> Self {
        Self::from_parts(Arc::new(FilterConfiguration::new()), DescriptorRegistry::new())
    }

    fn from_parts(configuration: Arc<FilterConfiguration>, registry: DescriptorRegistry) -> Self {
        let resolver = FilterRuleResolver::new(registry.clone());
        let cache = MapperCache::new(Arc::clone(&configuration), resolver);
        Self {
            configuration,
            registry,
            cache: Arc::new(cache),
        }
    }

    /// Runtime configuration.
    pub fn configuration(&self) -> &Arc<FilterConfiguration> {
        &self.configuration
    }

    /// Registered type descriptors.
    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Mapper cache.
    pub fn cache(&self) -> &MapperCache {
        &self.cache
    }

    /// Cache and fallback metrics.
    pub fn metrics(&self) -> &Metrics {
        self.cache.metrics()
    }

    /// Register the descriptor of a [`Filterable`] type.
    ///
    /// Cached mappers resolved before a new type is registered are rebuilt
    /// on their next use.
    pub fn register<T: Filterable + 'static>(&self) -> Arc<TypeDescriptor> {
        self.registry.register::<T>()
    }

    /// Filtered mapper for a call.
    ///
    /// Returns `None` when filtering is disabled or a filtered mapper could
    /// not be produced; callers then write with the base configuration.
    pub fn serializer_for(&self, ctx: &CallContext) -> Option<Arc<ConfiguredSerializer>> {
        if !self.configuration.is_enabled() {
            trace!(method = %ctx.method(), "field filtering disabled");
            return None;
        }

        let result =
            panic::catch_unwind(panic::AssertUnwindSafe(|| self.cache.find_or_build(ctx)));

        match result {
            Ok(Ok(serializer)) => Some(serializer),
            Ok(Err(err)) => {
                self.cache.metrics().record_fallback();
                warn!(
                    method = %ctx.method(),
                    media_type = %ctx.media_type(),
                    error = %err,
                    "field filtering unavailable, writing unfiltered"
                );
                None
            }
            Err(_) => {
                self.cache.metrics().record_fallback();
                warn!(
                    method = %ctx.method(),
                    media_type = %ctx.media_type(),
                    "building a filtered mapper panicked, writing unfiltered"
                );
                None
            }
        }
    }

    /// Serialize `value` for a call, filtering fields when possible.
    ///
    /// # Errors
    /// Fails only when the object cannot be written even unfiltered: it does
    /// not serialize, or no encoder exists for the media type.
    pub fn write<T>(&self, value: &T, ctx: &CallContext) -> Result<Vec<u8>, FilterError>
    where
        T: Serialize + ?Sized,
    {
        if let Some(serializer) = self.serializer_for(ctx) {
            let mut out = Vec::new();
            match serializer.write_value(serde_json::to_value(value)?, &mut out) {
                Ok(()) => return Ok(out),
                Err(err) => {
                    self.cache.metrics().record_fallback();
                    warn!(
                        method = %ctx.method(),
                        media_type = %ctx.media_type(),
                        error = %err,
                        "filtered encoding failed, writing unfiltered"
                    );
                }
            }
        }
        self.write_unfiltered(value, ctx.media_type())
    }

    /// Serialize `value` with the base configuration for `media_type`.
    ///
    /// Without a registered configuration the default one for the media
    /// type's wire format is used.
    pub fn write_unfiltered<T>(
        &self,
        value: &T,
        media_type: &MediaType,
    ) -> Result<Vec<u8>, FilterError>
    where
        T: Serialize + ?Sized,
    {
        let base = match self.configuration.lookup(media_type) {
            Some(resolved) => resolved.config,
            None => media_type
                .wire_format()
                .map(BaseMapperConfig::for_format)
                .ok_or_else(|| FilterError::UnsupportedMediaType(media_type.clone()))?,
        };

        let mut out = Vec::new();
        base.write_value(serde_json::to_value(value)?, &mut out)?;
        Ok(out)
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}
