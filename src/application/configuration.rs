//! Runtime filter configuration.
//!
//! Holds the base mapper configuration registered per media type, the global
//! kill switch, process-wide serialization options and custom converters.
//! Every change is visible to the next lookup; cached mappers built from a
//! replaced configuration are detected through revision stamps and rebuilt.

use crate::application::ports::Mapper;
use crate::domain::mapper_config::{BaseMapperConfig, SerializationConfig};
use crate::domain::media_type::{MediaType, MediaTypeError, WireFormat};
use crate::infrastructure::mapper::ConfiguredSerializer;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Invalid configuration rejected at registration time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The media type maps to no wire format the encoder supports
    #[error("media type {0} has no supported wire format")]
    UnsupportedMediaType(MediaType),
    /// The configuration encodes a different format than the media type names
    #[error("media type {media_type} needs a {expected} mapper, got {actual}")]
    FormatMismatch {
        media_type: MediaType,
        expected: WireFormat,
        actual: WireFormat,
    },
    /// A converter must wrap a mapper built by [`MapperBuilder`](crate::MapperBuilder)
    #[error("converter {0:?} does not wrap a filtered mapper")]
    UnfilteredConverter(String),
    /// A converter needs a name
    #[error("converter name must not be empty")]
    EmptyConverterName,
    /// A converter must declare at least one media type
    #[error("converter {0:?} declares no media types")]
    NoConverterMediaTypes(String),
    /// The media type string could not be parsed
    #[error(transparent)]
    MediaType(#[from] MediaTypeError),
}

/// An alternate encoder offered to the surrounding HTTP layer.
#[derive(Clone)]
pub struct Converter {
    name: String,
    media_types: Vec<MediaType>,
    mapper: Arc<dyn Mapper>,
}

impl Converter {
    /// Wrap a mapper under a name.
    pub fn new(name: impl Into<String>, mapper: Arc<dyn Mapper>) -> Self {
        Self {
            name: name.into(),
            media_types: Vec::new(),
            mapper,
        }
    }

    /// Declare a media type the converter writes.
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        if !self.media_types.contains(&media_type) {
            self.media_types.push(media_type);
        }
        self
    }

    /// Converter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media types.
    pub fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    /// Wrapped mapper.
    pub fn mapper(&self) -> &Arc<dyn Mapper> {
        &self.mapper
    }

    /// Whether the converter declares `media_type`.
    pub fn supports(&self, media_type: &MediaType) -> bool {
        self.media_types
            .iter()
            .any(|declared| declared == media_type || declared == &media_type.without_charset())
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("media_types", &self.media_types)
            .field("format", &self.mapper.wire_format())
            .finish()
    }
}

#[derive(Debug)]
struct Registered {
    config: BaseMapperConfig,
    revision: u64,
}

#[derive(Debug, Default)]
struct VersionedOptions {
    options: SerializationConfig,
    revision: u64,
}

/// Base configuration found for a media type, with the key it was
/// registered under and its revision stamp.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedMapper {
    pub(crate) registered_as: MediaType,
    pub(crate) config: BaseMapperConfig,
    pub(crate) revision: u64,
}

/// Media types registered when a configuration is created with [`FilterConfiguration::new`].
pub fn default_media_types() -> Vec<MediaType> {
    let mut defaults = vec![
        MediaType::application_json(),
        MediaType::application_json_utf8(),
        MediaType::application_xml(),
        MediaType::application_xml_utf8(),
        MediaType::text_xml(),
    ];
    defaults.extend(
        [("application", "*+json"), ("application", "*+xml")]
            .into_iter()
            .filter_map(|(kind, subtype)| MediaType::new(kind, subtype).ok()),
    );
    defaults
}

/// Runtime configuration shared by the engine and the mapper cache.
///
/// All methods take `&self`; the configuration is normally held in an `Arc`
/// and reconfigured while requests are being served.
#[derive(Debug)]
pub struct FilterConfiguration {
    mappers: DashMap<MediaType, Arc<Registered>>,
    revisions: AtomicU64,
    enabled: AtomicBool,
    use_default_converters: AtomicBool,
    serialization: RwLock<VersionedOptions>,
    converters: RwLock<Vec<Converter>>,
}

impl FilterConfiguration {
    /// Create a configuration with the default JSON and XML mappers registered.
    pub fn new() -> Self {
        let config = Self::empty();
        for media_type in default_media_types() {
            if let Some(format) = media_type.wire_format() {
                config.store(media_type, BaseMapperConfig::for_format(format));
            }
        }
        config
    }

    /// Create a configuration with no mappers registered.
    pub fn empty() -> Self {
        Self {
            mappers: DashMap::new(),
            revisions: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
            use_default_converters: AtomicBool::new(true),
            serialization: RwLock::new(VersionedOptions::default()),
            converters: RwLock::new(Vec::new()),
        }
    }

    fn next_revision(&self) -> u64 {
        self.revisions.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn store(&self, media_type: MediaType, config: BaseMapperConfig) -> Option<Arc<Registered>> {
        let revision = self.next_revision();
        self.mappers
            .insert(media_type, Arc::new(Registered { config, revision }))
    }

    /// Register or replace the base configuration for a media type.
    ///
    /// The last registration wins and is visible to the next lookup.
    ///
    /// # Errors
    /// Returns an error if the media type has no wire format, or if the
    /// configuration encodes a different format.
    pub fn set_mapper(
        &self,
        media_type: MediaType,
        config: BaseMapperConfig,
    ) -> Result<&Self, ConfigError> {
        let expected = media_type
            .wire_format()
            .ok_or_else(|| ConfigError::UnsupportedMediaType(media_type.clone()))?;
        if config.format() != expected {
            return Err(ConfigError::FormatMismatch {
                media_type,
                expected,
                actual: config.format(),
            });
        }

        let label = media_type.to_string();
        let replaced = self.store(media_type, config).is_some();
        debug!(media_type = %label, replaced, "registered base mapper");
        Ok(self)
    }

    /// Base configuration registered under exactly this media type.
    pub fn get_mapper(&self, media_type: &MediaType) -> Option<BaseMapperConfig> {
        self.mappers
            .get(media_type)
            .map(|entry| entry.value().config.clone())
    }

    /// Apply `f` to the configuration registered for `media_type`.
    ///
    /// Returns whether a configuration was found.
    pub fn find_mapper<F>(&self, media_type: &MediaType, f: F) -> bool
    where
        F: FnOnce(&BaseMapperConfig),
    {
        match self.mappers.get(media_type) {
            Some(entry) => {
                f(&entry.value().config);
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every registered configuration.
    pub fn find_mappers<F>(&self, mut f: F)
    where
        F: FnMut(&MediaType, &BaseMapperConfig),
    {
        for entry in self.mappers.iter() {
            f(entry.key(), &entry.value().config);
        }
    }

    /// Registered media types, sorted.
    pub fn supported_media_types(&self) -> Vec<MediaType> {
        let mut media_types: Vec<_> = self.mappers.iter().map(|e| e.key().clone()).collect();
        media_types.sort();
        media_types
    }

    fn find_registered(&self, media_type: &MediaType) -> Option<(MediaType, Arc<Registered>)> {
        let candidates = [
            Some(media_type.clone()),
            media_type.charset().map(|_| media_type.without_charset()),
            media_type.suffix_wildcard(),
        ];

        candidates.into_iter().flatten().find_map(|candidate| {
            let registered = self.mappers.get(&candidate)?.value().clone();
            Some((candidate, registered))
        })
    }

    /// Find the configuration used to write `media_type`.
    ///
    /// Tries the exact media type, then the same type without charset, then
    /// the structured-suffix wildcard (`application/*+json`).
    pub(crate) fn lookup(&self, media_type: &MediaType) -> Option<ResolvedMapper> {
        self.find_registered(media_type)
            .map(|(registered_as, registered)| ResolvedMapper {
                registered_as,
                config: registered.config.clone(),
                revision: registered.revision,
            })
    }

    /// Revision of the configuration [`lookup`](Self::lookup) would return.
    ///
    /// Revisions are unique across all registrations, so an unchanged
    /// revision means an unchanged configuration.
    pub(crate) fn resolved_revision(&self, media_type: &MediaType) -> Option<u64> {
        self.find_registered(media_type)
            .map(|(_, registered)| registered.revision)
    }

    /// Whether filtering is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn filtering on or off. Disabled means responses are written unfiltered.
    pub fn set_enabled(&self, enabled: bool) -> &Self {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            debug!(enabled, "field filtering toggled");
        }
        self
    }

    /// Whether the surrounding HTTP layer should keep its default converters.
    pub fn is_use_default_converters(&self) -> bool {
        self.use_default_converters.load(Ordering::Acquire)
    }

    /// Keep or drop the surrounding HTTP layer's default converters.
    pub fn set_use_default_converters(&self, use_defaults: bool) -> &Self {
        self.use_default_converters
            .store(use_defaults, Ordering::Release);
        self
    }

    /// Process-wide serialization options.
    pub fn serialization_config(&self) -> SerializationConfig {
        self.serialization.read().options.clone()
    }

    /// Replace the process-wide serialization options.
    ///
    /// Cached mappers built with the previous options are rebuilt on next use.
    pub fn set_serialization_config(&self, options: SerializationConfig) -> &Self {
        let revision = self.next_revision();
        let mut guard = self.serialization.write();
        guard.options = options;
        guard.revision = revision;
        debug!(revision, "serialization options replaced");
        self
    }

    pub(crate) fn serialization_snapshot(&self) -> (SerializationConfig, u64) {
        let guard = self.serialization.read();
        (guard.options.clone(), guard.revision)
    }

    pub(crate) fn serialization_revision(&self) -> u64 {
        self.serialization.read().revision
    }

    /// Register a custom converter.
    ///
    /// # Errors
    /// The converter must wrap a mapper built by this crate, have a
    /// non-empty name and declare at least one media type.
    pub fn with_custom_converter(&self, converter: Converter) -> Result<&Self, ConfigError> {
        if converter.name.trim().is_empty() {
            return Err(ConfigError::EmptyConverterName);
        }
        if converter.media_types.is_empty() {
            return Err(ConfigError::NoConverterMediaTypes(converter.name));
        }
        if !converter.mapper.as_any().is::<ConfiguredSerializer>() {
            return Err(ConfigError::UnfilteredConverter(converter.name));
        }

        debug!(
            converter = %converter.name,
            media_types = converter.media_types.len(),
            "registered custom converter"
        );
        self.converters.write().push(converter);
        Ok(self)
    }

    /// Registered custom converters, in registration order.
    pub fn custom_converters(&self) -> Vec<Converter> {
        self.converters.read().clone()
    }

    /// First custom converter declaring `media_type`.
    pub fn custom_converter_for(&self, media_type: &MediaType) -> Option<Converter> {
        self.converters
            .read()
            .iter()
            .find(|converter| converter.supports(media_type))
            .cloned()
    }
}

impl Default for FilterConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
