//! Building filtered mappers from base configurations.
//!
//! A [`ConfiguredSerializer`] is an independent mapper owning a private copy
//! of a base configuration plus the exclusions resolved for one filtering
//! context. The base configuration it was built from is never touched.

use crate::application::error::EncodeError;
use crate::application::ports::Mapper;
use crate::application::registry::DescriptorRegistry;
use crate::domain::filter_set::FieldFilterSet;
use crate::domain::mapper_config::{BaseMapperConfig, SerializationConfig};
use crate::domain::media_type::WireFormat;
use crate::infrastructure::encoder;
use crate::infrastructure::visitor::DocumentPruner;
use serde_json::Value;
use std::any::Any;
use std::io;
use std::sync::Arc;

/// Builder for [`ConfiguredSerializer`].
///
/// # Example
/// ```
/// use field_filter::{BaseMapperConfig, FieldFilterSet, MapperBuilder, MapperExt};
/// use serde_json::json;
///
/// let filters: FieldFilterSet = [("User", vec!["password"])].into_iter().collect();
/// let mapper = MapperBuilder::new(&BaseMapperConfig::json())
///     .with_filter_fields(filters)
///     .with_root_type("User")
///     .build();
///
/// let bytes = mapper.write_object(&json!({"id": 1, "password": "x"})).unwrap();
/// assert_eq!(bytes, br#"{"id":1}"#);
/// ```
#[derive(Debug, Clone)]
pub struct MapperBuilder {
    config: BaseMapperConfig,
    filters: Arc<FieldFilterSet>,
    options: Option<SerializationConfig>,
    root_type: Option<String>,
    descriptors: Option<DescriptorRegistry>,
}

impl MapperBuilder {
    /// Start from a copy of `base`.
    pub fn new(base: &BaseMapperConfig) -> Self {
        Self {
            config: base.clone(),
            filters: Arc::new(FieldFilterSet::empty()),
            options: None,
            root_type: None,
            descriptors: None,
        }
    }

    /// Exclusions applied when writing.
    pub fn with_filter_fields(mut self, filters: impl Into<Arc<FieldFilterSet>>) -> Self {
        self.filters = filters.into();
        self
    }

    /// Process-wide options layered over the copied base configuration.
    pub fn with_serialization_config(mut self, options: SerializationConfig) -> Self {
        self.options = Some(options);
        self
    }

    /// Type name of the documents this mapper writes.
    ///
    /// Without a root type only exclusions reachable from it can apply, so
    /// nothing is pruned.
    pub fn with_root_type(mut self, type_name: impl Into<String>) -> Self {
        self.root_type = Some(type_name.into());
        self
    }

    /// Descriptors used to follow nested fields to their types.
    pub fn with_descriptors(mut self, registry: DescriptorRegistry) -> Self {
        self.descriptors = Some(registry);
        self
    }

    /// Build the mapper.
    pub fn build(self) -> ConfiguredSerializer {
        let mut config = self.config;
        if let Some(options) = &self.options {
            config.apply(options);
        }
        ConfiguredSerializer {
            config,
            filters: self.filters,
            root_type: self.root_type,
            descriptors: self.descriptors,
        }
    }
}

/// A mapper specialised for one filtering context.
///
/// Equality compares the effective configuration, the root type and the
/// exclusions; two serializers built for the same context compare equal.
#[derive(Debug, Clone)]
pub struct ConfiguredSerializer {
    config: BaseMapperConfig,
    filters: Arc<FieldFilterSet>,
    root_type: Option<String>,
    descriptors: Option<DescriptorRegistry>,
}

impl ConfiguredSerializer {
    /// Effective configuration after serialization options were applied.
    pub fn config(&self) -> &BaseMapperConfig {
        &self.config
    }

    /// Exclusions applied by this mapper.
    pub fn filters(&self) -> &FieldFilterSet {
        &self.filters
    }

    /// Root type name.
    pub fn root_type(&self) -> Option<&str> {
        self.root_type.as_deref()
    }

    /// Prune a document without encoding it.
    pub fn filter_value(&self, value: Value) -> Value {
        DocumentPruner::filtered(&self.config, &self.filters, self.descriptors.as_ref())
            .prune(value, self.root_type.as_deref())
    }
}

impl PartialEq for ConfiguredSerializer {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
            && self.root_type == other.root_type
            && self.filters == other.filters
    }
}

impl Eq for ConfiguredSerializer {}

impl Mapper for ConfiguredSerializer {
    fn wire_format(&self) -> WireFormat {
        self.config.format()
    }

    fn write_value(&self, value: Value, out: &mut dyn io::Write) -> Result<(), EncodeError> {
        let document = self.filter_value(value);
        encoder::encode(&self.config, &document, out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
