//! Document walker that prunes excluded fields.
//!
//! The response object is first converted into a `serde_json::Value`. The
//! pruner then walks that document alongside the registered type
//! descriptors: each object is matched to a type name, its excluded fields
//! are dropped, and nested fields continue with their declared type. Arrays
//! apply the current type to every element.
//!
//! The same pass applies null handling and the naming strategy, so renaming
//! only ever sees declared field names.

use crate::application::registry::DescriptorRegistry;
use crate::domain::filter_set::FieldFilterSet;
use crate::domain::mapper_config::{BaseMapperConfig, NamingStrategy, NullHandling};
use serde_json::{Map, Value};

/// Prunes a document according to a filter set.
#[derive(Debug)]
pub(crate) struct DocumentPruner<'a> {
    filters: Option<&'a FieldFilterSet>,
    descriptors: Option<&'a DescriptorRegistry>,
    naming: NamingStrategy,
    nulls: NullHandling,
}

impl<'a> DocumentPruner<'a> {
    /// A pruner that only applies naming and null handling.
    pub(crate) fn unfiltered(config: &BaseMapperConfig) -> Self {
        Self {
            filters: None,
            descriptors: None,
            naming: config.naming(),
            nulls: config.null_handling(),
        }
    }

    /// A pruner dropping the fields excluded by `filters`.
    pub(crate) fn filtered(
        config: &BaseMapperConfig,
        filters: &'a FieldFilterSet,
        descriptors: Option<&'a DescriptorRegistry>,
    ) -> Self {
        Self {
            filters: Some(filters),
            descriptors,
            naming: config.naming(),
            nulls: config.null_handling(),
        }
    }

    /// Prune `value`, treating it as an instance of `type_name`.
    pub(crate) fn prune(&self, value: Value, type_name: Option<&str>) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.prune(item, type_name))
                    .collect(),
            ),
            Value::Object(fields) => Value::Object(self.prune_object(fields, type_name)),
            value => value,
        }
    }

    fn prune_object(
        &self,
        fields: Map<String, Value>,
        type_name: Option<&str>,
    ) -> Map<String, Value> {
        let excluded = match (self.filters, type_name) {
            (Some(filters), Some(type_name)) => filters.excluded_fields(type_name),
            _ => None,
        };
        let descriptor = match (self.descriptors, type_name) {
            (Some(registry), Some(type_name)) => registry.get(type_name),
            _ => None,
        };

        let mut pruned = Map::with_capacity(fields.len());
        for (name, value) in fields {
            if excluded.is_some_and(|excluded| excluded.contains(&name)) {
                continue;
            }
            if value.is_null() && self.nulls == NullHandling::Omit {
                continue;
            }

            let nested = descriptor
                .as_ref()
                .and_then(|descriptor| descriptor.get(&name))
                .and_then(|field| field.nested_type());
            let value = self.prune(value, nested);
            pruned.insert(self.naming.apply(&name), value);
        }
        pruned
    }
}
