//! Per-type field exclusion sets.

use std::collections::{BTreeMap, BTreeSet};

/// Mapping from type name to the field names excluded for that type.
///
/// Built once per filtering context and never modified afterwards. Types
/// that were resolved but lost no fields are still recorded, with an empty
/// set, so callers can tell "resolved, nothing excluded" from "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilterSet {
    excluded: BTreeMap<String, BTreeSet<String>>,
}

impl FieldFilterSet {
    /// A set excluding nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn record_type(&mut self, type_name: &str, excluded: BTreeSet<String>) {
        self.excluded.insert(type_name.to_string(), excluded);
    }

    /// Whether the type has been resolved into this set.
    pub fn covers(&self, type_name: &str) -> bool {
        self.excluded.contains_key(type_name)
    }

    /// Excluded fields for a type.
    pub fn excluded_fields(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.excluded.get(type_name)
    }

    /// Whether `field` of `type_name` is excluded.
    pub fn is_excluded(&self, type_name: &str, field: &str) -> bool {
        self.excluded
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }

    /// True when no field of any type is excluded.
    pub fn is_empty(&self) -> bool {
        self.excluded.values().all(BTreeSet::is_empty)
    }

    /// Number of resolved types.
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    /// Total number of excluded fields across all types.
    pub fn excluded_count(&self) -> usize {
        self.excluded.values().map(BTreeSet::len).sum()
    }

    /// Iterate over `(type name, excluded fields)` in type-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.excluded
            .iter()
            .map(|(type_name, fields)| (type_name.as_str(), fields))
    }
}

impl<T, I, F> FromIterator<(T, I)> for FieldFilterSet
where
    T: Into<String>,
    I: IntoIterator<Item = F>,
    F: Into<String>,
{
    fn from_iter<It: IntoIterator<Item = (T, I)>>(iter: It) -> Self {
        let mut set = Self::empty();
        for (type_name, fields) in iter {
            set.excluded
                .entry(type_name.into())
                .or_default()
                .extend(fields.into_iter().map(Into::into));
        }
        set
    }
}
