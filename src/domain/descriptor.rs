//! Declarative per-type filter metadata.
//!
//! Each serializable type is described once by a [`TypeDescriptor`]: its
//! fields, the filter markers on them and the types of nested fields. The
//! descriptor is a side table registered up front; nothing is discovered at
//! runtime.

use crate::domain::context::CallContext;
use crate::domain::predicate::{FieldDecision, FieldPredicate, Predicate};

/// Filter metadata for one field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    always_exclude: bool,
    conditions: Vec<Predicate>,
    nested: Option<String>,
}

impl FieldDescriptor {
    /// A plain field with no markers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            always_exclude: false,
            conditions: Vec::new(),
            nested: None,
        }
    }

    /// Mark the field as never serialized.
    pub fn always_exclude(mut self) -> Self {
        self.always_exclude = true;
        self
    }

    /// Serialize the field only when `predicate` holds.
    ///
    /// Several conditions must all hold.
    pub fn include_when(mut self, predicate: Predicate) -> Self {
        self.conditions.push(predicate);
        self
    }

    /// Serialize the field only for principals holding `role`.
    pub fn role_gated(self, role: impl Into<String>) -> Self {
        self.include_when(Predicate::has_role(role))
    }

    /// Declare the field's value (or each element of a list value) as an
    /// instance of `type_name`.
    pub fn nested(mut self, type_name: impl Into<String>) -> Self {
        self.nested = Some(type_name.into());
        self
    }

    /// Field name as it appears in the serialized document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field carries the always-exclude marker.
    pub fn is_always_excluded(&self) -> bool {
        self.always_exclude
    }

    /// Conditional markers.
    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    /// Nested type name.
    pub fn nested_type(&self) -> Option<&str> {
        self.nested.as_deref()
    }

    /// Whether the field carries any filter marker.
    pub fn has_markers(&self) -> bool {
        self.always_exclude || !self.conditions.is_empty()
    }

    /// Apply the field's own markers.
    ///
    /// Always-exclude wins over conditional markers; a conditional field is
    /// excluded as soon as one predicate is false.
    pub fn decide(&self, ctx: &CallContext) -> FieldDecision {
        if self.always_exclude {
            return FieldDecision::Exclude;
        }

        if self
            .conditions
            .iter()
            .all(|predicate| predicate.evaluate(ctx, &self.name))
        {
            FieldDecision::Include
        } else {
            FieldDecision::Exclude
        }
    }
}

/// Filter metadata for one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Describe a type by name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field. A later field with the same name replaces the earlier one.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Add several unmarked fields.
    pub fn plain_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.field(FieldDescriptor::new(name));
        }
        self
    }

    /// Type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a declared field.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether any field carries a marker.
    pub fn has_markers(&self) -> bool {
        self.fields.iter().any(FieldDescriptor::has_markers)
    }

    /// Types reachable through nested fields.
    pub fn nested_types(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(FieldDescriptor::nested_type)
    }
}

/// Types that carry their own filter metadata.
///
/// # Example
/// ```
/// use field_filter::{FieldDescriptor, Filterable, TypeDescriptor};
///
/// struct User;
///
/// impl Filterable for User {
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::new("User")
///             .plain_fields(["id", "name"])
///             .field(FieldDescriptor::new("password").always_exclude())
///     }
/// }
///
/// assert!(User::descriptor().has_markers());
/// ```
pub trait Filterable {
    /// Build the descriptor. Called once per type by the registry.
    fn descriptor() -> TypeDescriptor;
}
