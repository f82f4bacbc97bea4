//! Filter rule resolution.
//!
//! Walks the type graph reachable from a root type and decides, per field,
//! whether it is serialized in the given call context. The outcome is a
//! [`FieldFilterSet`] listing the excluded fields of every visited type.
//!
//! Field decisions are made in priority order:
//! 1. the always-exclude marker excludes the field;
//! 2. conditional markers exclude the field as soon as one is false;
//! 3. dynamic field lists targeting the type: with an include list present an
//!    unlisted field is excluded, and an exclude list naming the field
//!    excludes it;
//! 4. otherwise the field is included.

use crate::application::registry::DescriptorRegistry;
use crate::domain::context::{CallContext, Relevance};
use crate::domain::descriptor::TypeDescriptor;
use crate::domain::filter_set::FieldFilterSet;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Caller-supplied include and exclude lists, grouped by target type.
#[derive(Debug, Default)]
struct FieldLists<'a> {
    include: HashMap<&'a str, BTreeSet<&'a str>>,
    exclude: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> FieldLists<'a> {
    fn collect(root: &'a str, ctx: &'a CallContext) -> Self {
        let mut lists = Self::default();
        for argument in ctx.arguments() {
            let (target, names) = match argument.relevance() {
                Relevance::IncludeList(target) => (target, &mut lists.include),
                Relevance::ExcludeList(target) => (target, &mut lists.exclude),
                Relevance::Ignored | Relevance::Relevant => continue,
            };
            let fields = argument.field_names();
            // A list naming nothing does not restrict the type.
            if fields.is_empty() {
                continue;
            }
            names
                .entry(target.type_name(root))
                .or_default()
                .extend(fields);
        }
        lists
    }

    fn excludes(&self, type_name: &str, field: &str) -> bool {
        let not_included = self
            .include
            .get(type_name)
            .is_some_and(|listed| !listed.contains(field));
        let excluded = self
            .exclude
            .get(type_name)
            .is_some_and(|listed| listed.contains(field));
        not_included || excluded
    }
}

/// Resolves per-type field exclusions for a call context.
#[derive(Debug, Clone)]
pub struct FilterRuleResolver {
    registry: DescriptorRegistry,
}

impl FilterRuleResolver {
    /// Create a resolver reading descriptors from `registry`.
    pub fn new(registry: DescriptorRegistry) -> Self {
        Self { registry }
    }

    /// Registry the resolver reads from.
    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Resolve exclusions starting from the context's declared return type.
    pub fn resolve(&self, ctx: &CallContext) -> FieldFilterSet {
        self.resolve_type(ctx.return_type(), ctx)
    }

    /// Resolve exclusions starting from `root`.
    ///
    /// Every type reachable through included nested fields is resolved
    /// exactly once, so cyclic type graphs terminate.
    pub fn resolve_type(&self, root: &str, ctx: &CallContext) -> FieldFilterSet {
        let lists = FieldLists::collect(root, ctx);
        let mut set = FieldFilterSet::empty();
        self.walk(root, ctx, &lists, &mut set);
        set
    }

    fn walk(
        &self,
        type_name: &str,
        ctx: &CallContext,
        lists: &FieldLists<'_>,
        set: &mut FieldFilterSet,
    ) {
        if set.covers(type_name) {
            trace!(type_name, "type already resolved, skipping");
            return;
        }

        let Some(descriptor) = self.registry.get(type_name) else {
            set.record_type(type_name, BTreeSet::new());
            return;
        };

        let excluded = Self::exclusions(&descriptor, ctx, lists);
        let nested: Vec<&str> = descriptor
            .fields()
            .iter()
            .filter(|field| !excluded.contains(field.name()))
            .filter_map(|field| field.nested_type())
            .collect();

        // Recorded before descending so cycles back to this type stop here.
        set.record_type(type_name, excluded);

        for nested_type in nested {
            self.walk(nested_type, ctx, lists, set);
        }
    }

    fn exclusions(
        descriptor: &TypeDescriptor,
        ctx: &CallContext,
        lists: &FieldLists<'_>,
    ) -> BTreeSet<String> {
        descriptor
            .fields()
            .iter()
            .filter(|field| {
                field.decide(ctx).is_exclude()
                    || lists.excludes(descriptor.type_name(), field.name())
            })
            .map(|field| field.name().to_string())
            .collect()
    }
}
