//! Central registry of per-type filter metadata.
//!
//! The registry holds one [`TypeDescriptor`] per type name. Descriptors are
//! registered once and never replaced. Every newly registered name bumps a
//! revision so mappers resolved before it can be detected as stale.

use crate::domain::descriptor::{Filterable, TypeDescriptor};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Registry managing all type descriptors.
///
/// Clones share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    by_name: Arc<DashMap<String, Arc<TypeDescriptor>>>,
    by_type: Arc<DashMap<TypeId, Arc<TypeDescriptor>>>,
    revision: Arc<AtomicU64>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the descriptor of a [`Filterable`] type.
    ///
    /// `T::descriptor()` runs at most once per Rust type.
    pub fn register<T: Filterable + 'static>(&self) -> Arc<TypeDescriptor> {
        let descriptor = self
            .by_type
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(T::descriptor()))
            .value()
            .clone();
        self.insert(descriptor)
    }

    /// Register a descriptor built by hand.
    ///
    /// The first descriptor registered under a type name is kept; later ones
    /// are dropped. Returns the retained descriptor.
    pub fn register_descriptor(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        self.insert(Arc::new(descriptor))
    }

    fn insert(&self, descriptor: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        let mut inserted = false;
        let retained = self
            .by_name
            .entry(descriptor.type_name().to_string())
            .or_insert_with(|| {
                inserted = true;
                Arc::clone(&descriptor)
            })
            .value()
            .clone();

        // Bumped only once the descriptor is visible to lookups
        if inserted {
            let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(
                type_name = descriptor.type_name(),
                fields = descriptor.fields().len(),
                revision,
                "registered type descriptor"
            );
        } else if !Arc::ptr_eq(&retained, &descriptor) {
            debug!(
                type_name = descriptor.type_name(),
                "type descriptor already registered, keeping the first"
            );
        }
        retained
    }

    /// Number of descriptors ever registered.
    ///
    /// Changes whenever a new type name is registered. A mapper resolved at
    /// an older revision may have walked a type that was unknown then.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Look up a descriptor by type name.
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_name.get(type_name).map(|entry| entry.value().clone())
    }

    /// Whether a type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_name.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
