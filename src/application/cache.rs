//! Cache of filtered mappers keyed by context fingerprint.
//!
//! The first serialization in a filtering context resolves the exclusions
//! and builds a [`ConfiguredSerializer`]; later serializations in an equal
//! context reuse it. Entries are never evicted. An entry built from a base
//! configuration or serialization options that have since been replaced, or
//! resolved before another type descriptor was registered, is stale and gets
//! rebuilt on its next lookup.
//!
//! Concurrent first use of a fingerprint may build more than once. Exactly
//! one result is retained and every caller gets that retained value.

use crate::application::configuration::FilterConfiguration;
use crate::application::error::FilterError;
use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::resolver::FilterRuleResolver;
use crate::domain::context::CallContext;
use crate::domain::fingerprint::ContextFingerprint;
use crate::domain::media_type::MediaType;
use crate::infrastructure::mapper::{ConfiguredSerializer, MapperBuilder};
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use tracing::{debug, trace};

/// A built mapper together with the revisions it was built from.
#[derive(Debug)]
pub struct CachedMapper {
    serializer: Arc<ConfiguredSerializer>,
    base_revision: u64,
    options_revision: u64,
    registry_revision: u64,
}

impl CachedMapper {
    /// The cached serializer.
    pub fn serializer(&self) -> &Arc<ConfiguredSerializer> {
        &self.serializer
    }

    /// Revision of the base configuration the serializer was built from.
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    /// Revision of the serialization options the serializer was built with.
    pub fn options_revision(&self) -> u64 {
        self.options_revision
    }

    /// Descriptor registry revision the exclusions were resolved at.
    pub fn registry_revision(&self) -> u64 {
        self.registry_revision
    }
}

/// Default storage backend for the cache.
pub type MapperStorage = ShardedStorage<ContextFingerprint, Arc<CachedMapper>>;

/// Mapper cache.
///
/// Generic over the storage implementation; [`MapperCache::new`] uses
/// [`ShardedStorage`].
#[derive(Debug)]
pub struct MapperCache<S = MapperStorage>
where
    S: Storage<ContextFingerprint, Arc<CachedMapper>>,
{
    storage: S,
    configuration: Arc<FilterConfiguration>,
    resolver: FilterRuleResolver,
    metrics: Metrics,
}

impl MapperCache {
    /// Create a cache backed by sharded in-memory storage.
    pub fn new(configuration: Arc<FilterConfiguration>, resolver: FilterRuleResolver) -> Self {
        Self::with_storage(MapperStorage::new(), configuration, resolver, Metrics::new())
    }
}

impl<S> MapperCache<S>
where
    S: Storage<ContextFingerprint, Arc<CachedMapper>>,
{
    /// Create a cache with a custom storage backend and metrics tracker.
    pub fn with_storage(
        storage: S,
        configuration: Arc<FilterConfiguration>,
        resolver: FilterRuleResolver,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            configuration,
            resolver,
            metrics,
        }
    }

    /// Find or build the serializer for a call context.
    pub fn find_or_build(
        &self,
        ctx: &CallContext,
    ) -> Result<Arc<ConfiguredSerializer>, FilterError> {
        self.find_or_build_for(ctx.fingerprint(), ctx)
    }

    /// Find or build the serializer for an already computed fingerprint.
    ///
    /// `ctx` must be the context `fingerprint` was computed from; it is only
    /// read on a miss.
    ///
    /// # Errors
    /// Returns [`FilterError::ConfigurationMissing`] when no base
    /// configuration is registered for the fingerprint's media type.
    pub fn find_or_build_for(
        &self,
        fingerprint: ContextFingerprint,
        ctx: &CallContext,
    ) -> Result<Arc<ConfiguredSerializer>, FilterError> {
        let stale = match self.storage.get(&fingerprint) {
            Some(entry) if self.is_current(fingerprint.media_type(), &entry) => {
                self.metrics.record_hit();
                trace!(fingerprint = %fingerprint, "mapper cache hit");
                return Ok(Arc::clone(&entry.serializer));
            }
            Some(_) => true,
            None => false,
        };
        self.metrics.record_miss();

        let candidate = Arc::new(self.build(&fingerprint, ctx)?);
        self.metrics.record_build();
        if stale {
            self.metrics.record_stale_rebuild();
        }

        let media_type = fingerprint.media_type().clone();
        let retained = self.storage.insert_unless(fingerprint, candidate, |existing| {
            self.is_current(&media_type, existing)
        });
        Ok(Arc::clone(&retained.serializer))
    }

    fn build(
        &self,
        fingerprint: &ContextFingerprint,
        ctx: &CallContext,
    ) -> Result<CachedMapper, FilterError> {
        let media_type = fingerprint.media_type();
        let base = self
            .configuration
            .lookup(media_type)
            .ok_or_else(|| FilterError::ConfigurationMissing(media_type.clone()))?;
        let (options, options_revision) = self.configuration.serialization_snapshot();

        // Read before resolving: a type registered mid-build leaves the entry stale
        let registry_revision = self.resolver.registry().revision();
        let filters = self.resolver.resolve(ctx);
        debug!(
            fingerprint = %fingerprint,
            base = %base.registered_as,
            excluded = filters.excluded_count(),
            "building filtered mapper"
        );

        let serializer = MapperBuilder::new(&base.config)
            .with_filter_fields(filters)
            .with_serialization_config(options)
            .with_root_type(ctx.return_type())
            .with_descriptors(self.resolver.registry().clone())
            .build();

        Ok(CachedMapper {
            serializer: Arc::new(serializer),
            base_revision: base.revision,
            options_revision,
            registry_revision,
        })
    }

    fn is_current(&self, media_type: &MediaType, entry: &CachedMapper) -> bool {
        self.configuration.resolved_revision(media_type) == Some(entry.base_revision)
            && self.configuration.serialization_revision() == entry.options_revision
            && self.resolver.registry().revision() == entry.registry_revision
    }

    /// Cached serializer for a fingerprint, if one was built.
    pub fn get(&self, fingerprint: &ContextFingerprint) -> Option<Arc<ConfiguredSerializer>> {
        self.storage
            .get(fingerprint)
            .map(|entry| Arc::clone(&entry.serializer))
    }

    /// Number of cached mappers.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drop every cached mapper.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Drop the mappers built for a media type. Returns how many were dropped.
    pub fn invalidate_media_type(&self, media_type: &MediaType) -> usize {
        let mut dropped = 0;
        self.storage.retain(|fingerprint, _| {
            let keep = fingerprint.media_type() != media_type;
            if !keep {
                dropped += 1;
            }
            keep
        });
        debug!(media_type = %media_type, dropped, "invalidated cached mappers");
        dropped
    }

    /// Cache metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the cache builds from.
    pub fn configuration(&self) -> &Arc<FilterConfiguration> {
        &self.configuration
    }

    /// Resolver used on cache misses.
    pub fn resolver(&self) -> &FilterRuleResolver {
        &self.resolver
    }
}
