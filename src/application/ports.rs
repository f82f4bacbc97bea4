//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::application::error::{EncodeError, FilterError};
use crate::domain::media_type::WireFormat;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;
use std::io;

/// Port for concurrent key-value storage.
///
/// This abstraction allows the application layer to cache values without
/// depending on a specific concurrent map. Values are handed out by clone,
/// so they are expected to be cheap handles such as `Arc`s.
/// Infrastructure provides the concrete implementation (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Get a copy of the value stored under `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Insert `value` unless an existing entry should be kept.
    ///
    /// The check and the write happen atomically with respect to other
    /// writers of the same key.
    ///
    /// # Arguments
    /// * `key` - The key to store under
    /// * `value` - The candidate value
    /// * `keep_existing` - Called with the current value, if any; returning
    ///   `true` keeps it and discards the candidate
    ///
    /// # Returns
    /// The value retained in storage
    fn insert_unless<F>(&self, key: K, value: V, keep_existing: F) -> V
    where
        F: FnOnce(&V) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for encoders that turn a document into bytes.
///
/// Base configurations and filtered mappers share this contract, so a
/// filtered mapper is a drop-in replacement for the base one.
pub trait Mapper: Send + Sync + Debug {
    /// Wire format produced.
    fn wire_format(&self) -> WireFormat;

    /// Encode a document into `out`.
    fn write_value(&self, value: Value, out: &mut dyn io::Write) -> Result<(), EncodeError>;

    /// Downcasting hook used to recognise mappers built by this crate.
    fn as_any(&self) -> &dyn Any;
}

/// Convenience methods for every [`Mapper`].
pub trait MapperExt: Mapper {
    /// Serialize any value and encode it.
    fn write_object<T>(&self, value: &T) -> Result<Vec<u8>, FilterError>
    where
        T: Serialize + ?Sized,
    {
        let document = serde_json::to_value(value)?;
        let mut out = Vec::new();
        self.write_value(document, &mut out)?;
        Ok(out)
    }
}

impl<M: Mapper + ?Sized> MapperExt for M {}
