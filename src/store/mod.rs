//! The ordered key-value store underneath an instance.
//!
//! Any store offering point reads and writes, atomic batches and prefix-ordered
//! iteration can back an [`Instance`](crate::Instance). [`SledStore`] is the
//! embedded implementation used by [`Instance::open`](crate::Instance::open).

mod sled_store;

pub use sled_store::SledStore;

use crate::error::CheddarResult;

/// A key and its value as read from the store.
pub type KvEntry = (Vec<u8>, Vec<u8>);

/// Iterator over store entries in key order.
///
/// Dropping the iterator releases any store-side resources.
pub type KvIter<'a> = Box<dyn Iterator<Item = CheddarResult<KvEntry>> + 'a>;

/// Ordered key-value store seam.
///
/// Implementations must be safe to call from several threads at once.
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`.
    fn get(&self, key: &[u8]) -> CheddarResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> CheddarResult<()>;

    /// Store every `(key, value)` pair, or none of them.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> CheddarResult<()>;

    /// Iterate every entry whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> KvIter<'_>;

    /// Make previous writes durable.
    fn flush(&self) -> CheddarResult<()>;
}
