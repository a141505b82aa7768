//! Resolution cache for schemas, column indices and row segment sets.
//!
//! [`TwoQueueCache`] implements the 2Q discipline: new keys land in a small
//! probationary `recent` queue and only move to the `frequent` queue on a second
//! access, so a one-off scan cannot flush entries that are reused. Keys evicted
//! from `recent` are remembered as ghosts; re-adding a ghost admits it straight
//! to `frequent`.
//!
//! [`ResolutionCache`] puts a 2Q cache behind a mutex and keys it by the hash of
//! a composite lookup string.

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use xxhash_rust::xxh64::xxh64;

use crate::{key::KEY_SEPARATOR, row::RowSegment, schema::Table};

/// Default number of resolved entries kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

const RECENT_RATIO: f64 = 0.25;
const GHOST_RATIO: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Recent,
    Frequent,
}

/// Capacity-bounded 2Q cache.
#[derive(Debug)]
pub struct TwoQueueCache<K, V> {
    capacity: usize,
    recent_target: usize,
    ghost_capacity: usize,
    entries: HashMap<K, (V, Tier)>,
    /// Probationary keys, oldest first.
    recent: VecDeque<K>,
    /// Protected keys, least recently used first.
    frequent: VecDeque<K>,
    /// Keys recently evicted from `recent`.
    ghosts: VecDeque<K>,
}

impl<K: Hash + Eq + Clone, V> TwoQueueCache<K, V> {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            recent_target: ((capacity as f64 * RECENT_RATIO) as usize).max(1),
            ghost_capacity: ((capacity as f64 * GHOST_RATIO) as usize).max(1),
            entries: HashMap::with_capacity(capacity),
            recent: VecDeque::new(),
            frequent: VecDeque::new(),
            ghosts: VecDeque::new(),
        }
    }

    /// Number of live entries; ghosts are not counted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no live entry is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of live entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up `key` without touching its recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Look up `key`, promoting a probationary hit to the frequent queue.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tier = self.entries.get(key)?.1;
        self.touch(key, tier);
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Insert or replace `key`, evicting per 2Q when full.
    pub fn add(&mut self, key: K, value: V) {
        if let Some((slot, tier)) = self.entries.get_mut(&key) {
            *slot = value;
            let tier = *tier;
            self.touch(&key, tier);
            return;
        }

        if let Some(pos) = self.ghosts.iter().position(|k| k == &key) {
            self.ghosts.remove(pos);
            self.ensure_space(true);
            self.frequent.push_back(key.clone());
            self.entries.insert(key, (value, Tier::Frequent));
            return;
        }

        self.ensure_space(false);
        self.recent.push_back(key.clone());
        self.entries.insert(key, (value, Tier::Recent));
    }

    /// Drop `key` and forget any ghost of it.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(pos) = self.ghosts.iter().position(|k| k == key) {
            self.ghosts.remove(pos);
        }
        let (value, tier) = self.entries.remove(key)?;
        let queue = match tier {
            Tier::Recent => &mut self.recent,
            Tier::Frequent => &mut self.frequent,
        };
        if let Some(pos) = queue.iter().position(|k| k == key) {
            queue.remove(pos);
        }
        Some(value)
    }

    fn touch(&mut self, key: &K, tier: Tier) {
        let queue = match tier {
            Tier::Recent => &mut self.recent,
            Tier::Frequent => &mut self.frequent,
        };
        let Some(pos) = queue.iter().position(|k| k == key) else {
            return;
        };
        let Some(k) = queue.remove(pos) else {
            return;
        };
        self.frequent.push_back(k);
        if let Some(entry) = self.entries.get_mut(key) {
            entry.1 = Tier::Frequent;
        }
    }

    fn ensure_space(&mut self, ghost_hit: bool) {
        if self.entries.len() < self.capacity {
            return;
        }
        let recent_len = self.recent.len();
        let prefer_recent = recent_len > 0
            && (recent_len > self.recent_target
                || (recent_len == self.recent_target && !ghost_hit)
                || self.frequent.is_empty());
        if prefer_recent {
            if let Some(key) = self.recent.pop_front() {
                self.entries.remove(&key);
                if self.ghosts.len() >= self.ghost_capacity {
                    self.ghosts.pop_front();
                }
                self.ghosts.push_back(key);
            }
        } else if let Some(key) = self.frequent.pop_front() {
            self.entries.remove(&key);
        }
    }
}

/// Metadata resolved from the store and kept in the cache.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Decoded table schema.
    Table(Arc<Table>),
    /// Index of a column within its table.
    Column(u16),
    /// Ordered segments of one row.
    Segments(Arc<[RowSegment]>),
}

/// Snapshot of cache lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by the cache.
    pub hits: u64,
    /// Lookups that fell through to the store.
    pub misses: u64,
}

/// Thread-safe cache keyed by hashed lookup strings.
pub struct ResolutionCache {
    inner: Mutex<TwoQueueCache<u64, CacheEntry>>,
    hasher: fn(&[u8]) -> u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// xxHash64 with a zero seed.
pub fn default_hash(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

impl ResolutionCache {
    /// Create a cache of `capacity` entries keyed by [`default_hash`].
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, default_hash)
    }

    /// Create a cache using `hasher` to key the composite lookup strings.
    pub fn with_hasher(capacity: usize, hasher: fn(&[u8]) -> u64) -> Self {
        Self {
            inner: Mutex::new(TwoQueueCache::new(capacity)),
            hasher,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Hash of `"c" + table`.
    pub fn table_key(&self, table: &str) -> u64 {
        self.hash(&format!("c{table}"))
    }

    /// Hash of `table + "." + column`.
    pub fn column_key(&self, table: &str, column: &str) -> u64 {
        self.hash(&format!("{table}{KEY_SEPARATOR}{column}"))
    }

    /// Hash of `table + "." + row_id`.
    pub fn segments_key(&self, table: &str, row_id: &str) -> u64 {
        self.hash(&format!("{table}{KEY_SEPARATOR}{row_id}"))
    }

    fn hash(&self, composite: &str) -> u64 {
        (self.hasher)(composite.as_bytes())
    }

    /// Whether `hash` is cached, without counting a lookup.
    pub fn contains(&self, hash: u64) -> bool {
        self.inner.lock().contains(&hash)
    }

    /// Look up any entry under `hash`, counting a hit or a miss.
    pub fn get(&self, hash: u64) -> Option<CacheEntry> {
        self.lookup(hash, |entry| Some(entry.clone()))
    }

    /// Count a hit and promote only when `pick` accepts the cached entry.
    fn lookup<T>(&self, hash: u64, pick: impl FnOnce(&CacheEntry) -> Option<T>) -> Option<T> {
        let mut inner = self.inner.lock();
        let found = inner.peek(&hash).and_then(pick);
        let counter = if found.is_some() {
            inner.get(&hash);
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert or replace the entry under `hash`.
    pub fn add(&self, hash: u64, entry: CacheEntry) {
        self.inner.lock().add(hash, entry);
    }

    /// Drop the entry under `hash`.
    pub fn remove(&self, hash: u64) -> Option<CacheEntry> {
        self.inner.lock().remove(&hash)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit and miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Cached schema of `table`.
    pub fn get_table(&self, table: &str) -> Option<Arc<Table>> {
        self.lookup(self.table_key(table), |entry| match entry {
            CacheEntry::Table(schema) => Some(schema.clone()),
            _ => None,
        })
    }

    /// Replace the cached schema of `table`.
    pub fn put_table(&self, schema: Arc<Table>) {
        let key = self.table_key(schema.name());
        let mut inner = self.inner.lock();
        inner.remove(&key);
        inner.add(key, CacheEntry::Table(schema));
    }

    /// Cached index of `column` within `table`.
    pub fn get_column(&self, table: &str, column: &str) -> Option<u16> {
        self.lookup(self.column_key(table, column), |entry| match entry {
            CacheEntry::Column(index) => Some(*index),
            _ => None,
        })
    }

    /// Remember the index of `column` within `table`.
    pub fn put_column(&self, table: &str, column: &str, index: u16) {
        self.add(self.column_key(table, column), CacheEntry::Column(index));
    }

    /// Cached segments of one row.
    pub fn get_segments(&self, table: &str, row_id: &str) -> Option<Arc<[RowSegment]>> {
        self.lookup(self.segments_key(table, row_id), |entry| match entry {
            CacheEntry::Segments(segments) => Some(segments.clone()),
            _ => None,
        })
    }

    /// Remember the segments of one row.
    pub fn put_segments(&self, table: &str, row_id: &str, segments: Arc<[RowSegment]>) {
        self.add(
            self.segments_key(table, row_id),
            CacheEntry::Segments(segments),
        );
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
