use sled::{Batch, Config, Db};

use super::{KvIter, KvStore};
use crate::{
    error::{CheddarError, CheddarResult},
    option::InstanceOption,
};

/// [`KvStore`] backed by an embedded sled database.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the database described by `option`.
    pub fn open(option: &InstanceOption) -> CheddarResult<Self> {
        let db = Config::new()
            .path(&option.path)
            .cache_capacity(option.store_cache_bytes)
            .flush_every_ms(option.flush_every_ms)
            .temporary(option.temporary)
            .open()
            .map_err(|source| CheddarError::StoreOpen {
                path: option.path.clone(),
                source,
            })?;
        Ok(Self { db })
    }

    /// Whether the database already existed on disk.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// The underlying sled database.
    pub fn db(&self) -> &Db {
        &self.db
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> CheddarResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CheddarResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> CheddarResult<()> {
        let mut batch = Batch::default();
        for &(key, value) in entries {
            batch.insert(key, value);
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvIter<'_> {
        Box::new(self.db.scan_prefix(prefix).map(|entry| {
            entry
                .map(|(key, value)| (key.to_vec(), value.to_vec()))
                .map_err(CheddarError::from)
        }))
    }

    fn flush(&self) -> CheddarResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
