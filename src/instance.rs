use std::sync::Arc;

use log::Level;

use crate::{
    cache::{CacheStats, ResolutionCache},
    error::{CheddarError, CheddarResult},
    id::{IdGenerator, UlidGenerator},
    key::{check_table_name, column_prefix, make_row_key, RowKey},
    logging::{cheddar_log, LogContext},
    option::InstanceOption,
    pool::BufferPool,
    row::{assemble_row, segment_row, RowSegment},
    schema::Table,
    store::{KvStore, SledStore},
    value::{Head, Value},
};

/// Entry point: tables, rows and column scans over one key-value store.
///
/// Schemas live under the table name; row segments live under
/// `table.column_index.row_id`. Schema and column lookups go through a shared
/// [`ResolutionCache`]; the store stays the source of truth.
pub struct Instance<S = SledStore> {
    store: S,
    cache: ResolutionCache,
    pool: BufferPool,
    ids: Arc<dyn IdGenerator>,
    log: LogContext,
}

impl Instance<SledStore> {
    /// Open or create the embedded store at `option.path`.
    pub fn open(option: InstanceOption) -> CheddarResult<Self> {
        let store = SledStore::open(&option)?;
        let created = !store.was_recovered();
        let path = option.path.clone();
        let instance = Self::with_store(store, option);
        cheddar_log!(
            Level::Info,
            ctx: &instance.log,
            "instance_open",
            "path={} created={}",
            path.display(),
            created
        );
        Ok(instance)
    }
}

impl<S: KvStore> Instance<S> {
    /// Build an instance over an already opened store.
    pub fn with_store(store: S, option: InstanceOption) -> Self {
        Self {
            store,
            cache: ResolutionCache::new(option.cache_capacity),
            pool: BufferPool::new(option.pooled_buffers),
            ids: Arc::new(UlidGenerator::new()),
            log: option.log_context,
        }
    }

    /// Replace the row id source.
    pub fn with_id_generator(self, ids: impl IdGenerator + 'static) -> Self {
        Instance {
            ids: Arc::new(ids),
            ..self
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hit and miss counters of the resolution cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Persist `table` under its name and refresh the cached schema.
    pub fn insert_table(&self, table: &Table) -> CheddarResult<()> {
        check_table_name(table.name())?;
        let mut buf = self.pool.acquire();
        table.encode_into(&mut buf);
        self.store.put(table.name().as_bytes(), &buf)?;
        self.cache.put_table(Arc::new(table.clone()));
        cheddar_log!(
            Level::Debug,
            ctx: &self.log,
            "table_inserted",
            "table={} columns={} bytes={}",
            table.name(),
            table.columns().len(),
            buf.len()
        );
        Ok(())
    }

    /// Load a schema, from the cache when possible.
    pub fn get_table(&self, name: &str) -> CheddarResult<Arc<Table>> {
        check_table_name(name)?;
        if let Some(table) = self.cache.get_table(name) {
            return Ok(table);
        }
        let bytes = self
            .store
            .get(name.as_bytes())?
            .ok_or_else(|| CheddarError::NotFound(format!("table `{name}`")))?;
        let table = Arc::new(Table::decode(&bytes)?);
        self.cache.put_table(table.clone());
        Ok(table)
    }

    /// Resolve a column name to its index within `table`.
    pub fn resolve_column(&self, table: &str, column: &str) -> CheddarResult<u16> {
        if let Some(index) = self.cache.get_column(table, column) {
            return Ok(index);
        }
        let schema = self.get_table(table)?;
        let index = schema
            .index_of(column)
            .ok_or_else(|| CheddarError::NoColumnFound {
                table: table.to_owned(),
                column: column.to_owned(),
            })?;
        self.cache.put_column(table, column, index);
        Ok(index)
    }

    /// Write one column value of one row and return the row id used.
    ///
    /// A fresh id is generated unless a non-empty `row_id` is supplied. The
    /// value is not checked against the schema, but keys that could not be
    /// read back are rejected.
    pub fn insert_row_segment(
        &self,
        table: &str,
        column_index: u64,
        value: &Value,
        row_id: Option<&str>,
    ) -> CheddarResult<String> {
        check_table_name(table)?;
        value.validate()?;
        let row_id = match row_id {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => self.ids.generate(),
        };
        let key = make_row_key(table, column_index, &row_id);
        let mut buf = self.pool.acquire();
        value.encode_into(&mut buf);
        self.store.put(key.as_bytes(), &buf)?;
        cheddar_log!(
            Level::Trace,
            ctx: &self.log,
            "segment_inserted",
            "key={} kind={}",
            key,
            value.kind()
        );
        Ok(row_id)
    }

    /// Fetch the segment stored under a raw `table.column_index.row_id` key.
    pub fn get_row_segment(&self, key: &[u8]) -> CheddarResult<RowSegment> {
        let row_key = RowKey::parse(key)?;
        let raw = self.store.get(key)?.ok_or_else(|| {
            CheddarError::NotFound(format!("row segment `{}`", String::from_utf8_lossy(key)))
        })?;
        RowSegment::from_stored(row_key, raw)
    }

    /// Insert a full row and return its freshly generated id.
    ///
    /// Every value is checked against its column before anything is written,
    /// and the segments are written as one atomic batch.
    pub fn insert_row(&self, table: &str, values: &[Value]) -> CheddarResult<String> {
        let schema = self.get_table(table)?;
        let row_id = self.ids.generate();
        let mut buf = self.pool.acquire();
        let encoded = segment_row(&schema, values, &row_id, &mut buf)?;
        let entries: Vec<(&[u8], &[u8])> = encoded
            .iter()
            .map(|(key, range)| (key.as_bytes(), &buf[range.clone()]))
            .collect();
        self.store.put_batch(&entries)?;
        let segments = entries.len();
        cheddar_log!(
            Level::Debug,
            ctx: &self.log,
            "row_inserted",
            "table={} row_id={} segments={}",
            table,
            row_id,
            segments
        );
        Ok(row_id)
    }

    /// All segments of one row, in column order.
    pub fn get_segments(&self, table: &str, row_id: &str) -> CheddarResult<Vec<RowSegment>> {
        if let Some(segments) = self.cache.get_segments(table, row_id) {
            return Ok(segments.to_vec());
        }
        let schema = self.get_table(table)?;
        let segments = (0..schema.columns().len() as u64)
            .map(|index| self.get_row_segment(make_row_key(table, index, row_id).as_bytes()))
            .collect::<CheddarResult<Vec<_>>>()?;
        self.cache
            .put_segments(table, row_id, Arc::from(segments.as_slice()));
        Ok(segments)
    }

    /// Decoded values of one row, in column order.
    pub fn get_row(&self, table: &str, row_id: &str) -> CheddarResult<Vec<Value>> {
        assemble_row(&self.get_segments(table, row_id)?)
    }

    /// Raw encoded values of one column across all rows, in store order.
    pub fn get_column(&self, table: &str, column: &str) -> CheddarResult<Vec<Vec<u8>>> {
        let index = self.resolve_column(table, column)?;
        let prefix = column_prefix(table, u64::from(index));
        let values = self
            .store
            .scan_prefix(prefix.as_bytes())
            .map(|entry| entry.map(|(_, value)| value))
            .collect::<CheddarResult<Vec<_>>>()?;
        cheddar_log!(
            Level::Debug,
            ctx: &self.log,
            "column_scanned",
            "table={} column={} index={} rows={}",
            table,
            column,
            index,
            values.len()
        );
        Ok(values)
    }

    /// Decoded values of one column, checked against its declared kind.
    pub fn get_column_values(&self, table: &str, column: &str) -> CheddarResult<Vec<Value>> {
        let schema = self.get_table(table)?;
        let expected = schema
            .column(column)
            .ok_or_else(|| CheddarError::NoColumnFound {
                table: table.to_owned(),
                column: column.to_owned(),
            })?
            .kind;
        self.get_column(table, column)?
            .iter()
            .map(|raw| -> CheddarResult<Value> {
                let (value, head) = Value::decode(raw)?;
                if head.kind != expected {
                    return Err(CheddarError::ColumnTypeMismatch {
                        table: table.to_owned(),
                        column: column.to_owned(),
                        expected,
                        actual: head.kind,
                    });
                }
                Ok(value)
            })
            .collect()
    }

    /// Log every entry in the store with its decoded head.
    ///
    /// Returns the number of entries visited. Meant for debugging only.
    pub fn trace(&self) -> CheddarResult<usize> {
        let mut visited = 0;
        for entry in self.store.scan_prefix(b"") {
            let (key, value) = entry?;
            visited += 1;
            match Head::decode_from(&value) {
                Ok((head, _)) => cheddar_log!(
                    Level::Debug,
                    ctx: &self.log,
                    "trace_entry",
                    "key={} kind={} size={}",
                    String::from_utf8_lossy(&key),
                    head.kind,
                    head.size
                ),
                Err(err) => cheddar_log!(
                    Level::Warn,
                    ctx: &self.log,
                    "trace_bad_head",
                    "key={} error={}",
                    String::from_utf8_lossy(&key),
                    err
                ),
            }
        }
        cheddar_log!(Level::Info, ctx: &self.log, "trace", "entries={}", visited);
        Ok(visited)
    }

    /// Make previous writes durable.
    pub fn flush(&self) -> CheddarResult<()> {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{schema::Column, value::Kind};

    fn instance(dir: &TempDir) -> Instance {
        Instance::open(InstanceOption::from(dir.path())).unwrap()
    }

    #[test]
    fn supplied_row_ids_are_kept() {
        let dir = TempDir::new().unwrap();
        let db = instance(&dir);
        let id = db
            .insert_row_segment("t", 0, &Value::Int64(1), Some("fixed"))
            .unwrap();
        assert_eq!(id, "fixed");
        let fresh = db
            .insert_row_segment("t", 0, &Value::Int64(2), Some(""))
            .unwrap();
        assert_ne!(fresh, "");

        let segment = db.get_row_segment(b"t.0.fixed").unwrap();
        assert_eq!(segment.key, RowKey::new("t", 0, "fixed"));
        assert_eq!(segment.head.kind, Kind::Int64);
        assert_eq!(segment.value().unwrap(), Value::Int64(1));
    }

    #[test]
    fn injected_ids_are_used() {
        let dir = TempDir::new().unwrap();
        let db = instance(&dir).with_id_generator(|| "r1".to_string());
        let table = Table::new("t", 1)
            .with_column(Column::new("c", Kind::Bool))
            .unwrap();
        db.insert_table(&table).unwrap();
        assert_eq!(db.insert_row("t", &[Value::Bool(true)]).unwrap(), "r1");
        assert_eq!(db.get_row("t", "r1").unwrap(), vec![Value::Bool(true)]);
    }

    #[test]
    fn bad_keys_and_names() {
        let dir = TempDir::new().unwrap();
        let db = instance(&dir);
        assert!(matches!(
            db.get_row_segment(b"nonsense"),
            Err(CheddarError::InvalidKey(_))
        ));
        assert!(matches!(
            db.get_row_segment(b"t.0.missing"),
            Err(CheddarError::NotFound(_))
        ));
        assert!(matches!(
            db.insert_table(&Table::new("a.b", 1)),
            Err(CheddarError::InvalidKey(_))
        ));
        assert!(matches!(db.get_table("nope"), Err(CheddarError::NotFound(_))));
    }

    #[test]
    fn unreadable_keys_are_never_written() {
        let dir = TempDir::new().unwrap();
        let db = instance(&dir).with_id_generator(|| "r1".to_string());
        let table = Table::new("refs", 1)
            .with_column(Column::new("target", Kind::Key))
            .unwrap();
        db.insert_table(&table).unwrap();

        let dotted = Value::Key(RowKey::new("a.b", 0, "x"));
        assert!(matches!(
            db.insert_row("refs", &[dotted.clone()]),
            Err(CheddarError::InvalidKey(_))
        ));
        assert!(matches!(
            db.insert_row_segment("refs", 0, &dotted, Some("r2")),
            Err(CheddarError::InvalidKey(_))
        ));
        assert_eq!(db.trace().unwrap(), 1);

        let target = Value::Key(RowKey::new("people", 2, "01hx"));
        db.insert_row("refs", &[target.clone()]).unwrap();
        assert_eq!(db.get_row("refs", "r1").unwrap(), vec![target.clone()]);
        assert_eq!(db.get_column_values("refs", "target").unwrap(), vec![target]);
        // Row encoding reuses the pooled scratch buffer.
        assert_eq!(db.pool.idle(), 1);
    }

    #[test]
    fn trace_counts_every_entry() {
        let dir = TempDir::new().unwrap();
        let db = instance(&dir);
        let table = Table::new("t", 2)
            .with_column(Column::new("a", Kind::Int64))
            .unwrap()
            .with_column(Column::new("b", Kind::String))
            .unwrap();
        db.insert_table(&table).unwrap();
        db.insert_row("t", &[Value::Int64(1), Value::from("x")])
            .unwrap();
        db.store().put(b"junk", b"??").unwrap();
        assert_eq!(db.trace().unwrap(), 4);
    }
}
