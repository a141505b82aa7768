use std::collections::HashMap;

use super::Column;
use crate::{
    error::{CheddarError, CheddarResult},
    value::{
        encoding::{take_bool, take_int64, take_string},
        Value,
    },
};

/// Byte terminating each column record inside a table record.
pub const COLUMN_TERMINATOR: u8 = b'\n';

/// Schema of a table: a fixed-capacity, ordered list of columns.
///
/// Columns receive their index when attached; `name_to_index` always mirrors
/// `cols[i].name -> i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    keyed: bool,
    capacity: usize,
    cols: Vec<Column>,
    name_to_index: HashMap<String, u16>,
}

impl Table {
    /// Create an empty table that can hold up to `capacity` columns.
    pub fn new(name: impl Into<String>, capacity: u16) -> Self {
        let capacity = usize::from(capacity);
        Self {
            name: name.into(),
            keyed: false,
            capacity,
            cols: Vec::with_capacity(capacity),
            name_to_index: HashMap::with_capacity(capacity),
        }
    }

    /// Mark the table as keyed.
    pub fn keyed(self, keyed: bool) -> Self {
        Table { keyed, ..self }
    }

    /// Attach `col` at the next free index and return that index.
    ///
    /// The table is left untouched when it is already full, the name is taken
    /// or the default value could not be read back.
    pub fn attach_column(&mut self, mut col: Column) -> CheddarResult<u16> {
        if self.cols.len() >= self.capacity {
            return Err(CheddarError::SchemaFull {
                table: self.name.clone(),
                capacity: self.capacity,
            });
        }
        if self.name_to_index.contains_key(&col.name) {
            return Err(CheddarError::DuplicateColumn {
                table: self.name.clone(),
                column: col.name,
            });
        }
        if let Some(default) = &col.default {
            default.validate()?;
        }
        // capacity is a u16, so the position always fits.
        let index = self.cols.len() as u16;
        col.index = index;
        self.name_to_index.insert(col.name.clone(), index);
        self.cols.push(col);
        Ok(index)
    }

    /// Builder form of [`Table::attach_column`].
    pub fn with_column(mut self, col: Column) -> CheddarResult<Self> {
        self.attach_column(col)?;
        Ok(self)
    }

    /// Table name, also its store key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the table is keyed.
    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    /// Declared column capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attached columns in index order.
    pub fn columns(&self) -> &[Column] {
        &self.cols
    }

    /// Column called `name`, if attached.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|idx| &self.cols[usize::from(idx)])
    }

    /// Index of the column called `name`, if attached.
    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.name_to_index.get(name).copied()
    }

    /// Serialize the schema.
    ///
    /// Layout: `[capacity][keyed][name]` as encoded values, then every column
    /// record followed by [`COLUMN_TERMINATOR`].
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        Value::Int64(self.capacity as i64).encode_into(buf);
        Value::Bool(self.keyed).encode_into(buf);
        Value::String(self.name.clone()).encode_into(buf);
        for col in &self.cols {
            col.encode_into(buf);
            buf.push(COLUMN_TERMINATOR);
        }
    }

    /// Serialize the schema into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Deserialize a schema written by [`Table::encode`].
    ///
    /// Column records are self-delimiting, so each one is decoded in place and
    /// must then be followed by the terminator byte. Binary fields may contain
    /// `0x0A` without confusing the framing. Indices are reassigned from decode
    /// order.
    pub fn decode(bytes: &[u8]) -> CheddarResult<Self> {
        let (count, rest) = take_int64(bytes)?;
        let capacity = u16::try_from(count)
            .map_err(|_| CheddarError::malformed(format!("column count {count} out of range")))?;
        let (keyed, rest) = take_bool(rest)?;
        let (name, mut rest) = take_string(rest)?;

        let mut table = Table::new(name, capacity).keyed(keyed);
        while !rest.is_empty() {
            let (col, tail) = Column::decode_from(rest)?;
            let Some((&terminator, tail)) = tail.split_first() else {
                return Err(CheddarError::malformed("column record terminator missing"));
            };
            if terminator != COLUMN_TERMINATOR {
                return Err(CheddarError::malformed(
                    "column record not followed by terminator",
                ));
            }
            table.attach_column(col).map_err(|err| match err {
                CheddarError::SchemaFull { .. } => {
                    CheddarError::malformed("more column records than declared")
                }
                CheddarError::DuplicateColumn { column, .. } => {
                    CheddarError::malformed(format!("column `{column}` recorded twice"))
                }
                other => other,
            })?;
            rest = tail;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    fn people() -> Table {
        Table::new("people", 4)
            .keyed(true)
            .with_column(Column::new("id", Kind::String).primary(true).not_null(true))
            .unwrap()
            .with_column(Column::new("age", Kind::Int64).default_value(18i64))
            .unwrap()
            .with_column(
                Column::new("score", Kind::Float64)
                    .default_value(0.5)
                    .size_bounds(0, 100),
            )
            .unwrap()
            .with_column(Column::new("active", Kind::Bool).default_value(true))
            .unwrap()
    }

    #[test]
    fn attach_assigns_dense_indices() {
        let table = people();
        for (i, col) in table.columns().iter().enumerate() {
            assert_eq!(usize::from(col.index()), i);
            assert_eq!(table.index_of(&col.name), Some(col.index()));
        }
        assert_eq!(table.column("score").unwrap().kind, Kind::Float64);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn attach_beyond_capacity_leaves_table_unmodified() {
        let mut table = people();
        let before = table.clone();
        let err = table
            .attach_column(Column::new("extra", Kind::Int64))
            .unwrap_err();
        assert!(matches!(err, CheddarError::SchemaFull { capacity: 4, .. }));
        assert_eq!(table, before);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut table = Table::new("t", 2);
        table.attach_column(Column::new("a", Kind::Int64)).unwrap();
        let err = table.attach_column(Column::new("a", Kind::Bool)).unwrap_err();
        assert!(matches!(err, CheddarError::DuplicateColumn { .. }));
        assert_eq!(table.columns().len(), 1);
    }

    #[test]
    fn unreadable_key_defaults_are_rejected() {
        let mut table = Table::new("t", 1);
        let col = Column::new("ref", Kind::Key)
            .default_value(Value::Key(crate::key::RowKey::new("a.b", 0, "x")));
        assert!(matches!(
            table.attach_column(col),
            Err(CheddarError::InvalidKey(_))
        ));
        assert!(table.columns().is_empty());
    }

    #[test]
    fn schema_round_trips() {
        let table = people();
        let decoded = Table::decode(&table.encode()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(
            decoded.column("age").unwrap().default,
            Some(Value::Int64(18))
        );
    }

    #[test]
    fn newline_bytes_inside_records_survive() {
        // Index 10 and a ten byte name both put 0x0A inside the record.
        let mut table = Table::new("wide", 12);
        for i in 0..11 {
            table
                .attach_column(Column::new(format!("column_{i:03}"), Kind::Int64))
                .unwrap();
        }
        table
            .attach_column(Column::new("multi\nline", Kind::String).default_value("a\nb"))
            .unwrap();
        let decoded = Table::decode(&table.encode()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn partially_filled_tables_keep_their_capacity() {
        let table = Table::new("sparse", 3)
            .with_column(Column::new("only", Kind::Bool))
            .unwrap();
        let decoded = Table::decode(&table.encode()).unwrap();
        assert_eq!(decoded.capacity(), 3);
        assert_eq!(decoded.columns().len(), 1);
    }

    #[test]
    fn persisted_indices_are_overridden() {
        let mut bytes = Vec::new();
        Value::Int64(1).encode_into(&mut bytes);
        Value::Bool(false).encode_into(&mut bytes);
        Value::from("t").encode_into(&mut bytes);
        let mut col = Column::new("c", Kind::Int64);
        col.index = 9;
        col.encode_into(&mut bytes);
        bytes.push(COLUMN_TERMINATOR);

        let table = Table::decode(&bytes).unwrap();
        assert_eq!(table.columns()[0].index(), 0);
        assert_eq!(table.index_of("c"), Some(0));
    }

    #[test]
    fn corrupt_records_are_errors() {
        let table = people();
        let bytes = table.encode();
        assert!(Table::decode(&bytes[..bytes.len() - 1]).is_err());

        let mut extra = bytes.clone();
        Column::new("fifth", Kind::Int64).encode_into(&mut extra);
        extra.push(COLUMN_TERMINATOR);
        assert!(matches!(
            Table::decode(&extra),
            Err(CheddarError::MalformedValue(_))
        ));

        assert!(Table::decode(&Value::from("people").encode()).is_err());
    }
}
