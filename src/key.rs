//! Store keys addressing a single row segment.
//!
//! A segment lives under `table.column_index.row_id`. Table names never contain
//! the separator, so the first two separators always delimit the triple and the
//! row id may carry further dots.

use std::fmt;

use crate::error::{CheddarError, CheddarResult};

/// Separator between the parts of a row key.
pub const KEY_SEPARATOR: char = '.';

/// Key of one row segment in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    /// Owning table.
    pub table: String,
    /// Column index within the table.
    pub column_index: u64,
    /// Opaque id shared by all segments of a row.
    pub row_id: String,
}

impl RowKey {
    /// Build a key from its parts without validating them.
    ///
    /// See [`RowKey::validate`] for the shape a stored key must have.
    pub fn new(table: impl Into<String>, column_index: u64, row_id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column_index,
            row_id: row_id.into(),
        }
    }

    /// Parse `table.column_index.row_id`.
    pub fn parse(bytes: &[u8]) -> CheddarResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CheddarError::InvalidKey("row key is not valid utf-8".into()))?;
        let mut parts = text.splitn(3, KEY_SEPARATOR);
        let (Some(table), Some(column), Some(row_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CheddarError::InvalidKey(format!(
                "`{text}` is not table.column.row_id"
            )));
        };
        if table.is_empty() || row_id.is_empty() {
            return Err(CheddarError::InvalidKey(format!(
                "`{text}` has an empty table or row id"
            )));
        }
        let column_index = column.parse::<u64>().map_err(|_| {
            CheddarError::InvalidKey(format!("`{text}` has a non-numeric column index"))
        })?;
        Ok(Self::new(table, column_index, row_id))
    }

    /// Check that the key reads back unchanged through [`RowKey::parse`].
    pub fn validate(&self) -> CheddarResult<()> {
        check_table_name(&self.table)?;
        if self.row_id.is_empty() {
            return Err(CheddarError::InvalidKey(format!("`{self}` has an empty row id")));
        }
        Ok(())
    }

    pub(crate) fn encoded_len(&self) -> usize {
        let mut digits = 1;
        let mut n = self.column_index;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        self.table.len() + 1 + digits + 1 + self.row_id.len()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.table, self.column_index, self.row_id
        )
    }
}

/// Format the store key of one row segment.
pub fn make_row_key(table: &str, column_index: u64, row_id: &str) -> String {
    format!("{table}{KEY_SEPARATOR}{column_index}{KEY_SEPARATOR}{row_id}")
}

/// Prefix shared by every segment of one column.
///
/// The trailing separator keeps column 1 from matching columns 10 and up.
pub fn column_prefix(table: &str, column_index: u64) -> String {
    format!("{table}{KEY_SEPARATOR}{column_index}{KEY_SEPARATOR}")
}

/// Reject table names that would make row keys ambiguous.
pub(crate) fn check_table_name(name: &str) -> CheddarResult<()> {
    if name.is_empty() {
        return Err(CheddarError::InvalidKey("table name is empty".into()));
    }
    if name.contains(KEY_SEPARATOR) {
        return Err(CheddarError::InvalidKey(format!(
            "table name `{name}` contains `{KEY_SEPARATOR}`"
        )));
    }
    Ok(())
}
