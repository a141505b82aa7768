//! Error type shared by every cheddar module.

use std::path::PathBuf;

use thiserror::Error;

use crate::value::Kind;

/// Result alias used throughout cheddar.
pub type CheddarResult<T> = Result<T, CheddarError>;

/// Errors surfaced by the codec, the schema model and the instance.
#[derive(Debug, Error)]
pub enum CheddarError {
    /// Encoded bytes were truncated, garbled or carried an unknown kind tag.
    #[error("malformed value: {0}")]
    MalformedValue(String),
    /// More columns were attached than the table declared.
    #[error("schema full: table `{table}` declares {capacity} columns")]
    SchemaFull {
        /// Table being defined.
        table: String,
        /// Declared column capacity.
        capacity: usize,
    },
    /// A column with the same name is already attached.
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn {
        /// Table being defined.
        table: String,
        /// Offending column name.
        column: String,
    },
    /// The column name is not part of the table schema.
    #[error("no column `{column}` in table `{table}`")]
    NoColumnFound {
        /// Table that was searched.
        table: String,
        /// Column name that was requested.
        column: String,
    },
    /// A row value does not carry the kind its column declares.
    #[error("column `{column}` of table `{table}` expects {expected}, got {actual}")]
    ColumnTypeMismatch {
        /// Table the row targets.
        table: String,
        /// Column whose kind disagreed.
        column: String,
        /// Kind declared by the schema.
        expected: Kind,
        /// Kind carried by the value.
        actual: Kind,
    },
    /// A row carries a different number of values than the table has columns.
    #[error("table `{table}` has {expected} columns, row carries {actual} values")]
    RowWidthMismatch {
        /// Table the row targets.
        table: String,
        /// Number of columns in the schema.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A table or row key is absent from the store.
    #[error("not found: {0}")]
    NotFound(String),
    /// A table name, row id or store key does not have the expected shape.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// A value cannot be represented as JSON.
    #[error("json rendering failed: {0}")]
    Json(String),
    /// The backing store could not be opened.
    #[error("failed to open store at {}: {source}", .path.display())]
    StoreOpen {
        /// Directory handed to the store.
        path: PathBuf,
        /// Error reported by the store.
        #[source]
        source: sled::Error,
    },
    /// Any other store failure, propagated as reported.
    #[error("store error: {0}")]
    Store(#[from] sled::Error),
}

impl CheddarError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CheddarError::MalformedValue(msg.into())
    }
}
