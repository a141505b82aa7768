#![deny(missing_docs)]
//! Typed tables over an embedded ordered key-value store.
//!
//! A [`Table`] describes named, typed [`Column`]s. Rows are split into one
//! store entry per column, keyed `table.column_index.row_id`, so a single
//! column can be scanned across every row by key prefix without touching the
//! other columns. Values use a compact tagged encoding (see [`value`]).
//!
//! ```no_run
//! use cheddar::{Column, Instance, InstanceOption, Kind, Table, Value};
//!
//! # fn main() -> cheddar::CheddarResult<()> {
//! let db = Instance::open(InstanceOption::from("db"))?;
//! let people = Table::new("people", 2)
//!     .with_column(Column::new("name", Kind::String))?
//!     .with_column(Column::new("age", Kind::Int64))?;
//! db.insert_table(&people)?;
//!
//! let row_id = db.insert_row("people", &[Value::from("ada"), Value::from(36i64)])?;
//! let ages = db.get_column_values("people", "age")?;
//! # let _ = (row_id, ages);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod id;
mod instance;
pub mod key;
mod logging;
pub mod option;
pub mod pool;
pub mod row;
pub mod schema;
pub mod store;
pub mod value;

pub use crate::{
    error::{CheddarError, CheddarResult},
    id::{IdGenerator, UlidGenerator},
    instance::Instance,
    key::{make_row_key, RowKey},
    logging::LogContext,
    option::InstanceOption,
    row::RowSegment,
    schema::{Column, Table},
    store::{KvStore, SledStore},
    value::{Head, Kind, Value},
};
