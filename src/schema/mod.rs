//! Table schemas and their on-store records.

mod column;
mod table;

pub use column::Column;
pub use table::{Table, COLUMN_TERMINATOR};
