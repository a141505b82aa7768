//! Columnar decomposition of logical rows.
//!
//! A row with `n` values becomes `n` independent store entries keyed
//! `table.i.row_id`, each holding the encoded value of column `i`.

use std::ops::Range;

use serde_json::Number;

use crate::{
    error::{CheddarError, CheddarResult},
    key::{make_row_key, RowKey},
    schema::Table,
    value::{Head, Value},
};

/// One column's encoded value for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSegment {
    /// Store key the segment lives under.
    pub key: RowKey,
    /// Framing of `raw_value`.
    pub head: Head,
    /// Encoded value, head included.
    pub raw_value: Vec<u8>,
}

impl RowSegment {
    /// Build a segment from its key and stored bytes.
    pub fn from_stored(key: RowKey, raw_value: Vec<u8>) -> CheddarResult<Self> {
        let (head, _) = Head::decode_from(&raw_value)?;
        Ok(Self {
            key,
            head,
            raw_value,
        })
    }

    /// Decode the stored value.
    pub fn value(&self) -> CheddarResult<Value> {
        Value::decode(&self.raw_value).map(|(value, _)| value)
    }

    /// Render the stored value as JSON.
    pub fn to_json(&self) -> CheddarResult<serde_json::Value> {
        Ok(match self.value()? {
            Value::Null => serde_json::Value::Null,
            Value::String(v) => serde_json::Value::String(v),
            Value::Int64(v) => serde_json::Value::Number(v.into()),
            Value::Float64(v) => Number::from_f64(v)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    CheddarError::Json(format!("{v} has no json representation"))
                })?,
            Value::Bool(v) => serde_json::Value::Bool(v),
            Value::Key(key) => serde_json::Value::String(key.to_string()),
        })
    }
}

/// Validate `values` against `table` and encode them into `buf`.
///
/// Returns the store key of every column together with the range of `buf`
/// holding its encoded value. Nothing is appended unless every value matches
/// its column, so callers can write the result as a unit.
pub fn segment_row(
    table: &Table,
    values: &[Value],
    row_id: &str,
    buf: &mut Vec<u8>,
) -> CheddarResult<Vec<(String, Range<usize>)>> {
    let cols = table.columns();
    if values.len() != cols.len() {
        return Err(CheddarError::RowWidthMismatch {
            table: table.name().to_owned(),
            expected: cols.len(),
            actual: values.len(),
        });
    }
    for (col, value) in cols.iter().zip(values) {
        if col.kind != value.kind() {
            return Err(CheddarError::ColumnTypeMismatch {
                table: table.name().to_owned(),
                column: col.name.clone(),
                expected: col.kind,
                actual: value.kind(),
            });
        }
        value.validate()?;
    }

    Ok(cols
        .iter()
        .zip(values)
        .map(|(col, value)| {
            let start = buf.len();
            value.encode_into(buf);
            (
                make_row_key(table.name(), u64::from(col.index()), row_id),
                start..buf.len(),
            )
        })
        .collect())
}

/// Decode the values of an ordered set of segments.
pub fn assemble_row(segments: &[RowSegment]) -> CheddarResult<Vec<Value>> {
    segments.iter().map(RowSegment::value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::Column, value::Kind};

    fn table() -> Table {
        Table::new("pets", 3)
            .with_column(Column::new("name", Kind::String))
            .unwrap()
            .with_column(Column::new("age", Kind::Int64))
            .unwrap()
            .with_column(Column::new("weight", Kind::Float64))
            .unwrap()
    }

    #[test]
    fn segments_one_entry_per_column() {
        let values = vec![Value::from("rex"), Value::Int64(4), Value::Float64(12.5)];
        let mut buf = Vec::new();
        let entries = segment_row(&table(), &values, "r1", &mut buf).unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["pets.0.r1", "pets.1.r1", "pets.2.r1"]);
        assert_eq!(entries.last().map(|(_, range)| range.end), Some(buf.len()));
        for ((_, range), value) in entries.iter().zip(&values) {
            assert_eq!(&Value::decode(&buf[range.clone()]).unwrap().0, value);
        }
    }

    #[test]
    fn late_mismatch_produces_nothing() {
        let values = vec![Value::from("rex"), Value::Int64(4), Value::from("heavy")];
        let mut buf = Vec::new();
        let err = segment_row(&table(), &values, "r1", &mut buf).unwrap_err();
        assert!(buf.is_empty());
        match err {
            CheddarError::ColumnTypeMismatch {
                column,
                expected,
                actual,
                ..
            } => {
                assert_eq!(column, "weight");
                assert_eq!(expected, Kind::Float64);
                assert_eq!(actual, Kind::String);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn width_must_match() {
        let mut buf = Vec::new();
        let err = segment_row(&table(), &[Value::from("rex")], "r1", &mut buf).unwrap_err();
        assert!(matches!(
            err,
            CheddarError::RowWidthMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn unreadable_keys_produce_nothing() {
        let refs = Table::new("refs", 2)
            .with_column(Column::new("name", Kind::String))
            .unwrap()
            .with_column(Column::new("target", Kind::Key))
            .unwrap();
        let mut buf = Vec::new();
        for target in [RowKey::new("a.b", 0, "x"), RowKey::new("pets", 0, "")] {
            let values = vec![Value::from("ref"), Value::Key(target)];
            let err = segment_row(&refs, &values, "r1", &mut buf).unwrap_err();
            assert!(matches!(err, CheddarError::InvalidKey(_)));
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn json_rendering() {
        let seg = |value: Value| {
            RowSegment::from_stored(RowKey::new("pets", 0, "r"), value.encode()).unwrap()
        };
        assert_eq!(seg(Value::Int64(-3)).to_json().unwrap(), serde_json::json!(-3));
        assert_eq!(seg(Value::from("a")).to_json().unwrap(), serde_json::json!("a"));
        assert_eq!(seg(Value::Bool(true)).to_json().unwrap(), serde_json::json!(true));
        assert_eq!(seg(Value::Float64(1.25)).to_json().unwrap(), serde_json::json!(1.25));
        assert_eq!(seg(Value::Null).to_json().unwrap(), serde_json::Value::Null);
        assert!(matches!(
            seg(Value::Float64(f64::NAN)).to_json(),
            Err(CheddarError::Json(_))
        ));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let mut raw = Value::Int64(1).encode();
        raw[0] = 42;
        assert!(matches!(
            RowSegment::from_stored(RowKey::new("pets", 0, "r"), raw),
            Err(CheddarError::MalformedValue(_))
        ));
    }
}
