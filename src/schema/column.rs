use crate::{
    error::{CheddarError, CheddarResult},
    value::{
        encoding::{take_int64, take_string},
        Kind, Value,
    },
};

/// One named, typed column of a [`Table`](super::Table).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) index: u16,
    /// Kind every value of the column must carry.
    pub kind: Kind,
    /// Column name, unique within its table.
    pub name: String,
    /// Whether the column rejects nulls.
    pub not_null: bool,
    /// Whether the column is part of the primary key.
    pub is_primary: bool,
    /// Default value, if declared.
    pub default: Option<Value>,
    /// Lower size bound.
    pub min_size: i64,
    /// Upper size bound.
    pub max_size: i64,
}

impl Column {
    /// Nullable column without default or size bounds.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            index: 0,
            kind,
            name: name.into(),
            not_null: false,
            is_primary: false,
            default: None,
            min_size: 0,
            max_size: 0,
        }
    }

    /// Mark the column as not nullable.
    pub fn not_null(self, not_null: bool) -> Self {
        Column { not_null, ..self }
    }

    /// Mark the column as part of the primary key.
    pub fn primary(self, is_primary: bool) -> Self {
        Column { is_primary, ..self }
    }

    /// Set the default value.
    pub fn default_value(self, default: impl Into<Value>) -> Self {
        Column {
            default: Some(default.into()),
            ..self
        }
    }

    /// Set the lower and upper size bounds.
    pub fn size_bounds(self, min_size: i64, max_size: i64) -> Self {
        Column {
            min_size,
            max_size,
            ..self
        }
    }

    /// Position within the owning table; `0` until attached.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Whether a default value is set.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Append the column record to `buf`.
    ///
    /// Layout: `[index:2 LE][is_primary:1][not_null:1][kind:1][name]`
    /// `[has_default:1][default?][min_size][max_size]`, where name, default and
    /// the bounds are encoded values.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.push(u8::from(self.is_primary));
        buf.push(u8::from(self.not_null));
        buf.push(self.kind.as_u8());
        Value::String(self.name.clone()).encode_into(buf);
        match &self.default {
            Some(default) => {
                buf.push(1);
                default.encode_into(buf);
            }
            None => buf.push(0),
        }
        Value::Int64(self.min_size).encode_into(buf);
        Value::Int64(self.max_size).encode_into(buf);
    }

    /// Encode the column record into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one column record from the front of `bytes`, returning the rest.
    pub fn decode_from(bytes: &[u8]) -> CheddarResult<(Self, &[u8])> {
        if bytes.len() < 5 {
            return Err(CheddarError::malformed("column record truncated"));
        }
        let (fixed, rest) = bytes.split_at(5);
        let index = u16::from_le_bytes([fixed[0], fixed[1]]);
        let is_primary = flag(fixed[2], "is_primary")?;
        let not_null = flag(fixed[3], "not_null")?;
        let kind = Kind::try_from(fixed[4])?;

        let (name, rest) = take_string(rest)?;

        let Some((&has_default, rest)) = rest.split_first() else {
            return Err(CheddarError::malformed("column default flag missing"));
        };
        let (default, rest) = if flag(has_default, "has_default")? {
            let (value, _, rest) = Value::decode_from(rest)?;
            (Some(value), rest)
        } else {
            (None, rest)
        };

        let (min_size, rest) = take_int64(rest)?;
        let (max_size, rest) = take_int64(rest)?;

        Ok((
            Column {
                index,
                kind,
                name,
                not_null,
                is_primary,
                default,
                min_size,
                max_size,
            },
            rest,
        ))
    }
}

fn flag(byte: u8, field: &str) -> CheddarResult<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CheddarError::malformed(format!(
            "column {field} flag must be 0 or 1, found {other}"
        ))),
    }
}
