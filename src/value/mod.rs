//! Scalar values and their tagged binary form.
//!
//! Every encoded value is framed as
//! `[kind:1][length:8 LE]['|'][payload:length]`. The framing is the [`Head`];
//! it is always re-derived from the bytes and never stored on its own.

pub(crate) mod encoding;

use std::fmt;

pub use encoding::{DELIMITER, HEAD_SIZE};

use crate::{error::CheddarError, key::RowKey};

/// Kind tag written as the first byte of every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No payload.
    Null,
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit IEEE-754 float.
    Float64,
    /// Boolean.
    Bool,
    /// Reference to a row segment.
    Key,
}

impl Kind {
    /// Return the on-disk tag for the kind.
    pub const fn as_u8(self) -> u8 {
        match self {
            Kind::Null => 0,
            Kind::String => 1,
            Kind::Int64 => 2,
            Kind::Float64 => 3,
            Kind::Bool => 4,
            Kind::Key => 5,
        }
    }

    /// Payload width for fixed-size kinds.
    pub(crate) const fn fixed_width(self) -> Option<usize> {
        match self {
            Kind::Null => Some(0),
            Kind::Int64 | Kind::Float64 => Some(8),
            Kind::Bool => Some(1),
            Kind::String | Kind::Key => None,
        }
    }
}

impl From<Kind> for u8 {
    fn from(value: Kind) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for Kind {
    type Error = CheddarError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Kind::Null),
            1 => Ok(Kind::String),
            2 => Ok(Kind::Int64),
            3 => Ok(Kind::Float64),
            4 => Ok(Kind::Bool),
            5 => Ok(Kind::Key),
            other => Err(CheddarError::malformed(format!("unknown kind tag {other}"))),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::String => "string",
            Kind::Int64 => "int64",
            Kind::Float64 => "float64",
            Kind::Bool => "bool",
            Kind::Key => "key",
        };
        f.write_str(name)
    }
}

/// Decoded framing that precedes every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    /// Kind tag.
    pub kind: Kind,
    /// Payload length in bytes.
    pub size: u64,
}

/// A scalar value as stored in a row segment or a schema default.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// UTF-8 string.
    String(String),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// Reference to another row segment.
    Key(RowKey),
}

impl Value {
    /// Kind tag the value encodes with.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::String(_) => Kind::String,
            Value::Int64(_) => Kind::Int64,
            Value::Float64(_) => Kind::Float64,
            Value::Bool(_) => Kind::Bool,
            Value::Key(_) => Kind::Key,
        }
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<RowKey> for Value {
    fn from(value: RowKey) -> Self {
        Value::Key(value)
    }
}
