//! Tagged length-prefixed encoding for [`Value`].

use super::{Head, Kind, Value};
use crate::{
    error::{CheddarError, CheddarResult},
    key::RowKey,
};

/// Byte separating the length field from the payload.
pub const DELIMITER: u8 = b'|';

/// Number of framing bytes preceding every payload.
pub const HEAD_SIZE: usize = 1 + 8 + 1;

impl Head {
    /// Serialize the framing into the provided buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind.as_u8());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.push(DELIMITER);
    }

    /// Parse the framing from the front of `bytes`, returning the rest.
    ///
    /// Only the head is validated; the payload may still be truncated.
    pub fn decode_from(bytes: &[u8]) -> CheddarResult<(Self, &[u8])> {
        if bytes.len() < HEAD_SIZE {
            return Err(CheddarError::malformed("value head truncated"));
        }
        let (head, rest) = bytes.split_at(HEAD_SIZE);
        let kind = Kind::try_from(head[0])?;

        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&head[1..9]);
        let size = u64::from_le_bytes(size_bytes);

        if head[9] != DELIMITER {
            return Err(CheddarError::malformed("value delimiter missing"));
        }
        if let Some(width) = kind.fixed_width() {
            if size != width as u64 {
                return Err(CheddarError::malformed(format!(
                    "{kind} payload must be {width} bytes, head says {size}"
                )));
            }
        }
        Ok((Head { kind, size }, rest))
    }
}

impl Value {
    /// Encode into a freshly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEAD_SIZE + self.payload_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Append the encoded value to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        Head {
            kind: self.kind(),
            size: self.payload_len() as u64,
        }
        .encode_into(buf);

        match self {
            Value::Null => {}
            Value::String(v) => buf.extend_from_slice(v.as_bytes()),
            Value::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Float64(v) => buf.extend_from_slice(&v.to_bits().to_le_bytes()),
            Value::Bool(v) => buf.push(u8::from(*v)),
            Value::Key(key) => buf.extend_from_slice(key.to_string().as_bytes()),
        }
    }

    /// Reject values whose encoding would not decode again.
    ///
    /// Only keys can fail: their table and row id must survive
    /// [`RowKey::parse`].
    pub fn validate(&self) -> CheddarResult<()> {
        match self {
            Value::Key(key) => key.validate(),
            _ => Ok(()),
        }
    }

    /// Decode exactly one value occupying all of `bytes`.
    pub fn decode(bytes: &[u8]) -> CheddarResult<(Self, Head)> {
        let (value, head, rest) = Self::decode_from(bytes)?;
        if !rest.is_empty() {
            return Err(CheddarError::malformed(format!(
                "{} trailing bytes after value",
                rest.len()
            )));
        }
        Ok((value, head))
    }

    /// Decode one value from the front of `bytes`, returning the rest.
    pub fn decode_from(bytes: &[u8]) -> CheddarResult<(Self, Head, &[u8])> {
        let (head, rest) = Head::decode_from(bytes)?;
        let size = usize::try_from(head.size)
            .map_err(|_| CheddarError::malformed("value length overflows usize"))?;
        if rest.len() < size {
            return Err(CheddarError::malformed(format!(
                "value payload truncated: need {size} bytes, have {}",
                rest.len()
            )));
        }
        let (payload, rest) = rest.split_at(size);
        let value = decode_payload(head.kind, payload)?;
        Ok((value, head, rest))
    }

    fn payload_len(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::String(v) => v.len(),
            Value::Int64(_) | Value::Float64(_) => 8,
            Value::Bool(_) => 1,
            Value::Key(key) => key.encoded_len(),
        }
    }
}

fn decode_payload(kind: Kind, payload: &[u8]) -> CheddarResult<Value> {
    match kind {
        Kind::Null => Ok(Value::Null),
        Kind::String => Ok(Value::String(utf8(payload)?)),
        Kind::Int64 => Ok(Value::Int64(i64::from_le_bytes(eight(payload)?))),
        Kind::Float64 => Ok(Value::Float64(f64::from_bits(u64::from_le_bytes(
            eight(payload)?,
        )))),
        Kind::Bool => match payload {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            _ => Err(CheddarError::malformed("bool payload must be 0 or 1")),
        },
        Kind::Key => RowKey::parse(payload)
            .map(Value::Key)
            .map_err(|err| CheddarError::malformed(format!("key payload: {err}"))),
    }
}

fn utf8(payload: &[u8]) -> CheddarResult<String> {
    String::from_utf8(payload.to_vec())
        .map_err(|_| CheddarError::malformed("string payload is not valid utf-8"))
}

fn eight(payload: &[u8]) -> CheddarResult<[u8; 8]> {
    payload
        .try_into()
        .map_err(|_| CheddarError::malformed("expected an 8 byte payload"))
}

/// Decode a value that must be a string.
pub(crate) fn take_string(bytes: &[u8]) -> CheddarResult<(String, &[u8])> {
    match Value::decode_from(bytes)? {
        (Value::String(v), _, rest) => Ok((v, rest)),
        (other, ..) => Err(unexpected(Kind::String, other.kind())),
    }
}

/// Decode a value that must be an integer.
pub(crate) fn take_int64(bytes: &[u8]) -> CheddarResult<(i64, &[u8])> {
    match Value::decode_from(bytes)? {
        (Value::Int64(v), _, rest) => Ok((v, rest)),
        (other, ..) => Err(unexpected(Kind::Int64, other.kind())),
    }
}

/// Decode a value that must be a boolean.
pub(crate) fn take_bool(bytes: &[u8]) -> CheddarResult<(bool, &[u8])> {
    match Value::decode_from(bytes)? {
        (Value::Bool(v), _, rest) => Ok((v, rest)),
        (other, ..) => Err(unexpected(Kind::Bool, other.kind())),
    }
}

fn unexpected(expected: Kind, actual: Kind) -> CheddarError {
    CheddarError::malformed(format!("expected {expected} value, found {actual}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_keys_are_rejected_before_encoding() {
        let dotted = Value::Key(RowKey::new("a.b", 0, "x"));
        assert!(Value::decode(&dotted.encode()).is_err());
        assert!(matches!(dotted.validate(), Err(CheddarError::InvalidKey(_))));

        let no_row = Value::Key(RowKey::new("t", 0, ""));
        assert!(matches!(no_row.validate(), Err(CheddarError::InvalidKey(_))));

        let fine = Value::Key(RowKey::new("t", 0, "r.1"));
        fine.validate().unwrap();
        assert_eq!(Value::decode(&fine.encode()).unwrap().0, fine);
        Value::Null.validate().unwrap();
    }

    #[test]
    fn values_round_trip_with_heads() {
        let cases = [
            (Value::Null, 0),
            (Value::from(""), 0),
            (Value::from("grüße, 世界"), "grüße, 世界".len() as u64),
            (Value::Int64(0), 8),
            (Value::Int64(-42), 8),
            (Value::Int64(i64::MAX), 8),
            (Value::Int64(i64::MIN), 8),
            (Value::Float64(0.0), 8),
            (Value::Float64(-1.5e300), 8),
            (Value::Bool(true), 1),
            (Value::Bool(false), 1),
            (Value::Key(RowKey::new("users", 3, "abc")), "users.3.abc".len() as u64),
        ];
        for (value, size) in cases {
            let bytes = value.encode();
            let (decoded, head) = Value::decode(&bytes).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(
                head,
                Head {
                    kind: value.kind(),
                    size
                }
            );
        }
    }

    #[test]
    fn int64_wire_layout() {
        let bytes = Value::Int64(-2).encode();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..9], &8u64.to_le_bytes());
        assert_eq!(bytes[9], b'|');
        assert_eq!(&bytes[10..], &(-2i64).to_le_bytes());
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let bytes = Value::from("hello").encode();
        let res = Value::decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(res, Err(CheddarError::MalformedValue(_))));

        let res = Value::decode(&bytes[..4]);
        assert!(matches!(res, Err(CheddarError::MalformedValue(_))));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let mut bytes = Value::Int64(7).encode();
        bytes[0] = 19;
        assert!(matches!(
            Value::decode(&bytes),
            Err(CheddarError::MalformedValue(_))
        ));
    }

    #[test]
    fn garbled_framing_is_malformed() {
        let mut bytes = Value::Int64(7).encode();
        bytes[9] = b'#';
        assert!(Value::decode(&bytes).is_err());

        let mut bytes = Value::Bool(true).encode();
        bytes[10] = 7;
        assert!(Value::decode(&bytes).is_err());

        // An int64 head announcing 4 bytes.
        let mut bytes = Vec::new();
        Head {
            kind: Kind::Int64,
            size: 4,
        }
        .encode_into(&mut bytes);
        bytes.extend_from_slice(&[0; 4]);
        assert!(Value::decode(&bytes).is_err());
    }

    #[test]
    fn decode_from_leaves_the_rest() {
        let mut bytes = Value::from("a").encode();
        Value::Int64(9).encode_into(&mut bytes);

        let (first, _, rest) = Value::decode_from(&bytes).unwrap();
        assert_eq!(first, Value::from("a"));
        let (second, rest) = take_int64(rest).unwrap();
        assert_eq!(second, 9);
        assert!(rest.is_empty());

        assert!(Value::decode(&bytes).is_err());
        assert!(take_bool(&bytes).is_err());
    }
}
