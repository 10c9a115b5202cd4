//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements the subset of RFC 8949 Core Deterministic Encoding
//! keygate needs:
//! - Map keys are unsigned integers, emitted in ascending order
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats, no tags
//!
//! Encoding works over [`CanonicalValue`], which can only express those
//! shapes, so it cannot fail. Decoding goes through `ciborium` and is then
//! checked against the re-encoded bytes where exactness matters.

use ciborium::value::Value;

use crate::error::DecodeError;

/// A value that has exactly one canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    Uint(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CanonicalValue>),
    Map(Vec<(u64, CanonicalValue)>),
}

/// Encode a value to canonical bytes.
pub fn encode(value: &CanonicalValue) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

fn encode_value_to(buf: &mut Vec<u8>, value: &CanonicalValue) {
    match value {
        CanonicalValue::Uint(n) => encode_uint(buf, 0, *n),
        CanonicalValue::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        CanonicalValue::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        CanonicalValue::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item);
            }
        }
        CanonicalValue::Map(entries) => {
            // Integer keys below 2^64 sort identically by value and by encoded bytes.
            let mut sorted: Vec<&(u64, CanonicalValue)> = entries.iter().collect();
            sorted.sort_by_key(|(k, _)| *k);

            encode_uint(buf, 5, sorted.len() as u64);
            for (key, value) in sorted {
                encode_uint(buf, 0, *key);
                encode_value_to(buf, value);
            }
        }
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Read one CBOR item from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied.
pub fn read_value(bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| DecodeError::Malformed(format!("invalid CBOR: {e}")))?;
    Ok((value, cursor.position() as usize))
}

/// A decoded CBOR map keyed by unsigned integers.
#[derive(Debug, Clone)]
pub struct CborMap {
    entries: Vec<(u64, Value)>,
}

impl CborMap {
    /// Interpret a value as an integer-keyed map, rejecting duplicate keys.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let raw = match value {
            Value::Map(m) => m,
            _ => return Err(DecodeError::Malformed("expected map".into())),
        };

        let mut entries = Vec::with_capacity(raw.len());
        for (k, v) in raw {
            let key = match k {
                Value::Integer(i) => u64::try_from(i)
                    .map_err(|_| DecodeError::Malformed("negative map key".into()))?,
                _ => return Err(DecodeError::Malformed("non-integer map key".into())),
            };
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(DecodeError::Malformed(format!("duplicate key {key}")));
            }
            entries.push((key, v));
        }

        Ok(Self { entries })
    }

    fn get(&self, key: u64) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Keys present that are not in `known`.
    pub fn unknown_keys(&self, known: &[u64]) -> Vec<u64> {
        self.entries
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| !known.contains(k))
            .collect()
    }

    /// Required unsigned integer field.
    pub fn uint(&self, key: u64, field: &str) -> Result<u64, DecodeError> {
        match self.get(key) {
            Some(Value::Integer(i)) => u64::try_from(*i)
                .map_err(|_| DecodeError::Malformed(format!("{field}: out of range"))),
            Some(_) => Err(DecodeError::Malformed(format!("{field}: expected integer"))),
            None => Err(DecodeError::Malformed(format!("missing {field}"))),
        }
    }

    /// Required text field.
    pub fn text(&self, key: u64, field: &str) -> Result<&str, DecodeError> {
        match self.get(key) {
            Some(Value::Text(s)) => Ok(s.as_str()),
            Some(_) => Err(DecodeError::Malformed(format!("{field}: expected text"))),
            None => Err(DecodeError::Malformed(format!("missing {field}"))),
        }
    }

    /// Required byte string field.
    pub fn bytes(&self, key: u64, field: &str) -> Result<&[u8], DecodeError> {
        match self.get(key) {
            Some(Value::Bytes(b)) => Ok(b.as_slice()),
            Some(_) => Err(DecodeError::Malformed(format!("{field}: expected bytes"))),
            None => Err(DecodeError::Malformed(format!("missing {field}"))),
        }
    }

    /// Required fixed-length byte field.
    pub fn fixed<const N: usize>(&self, key: u64, field: &str) -> Result<[u8; N], DecodeError> {
        let b = self.bytes(key, field)?;
        b.try_into().map_err(|_| {
            DecodeError::Malformed(format!("{field}: expected {} bytes, got {}", N, b.len()))
        })
    }
}
