//! Conversion between native [`Literal`]s and [`WireValue`]s.
//!
//! Encoding is total: every literal has exactly one wire shape. Decoding can
//! fail on malformed scalars (e.g. a string that is not UTF-8) or when the
//! active [`IntegerPolicy`] cannot hold an integer exactly. Errors carry the
//! field path of the offending value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::datatypes::WireValue;
use crate::scalar::ScalarValue;
use crate::value::Literal;
use crate::Error;

/// Largest integer magnitude an IEEE-754 double holds without gaps.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// How decoded integers are represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerPolicy {
    /// Keep signed and unsigned 64-bit integers as they are.
    #[default]
    Exact,
    /// Integers beyond ±[`MAX_SAFE_INTEGER`] become decimal strings.
    String,
    /// Integers become doubles; values a double cannot hold exactly are a
    /// precision error.
    Double,
}

/// Encode a literal into its wire representation.
pub fn encode(literal: &Literal) -> WireValue {
    match literal {
        Literal::Null => WireValue::Scalar(ScalarValue::Null),
        Literal::Bool(v) => WireValue::Scalar(ScalarValue::Bool(*v)),
        Literal::Int(v) => WireValue::Scalar(ScalarValue::SignedInt(*v)),
        Literal::UInt(v) => WireValue::Scalar(ScalarValue::UnsignedInt(*v)),
        Literal::Float(v) => WireValue::Scalar(ScalarValue::Float(*v)),
        Literal::Double(v) => WireValue::Scalar(ScalarValue::Double(*v)),
        Literal::String(s) => WireValue::Scalar(ScalarValue::string(s.as_str())),
        Literal::Bytes(b) => WireValue::Scalar(ScalarValue::octets(b.clone())),
        Literal::Array(items) => WireValue::Array(items.iter().map(encode).collect()),
        Literal::Object(fields) => WireValue::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), encode(value)))
                .collect(),
        ),
    }
}

/// Encode every literal in order.
pub fn encode_all<'a, I>(literals: I) -> Vec<WireValue>
where
    I: IntoIterator<Item = &'a Literal>,
{
    literals.into_iter().map(encode).collect()
}

/// Decode a wire value with [`IntegerPolicy::Exact`].
pub fn decode(wire: &WireValue) -> Result<Literal, Error> {
    decode_with(wire, IntegerPolicy::Exact)
}

/// Decode a wire value under the given integer policy.
///
/// A field name that appears more than once in an object keeps the value of
/// its last occurrence.
pub fn decode_with(wire: &WireValue, policy: IntegerPolicy) -> Result<Literal, Error> {
    match wire {
        WireValue::Scalar(scalar) => decode_scalar(scalar, policy),
        WireValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| decode_with(item, policy).map_err(|e| e.within(&format!("[{i}]"))))
            .collect::<Result<Vec<_>, _>>()
            .map(Literal::Array),
        WireValue::Object(fields) => {
            let mut out = BTreeMap::new();
            for (key, value) in fields {
                let value = decode_with(value, policy).map_err(|e| e.within(key))?;
                out.insert(key.clone(), value);
            }
            Ok(Literal::Object(out))
        }
    }
}

/// Decode a scalar under the given integer policy.
pub fn decode_scalar(scalar: &ScalarValue, policy: IntegerPolicy) -> Result<Literal, Error> {
    match scalar {
        ScalarValue::Null => Ok(Literal::Null),
        ScalarValue::Bool(v) => Ok(Literal::Bool(*v)),
        ScalarValue::SignedInt(v) => signed_with(*v, policy),
        ScalarValue::UnsignedInt(v) => unsigned_with(*v, policy),
        ScalarValue::Float(v) => Ok(Literal::Float(*v)),
        ScalarValue::Double(v) => Ok(Literal::Double(*v)),
        ScalarValue::String { value, .. } => std::str::from_utf8(value)
            .map(|s| Literal::String(s.to_string()))
            .map_err(|e| Error::decode(format!("string is not valid utf-8: {e}"))),
        ScalarValue::Octets { value, .. } => Ok(Literal::Bytes(value.to_vec())),
    }
}

fn signed_with(v: i64, policy: IntegerPolicy) -> Result<Literal, Error> {
    match policy {
        IntegerPolicy::Exact => Ok(Literal::Int(v)),
        IntegerPolicy::String if v.unsigned_abs() > MAX_SAFE_INTEGER => {
            Ok(Literal::String(v.to_string()))
        }
        IntegerPolicy::String => Ok(Literal::Int(v)),
        IntegerPolicy::Double => {
            let f = v as f64;
            // 2^63 itself is out of range, so the round trip is only checked below it.
            if f < 9_223_372_036_854_775_808.0 && f as i64 == v {
                Ok(Literal::Double(f))
            } else {
                Err(Error::precision(format!("{v} cannot be held exactly by a double")))
            }
        }
    }
}

fn unsigned_with(v: u64, policy: IntegerPolicy) -> Result<Literal, Error> {
    match policy {
        IntegerPolicy::Exact => Ok(Literal::UInt(v)),
        IntegerPolicy::String if v > MAX_SAFE_INTEGER => Ok(Literal::String(v.to_string())),
        IntegerPolicy::String => Ok(Literal::UInt(v)),
        IntegerPolicy::Double => {
            let f = v as f64;
            if f < 18_446_744_073_709_551_616.0 && f as u64 == v {
                Ok(Literal::Double(f))
            } else {
                Err(Error::precision(format!("{v} cannot be held exactly by a double")))
            }
        }
    }
}

/// Encode a literal straight to `Any` message bytes.
pub fn encode_to_bytes(literal: &Literal) -> bytes::Bytes {
    encode(literal).to_bytes()
}

/// Decode `Any` message bytes straight to a literal.
pub fn decode_from_bytes(data: &[u8], policy: IntegerPolicy) -> Result<Literal, Error> {
    decode_with(&WireValue::decode(data)?, policy)
}
