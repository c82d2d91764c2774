//! Native literal values exchanged with the server.

use std::collections::BTreeMap;

use crate::Error;

/// A native value that can be bound as a statement argument, offered as a
/// capability, or produced by decoding a wire value.
///
/// Integers keep their full 64-bit range: negative or signed values use
/// [`Literal::Int`], values produced from unsigned sources use
/// [`Literal::UInt`]. Neither is ever widened through a float.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Array(Vec<Literal>),
    /// Field-keyed structure. Field order carries no meaning.
    Object(BTreeMap<String, Literal>),
}

impl Literal {
    /// Build an array literal.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Literal>,
    {
        Literal::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build an object literal. A repeated key keeps its last value.
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Literal>,
    {
        Literal::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Convert an arbitrary-width integer, failing when it is outside both
    /// the signed and unsigned 64-bit ranges.
    pub fn from_i128(value: i128) -> Result<Self, Error> {
        if let Ok(v) = i64::try_from(value) {
            Ok(Literal::Int(v))
        } else if let Ok(v) = u64::try_from(value) {
            Ok(Literal::UInt(v))
        } else {
            Err(Error::precision(format!(
                "integer {value} is outside the 64-bit range"
            )))
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Check if this value is a signed or unsigned integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, Literal::Int(_) | Literal::UInt(_))
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64. Unsigned values that fit are converted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            Literal::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get as u64. Non-negative signed values are converted.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Literal::UInt(v) => Some(*v),
            Literal::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get an integer as i64, reporting a precision error when it does not fit.
    pub fn try_as_i64(&self) -> Result<i64, Error> {
        match self {
            Literal::Int(v) => Ok(*v),
            Literal::UInt(v) => i64::try_from(*v)
                .map_err(|_| Error::precision(format!("{v} does not fit in a signed 64-bit integer"))),
            other => Err(Error::usage(format!("{other:?} is not an integer"))),
        }
    }

    /// Try to get as f64. Single precision values widen exactly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Double(v) => Some(*v),
            Literal::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Literal::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as array elements.
    pub fn as_array(&self) -> Option<&[Literal]> {
        match self {
            Literal::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as object fields.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Literal>> {
        match self {
            Literal::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up an object field.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.as_object().and_then(|fields| fields.get(key))
    }
}

macro_rules! from_int {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl From<$ty> for Literal {
                fn from(v: $ty) -> Self {
                    Literal::$variant(v.into())
                }
            }
        )*
    };
}

from_int!(Int: i8, i16, i32, i64);
from_int!(UInt: u8, u16, u32, u64);

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<f32> for Literal {
    fn from(v: f32) -> Self {
        Literal::Float(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Double(v)
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<Vec<u8>> for Literal {
    fn from(v: Vec<u8>) -> Self {
        Literal::Bytes(v)
    }
}

impl From<&[u8]> for Literal {
    fn from(v: &[u8]) -> Self {
        Literal::Bytes(v.to_vec())
    }
}

impl From<Vec<Literal>> for Literal {
    fn from(v: Vec<Literal>) -> Self {
        Literal::Array(v)
    }
}

impl From<BTreeMap<String, Literal>> for Literal {
    fn from(v: BTreeMap<String, Literal>) -> Self {
        Literal::Object(v)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Literal::Null,
        }
    }
}

impl From<serde_json::Value> for Literal {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match v {
            Json::Null => Literal::Null,
            Json::Bool(b) => Literal::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Literal::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Literal::UInt(u)
                } else {
                    // Neither integer form fits, so serde_json already holds an f64.
                    Literal::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Literal::String(s),
            Json::Array(items) => Literal::Array(items.into_iter().map(Literal::from).collect()),
            Json::Object(fields) => Literal::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Literal::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_accessors() {
        assert!(Literal::Null.is_null());
        assert!(!Literal::Bool(true).is_null());

        assert_eq!(Literal::Bool(true).as_bool(), Some(true));
        assert_eq!(Literal::Int(-42).as_i64(), Some(-42));
        assert_eq!(Literal::UInt(42).as_i64(), Some(42));
        assert_eq!(Literal::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Literal::Int(-1).as_u64(), None);
        assert_eq!(Literal::Float(1.5).as_f64(), Some(1.5));

        assert_eq!(Literal::from("hello").as_str(), Some("hello"));
        assert_eq!(Literal::from(vec![1u8, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(Literal::from(42i32), Literal::Int(42));
        assert_eq!(Literal::from(42u32), Literal::UInt(42));
        assert_eq!(Literal::from(u64::MAX), Literal::UInt(u64::MAX));
        assert_eq!(Literal::from(None::<i32>), Literal::Null);
        assert_eq!(Literal::from(Some("x")), Literal::String("x".into()));
    }

    #[test]
    fn test_object_builder_keeps_last_key() {
        let obj = Literal::object([("a", 1i64), ("b", 2), ("a", 3)]);
        assert_eq!(obj.get("a"), Some(&Literal::Int(3)));
        assert_eq!(obj.as_object().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_from_i128() {
        assert_eq!(Literal::from_i128(-5).unwrap(), Literal::Int(-5));
        assert_eq!(
            Literal::from_i128(u64::MAX as i128).unwrap(),
            Literal::UInt(u64::MAX)
        );

        let err = Literal::from_i128(u64::MAX as i128 + 1).unwrap_err();
        assert!(err.is_precision());
        let err = Literal::from_i128(i64::MIN as i128 - 1).unwrap_err();
        assert!(err.is_precision());
    }

    #[test]
    fn test_try_as_i64() {
        assert_eq!(Literal::UInt(7).try_as_i64().unwrap(), 7);
        assert!(Literal::UInt(u64::MAX).try_as_i64().unwrap_err().is_precision());
        assert!(Literal::from("7").try_as_i64().unwrap_err().is_usage());
    }

    #[test]
    fn test_from_json() {
        let lit = Literal::from(json!({
            "name": "widget",
            "count": 3,
            "big": 18446744073709551615u64,
            "ratio": 0.5,
            "tags": ["a", null, true],
        }));

        assert_eq!(lit.get("name"), Some(&Literal::from("widget")));
        assert_eq!(lit.get("count"), Some(&Literal::Int(3)));
        assert_eq!(lit.get("big"), Some(&Literal::UInt(u64::MAX)));
        assert_eq!(lit.get("ratio"), Some(&Literal::Double(0.5)));
        assert_eq!(
            lit.get("tags"),
            Some(&Literal::Array(vec![
                Literal::from("a"),
                Literal::Null,
                Literal::Bool(true)
            ]))
        );
    }
}
