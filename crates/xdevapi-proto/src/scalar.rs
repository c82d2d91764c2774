//! `Mysqlx.Datatypes.Scalar` values.

use bytes::Bytes;
use prost::Message;
use serde_json::json;

use crate::mysqlx::datatypes as pb;
use crate::Error;

/// Scalar type discriminators as they appear on the wire.
pub mod scalar_type {
    /// Signed 64-bit integer (zigzag).
    pub const V_SINT: u32 = 1;
    /// Unsigned 64-bit integer.
    pub const V_UINT: u32 = 2;
    /// Null.
    pub const V_NULL: u32 = 3;
    /// Opaque octets with an optional content type.
    pub const V_OCTETS: u32 = 4;
    /// IEEE-754 double.
    pub const V_DOUBLE: u32 = 5;
    /// IEEE-754 single.
    pub const V_FLOAT: u32 = 6;
    /// Boolean.
    pub const V_BOOL: u32 = 7;
    /// Character string with an optional collation.
    pub const V_STRING: u32 = 8;
}

/// Content types carried by octet scalars.
pub mod content_type {
    /// Plain bytes.
    pub const PLAIN: u32 = 0;
    /// Well-known binary geometry.
    pub const GEOMETRY: u32 = 1;
    /// JSON document text.
    pub const JSON: u32 = 2;
    /// XML document text.
    pub const XML: u32 = 3;
}

/// A scalar value in wire representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    SignedInt(i64),
    /// Unsigned 64-bit integer.
    UnsignedInt(u64),
    /// Single precision float.
    Float(f32),
    /// Double precision float.
    Double(f64),
    /// Character string; `value` holds the raw bytes in the given collation.
    String {
        /// Raw string bytes.
        value: Bytes,
        /// Collation id, if the sender specified one.
        collation: Option<u64>,
    },
    /// Opaque bytes.
    Octets {
        /// Raw bytes.
        value: Bytes,
        /// Content type, if the sender specified one.
        content_type: Option<u32>,
    },
}

impl ScalarValue {
    /// Build a string scalar without a collation.
    pub fn string(value: impl Into<String>) -> Self {
        ScalarValue::String {
            value: Bytes::from(value.into().into_bytes()),
            collation: None,
        }
    }

    /// Build an octets scalar without a content type.
    pub fn octets(value: impl Into<Bytes>) -> Self {
        ScalarValue::Octets {
            value: value.into(),
            content_type: None,
        }
    }

    /// Wire type discriminator.
    pub fn type_id(&self) -> u32 {
        match self {
            ScalarValue::Null => scalar_type::V_NULL,
            ScalarValue::Bool(_) => scalar_type::V_BOOL,
            ScalarValue::SignedInt(_) => scalar_type::V_SINT,
            ScalarValue::UnsignedInt(_) => scalar_type::V_UINT,
            ScalarValue::Float(_) => scalar_type::V_FLOAT,
            ScalarValue::Double(_) => scalar_type::V_DOUBLE,
            ScalarValue::String { .. } => scalar_type::V_STRING,
            ScalarValue::Octets { .. } => scalar_type::V_OCTETS,
        }
    }

    /// Wire type name, as used in debug views.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "V_NULL",
            ScalarValue::Bool(_) => "V_BOOL",
            ScalarValue::SignedInt(_) => "V_SINT",
            ScalarValue::UnsignedInt(_) => "V_UINT",
            ScalarValue::Float(_) => "V_FLOAT",
            ScalarValue::Double(_) => "V_DOUBLE",
            ScalarValue::String { .. } => "V_STRING",
            ScalarValue::Octets { .. } => "V_OCTETS",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Try to get as an unsigned integer. Non-negative signed values widen.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ScalarValue::UnsignedInt(v) => Some(*v),
            ScalarValue::SignedInt(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get the string payload as UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String { value, .. } => std::str::from_utf8(value).ok(),
            _ => None,
        }
    }

    /// Protobuf form of the value.
    pub fn to_proto(&self) -> pb::Scalar {
        let mut scalar = pb::Scalar {
            r#type: Some(self.type_id()),
            ..Default::default()
        };
        match self {
            ScalarValue::Null => {}
            ScalarValue::SignedInt(v) => scalar.v_signed_int = Some(*v),
            ScalarValue::UnsignedInt(v) => scalar.v_unsigned_int = Some(*v),
            ScalarValue::Octets {
                value,
                content_type,
            } => {
                scalar.v_octets = Some(pb::ScalarOctets {
                    value: Some(value.clone()),
                    content_type: *content_type,
                })
            }
            ScalarValue::Double(v) => scalar.v_double = Some(*v),
            ScalarValue::Float(v) => scalar.v_float = Some(*v),
            ScalarValue::Bool(v) => scalar.v_bool = Some(*v),
            ScalarValue::String { value, collation } => {
                scalar.v_string = Some(pb::ScalarString {
                    value: Some(value.clone()),
                    collation: *collation,
                })
            }
        }
        scalar
    }

    /// Interpret a decoded protobuf scalar.
    ///
    /// The payload field matching `type` must be present; others are ignored.
    pub fn from_proto(scalar: pb::Scalar) -> Result<Self, Error> {
        let type_id = scalar.r#type.ok_or_else(|| Error::decode("missing scalar type"))?;
        let missing = |name: &str| Error::decode(format!("missing {name} payload"));

        match type_id {
            scalar_type::V_SINT => scalar
                .v_signed_int
                .map(ScalarValue::SignedInt)
                .ok_or_else(|| missing("V_SINT")),
            scalar_type::V_UINT => scalar
                .v_unsigned_int
                .map(ScalarValue::UnsignedInt)
                .ok_or_else(|| missing("V_UINT")),
            scalar_type::V_NULL => Ok(ScalarValue::Null),
            scalar_type::V_OCTETS => {
                let octets = scalar.v_octets.ok_or_else(|| missing("V_OCTETS"))?;
                let value = octets
                    .value
                    .ok_or_else(|| Error::decode("missing octets value").within("v_octets"))?;
                Ok(ScalarValue::Octets {
                    value,
                    content_type: octets.content_type,
                })
            }
            scalar_type::V_DOUBLE => scalar
                .v_double
                .map(ScalarValue::Double)
                .ok_or_else(|| missing("V_DOUBLE")),
            scalar_type::V_FLOAT => scalar
                .v_float
                .map(ScalarValue::Float)
                .ok_or_else(|| missing("V_FLOAT")),
            scalar_type::V_BOOL => scalar.v_bool.map(ScalarValue::Bool).ok_or_else(|| missing("V_BOOL")),
            scalar_type::V_STRING => {
                let string = scalar.v_string.ok_or_else(|| missing("V_STRING"))?;
                let value = string
                    .value
                    .ok_or_else(|| Error::decode("missing string value").within("v_string"))?;
                Ok(ScalarValue::String {
                    value,
                    collation: string.collation,
                })
            }
            other => Err(Error::decode(format!("unknown scalar type {other}"))),
        }
    }

    /// Encode as a `Scalar` message body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_proto().encode_to_vec())
    }

    /// Decode a `Scalar` message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Self::from_proto(pb::Scalar::decode(data)?)
    }

    /// Structured mirror of the value for tracing.
    pub fn to_debug_view(&self) -> serde_json::Value {
        let payload = match self {
            ScalarValue::Null => serde_json::Value::Null,
            ScalarValue::Bool(v) => json!(v),
            ScalarValue::SignedInt(v) => json!(v),
            ScalarValue::UnsignedInt(v) => json!(v),
            ScalarValue::Float(v) => float_view(f64::from(*v)),
            ScalarValue::Double(v) => float_view(*v),
            ScalarValue::String { value, collation } => {
                let value = match std::str::from_utf8(value) {
                    Ok(s) => json!(s),
                    Err(_) => json!({ "hex": hex::encode(value) }),
                };
                json!({ "value": value, "collation": collation })
            }
            ScalarValue::Octets {
                value,
                content_type,
            } => json!({ "hex": hex::encode(value), "content_type": content_type }),
        };
        json!({ "type": self.type_name(), "value": payload })
    }
}

// Non-finite floats have no JSON number form.
fn float_view(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| json!(v.to_string()))
}
