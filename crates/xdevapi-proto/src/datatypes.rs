//! The self-describing `Any` value and its `Array`/`Object` containers.

use bytes::Bytes;
use prost::Message;
use serde_json::json;

use crate::mysqlx::datatypes as pb;
use crate::scalar::ScalarValue;
use crate::Error;

/// `Any.type` discriminators.
pub mod any_type {
    /// Payload in `scalar`.
    pub const SCALAR: u32 = 1;
    /// Payload in `obj`.
    pub const OBJECT: u32 = 2;
    /// Payload in `array`.
    pub const ARRAY: u32 = 3;
}

/// A tagged wire value (`Mysqlx.Datatypes.Any`).
///
/// Object fields keep the order they were received in, duplicates included;
/// collapsing duplicates is left to [`crate::codec::decode`].
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// A scalar payload.
    Scalar(ScalarValue),
    /// An ordered sequence of values.
    Array(Vec<WireValue>),
    /// Field name and value pairs.
    Object(Vec<(String, WireValue)>),
}

impl WireValue {
    /// The `Any.type` tag of this value.
    pub fn type_id(&self) -> u32 {
        match self {
            WireValue::Scalar(_) => any_type::SCALAR,
            WireValue::Object(_) => any_type::OBJECT,
            WireValue::Array(_) => any_type::ARRAY,
        }
    }

    /// The `Any.type` tag name.
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Scalar(_) => "SCALAR",
            WireValue::Object(_) => "OBJECT",
            WireValue::Array(_) => "ARRAY",
        }
    }

    /// Try to get the scalar payload.
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            WireValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Protobuf form of the value.
    pub fn to_proto(&self) -> pb::Any {
        let mut any = pb::Any {
            r#type: Some(self.type_id()),
            ..Default::default()
        };
        match self {
            WireValue::Scalar(scalar) => any.scalar = Some(scalar.to_proto()),
            WireValue::Object(fields) => {
                any.obj = Some(pb::Object {
                    fld: fields
                        .iter()
                        .map(|(key, value)| pb::ObjectField {
                            key: Some(key.clone()),
                            value: Some(value.to_proto()),
                        })
                        .collect(),
                })
            }
            WireValue::Array(items) => {
                any.array = Some(pb::Array {
                    value: items.iter().map(WireValue::to_proto).collect(),
                })
            }
        }
        any
    }

    /// Interpret a decoded protobuf `Any`, recursively.
    pub fn from_proto(any: pb::Any) -> Result<Self, Error> {
        let type_id = any.r#type.ok_or_else(|| Error::decode("missing Any type"))?;
        match type_id {
            any_type::SCALAR => {
                let scalar = any.scalar.ok_or_else(|| Error::decode("missing scalar payload"))?;
                ScalarValue::from_proto(scalar)
                    .map(WireValue::Scalar)
                    .map_err(|e| e.within("scalar"))
            }
            any_type::OBJECT => {
                let object = any.obj.ok_or_else(|| Error::decode("missing obj payload"))?;
                from_object(object).map_err(|e| e.within("obj"))
            }
            any_type::ARRAY => {
                let array = any.array.ok_or_else(|| Error::decode("missing array payload"))?;
                let items = array
                    .value
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| WireValue::from_proto(item).map_err(|e| e.within(&format!("[{i}]"))))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| e.within("array"))?;
                Ok(WireValue::Array(items))
            }
            other => Err(Error::decode(format!("unknown Any type {other}"))),
        }
    }

    /// Encode as an `Any` message body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_proto().encode_to_vec())
    }

    /// Decode an `Any` message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Self::from_proto(pb::Any::decode(data)?)
    }

    /// Lossless, human-readable mirror of the tag and payload, for tracing.
    pub fn to_debug_view(&self) -> serde_json::Value {
        match self {
            WireValue::Scalar(scalar) => json!({
                "type": self.type_name(),
                "scalar": scalar.to_debug_view(),
            }),
            WireValue::Object(fields) => json!({
                "type": self.type_name(),
                "obj": fields
                    .iter()
                    .map(|(key, value)| json!({ "key": key, "value": value.to_debug_view() }))
                    .collect::<Vec<_>>(),
            }),
            WireValue::Array(items) => json!({
                "type": self.type_name(),
                "array": items.iter().map(WireValue::to_debug_view).collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<ScalarValue> for WireValue {
    fn from(v: ScalarValue) -> Self {
        WireValue::Scalar(v)
    }
}

fn from_object(object: pb::Object) -> Result<WireValue, Error> {
    let mut fields = Vec::with_capacity(object.fld.len());
    for (i, field) in object.fld.into_iter().enumerate() {
        let index = format!("fld[{i}]");
        let key = field
            .key
            .ok_or_else(|| Error::decode("missing object field key").within(&index))?;
        let value = field
            .value
            .ok_or_else(|| Error::decode(format!("missing value for field `{key}`")).within(&index))?;
        let value = WireValue::from_proto(value).map_err(|e| e.within(&key).within(&index))?;
        fields.push((key, value));
    }
    Ok(WireValue::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> WireValue {
        WireValue::Object(vec![
            ("name".into(), ScalarValue::string("a").into()),
            (
                "list".into(),
                WireValue::Array(vec![
                    ScalarValue::SignedInt(1).into(),
                    ScalarValue::UnsignedInt(u64::MAX).into(),
                    WireValue::Array(vec![ScalarValue::Null.into()]),
                ]),
            ),
            ("name".into(), ScalarValue::string("b").into()),
        ])
    }

    #[test]
    fn test_any_roundtrip_preserves_duplicates() {
        let value = nested();
        let bytes = value.to_bytes();
        assert_eq!(WireValue::decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_scalar_any_layout() {
        // Any { type: SCALAR, scalar: { type: V_BOOL, v_bool: true } }
        let bytes = WireValue::Scalar(ScalarValue::Bool(true)).to_bytes();
        assert_eq!(&bytes[..], &[0x08, 0x01, 0x12, 0x04, 0x08, 0x07, 0x40, 0x01]);
    }

    #[test]
    fn test_missing_payload_for_tag() {
        // type = ARRAY with a scalar payload instead
        let any = pb::Any {
            r#type: Some(any_type::ARRAY),
            scalar: Some(ScalarValue::Null.to_proto()),
            ..Default::default()
        };

        let err = WireValue::decode(&any.encode_to_vec()).unwrap_err();
        assert!(err.to_string().contains("missing array payload"));
    }

    #[test]
    fn test_unknown_tag() {
        let err = WireValue::decode(&[0x08, 0x09]).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("unknown Any type 9"));
    }

    #[test]
    fn test_error_path_points_at_element() {
        let bad = WireValue::Object(vec![(
            "list".into(),
            WireValue::Array(vec![
                ScalarValue::SignedInt(1).into(),
                ScalarValue::SignedInt(2).into(),
            ]),
        )]);
        let mut bytes = bad.to_bytes().to_vec();
        // Turn the last scalar's V_SINT tag into an unknown scalar type.
        let pos = bytes.iter().rposition(|b| *b == 0x01).unwrap() - 1;
        assert_eq!(bytes[pos], 0x08);
        bytes[pos + 1] = 0x63;

        let err = WireValue::decode(&bytes).unwrap_err();
        assert_eq!(err.path(), Some("obj.fld[0].list.array[1].scalar"));
    }

    #[test]
    fn test_debug_view() {
        let view = nested().to_debug_view();
        assert_eq!(view["type"], "OBJECT");
        assert_eq!(view["obj"][0]["key"], "name");
        assert_eq!(view["obj"][1]["value"]["type"], "ARRAY");
        assert_eq!(
            view["obj"][1]["value"]["array"][1]["scalar"]["value"].as_u64(),
            Some(u64::MAX)
        );
        assert_eq!(view["obj"].as_array().map(Vec::len), Some(3));
    }
}
