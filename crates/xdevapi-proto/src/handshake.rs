//! Capability negotiation types (`Mysqlx.Connection`).
//!
//! Capabilities are exchanged before any statement traffic: the client asks
//! for the server's list with `CapabilitiesGet` and requests features with
//! `CapabilitiesSet`. The server evaluates a `CapabilitiesSet` in wire order,
//! so a `tls` request has to be the first entry.

use std::collections::BTreeMap;

use bytes::Bytes;
use prost::Message;

use crate::codec::{self, IntegerPolicy};
use crate::datatypes::WireValue;
use crate::mysqlx::connection as pb;
use crate::value::Literal;
use crate::Error;

/// A named connection-level feature or setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    /// Capability name.
    pub name: String,
    /// Capability value.
    pub value: WireValue,
}

impl Capability {
    /// Create a capability from a native value.
    pub fn new(name: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self {
            name: name.into(),
            value: codec::encode(&value.into()),
        }
    }

    fn to_proto(&self) -> pb::Capability {
        pb::Capability {
            name: Some(self.name.clone()),
            value: Some(self.value.to_proto()),
        }
    }

    fn from_proto(capability: pb::Capability) -> Result<Self, Error> {
        let name = capability
            .name
            .ok_or_else(|| Error::decode("missing capability name"))?;
        let value = capability
            .value
            .ok_or_else(|| Error::decode(format!("missing value for capability `{name}`")))?;
        let value = WireValue::from_proto(value).map_err(|e| e.within(&name_segment(&name)))?;
        Ok(Self { name, value })
    }
}

/// An ordered list of capabilities (`Mysqlx.Connection.Capabilities`).
///
/// Duplicate names are allowed on the wire; [`parse_capability_set`] keeps the
/// last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a capability.
    pub fn with_capability(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.push(Capability::new(name, value));
        self
    }

    /// Append a capability.
    pub fn push(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }

    /// Capabilities in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// The last wire value carried under `name`.
    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.capabilities
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| &c.value)
    }

    /// Check if a capability is present.
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }

    /// Protobuf form of the set.
    pub fn to_proto(&self) -> pb::Capabilities {
        pb::Capabilities {
            capabilities: self.capabilities.iter().map(Capability::to_proto).collect(),
        }
    }

    /// Interpret a decoded `Capabilities` message.
    pub fn from_proto(set: pb::Capabilities) -> Result<Self, Error> {
        let capabilities = set
            .capabilities
            .into_iter()
            .map(Capability::from_proto)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.within("capabilities"))?;
        Ok(Self { capabilities })
    }

    /// Encode as a `Capabilities` message body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_proto().encode_to_vec())
    }

    /// Decode a `Capabilities` message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Self::from_proto(pb::Capabilities::decode(data)?)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.capabilities.iter()
    }
}

/// Build a capability set from name/value pairs, keeping their order.
///
/// Iteration order of `properties` is wire order, so pass an ordered
/// collection (a `Vec` or an array) when priority matters.
pub fn build_capability_set<I, K, V>(properties: I) -> CapabilitySet
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Literal>,
{
    properties
        .into_iter()
        .map(|(name, value)| Capability::new(name, value))
        .collect()
}

/// Decode every capability into a name → literal map. Later duplicates win.
pub fn parse_capability_set(set: &CapabilitySet) -> Result<BTreeMap<String, Literal>, Error> {
    parse_capability_set_with(set, IntegerPolicy::Exact)
}

/// [`parse_capability_set`] under an explicit integer policy.
pub fn parse_capability_set_with(
    set: &CapabilitySet,
    policy: IntegerPolicy,
) -> Result<BTreeMap<String, Literal>, Error> {
    let mut out = BTreeMap::new();
    for capability in set {
        let value = codec::decode_with(&capability.value, policy)
            .map_err(|e| e.within(&name_segment(&capability.name)).within("capabilities"))?;
        out.insert(capability.name.clone(), value);
    }
    Ok(out)
}

// Capability names may contain dots, so they are quoted in error paths.
fn name_segment(name: &str) -> String {
    format!("[{name:?}]")
}

/// Standard capability names.
pub mod capabilities {
    /// Switch the connection to TLS. Must be the first entry of a set request.
    pub const TLS: &str = "tls";
    /// Authentication mechanisms the server accepts.
    pub const AUTHENTICATION_MECHANISMS: &str = "authentication.mechanisms";
    /// Document formats the server produces.
    pub const DOC_FORMATS: &str = "doc.formats";
    /// Node type reported by the server.
    pub const NODE_TYPE: &str = "node_type";
    /// Compression negotiation object.
    pub const COMPRESSION: &str = "compression";
    /// Connection attributes sent by the client.
    pub const SESSION_CONNECT_ATTRS: &str = "session_connect_attrs";
    /// Accept sessions whose password has expired.
    pub const CLIENT_PWD_EXPIRE_OK: &str = "client.pwd_expire_ok";
    /// Mark the session as interactive for idle timeouts.
    pub const CLIENT_INTERACTIVE: &str = "client.interactive";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarValue;

    #[test]
    fn test_build_keeps_order() {
        let set = build_capability_set([
            (capabilities::TLS, Literal::from(true)),
            (capabilities::COMPRESSION, Literal::from("zstd")),
        ]);

        assert_eq!(set.len(), 2);
        let names: Vec<_> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["tls", "compression"]);
        assert_eq!(
            set.get("tls"),
            Some(&WireValue::Scalar(ScalarValue::Bool(true)))
        );
    }

    #[test]
    fn test_parse_last_write_wins() {
        let set = CapabilitySet::new()
            .with_capability("node_type", "mysql")
            .with_capability("client.interactive", false)
            .with_capability("node_type", "router");

        let parsed = parse_capability_set(&set).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["node_type"], Literal::from("router"));
        assert_eq!(parsed["client.interactive"], Literal::Bool(false));
    }

    #[test]
    fn test_wire_roundtrip() {
        let set = build_capability_set([
            ("tls", Literal::from(true)),
            (
                "compression",
                Literal::object([
                    ("algorithm", Literal::from("zstd_stream")),
                    ("server_combine_mixed_messages", Literal::from(true)),
                ]),
            ),
            (
                "authentication.mechanisms",
                Literal::array(["MYSQL41", "SHA256_MEMORY"]),
            ),
        ]);

        let decoded = CapabilitySet::decode(&set.to_bytes()).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_malformed_value_names_capability() {
        let set = CapabilitySet::from_iter([Capability {
            name: "doc.formats".into(),
            value: WireValue::Scalar(ScalarValue::String {
                value: bytes::Bytes::from_static(&[0xc3, 0x28]),
                collation: None,
            }),
        }]);

        let err = parse_capability_set(&set).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.path(), Some("capabilities[\"doc.formats\"]"));
    }

    #[test]
    fn test_bad_capability_value_names_it() {
        // Any { type: SCALAR, scalar: { type: 99 } }
        let set = pb::Capabilities {
            capabilities: vec![pb::Capability {
                name: Some("node_type".into()),
                value: Some(crate::mysqlx::datatypes::Any {
                    r#type: Some(1),
                    scalar: Some(crate::mysqlx::datatypes::Scalar {
                        r#type: Some(99),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            }],
        };

        let err = CapabilitySet::decode(&set.encode_to_vec()).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.path(), Some("capabilities[\"node_type\"].scalar"));
    }

    #[test]
    fn test_truncated_capabilities() {
        // Capability { name: "node_type", value: <claims 5 bytes, has 1> }
        let mut body = vec![0x0a, 0x09];
        body.extend_from_slice(b"node_type");
        body.extend_from_slice(&[0x12, 0x05, 0x08]);
        let mut outer = vec![0x0a, body.len() as u8];
        outer.extend_from_slice(&body);

        assert!(CapabilitySet::decode(&outer).unwrap_err().is_decode());
    }
}
