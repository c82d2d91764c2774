//! MySQL X Protocol message types and encoding.
//!
//! This crate implements the client side of the X Protocol wire format:
//! the `Any` value family, capability negotiation, ad-hoc and prepared
//! statement messages, and message framing. Message bodies are the
//! [`prost`] structs in [`mysqlx`]; the other modules convert them into
//! checked types.
//!
//! # Modules
//!
//! - [`value`] - Native literal values supplied by callers
//! - [`scalar`] / [`datatypes`] - Wire representation of `Scalar` and `Any`
//! - [`codec`] - Conversion between literals and wire values
//! - [`handshake`] - Capability negotiation
//! - [`sql`] - Ad-hoc `StmtExecute`
//! - [`prepare`] - Prepared statement lifecycle and its messages
//! - [`notice`] / [`resultset`] - Server notices and result sets
//! - [`message`] - Client and server message envelopes
//! - [`mysqlx`] - Protobuf message definitions
//! - [`framing`] - Length-prefixed typed frames
//! - [`error`] - Protocol error types
//!
//! # Example
//!
//! ```ignore
//! use xdevapi_proto::{codec, Literal};
//!
//! let wire = codec::encode(&Literal::array([1i64, 2, 3]));
//! let bytes = wire.to_bytes();
//! let back = codec::decode(&xdevapi_proto::WireValue::decode(&bytes).unwrap()).unwrap();
//! assert_eq!(back, Literal::array([1i64, 2, 3]));
//! ```

pub mod codec;
pub mod datatypes;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod message;
pub mod mysqlx;
pub mod notice;
pub mod prepare;
pub mod resultset;
pub mod scalar;
pub mod sql;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use codec::{IntegerPolicy, MAX_SAFE_INTEGER};
pub use datatypes::WireValue;
pub use framing::Frame;
pub use handshake::{
    build_capability_set, parse_capability_set, parse_capability_set_with, Capability,
    CapabilitySet,
};
pub use message::{AuthenticateStart, ClientMessage, ServerError, ServerMessage};
pub use notice::{Notice, NoticeFrame};
pub use prepare::{
    CommandDefinition, DeallocateRequest, ExecuteRequest, PrepareRequest, PreparedStatement,
    SessionScope, StatementId, StatementState,
};
pub use resultset::{ColumnMetaData, Row};
pub use scalar::ScalarValue;
pub use sql::{Namespace, StmtExecute};
pub use value::Literal;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_through_frame() {
        let stmt = StmtExecute::new("SELECT ?").with_args(&[Literal::from(u64::MAX)]);
        let message = ClientMessage::StmtExecute(stmt);

        let mut buf = framing::encode_frame(message.message_type(), &message.to_payload()).unwrap();
        let frame = framing::decode_frame(&mut buf, framing::MAX_MESSAGE_SIZE)
            .unwrap()
            .unwrap();

        match ClientMessage::decode(frame.message_type, &frame.payload).unwrap() {
            ClientMessage::StmtExecute(decoded) => {
                assert_eq!(codec::decode(&decoded.args[0]).unwrap(), Literal::UInt(u64::MAX));
            }
            other => panic!("Expected StmtExecute, got {other:?}"),
        }
    }
}
