//! Client and server message envelopes.
//!
//! Every message travels as a frame with a one-byte type. The type spaces of
//! the two directions overlap, so a payload can only be interpreted once the
//! direction is known.

use bytes::Bytes;
use prost::Message;

use crate::handshake::CapabilitySet;
use crate::mysqlx::{connection, session, ErrorMessage, OkMessage};
use crate::notice::NoticeFrame;
use crate::prepare::{DeallocateRequest, ExecuteRequest, PrepareRequest};
use crate::resultset::{ColumnMetaData, Row};
use crate::sql::StmtExecute;
use crate::Error;

/// Message types sent by the client.
pub mod client_type {
    /// `Connection.CapabilitiesGet`.
    pub const CON_CAPABILITIES_GET: u8 = 1;
    /// `Connection.CapabilitiesSet`.
    pub const CON_CAPABILITIES_SET: u8 = 2;
    /// `Connection.Close`.
    pub const CON_CLOSE: u8 = 3;
    /// `Session.AuthenticateStart`.
    pub const SESS_AUTHENTICATE_START: u8 = 4;
    /// `Session.AuthenticateContinue`.
    pub const SESS_AUTHENTICATE_CONTINUE: u8 = 5;
    /// `Session.Reset`.
    pub const SESS_RESET: u8 = 6;
    /// `Session.Close`.
    pub const SESS_CLOSE: u8 = 7;
    /// `Sql.StmtExecute`.
    pub const SQL_STMT_EXECUTE: u8 = 12;
    /// `Prepare.Prepare`.
    pub const PREPARE_PREPARE: u8 = 40;
    /// `Prepare.Execute`.
    pub const PREPARE_EXECUTE: u8 = 41;
    /// `Prepare.Deallocate`.
    pub const PREPARE_DEALLOCATE: u8 = 42;
}

/// Message types sent by the server.
pub mod server_type {
    /// `Ok`.
    pub const OK: u8 = 0;
    /// `Error`.
    pub const ERROR: u8 = 1;
    /// `Connection.Capabilities`.
    pub const CONN_CAPABILITIES: u8 = 2;
    /// `Session.AuthenticateContinue`.
    pub const SESS_AUTHENTICATE_CONTINUE: u8 = 3;
    /// `Session.AuthenticateOk`.
    pub const SESS_AUTHENTICATE_OK: u8 = 4;
    /// `Notice.Frame`.
    pub const NOTICE: u8 = 11;
    /// `Resultset.ColumnMetaData`.
    pub const RESULTSET_COLUMN_META_DATA: u8 = 12;
    /// `Resultset.Row`.
    pub const RESULTSET_ROW: u8 = 13;
    /// `Resultset.FetchDone`.
    pub const RESULTSET_FETCH_DONE: u8 = 14;
    /// `Resultset.FetchSuspended`.
    pub const RESULTSET_FETCH_SUSPENDED: u8 = 15;
    /// `Resultset.FetchDoneMoreResultsets`.
    pub const RESULTSET_FETCH_DONE_MORE_RESULTSETS: u8 = 16;
    /// `Sql.StmtExecuteOk`.
    pub const SQL_STMT_EXECUTE_OK: u8 = 17;
    /// `Resultset.FetchDoneMoreOutParams`.
    pub const RESULTSET_FETCH_DONE_MORE_OUT_PARAMS: u8 = 18;
}

/// Opens an authentication exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticateStart {
    /// Mechanism name, e.g. `PLAIN` or `SHA256_MEMORY`.
    pub mech_name: String,
    /// Mechanism data sent with the first message.
    pub auth_data: Option<Bytes>,
    /// Initial response for mechanisms that support it.
    pub initial_response: Option<Bytes>,
}

impl AuthenticateStart {
    /// Start the named mechanism without data.
    pub fn new(mech_name: impl Into<String>) -> Self {
        Self {
            mech_name: mech_name.into(),
            auth_data: None,
            initial_response: None,
        }
    }

    /// Attach mechanism data.
    pub fn with_auth_data(mut self, data: impl Into<Bytes>) -> Self {
        self.auth_data = Some(data.into());
        self
    }

    fn to_bytes(&self) -> Bytes {
        let message = session::AuthenticateStart {
            mech_name: Some(self.mech_name.clone()),
            auth_data: self.auth_data.clone(),
            initial_response: self.initial_response.clone(),
        };
        Bytes::from(message.encode_to_vec())
    }

    fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = session::AuthenticateStart::decode(data)?;
        Ok(Self {
            mech_name: message.mech_name.ok_or_else(|| Error::decode("missing mech_name"))?,
            auth_data: message.auth_data,
            initial_response: message.initial_response,
        })
    }
}

/// An error reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    /// A fatal error closes the session.
    pub fatal: bool,
    /// MySQL error code.
    pub code: u32,
    /// SQLSTATE.
    pub sql_state: String,
    /// Message text.
    pub msg: String,
}

impl ServerError {
    /// Create a non-fatal error.
    pub fn new(code: u32, sql_state: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            fatal: false,
            code,
            sql_state: sql_state.into(),
            msg: msg.into(),
        }
    }

    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let message = ErrorMessage {
            severity: Some(u32::from(self.fatal)),
            code: Some(self.code),
            msg: Some(self.msg.as_bytes().to_vec()),
            sql_state: Some(self.sql_state.clone()),
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body. Absent fields read as empty.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = ErrorMessage::decode(data)?;
        Ok(Self {
            fatal: message.severity == Some(1),
            code: message.code.unwrap_or_default(),
            sql_state: message.sql_state.unwrap_or_default(),
            msg: message
                .msg
                .map(|msg| String::from_utf8_lossy(&msg).into_owned())
                .unwrap_or_default(),
        })
    }
}

/// A message sent by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Ask for the server's capabilities.
    CapabilitiesGet,
    /// Request capability changes, evaluated in order.
    CapabilitiesSet(CapabilitySet),
    /// Close the connection.
    ConnectionClose,
    /// Start authentication.
    AuthenticateStart(AuthenticateStart),
    /// Answer an authentication challenge.
    AuthenticateContinue(Bytes),
    /// Reset the session.
    SessionReset {
        /// Keep the session authenticated.
        keep_open: bool,
    },
    /// Close the session but keep the connection.
    SessionClose,
    /// Run an ad-hoc statement.
    StmtExecute(StmtExecute),
    /// Prepare a statement.
    Prepare(PrepareRequest),
    /// Execute a prepared statement.
    Execute(ExecuteRequest),
    /// Release a prepared statement.
    Deallocate(DeallocateRequest),
}

impl ClientMessage {
    /// Wire type byte.
    pub fn message_type(&self) -> u8 {
        match self {
            ClientMessage::CapabilitiesGet => client_type::CON_CAPABILITIES_GET,
            ClientMessage::CapabilitiesSet(_) => client_type::CON_CAPABILITIES_SET,
            ClientMessage::ConnectionClose => client_type::CON_CLOSE,
            ClientMessage::AuthenticateStart(_) => client_type::SESS_AUTHENTICATE_START,
            ClientMessage::AuthenticateContinue(_) => client_type::SESS_AUTHENTICATE_CONTINUE,
            ClientMessage::SessionReset { .. } => client_type::SESS_RESET,
            ClientMessage::SessionClose => client_type::SESS_CLOSE,
            ClientMessage::StmtExecute(_) => client_type::SQL_STMT_EXECUTE,
            ClientMessage::Prepare(_) => client_type::PREPARE_PREPARE,
            ClientMessage::Execute(_) => client_type::PREPARE_EXECUTE,
            ClientMessage::Deallocate(_) => client_type::PREPARE_DEALLOCATE,
        }
    }

    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::CapabilitiesGet => "CapabilitiesGet",
            ClientMessage::CapabilitiesSet(_) => "CapabilitiesSet",
            ClientMessage::ConnectionClose => "ConnectionClose",
            ClientMessage::AuthenticateStart(_) => "AuthenticateStart",
            ClientMessage::AuthenticateContinue(_) => "AuthenticateContinue",
            ClientMessage::SessionReset { .. } => "SessionReset",
            ClientMessage::SessionClose => "SessionClose",
            ClientMessage::StmtExecute(_) => "StmtExecute",
            ClientMessage::Prepare(_) => "Prepare",
            ClientMessage::Execute(_) => "Execute",
            ClientMessage::Deallocate(_) => "Deallocate",
        }
    }

    /// Encode the message body.
    pub fn to_payload(&self) -> Bytes {
        match self {
            ClientMessage::CapabilitiesGet
            | ClientMessage::ConnectionClose
            | ClientMessage::SessionClose => Bytes::new(),
            ClientMessage::CapabilitiesSet(set) => {
                let message = connection::CapabilitiesSet {
                    capabilities: Some(set.to_proto()),
                };
                Bytes::from(message.encode_to_vec())
            }
            ClientMessage::AuthenticateStart(start) => start.to_bytes(),
            ClientMessage::AuthenticateContinue(data) => auth_data_bytes(Some(data)),
            ClientMessage::SessionReset { keep_open } => {
                let message = session::Reset {
                    keep_open: Some(*keep_open),
                };
                Bytes::from(message.encode_to_vec())
            }
            ClientMessage::StmtExecute(stmt) => stmt.to_bytes(),
            ClientMessage::Prepare(request) => request.to_bytes(),
            ClientMessage::Execute(request) => request.to_bytes(),
            ClientMessage::Deallocate(request) => request.to_bytes(),
        }
    }

    /// Decode a body received with the given type byte.
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Self, Error> {
        let message = match message_type {
            client_type::CON_CAPABILITIES_GET => ClientMessage::CapabilitiesGet,
            client_type::CON_CAPABILITIES_SET => {
                let message = connection::CapabilitiesSet::decode(payload)?;
                let set = match message.capabilities {
                    Some(capabilities) => CapabilitySet::from_proto(capabilities)?,
                    None => CapabilitySet::new(),
                };
                ClientMessage::CapabilitiesSet(set)
            }
            client_type::CON_CLOSE => ClientMessage::ConnectionClose,
            client_type::SESS_AUTHENTICATE_START => {
                ClientMessage::AuthenticateStart(AuthenticateStart::decode(payload)?)
            }
            client_type::SESS_AUTHENTICATE_CONTINUE => {
                ClientMessage::AuthenticateContinue(decode_auth_data(payload)?.unwrap_or_default())
            }
            client_type::SESS_RESET => ClientMessage::SessionReset {
                keep_open: session::Reset::decode(payload)?.keep_open.unwrap_or(false),
            },
            client_type::SESS_CLOSE => ClientMessage::SessionClose,
            client_type::SQL_STMT_EXECUTE => ClientMessage::StmtExecute(StmtExecute::decode(payload)?),
            client_type::PREPARE_PREPARE => ClientMessage::Prepare(PrepareRequest::decode(payload)?),
            client_type::PREPARE_EXECUTE => ClientMessage::Execute(ExecuteRequest::decode(payload)?),
            client_type::PREPARE_DEALLOCATE => {
                ClientMessage::Deallocate(DeallocateRequest::decode(payload)?)
            }
            other => {
                return Err(Error::InvalidMessage(format!(
                    "unknown client message type {other}"
                )))
            }
        };
        Ok(message)
    }
}

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Generic success, with an optional message.
    Ok(Option<String>),
    /// Request failed.
    Error(ServerError),
    /// Reply to `CapabilitiesGet`.
    Capabilities(CapabilitySet),
    /// Authentication challenge.
    AuthenticateContinue(Bytes),
    /// Authentication succeeded.
    AuthenticateOk(Option<Bytes>),
    /// Out-of-band notice.
    Notice(NoticeFrame),
    /// Column description.
    ColumnMetaData(ColumnMetaData),
    /// Result row.
    Row(Row),
    /// End of the last result set.
    FetchDone,
    /// A cursor fetch stopped early.
    FetchSuspended,
    /// End of a result set, more follow.
    FetchDoneMoreResultsets,
    /// End of a result set, output parameters follow.
    FetchDoneMoreOutParams,
    /// Statement finished.
    StmtExecuteOk,
}

impl ServerMessage {
    /// Wire type byte.
    pub fn message_type(&self) -> u8 {
        match self {
            ServerMessage::Ok(_) => server_type::OK,
            ServerMessage::Error(_) => server_type::ERROR,
            ServerMessage::Capabilities(_) => server_type::CONN_CAPABILITIES,
            ServerMessage::AuthenticateContinue(_) => server_type::SESS_AUTHENTICATE_CONTINUE,
            ServerMessage::AuthenticateOk(_) => server_type::SESS_AUTHENTICATE_OK,
            ServerMessage::Notice(_) => server_type::NOTICE,
            ServerMessage::ColumnMetaData(_) => server_type::RESULTSET_COLUMN_META_DATA,
            ServerMessage::Row(_) => server_type::RESULTSET_ROW,
            ServerMessage::FetchDone => server_type::RESULTSET_FETCH_DONE,
            ServerMessage::FetchSuspended => server_type::RESULTSET_FETCH_SUSPENDED,
            ServerMessage::FetchDoneMoreResultsets => server_type::RESULTSET_FETCH_DONE_MORE_RESULTSETS,
            ServerMessage::FetchDoneMoreOutParams => server_type::RESULTSET_FETCH_DONE_MORE_OUT_PARAMS,
            ServerMessage::StmtExecuteOk => server_type::SQL_STMT_EXECUTE_OK,
        }
    }

    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::Ok(_) => "Ok",
            ServerMessage::Error(_) => "Error",
            ServerMessage::Capabilities(_) => "Capabilities",
            ServerMessage::AuthenticateContinue(_) => "AuthenticateContinue",
            ServerMessage::AuthenticateOk(_) => "AuthenticateOk",
            ServerMessage::Notice(_) => "Notice",
            ServerMessage::ColumnMetaData(_) => "ColumnMetaData",
            ServerMessage::Row(_) => "Row",
            ServerMessage::FetchDone => "FetchDone",
            ServerMessage::FetchSuspended => "FetchSuspended",
            ServerMessage::FetchDoneMoreResultsets => "FetchDoneMoreResultsets",
            ServerMessage::FetchDoneMoreOutParams => "FetchDoneMoreOutParams",
            ServerMessage::StmtExecuteOk => "StmtExecuteOk",
        }
    }

    /// Check if this message ends a response.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerMessage::Ok(_)
                | ServerMessage::Error(_)
                | ServerMessage::Capabilities(_)
                | ServerMessage::AuthenticateContinue(_)
                | ServerMessage::AuthenticateOk(_)
                | ServerMessage::StmtExecuteOk
        )
    }

    /// Encode the message body.
    pub fn to_payload(&self) -> Bytes {
        match self {
            ServerMessage::Ok(msg) => {
                let message = OkMessage { msg: msg.clone() };
                Bytes::from(message.encode_to_vec())
            }
            ServerMessage::Error(error) => error.to_bytes(),
            ServerMessage::Capabilities(set) => set.to_bytes(),
            ServerMessage::AuthenticateContinue(data) => auth_data_bytes(Some(data)),
            ServerMessage::AuthenticateOk(data) => auth_data_bytes(data.as_ref()),
            ServerMessage::Notice(frame) => frame.to_bytes(),
            ServerMessage::ColumnMetaData(meta) => meta.to_bytes(),
            ServerMessage::Row(row) => row.to_bytes(),
            ServerMessage::FetchDone
            | ServerMessage::FetchSuspended
            | ServerMessage::FetchDoneMoreResultsets
            | ServerMessage::FetchDoneMoreOutParams
            | ServerMessage::StmtExecuteOk => Bytes::new(),
        }
    }

    /// Decode a body received with the given type byte.
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Self, Error> {
        let message = match message_type {
            server_type::OK => ServerMessage::Ok(OkMessage::decode(payload)?.msg),
            server_type::ERROR => ServerMessage::Error(ServerError::decode(payload)?),
            server_type::CONN_CAPABILITIES => {
                ServerMessage::Capabilities(CapabilitySet::decode(payload)?)
            }
            server_type::SESS_AUTHENTICATE_CONTINUE => ServerMessage::AuthenticateContinue(
                decode_auth_data(payload)?
                    .ok_or_else(|| Error::decode("missing auth_data"))?,
            ),
            server_type::SESS_AUTHENTICATE_OK => {
                ServerMessage::AuthenticateOk(decode_auth_data(payload)?)
            }
            server_type::NOTICE => ServerMessage::Notice(NoticeFrame::decode(payload)?),
            server_type::RESULTSET_COLUMN_META_DATA => {
                ServerMessage::ColumnMetaData(ColumnMetaData::decode(payload)?)
            }
            server_type::RESULTSET_ROW => ServerMessage::Row(Row::decode(payload)?),
            server_type::RESULTSET_FETCH_DONE => ServerMessage::FetchDone,
            server_type::RESULTSET_FETCH_SUSPENDED => ServerMessage::FetchSuspended,
            server_type::RESULTSET_FETCH_DONE_MORE_RESULTSETS => ServerMessage::FetchDoneMoreResultsets,
            server_type::RESULTSET_FETCH_DONE_MORE_OUT_PARAMS => ServerMessage::FetchDoneMoreOutParams,
            server_type::SQL_STMT_EXECUTE_OK => ServerMessage::StmtExecuteOk,
            other => {
                return Err(Error::InvalidMessage(format!(
                    "unknown server message type {other}"
                )))
            }
        };
        Ok(message)
    }
}

fn auth_data_bytes(data: Option<&Bytes>) -> Bytes {
    let message = session::AuthData {
        auth_data: data.cloned(),
    };
    Bytes::from(message.encode_to_vec())
}

fn decode_auth_data(payload: &[u8]) -> Result<Option<Bytes>, Error> {
    Ok(session::AuthData::decode(payload)?.auth_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::build_capability_set;
    use crate::prepare::{CommandDefinition, PreparedStatement, SessionScope};
    use crate::value::Literal;

    fn client_roundtrip(message: ClientMessage) -> ClientMessage {
        ClientMessage::decode(message.message_type(), &message.to_payload()).unwrap()
    }

    fn server_roundtrip(message: ServerMessage) -> ServerMessage {
        ServerMessage::decode(message.message_type(), &message.to_payload()).unwrap()
    }

    #[test]
    fn test_client_type_ids() {
        assert_eq!(ClientMessage::CapabilitiesGet.message_type(), 1);
        assert_eq!(
            ClientMessage::StmtExecute(StmtExecute::new("SELECT 1")).message_type(),
            12
        );
        assert_eq!(
            ClientMessage::Deallocate(DeallocateRequest { stmt_id: 1 }).message_type(),
            42
        );
    }

    #[test]
    fn test_empty_bodies() {
        assert!(ClientMessage::CapabilitiesGet.to_payload().is_empty());
        assert!(ClientMessage::ConnectionClose.to_payload().is_empty());
        assert!(ServerMessage::StmtExecuteOk.to_payload().is_empty());
        assert!(ServerMessage::Ok(None).to_payload().is_empty());
    }

    #[test]
    fn test_capabilities_set_is_wrapped() {
        let set = build_capability_set([("tls", Literal::from(true))]);
        let message = ClientMessage::CapabilitiesSet(set.clone());

        // CapabilitiesSet { capabilities: Capabilities { ... } }
        let inner = set.to_bytes();
        let payload = message.to_payload();
        assert_eq!(payload[0], 0x0a);
        assert_eq!(&payload[2..], &inner[..]);

        assert_eq!(client_roundtrip(message.clone()), message);
    }

    #[test]
    fn test_prepare_messages_roundtrip() {
        let session = SessionScope::new(1);
        let mut statement = PreparedStatement::new(CommandDefinition::sql("SELECT ?")).bind(5i64);
        let prepare = ClientMessage::Prepare(statement.prepare(3, session).unwrap());
        assert_eq!(client_roundtrip(prepare.clone()), prepare);

        statement.mark_prepared(3, session).unwrap();
        let execute = ClientMessage::Execute(statement.execute(session).unwrap());
        assert_eq!(client_roundtrip(execute.clone()), execute);
    }

    #[test]
    fn test_authenticate_start_roundtrip() {
        let message = ClientMessage::AuthenticateStart(
            AuthenticateStart::new("PLAIN").with_auth_data(&b"db\0root\0secret"[..]),
        );
        assert_eq!(client_roundtrip(message.clone()), message);
    }

    #[test]
    fn test_server_error() {
        let error = ServerError {
            fatal: true,
            code: 1045,
            sql_state: "HY000".into(),
            msg: "Access denied".into(),
        };
        match server_roundtrip(ServerMessage::Error(error.clone())) {
            ServerMessage::Error(decoded) => assert_eq!(decoded, error),
            other => panic!("Expected Error, got {other:?}"),
        }
    }

    #[test]
    fn test_server_error_message_is_lossy() {
        let message = ErrorMessage {
            severity: Some(0),
            code: Some(1064),
            msg: Some(vec![b'n', b'e', b'a', b'r', b' ', 0xe9]),
            sql_state: Some("42000".into()),
        };
        let error = ServerError::decode(&message.encode_to_vec()).unwrap();
        assert!(!error.fatal);
        assert_eq!(error.msg, "near \u{fffd}");
        assert_eq!(error.sql_state, "42000");
    }

    #[test]
    fn test_session_reset_body() {
        let message = ClientMessage::SessionReset { keep_open: true };
        assert_eq!(&message.to_payload()[..], &[0x08, 0x01]);
        assert_eq!(client_roundtrip(message.clone()), message);
    }

    #[test]
    fn test_server_messages_roundtrip() {
        let messages = vec![
            ServerMessage::Ok(Some("bye!".into())),
            ServerMessage::AuthenticateContinue(Bytes::from_static(b"01234567890123456789")),
            ServerMessage::AuthenticateOk(None),
            ServerMessage::Row(Row::new([Bytes::from_static(b"\x02")])),
            ServerMessage::FetchDone,
            ServerMessage::FetchDoneMoreResultsets,
        ];
        for message in messages {
            assert_eq!(server_roundtrip(message.clone()), message);
        }
    }

    #[test]
    fn test_terminal_messages() {
        assert!(ServerMessage::StmtExecuteOk.is_terminal());
        assert!(ServerMessage::Ok(None).is_terminal());
        assert!(!ServerMessage::FetchDone.is_terminal());
        assert!(!ServerMessage::Row(Row::default()).is_terminal());
    }

    #[test]
    fn test_unknown_type() {
        let err = ServerMessage::decode(99, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
        let err = ClientMessage::decode(0, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_auth_continue_requires_data() {
        let err = ServerMessage::decode(server_type::SESS_AUTHENTICATE_CONTINUE, &[]).unwrap_err();
        assert!(err.is_decode());
    }
}
