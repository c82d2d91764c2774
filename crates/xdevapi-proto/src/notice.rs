//! Server notices (`Mysqlx.Notice`).
//!
//! Notices can arrive between any two messages of a response. The ones that
//! matter to statement execution are warnings and session state changes
//! (rows affected, generated ids).

use bytes::Bytes;
use prost::Message;

use crate::mysqlx::notice as pb;
use crate::scalar::ScalarValue;
use crate::Error;

/// `Frame.type` values.
pub mod frame_type {
    /// [`super::Warning`].
    pub const WARNING: u32 = 1;
    /// Session variable changed.
    pub const SESSION_VARIABLE_CHANGED: u32 = 2;
    /// [`super::SessionStateChanged`].
    pub const SESSION_STATE_CHANGED: u32 = 3;
    /// Group replication state changed.
    pub const GROUP_REPLICATION_STATE_CHANGED: u32 = 4;
    /// Sent once after connecting.
    pub const SERVER_HELLO: u32 = 5;
}

/// `SessionStateChanged.param` values.
pub mod state_param {
    /// Current schema changed.
    pub const CURRENT_SCHEMA: u32 = 1;
    /// Account password has expired.
    pub const ACCOUNT_EXPIRED: u32 = 2;
    /// `LAST_INSERT_ID()` after an insert.
    pub const GENERATED_INSERT_ID: u32 = 3;
    /// Rows affected by a statement.
    pub const ROWS_AFFECTED: u32 = 4;
    /// Rows found by a statement.
    pub const ROWS_FOUND: u32 = 5;
    /// Rows matched by an update.
    pub const ROWS_MATCHED: u32 = 6;
    /// Transaction committed.
    pub const TRX_COMMITTED: u32 = 7;
    /// Transaction rolled back.
    pub const TRX_ROLLEDBACK: u32 = 9;
    /// Server produced an info message.
    pub const PRODUCED_MESSAGE: u32 = 10;
    /// Connection id assigned by the server.
    pub const CLIENT_ID_ASSIGNED: u32 = 11;
    /// Document ids generated by an insert.
    pub const GENERATED_DOCUMENT_IDS: u32 = 12;
}

/// Whether a notice concerns the session or only the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Session-wide.
    Global,
    /// Current message only.
    Local,
}

/// Severity of a [`Warning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningLevel {
    /// Informational note.
    Note,
    /// Warning.
    Warning,
    /// Error that did not abort the statement.
    Error,
}

/// A warning attached to the current statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Severity.
    pub level: WarningLevel,
    /// Server error code.
    pub code: u32,
    /// Message text.
    pub msg: String,
}

/// A session state change and its values.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStateChanged {
    /// One of the [`state_param`] constants.
    pub param: u32,
    /// Values for the parameter; most carry exactly one.
    pub values: Vec<ScalarValue>,
}

impl SessionStateChanged {
    /// The first value as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        self.values.first().and_then(ScalarValue::as_u64)
    }
}

/// A decoded notice.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Warning for the current statement.
    Warning(Warning),
    /// Session variable changed.
    SessionVariableChanged {
        /// Variable name.
        param: String,
        /// New value, if any.
        value: Option<ScalarValue>,
    },
    /// Session state changed.
    SessionStateChanged(SessionStateChanged),
    /// A notice type this client does not interpret.
    Other {
        /// `Frame.type`.
        frame_type: u32,
        /// Raw payload.
        payload: Bytes,
    },
}

impl WarningLevel {
    fn to_proto(self) -> u32 {
        match self {
            WarningLevel::Note => 1,
            WarningLevel::Warning => 2,
            WarningLevel::Error => 3,
        }
    }

    /// Unknown levels read as `Warning`, the protocol default.
    fn from_proto(level: Option<u32>) -> Self {
        match level {
            Some(1) => WarningLevel::Note,
            Some(3) => WarningLevel::Error,
            _ => WarningLevel::Warning,
        }
    }
}

/// `Mysqlx.Notice.Frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeFrame {
    /// `Frame.type`.
    pub frame_type: u32,
    /// Scope, global when absent.
    pub scope: Scope,
    /// Encoded notice body.
    pub payload: Bytes,
}

impl NoticeFrame {
    /// A local session state change carrying one value.
    pub fn session_state(param: u32, value: ScalarValue) -> Self {
        let payload = pb::SessionStateChanged {
            param: Some(param),
            value: vec![value.to_proto()],
        };
        Self {
            frame_type: frame_type::SESSION_STATE_CHANGED,
            scope: Scope::Local,
            payload: Bytes::from(payload.encode_to_vec()),
        }
    }

    /// A local warning.
    pub fn warning(level: WarningLevel, code: u32, msg: &str) -> Self {
        let payload = pb::Warning {
            level: Some(level.to_proto()),
            code: Some(code),
            msg: Some(msg.to_string()),
        };
        Self {
            frame_type: frame_type::WARNING,
            scope: Scope::Local,
            payload: Bytes::from(payload.encode_to_vec()),
        }
    }

    /// Encode the frame body.
    pub fn to_bytes(&self) -> Bytes {
        let scope = match self.scope {
            Scope::Global => 1,
            Scope::Local => 2,
        };
        let frame = pb::Frame {
            r#type: Some(self.frame_type),
            scope: Some(scope),
            payload: Some(self.payload.clone()),
        };
        Bytes::from(frame.encode_to_vec())
    }

    /// Decode a frame body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let frame = pb::Frame::decode(data)?;
        Ok(Self {
            frame_type: frame.r#type.ok_or_else(|| Error::decode("missing notice type"))?,
            scope: match frame.scope {
                Some(2) => Scope::Local,
                _ => Scope::Global,
            },
            payload: frame.payload.unwrap_or_default(),
        })
    }

    /// Decode the payload according to the frame type.
    pub fn notice(&self) -> Result<Notice, Error> {
        match self.frame_type {
            frame_type::WARNING => decode_warning(&self.payload)
                .map(Notice::Warning)
                .map_err(|e| e.within("warning")),
            frame_type::SESSION_VARIABLE_CHANGED => decode_variable_changed(&self.payload)
                .map_err(|e| e.within("session_variable_changed")),
            frame_type::SESSION_STATE_CHANGED => decode_state_changed(&self.payload)
                .map(Notice::SessionStateChanged)
                .map_err(|e| e.within("session_state_changed")),
            other => Ok(Notice::Other {
                frame_type: other,
                payload: self.payload.clone(),
            }),
        }
    }
}

fn decode_warning(data: &[u8]) -> Result<Warning, Error> {
    let warning = pb::Warning::decode(data)?;
    Ok(Warning {
        level: WarningLevel::from_proto(warning.level),
        code: warning.code.ok_or_else(|| Error::decode("missing warning code"))?,
        msg: warning.msg.unwrap_or_default(),
    })
}

fn decode_variable_changed(data: &[u8]) -> Result<Notice, Error> {
    let changed = pb::SessionVariableChanged::decode(data)?;
    let value = changed
        .value
        .map(ScalarValue::from_proto)
        .transpose()
        .map_err(|e| e.within("value"))?;
    Ok(Notice::SessionVariableChanged {
        param: changed.param.ok_or_else(|| Error::decode("missing variable name"))?,
        value,
    })
}

fn decode_state_changed(data: &[u8]) -> Result<SessionStateChanged, Error> {
    let changed = pb::SessionStateChanged::decode(data)?;
    let values = changed
        .value
        .into_iter()
        .enumerate()
        .map(|(i, value)| ScalarValue::from_proto(value).map_err(|e| e.within(&format!("value[{i}]"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SessionStateChanged {
        param: changed.param.ok_or_else(|| Error::decode("missing state parameter"))?,
        values,
    })
}
