//! Client error types.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection cannot carry requests in its current state.
    #[error("connection is {state:?}{}", error_suffix(.last_error))]
    ConnectionState {
        /// State at the time of the call.
        state: ConnectionState,
        /// Last error reported by the transport, if any.
        last_error: Option<String>,
    },

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] xdevapi_proto::Error),

    /// The server rejected the request.
    #[error("server error {code} ({sql_state}): {message}")]
    Server {
        /// MySQL error code.
        code: u32,
        /// SQLSTATE.
        sql_state: String,
        /// Message text.
        message: String,
        /// The server closed the session.
        fatal: bool,
    },

    /// Authentication failed or the mechanism is unusable.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Transport I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,
}

impl Error {
    /// Check if this error came from the server.
    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// Check if this error is a protocol usage error.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Protocol(e) if e.is_usage())
    }

    /// Check if this error means the connection cannot be used any more.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Server { fatal, .. } => *fatal,
            Error::Connection(_) | Error::ConnectionState { .. } | Error::Io(_) | Error::Timeout => true,
            Error::Protocol(xdevapi_proto::Error::InvalidMessage(_)) => true,
            _ => false,
        }
    }
}

impl From<xdevapi_proto::ServerError> for Error {
    fn from(error: xdevapi_proto::ServerError) -> Self {
        Error::Server {
            code: error.code,
            sql_state: error.sql_state,
            message: error.msg,
            fatal: error.fatal,
        }
    }
}

fn error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(": {e}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_message() {
        let err = Error::ConnectionState {
            state: ConnectionState::Closed,
            last_error: Some("broken pipe".into()),
        };
        assert_eq!(err.to_string(), "connection is Closed: broken pipe");

        let err = Error::ConnectionState {
            state: ConnectionState::Closed,
            last_error: None,
        };
        assert_eq!(err.to_string(), "connection is Closed");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_server_error_conversion() {
        let err = Error::from(xdevapi_proto::ServerError::new(1146, "42S02", "Table 'x' doesn't exist"));
        assert!(err.is_server());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "server error 1146 (42S02): Table 'x' doesn't exist");
    }

    #[test]
    fn test_usage_is_not_fatal() {
        let err = Error::from(xdevapi_proto::Error::usage("statement is not prepared"));
        assert!(err.is_usage());
        assert!(!err.is_fatal());
    }
}
