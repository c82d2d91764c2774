//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The caller invoked an operation the current state does not allow.
    #[error("usage error: {0}")]
    Usage(String),

    /// Malformed wire data.
    #[error("decode error at `{path}`: {reason}")]
    Decode {
        /// Field path of the value that failed (e.g. `obj.list[1].scalar`).
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A number cannot be represented exactly under the active integer policy.
    #[error("precision error at `{path}`: {reason}")]
    Precision {
        /// Field path of the offending value.
        path: String,
        /// Why the conversion would lose information.
        reason: String,
    },

    /// Invalid message envelope or frame.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl Error {
    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    /// Create a decode error rooted at the current field.
    pub fn decode(reason: impl Into<String>) -> Self {
        Error::Decode {
            path: String::new(),
            reason: reason.into(),
        }
    }

    /// Create a precision error rooted at the current field.
    pub fn precision(reason: impl Into<String>) -> Self {
        Error::Precision {
            path: String::new(),
            reason: reason.into(),
        }
    }

    /// Prefix the field path of a decode or precision error with `segment`.
    ///
    /// Called while unwinding out of nested values, so the outermost segment
    /// ends up first. Segments starting with `[` are joined without a dot.
    pub fn within(mut self, segment: &str) -> Self {
        if let Error::Decode { path, .. } | Error::Precision { path, .. } = &mut self {
            *path = if path.is_empty() {
                segment.to_string()
            } else if path.starts_with('[') {
                format!("{segment}{path}")
            } else {
                format!("{segment}.{path}")
            };
        }
        self
    }

    /// The field path carried by decode and precision errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Decode { path, .. } | Error::Precision { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Check if this is a usage error.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// Check if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// Check if this is a precision error.
    pub fn is_precision(&self) -> bool {
        matches!(self, Error::Precision { .. })
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_built_outside_in() {
        let err = Error::decode("unknown scalar type 99")
            .within("scalar")
            .within("[1]")
            .within("list")
            .within("obj");

        assert_eq!(err.path(), Some("obj.list[1].scalar"));
        assert_eq!(
            err.to_string(),
            "decode error at `obj.list[1].scalar`: unknown scalar type 99"
        );
    }

    #[test]
    fn test_bracketed_segment_joins_without_dot() {
        let err = Error::decode("bad utf-8")
            .within("[\"doc.formats\"]")
            .within("capabilities");
        assert_eq!(err.path(), Some("capabilities[\"doc.formats\"]"));
    }

    #[test]
    fn test_malformed_protobuf_is_decode_error() {
        use prost::Message;

        // Length prefix claims 5 bytes, only 1 follows.
        let err: Error = crate::mysqlx::datatypes::Any::decode(&[0x12, 0x05, 0x08][..])
            .unwrap_err()
            .into();
        assert!(err.is_decode());
        assert_eq!(err.path(), Some(""));
    }

    #[test]
    fn test_within_leaves_other_errors_alone() {
        let err = Error::usage("statement is not prepared").within("args");
        assert_eq!(err, Error::Usage("statement is not prepared".into()));
        assert_eq!(err.path(), None);
    }
}
