//! Ad-hoc statement execution (`Mysqlx.Sql.StmtExecute`).

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use prost::Message;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::datatypes::WireValue;
use crate::mysqlx::sql as pb;
use crate::value::Literal;
use crate::Error;

/// Which server-side interpreter parses the statement text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Plain SQL.
    #[default]
    Sql,
    /// Administrative commands of the X Plugin (`list_objects`, `ensure_collection`, ...).
    Mysqlx,
    /// Legacy name of the administrative namespace.
    Xplugin,
}

impl Namespace {
    /// Name sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Sql => "sql",
            Namespace::Mysqlx => "mysqlx",
            Namespace::Xplugin => "xplugin",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql" => Ok(Namespace::Sql),
            "mysqlx" => Ok(Namespace::Mysqlx),
            "xplugin" => Ok(Namespace::Xplugin),
            other => Err(Error::decode(format!("unknown namespace `{other}`"))),
        }
    }
}

/// A one-shot statement: raw text plus positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct StmtExecute {
    /// Interpreter for `stmt`.
    pub namespace: Namespace,
    /// Statement text, sent as opaque bytes.
    pub stmt: Bytes,
    /// Positional arguments.
    pub args: Vec<WireValue>,
    /// Ask for column metadata without names and origin information.
    pub compact_metadata: bool,
}

impl StmtExecute {
    /// Create a SQL statement without arguments.
    pub fn new(stmt: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Sql,
            stmt: Bytes::from(stmt.into().into_bytes()),
            args: Vec::new(),
            compact_metadata: false,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Append arguments, encoding each literal.
    pub fn with_args<'a, I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = &'a Literal>,
    {
        self.args.extend(codec::encode_all(args));
        self
    }

    /// Request compact column metadata.
    pub fn with_compact_metadata(mut self, compact: bool) -> Self {
        self.compact_metadata = compact;
        self
    }

    /// Statement text, if it is valid UTF-8.
    pub fn stmt_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.stmt).ok()
    }

    /// Protobuf form of the request.
    pub fn to_proto(&self) -> pb::StmtExecute {
        pb::StmtExecute {
            stmt: Some(self.stmt.clone()),
            args: self.args.iter().map(WireValue::to_proto).collect(),
            namespace: Some(self.namespace.as_str().to_string()),
            compact_metadata: Some(self.compact_metadata),
        }
    }

    /// Interpret a decoded request. A missing namespace means SQL.
    pub fn from_proto(stmt: pb::StmtExecute) -> Result<Self, Error> {
        let namespace = match stmt.namespace {
            Some(name) => name.parse::<Namespace>().map_err(|e| e.within("namespace"))?,
            None => Namespace::Sql,
        };
        let args = stmt
            .args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| WireValue::from_proto(arg).map_err(|e| e.within(&format!("args[{i}]"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            namespace,
            stmt: stmt.stmt.ok_or_else(|| Error::decode("missing stmt"))?,
            args,
            compact_metadata: stmt.compact_metadata.unwrap_or(false),
        })
    }

    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_proto().encode_to_vec())
    }

    /// Decode a message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        Self::from_proto(pb::StmtExecute::decode(data)?)
    }
}
