//! Prepared statement lifecycle (`Mysqlx.Prepare`).
//!
//! A [`PreparedStatement`] starts `Unprepared`. The session layer allocates a
//! statement id, sends the [`PrepareRequest`] built by
//! [`PreparedStatement::prepare`] and, once the server answers `Ok`, records the
//! transition with [`PreparedStatement::mark_prepared`]. Deallocation follows
//! the same build / confirm pattern. The builders never change state, so a
//! failed exchange leaves the statement where it was.
//!
//! Statement ids are only meaningful on the session that issued them. A
//! prepared statement remembers that session as a [`SessionScope`], and
//! execute or deallocate requests built for any other scope are refused.

use std::fmt;

use bytes::Bytes;
use prost::Message;

use crate::codec;
use crate::datatypes::WireValue;
use crate::mysqlx::prepare as pb;
use crate::sql::StmtExecute;
use crate::value::Literal;
use crate::Error;

/// Server-side statement identifier, unique per connection.
pub type StatementId = u32;

/// `Prepare.OneOfMessage.type` discriminators.
pub mod command_type {
    /// `Mysqlx.Crud.Find`.
    pub const FIND: u32 = 0;
    /// `Mysqlx.Crud.Insert`.
    pub const INSERT: u32 = 1;
    /// `Mysqlx.Crud.Update`.
    pub const UPDATE: u32 = 2;
    /// `Mysqlx.Crud.Delete`.
    pub const DELETE: u32 = 4;
    /// `Mysqlx.Sql.StmtExecute`.
    pub const STMT: u32 = 5;
}

/// The server-side session a statement id belongs to.
///
/// `token` tells connections apart; `generation` changes every time the
/// session is reset, which drops all of its prepared statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionScope {
    /// Unique per connection within the process.
    pub token: u64,
    /// Bumped by each session reset.
    pub generation: u64,
}

impl SessionScope {
    /// Scope of a fresh session.
    pub fn new(token: u64) -> Self {
        Self { token, generation: 0 }
    }

    /// The scope after a session reset.
    pub fn next_generation(self) -> Self {
        Self {
            token: self.token,
            generation: self.generation + 1,
        }
    }
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}/{}", self.token, self.generation)
    }
}

/// What is being prepared.
///
/// CRUD payloads are produced by the query builder and carried as encoded
/// message bodies; they are forwarded without being inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandDefinition {
    /// Encoded `Mysqlx.Crud.Find` body.
    Find(Bytes),
    /// Encoded `Mysqlx.Crud.Insert` body.
    Insert(Bytes),
    /// Encoded `Mysqlx.Crud.Update` body.
    Update(Bytes),
    /// Encoded `Mysqlx.Crud.Delete` body.
    Delete(Bytes),
    /// A SQL statement with `?` placeholders.
    Stmt(StmtExecute),
}

impl CommandDefinition {
    /// Prepare a SQL statement.
    pub fn sql(stmt: impl Into<String>) -> Self {
        CommandDefinition::Stmt(StmtExecute::new(stmt))
    }

    /// The `OneOfMessage.type` value.
    pub fn type_id(&self) -> u32 {
        match self {
            CommandDefinition::Find(_) => command_type::FIND,
            CommandDefinition::Insert(_) => command_type::INSERT,
            CommandDefinition::Update(_) => command_type::UPDATE,
            CommandDefinition::Delete(_) => command_type::DELETE,
            CommandDefinition::Stmt(_) => command_type::STMT,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandDefinition::Find(_) => "find",
            CommandDefinition::Insert(_) => "insert",
            CommandDefinition::Update(_) => "update",
            CommandDefinition::Delete(_) => "delete",
            CommandDefinition::Stmt(_) => "stmt",
        }
    }

    fn to_proto(&self) -> pb::OneOfMessage {
        let mut message = pb::OneOfMessage {
            r#type: Some(self.type_id()),
            ..Default::default()
        };
        match self {
            CommandDefinition::Find(body) => message.find = Some(body.clone()),
            CommandDefinition::Insert(body) => message.insert = Some(body.clone()),
            CommandDefinition::Update(body) => message.update = Some(body.clone()),
            CommandDefinition::Delete(body) => message.delete = Some(body.clone()),
            CommandDefinition::Stmt(stmt) => message.stmt_execute = Some(stmt.to_proto()),
        }
        message
    }

    fn from_proto(message: pb::OneOfMessage) -> Result<Self, Error> {
        let type_id = message
            .r#type
            .ok_or_else(|| Error::decode("missing command type"))?;
        let missing = |name: &str| Error::decode(format!("missing {name} payload"));

        match type_id {
            command_type::FIND => message.find.map(CommandDefinition::Find).ok_or_else(|| missing("find")),
            command_type::INSERT => message
                .insert
                .map(CommandDefinition::Insert)
                .ok_or_else(|| missing("insert")),
            command_type::UPDATE => message
                .update
                .map(CommandDefinition::Update)
                .ok_or_else(|| missing("update")),
            command_type::DELETE => message
                .delete
                .map(CommandDefinition::Delete)
                .ok_or_else(|| missing("delete")),
            command_type::STMT => {
                let stmt = message.stmt_execute.ok_or_else(|| missing("stmt_execute"))?;
                StmtExecute::from_proto(stmt)
                    .map(CommandDefinition::Stmt)
                    .map_err(|e| e.within("stmt_execute"))
            }
            other => Err(Error::decode(format!("unknown command type {other}"))),
        }
    }
}

/// `Mysqlx.Prepare.Prepare`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareRequest {
    /// Id the statement will be known by.
    pub stmt_id: StatementId,
    /// The command, verbatim.
    pub command: CommandDefinition,
}

impl PrepareRequest {
    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let message = pb::Prepare {
            stmt_id: Some(self.stmt_id),
            stmt: Some(self.command.to_proto()),
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = pb::Prepare::decode(data)?;
        let stmt = message.stmt.ok_or_else(|| Error::decode("missing stmt"))?;
        Ok(Self {
            stmt_id: message.stmt_id.ok_or_else(|| Error::decode("missing stmt_id"))?,
            command: CommandDefinition::from_proto(stmt).map_err(|e| e.within("stmt"))?,
        })
    }
}

/// `Mysqlx.Prepare.Execute`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    /// Id assigned at prepare time.
    pub stmt_id: StatementId,
    /// Placeholder values followed by the synthetic limit/offset arguments.
    pub args: Vec<WireValue>,
    /// Request compact column metadata.
    pub compact_metadata: bool,
}

impl ExecuteRequest {
    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let message = pb::Execute {
            stmt_id: Some(self.stmt_id),
            args: self.args.iter().map(WireValue::to_proto).collect(),
            compact_metadata: Some(self.compact_metadata),
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = pb::Execute::decode(data)?;
        let args = message
            .args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| WireValue::from_proto(arg).map_err(|e| e.within(&format!("args[{i}]"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            stmt_id: message.stmt_id.ok_or_else(|| Error::decode("missing stmt_id"))?,
            args,
            compact_metadata: message.compact_metadata.unwrap_or(false),
        })
    }
}

/// `Mysqlx.Prepare.Deallocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeallocateRequest {
    /// Id to release.
    pub stmt_id: StatementId,
}

impl DeallocateRequest {
    /// Encode as a message body.
    pub fn to_bytes(&self) -> Bytes {
        let message = pb::Deallocate {
            stmt_id: Some(self.stmt_id),
        };
        Bytes::from(message.encode_to_vec())
    }

    /// Decode a message body.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let message = pb::Deallocate::decode(data)?;
        Ok(Self {
            stmt_id: message.stmt_id.ok_or_else(|| Error::decode("missing stmt_id"))?,
        })
    }
}

/// Lifecycle of a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Not known to the server yet.
    Unprepared,
    /// Prepared under `stmt_id` on `session`.
    Prepared {
        /// Id assigned by the session.
        stmt_id: StatementId,
        /// Session that owns the id.
        session: SessionScope,
    },
    /// Released; the id must not be used again.
    Deallocated(StatementId),
}

/// A statement that is prepared once and executed many times.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    command: CommandDefinition,
    bindings: Vec<Literal>,
    row_limit: Option<u64>,
    row_offset: Option<u64>,
    state: StatementState,
}

impl PreparedStatement {
    /// Create an unprepared statement for `command`.
    pub fn new(command: CommandDefinition) -> Self {
        Self {
            command,
            bindings: Vec::new(),
            row_limit: None,
            row_offset: None,
            state: StatementState::Unprepared,
        }
    }

    /// Append a placeholder value.
    pub fn bind(mut self, value: impl Into<Literal>) -> Self {
        self.bindings.push(value.into());
        self
    }

    /// Replace all placeholder values, e.g. before re-executing.
    pub fn set_bindings<I, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Literal>,
    {
        self.bindings = values.into_iter().map(Into::into).collect();
    }

    /// Set or clear the row limit.
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.row_limit = limit;
    }

    /// Set or clear the row offset. Only sent together with a limit.
    pub fn set_offset(&mut self, offset: Option<u64>) {
        self.row_offset = offset;
    }

    /// Builder form of [`set_limit`](Self::set_limit).
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.row_limit = Some(limit);
        self
    }

    /// Builder form of [`set_offset`](Self::set_offset).
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.row_offset = Some(offset);
        self
    }

    /// The command being prepared.
    pub fn command(&self) -> &CommandDefinition {
        &self.command
    }

    /// Current placeholder values.
    pub fn bindings(&self) -> &[Literal] {
        &self.bindings
    }

    /// Row limit, if any.
    pub fn limit(&self) -> Option<u64> {
        self.row_limit
    }

    /// Row offset, if any.
    pub fn offset(&self) -> Option<u64> {
        self.row_offset
    }

    /// Lifecycle state.
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Statement id while prepared or after deallocation.
    pub fn id(&self) -> Option<StatementId> {
        match self.state {
            StatementState::Unprepared => None,
            StatementState::Prepared { stmt_id, .. } | StatementState::Deallocated(stmt_id) => Some(stmt_id),
        }
    }

    /// Session that owns the statement id, while prepared.
    pub fn session(&self) -> Option<SessionScope> {
        match self.state {
            StatementState::Prepared { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Check if the statement is prepared on some session.
    pub fn is_prepared(&self) -> bool {
        matches!(self.state, StatementState::Prepared { .. })
    }

    /// Check if the statement can be executed on `session`.
    pub fn is_prepared_on(&self, session: SessionScope) -> bool {
        self.session() == Some(session)
    }

    /// Build the `Prepare` request for a freshly allocated id on `session`.
    ///
    /// A statement prepared on another session, or before a reset of this one,
    /// may be prepared again: its old id is no longer usable here.
    pub fn prepare(&self, stmt_id: StatementId, session: SessionScope) -> Result<PrepareRequest, Error> {
        match self.state {
            StatementState::Unprepared => {}
            StatementState::Prepared { session: owner, .. } if owner != session => {}
            StatementState::Prepared { stmt_id: id, .. } => {
                return Err(Error::usage(format!("statement is already prepared as {id}")))
            }
            StatementState::Deallocated(id) => {
                return Err(Error::usage(format!(
                    "statement {id} was deallocated and cannot be prepared again"
                )))
            }
        }
        Ok(PrepareRequest {
            stmt_id,
            command: self.command.clone(),
        })
    }

    /// Record a confirmed `Prepare` exchange.
    pub fn mark_prepared(&mut self, stmt_id: StatementId, session: SessionScope) -> Result<(), Error> {
        self.prepare(stmt_id, session)?;
        self.state = StatementState::Prepared { stmt_id, session };
        Ok(())
    }

    /// Build the `Execute` request for `session`.
    ///
    /// Arguments are the bindings in order, then the row limit, then the row
    /// offset. An offset without a limit is rejected.
    pub fn execute(&self, session: SessionScope) -> Result<ExecuteRequest, Error> {
        let stmt_id = self.require_prepared("execute", session)?;

        if self.row_offset.is_some() && self.row_limit.is_none() {
            return Err(Error::usage("row offset requires a row limit"));
        }

        let mut args = codec::encode_all(&self.bindings);
        if let Some(limit) = self.row_limit {
            args.push(codec::encode(&Literal::UInt(limit)));
            if let Some(offset) = self.row_offset {
                args.push(codec::encode(&Literal::UInt(offset)));
            }
        }

        Ok(ExecuteRequest {
            stmt_id,
            args,
            compact_metadata: true,
        })
    }

    /// Build the `Deallocate` request for `session`.
    pub fn deallocate(&self, session: SessionScope) -> Result<DeallocateRequest, Error> {
        let stmt_id = self.require_prepared("deallocate", session)?;
        Ok(DeallocateRequest { stmt_id })
    }

    /// Record a confirmed `Deallocate` exchange.
    pub fn mark_deallocated(&mut self, session: SessionScope) -> Result<(), Error> {
        let stmt_id = self.require_prepared("deallocate", session)?;
        self.state = StatementState::Deallocated(stmt_id);
        Ok(())
    }

    fn require_prepared(&self, op: &str, session: SessionScope) -> Result<StatementId, Error> {
        match self.state {
            StatementState::Prepared { stmt_id, session: owner } if owner == session => Ok(stmt_id),
            StatementState::Prepared { stmt_id, session: owner } => Err(Error::usage(format!(
                "cannot {op} statement {stmt_id}: it was prepared on {owner}, not {session}"
            ))),
            StatementState::Unprepared => {
                Err(Error::usage(format!("cannot {op} a statement that is not prepared")))
            }
            StatementState::Deallocated(id) => Err(Error::usage(format!(
                "cannot {op} statement {id}: it was deallocated"
            ))),
        }
    }
}
