//! Connection management for the X Protocol client.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

use xdevapi_proto::handshake::capabilities;
use xdevapi_proto::notice::{frame_type, state_param};
use xdevapi_proto::{
    build_capability_set, parse_capability_set_with, AuthenticateStart, CapabilitySet, ClientMessage,
    Literal, Notice, NoticeFrame, PreparedStatement, ServerMessage, SessionScope, StatementId,
    StmtExecute,
};

use crate::auth;
use crate::config::{AuthMechanism, ClientConfig};
use crate::error::Error;
use crate::result::SqlResult;
use crate::transport::{TcpTransport, Transport};

/// Server error code for an unknown capability.
const ER_X_CAPABILITY_NOT_FOUND: u32 = 5002;

static NEXT_SESSION_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport established, session not authenticated.
    Connected,
    /// Authenticated and ready for statements.
    Ready,
    /// Connection closed, by either side or after an unrecoverable error.
    Closed,
}

/// Hands out statement ids for one connection.
///
/// Ids start at 1, increase monotonically and are never reused, even when
/// the exchange that consumed one failed.
#[derive(Debug, Clone)]
pub struct StatementIdAllocator {
    next: Option<StatementId>,
}

impl StatementIdAllocator {
    /// Create an allocator starting at 1.
    pub fn new() -> Self {
        Self { next: Some(1) }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> Result<StatementId, Error> {
        self.next.ok_or_else(|| {
            Error::Protocol(xdevapi_proto::Error::usage(
                "statement ids exhausted on this connection",
            ))
        })
    }

    /// Take the next id.
    pub fn allocate(&mut self) -> Result<StatementId, Error> {
        let id = self.peek()?;
        self.next = id.checked_add(1);
        Ok(id)
    }
}

impl Default for StatementIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection to an X Protocol server.
pub struct Connection {
    transport: Box<dyn Transport>,
    state: ConnectionState,
    config: ClientConfig,
    server_capabilities: BTreeMap<String, Literal>,
    statement_ids: StatementIdAllocator,
    session: SessionScope,
    last_activity: Instant,
    last_error: Option<String>,
    client_id: Option<u64>,
}

impl Connection {
    /// Open a TCP connection to the configured server.
    pub async fn establish(config: ClientConfig) -> Result<Self, Error> {
        let transport =
            TcpTransport::connect(&config.address, config.timeout, config.max_message_size).await?;
        Ok(Self::with_transport(Box::new(transport), config))
    }

    /// Wrap an already connected transport.
    pub fn with_transport(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            state: ConnectionState::Connected,
            config,
            server_capabilities: BTreeMap::new(),
            statement_ids: StatementIdAllocator::new(),
            session: SessionScope::new(NEXT_SESSION_TOKEN.fetch_add(1, Ordering::Relaxed)),
            last_activity: Instant::now(),
            last_error: None,
            client_id: None,
        }
    }

    /// Negotiate capabilities and authenticate.
    pub async fn handshake(&mut self) -> Result<(), Error> {
        if self.state != ConnectionState::Connected {
            return Err(Error::Connection(format!(
                "cannot handshake in state {:?}",
                self.state
            )));
        }

        self.capabilities_get().await?;

        let mut requested = Vec::new();
        if self.config.tls {
            requested.push((capabilities::TLS, Literal::Bool(true)));
        }
        if self.config.interactive {
            requested.push((capabilities::CLIENT_INTERACTIVE, Literal::Bool(true)));
        }
        if !requested.is_empty() {
            self.capabilities_set(&build_capability_set(requested)).await?;
        }
        if self.config.tls {
            self.transport.start_tls().await?;
            tracing::debug!("tls established");
        }

        if !self.config.connect_attrs.is_empty() {
            let attrs = Literal::object(self.config.connect_attrs.clone());
            let set = build_capability_set([(capabilities::SESSION_CONNECT_ATTRS, attrs)]);
            match self.capabilities_set(&set).await {
                Ok(()) => {}
                Err(Error::Server { code, .. }) if code == ER_X_CAPABILITY_NOT_FOUND => {
                    tracing::debug!("server does not accept connection attributes");
                }
                Err(e) => return Err(e),
            }
        }

        if let Err(e) = self.authenticate().await {
            self.close_with(e.to_string());
            return Err(e);
        }

        self.state = ConnectionState::Ready;
        tracing::info!(
            address = %self.config.address,
            user = %self.config.user,
            client_id = ?self.client_id,
            "session ready"
        );
        Ok(())
    }

    /// Fetch the server's capabilities. The result is also cached.
    pub async fn capabilities_get(&mut self) -> Result<BTreeMap<String, Literal>, Error> {
        self.check_usable()?;
        match self.request(&ClientMessage::CapabilitiesGet).await? {
            ServerMessage::Capabilities(set) => {
                let parsed = parse_capability_set_with(&set, self.config.integer_policy)?;
                tracing::debug!(count = parsed.len(), "server capabilities received");
                self.server_capabilities = parsed.clone();
                Ok(parsed)
            }
            other => Err(self.unexpected(&other, "Capabilities")),
        }
    }

    /// Request capability changes. The server applies them in order.
    pub async fn capabilities_set(&mut self, set: &CapabilitySet) -> Result<(), Error> {
        self.check_usable()?;
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        tracing::debug!(?names, "setting capabilities");
        self.expect_ok(&ClientMessage::CapabilitiesSet(set.clone())).await
    }

    async fn authenticate(&mut self) -> Result<(), Error> {
        let mechanism = self.config.auth_mechanism;
        if let Some(offered) = self
            .server_capabilities
            .get(capabilities::AUTHENTICATION_MECHANISMS)
            .and_then(Literal::as_array)
        {
            if !offered.iter().any(|m| m.as_str() == Some(mechanism.as_str())) {
                return Err(Error::Authentication(format!(
                    "server does not offer {}",
                    mechanism.as_str()
                )));
            }
        }

        let schema = self.config.schema.clone().unwrap_or_default();
        let user = self.config.user.clone();
        let password = self.config.password.clone();

        tracing::debug!(mechanism = mechanism.as_str(), %user, "authenticating");
        let start = AuthenticateStart::new(mechanism.as_str());
        let reply = match mechanism {
            AuthMechanism::Plain => {
                let data = auth::plain_auth_data(&schema, &user, &password);
                self.auth_request(&ClientMessage::AuthenticateStart(start.with_auth_data(data)))
                    .await?
            }
            AuthMechanism::Sha256Memory => {
                let nonce = match self.auth_request(&ClientMessage::AuthenticateStart(start)).await? {
                    ServerMessage::AuthenticateContinue(nonce) => nonce,
                    other => return Err(self.unexpected(&other, "AuthenticateContinue")),
                };
                let response = auth::sha256_memory_response(&schema, &user, &password, &nonce)?;
                self.auth_request(&ClientMessage::AuthenticateContinue(response.into()))
                    .await?
            }
        };

        match reply {
            ServerMessage::AuthenticateOk(_) => Ok(()),
            other => Err(self.unexpected(&other, "AuthenticateOk")),
        }
    }

    async fn auth_request(&mut self, message: &ClientMessage) -> Result<ServerMessage, Error> {
        match self.request(message).await {
            Err(Error::Server { code, message, .. }) => {
                Err(Error::Authentication(format!("{} (error {})", message, code)))
            }
            other => other,
        }
    }

    /// Run an ad-hoc statement and collect its result.
    pub async fn execute_sql(&mut self, stmt: StmtExecute) -> Result<SqlResult, Error> {
        self.check_ready()?;
        tracing::debug!(namespace = %stmt.namespace, args = stmt.args.len(), "executing statement");
        self.execute_statement(&ClientMessage::StmtExecute(stmt)).await
    }

    /// Prepare a statement under a fresh id.
    ///
    /// The statement becomes prepared only once the server confirms. A
    /// statement prepared on another connection, or before a session reset,
    /// is prepared again here under a new id.
    pub async fn prepare(&mut self, statement: &mut PreparedStatement) -> Result<StatementId, Error> {
        self.check_ready()?;
        let request = statement.prepare(self.statement_ids.peek()?, self.session)?;
        let stmt_id = self.statement_ids.allocate()?;

        tracing::debug!(stmt_id, kind = request.command.kind(), session = %self.session, "preparing statement");
        self.expect_ok(&ClientMessage::Prepare(request)).await?;
        statement.mark_prepared(stmt_id, self.session)?;
        Ok(stmt_id)
    }

    /// Execute a prepared statement with its current bindings.
    ///
    /// Fails with a usage error, without sending anything, if the statement
    /// was not prepared on the current session of this connection.
    pub async fn execute_prepared(&mut self, statement: &PreparedStatement) -> Result<SqlResult, Error> {
        self.check_ready()?;
        let request = statement.execute(self.session)?;
        tracing::debug!(stmt_id = request.stmt_id, args = request.args.len(), "executing prepared statement");
        self.execute_statement(&ClientMessage::Execute(request)).await
    }

    /// Release a prepared statement on the server.
    pub async fn deallocate(&mut self, statement: &mut PreparedStatement) -> Result<(), Error> {
        self.check_ready()?;
        let request = statement.deallocate(self.session)?;
        tracing::debug!(stmt_id = request.stmt_id, "deallocating statement");
        self.expect_ok(&ClientMessage::Deallocate(request)).await?;
        statement.mark_deallocated(self.session)?;
        Ok(())
    }

    /// Reset the session. Prepared statements of this session are gone afterwards.
    pub async fn reset_session(&mut self, keep_open: bool) -> Result<(), Error> {
        self.check_ready()?;
        tracing::debug!(keep_open, "resetting session");
        self.expect_ok(&ClientMessage::SessionReset { keep_open }).await?;
        self.session = self.session.next_generation();
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }

        if self.transport.is_usable() {
            if let Err(e) = self.expect_ok(&ClientMessage::ConnectionClose).await {
                tracing::debug!(error = %e, "close handshake failed");
            }
            if let Err(e) = self.transport.shutdown().await {
                tracing::debug!(error = %e, "transport shutdown failed");
            }
        }

        self.state = ConnectionState::Closed;
        tracing::info!(address = %self.config.address, "connection closed");
        Ok(())
    }

    /// Fail with a connection state error if the connection is closed, its
    /// transport broke or it has been idle for longer than allowed.
    pub fn check_usable(&mut self) -> Result<(), Error> {
        if self.state != ConnectionState::Closed {
            if !self.transport.is_usable() {
                let reason = self
                    .transport
                    .last_error()
                    .unwrap_or_else(|| "transport is no longer usable".to_string());
                self.close_with(reason);
            } else if let Some(idle) = self.config.idle_timeout {
                if self.last_activity.elapsed() > idle {
                    self.close_with(format!("idle for more than {:?}", idle));
                }
            }
        }

        if self.state == ConnectionState::Closed {
            return Err(Error::ConnectionState {
                state: self.state,
                last_error: self.last_error.clone(),
            });
        }
        Ok(())
    }

    fn check_ready(&mut self) -> Result<(), Error> {
        self.check_usable()?;
        if self.state != ConnectionState::Ready {
            return Err(Error::ConnectionState {
                state: self.state,
                last_error: self.last_error.clone(),
            });
        }
        Ok(())
    }

    /// Check if the connection is ready for requests.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Ready && self.transport.is_usable()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session that statement ids prepared now belong to.
    pub fn session_scope(&self) -> SessionScope {
        self.session
    }

    /// Get the capabilities the server reported during the handshake.
    pub fn server_capabilities(&self) -> &BTreeMap<String, Literal> {
        &self.server_capabilities
    }

    /// Check if the server reported a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.server_capabilities.contains_key(capability)
    }

    /// Connection id assigned by the server.
    pub fn client_id(&self) -> Option<u64> {
        self.client_id
    }

    /// The error that closed the connection, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn expect_ok(&mut self, message: &ClientMessage) -> Result<(), Error> {
        match self.request(message).await? {
            ServerMessage::Ok(_) => Ok(()),
            other => Err(self.unexpected(&other, "Ok")),
        }
    }

    /// Send one message and return the first reply that is not a notice.
    async fn request(&mut self, message: &ClientMessage) -> Result<ServerMessage, Error> {
        self.write(message).await?;
        loop {
            match self.read().await? {
                ServerMessage::Notice(frame) => {
                    self.handle_notice(&frame)?;
                }
                ServerMessage::Error(error) => return Err(self.server_error(error)),
                reply => return Ok(reply),
            }
        }
    }

    /// Send a statement and gather its result sets until `StmtExecuteOk`.
    async fn execute_statement(&mut self, message: &ClientMessage) -> Result<SqlResult, Error> {
        self.write(message).await?;

        let mut result = SqlResult::default();
        let mut in_result_set = false;
        loop {
            match self.read().await? {
                ServerMessage::Notice(frame) => {
                    if let Some(notice) = self.handle_notice(&frame)? {
                        result.apply_notice(notice);
                    }
                }
                ServerMessage::ColumnMetaData(column) => {
                    if !in_result_set {
                        result.start_result_set();
                        in_result_set = true;
                    }
                    result.push_column(column);
                }
                ServerMessage::Row(row) => result.push_row(row),
                ServerMessage::FetchDone
                | ServerMessage::FetchSuspended
                | ServerMessage::FetchDoneMoreResultsets
                | ServerMessage::FetchDoneMoreOutParams => in_result_set = false,
                ServerMessage::StmtExecuteOk => {
                    tracing::debug!(
                        result_sets = result.columns.len(),
                        rows_affected = result.rows_affected,
                        warnings = result.warnings.len(),
                        "statement finished"
                    );
                    return Ok(result);
                }
                ServerMessage::Error(error) => return Err(self.server_error(error)),
                other => return Err(self.unexpected(&other, "a result set message")),
            }
        }
    }

    /// Apply connection-level notices; return the ones that belong to the
    /// current statement.
    fn handle_notice(&mut self, frame: &NoticeFrame) -> Result<Option<Notice>, Error> {
        let notice = frame.notice()?;
        match &notice {
            Notice::SessionStateChanged(change) if change.param == state_param::CLIENT_ID_ASSIGNED => {
                self.client_id = change.as_u64();
                tracing::debug!(client_id = ?self.client_id, "client id assigned");
                Ok(None)
            }
            Notice::Other { frame_type: frame_type::SERVER_HELLO, .. } => Ok(None),
            Notice::Warning(warning) => {
                tracing::warn!(code = warning.code, msg = %warning.msg, "server warning");
                Ok(Some(notice))
            }
            _ => {
                tracing::trace!(frame_type = frame.frame_type, "notice");
                Ok(Some(notice))
            }
        }
    }

    async fn write(&mut self, message: &ClientMessage) -> Result<(), Error> {
        let result = match tokio::time::timeout(self.config.timeout, self.transport.write_message(message)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        };
        self.after_io(result)
    }

    async fn read(&mut self) -> Result<ServerMessage, Error> {
        let result = match tokio::time::timeout(self.config.timeout, self.transport.read_message()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        };
        self.after_io(result)
    }

    fn after_io<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.last_activity = Instant::now(),
            // The reply may still arrive and would be read as the answer to
            // the next request.
            Err(Error::Timeout) => self.close_with("request timed out".to_string()),
            Err(_) if !self.transport.is_usable() => {
                let reason = self
                    .transport
                    .last_error()
                    .unwrap_or_else(|| "transport failed".to_string());
                self.close_with(reason);
            }
            Err(_) => {}
        }
        result
    }

    fn server_error(&mut self, error: xdevapi_proto::ServerError) -> Error {
        if error.fatal {
            self.close_with(format!("fatal server error {}: {}", error.code, error.msg));
        } else {
            tracing::debug!(code = error.code, sql_state = %error.sql_state, msg = %error.msg, "server error");
        }
        error.into()
    }

    fn unexpected(&mut self, message: &ServerMessage, expected: &str) -> Error {
        let reason = format!("expected {}, got {}", expected, message.name());
        self.close_with(reason.clone());
        Error::Protocol(xdevapi_proto::Error::InvalidMessage(reason))
    }

    fn close_with(&mut self, reason: String) {
        if self.state != ConnectionState::Closed {
            tracing::warn!(address = %self.config.address, %reason, "connection closed");
        }
        self.state = ConnectionState::Closed;
        self.last_error = Some(reason);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.config.address)
            .field("state", &self.state)
            .field("client_id", &self.client_id)
            .field("next_statement_id", &self.statement_ids.next)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_ids_are_monotonic() {
        let mut ids = StatementIdAllocator::new();
        assert_eq!(ids.peek().unwrap(), 1);
        assert_eq!(ids.allocate().unwrap(), 1);
        assert_eq!(ids.allocate().unwrap(), 2);
        assert_eq!(ids.peek().unwrap(), 3);
    }

    #[test]
    fn test_statement_ids_exhaust() {
        let mut ids = StatementIdAllocator {
            next: Some(StatementId::MAX),
        };
        assert_eq!(ids.allocate().unwrap(), StatementId::MAX);
        let err = ids.allocate().unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_connection_state() {
        assert_ne!(ConnectionState::Connected, ConnectionState::Ready);
        assert_ne!(ConnectionState::Ready, ConnectionState::Closed);
    }
}
