//! X Protocol client API.
//!
//! This module provides the main `Client` struct for running statements on a
//! MySQL server through the X Plugin.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use xdevapi_proto::{CapabilitySet, Literal, PreparedStatement, SessionScope, StatementId};

use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::Error;
use crate::result::SqlResult;
use crate::statement::{build_ad_hoc_request, AdHocStatement};
use crate::transport::Transport;

/// A client session on one connection.
///
/// Requests are serialized: one request/response exchange is in flight at a
/// time.
///
/// # Example
///
/// ```ignore
/// use xdevapi_client::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::localhost().with_credentials("app", "secret");
///     let client = Client::connect(config).await?;
///
///     let mut stmt = client.sql("SELECT name FROM shop.items WHERE id = ?");
///     stmt.bind([7i64]);
///     let result = stmt.execute(&client).await?;
///     println!("{} rows", result.first_rows().len());
///
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct Client {
    connection: Arc<Mutex<Connection>>,
}

impl Client {
    /// Connect to a server and authenticate.
    pub async fn connect(config: ClientConfig) -> Result<Self, Error> {
        let mut connection = Connection::establish(config).await?;
        connection.handshake().await?;
        Ok(Self::from_connection(connection))
    }

    /// Connect to a server at the given address with default credentials.
    pub async fn connect_to(address: impl Into<String>) -> Result<Self, Error> {
        Self::connect(ClientConfig::new(address)).await
    }

    /// Run the handshake over an already connected transport.
    pub async fn with_transport(transport: Box<dyn Transport>, config: ClientConfig) -> Result<Self, Error> {
        let mut connection = Connection::with_transport(transport, config);
        connection.handshake().await?;
        Ok(Self::from_connection(connection))
    }

    /// Wrap a connection that already completed its handshake.
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    /// Create a SQL statement bound to no arguments yet.
    pub fn sql(&self, text: impl Into<String>) -> AdHocStatement {
        AdHocStatement::new(text)
    }

    /// Run an ad-hoc statement. The statement freezes after its first
    /// successful run.
    pub async fn execute(&self, statement: &mut AdHocStatement) -> Result<SqlResult, Error> {
        let mut conn = self.connection.lock().await;
        let request = build_ad_hoc_request(&mut conn, statement)?;
        let result = conn.execute_sql(request).await?;
        statement.freeze();
        Ok(result)
    }

    /// Run SQL text once with the given arguments.
    pub async fn execute_sql<I, T>(&self, text: &str, args: I) -> Result<SqlResult, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<Literal>,
    {
        let mut statement = AdHocStatement::new(text);
        statement.bind(args);
        self.execute(&mut statement).await
    }

    /// Prepare a statement on the server.
    pub async fn prepare(&self, statement: &mut PreparedStatement) -> Result<StatementId, Error> {
        let mut conn = self.connection.lock().await;
        conn.prepare(statement).await
    }

    /// Execute a prepared statement.
    pub async fn execute_prepared(&self, statement: &PreparedStatement) -> Result<SqlResult, Error> {
        let mut conn = self.connection.lock().await;
        conn.execute_prepared(statement).await
    }

    /// Release a prepared statement.
    pub async fn deallocate(&self, statement: &mut PreparedStatement) -> Result<(), Error> {
        let mut conn = self.connection.lock().await;
        conn.deallocate(statement).await
    }

    /// Ask the server for its current capabilities.
    pub async fn capabilities(&self) -> Result<BTreeMap<String, Literal>, Error> {
        let mut conn = self.connection.lock().await;
        conn.capabilities_get().await
    }

    /// Request capability changes.
    pub async fn set_capabilities(&self, set: &CapabilitySet) -> Result<(), Error> {
        let mut conn = self.connection.lock().await;
        conn.capabilities_set(set).await
    }

    /// Capabilities reported during the handshake.
    pub async fn server_capabilities(&self) -> BTreeMap<String, Literal> {
        let conn = self.connection.lock().await;
        conn.server_capabilities().clone()
    }

    /// Check if the server reported a capability during the handshake.
    pub async fn has_capability(&self, capability: &str) -> bool {
        let conn = self.connection.lock().await;
        conn.has_capability(capability)
    }

    /// Reset the session, dropping its prepared statements on the server.
    pub async fn reset_session(&self) -> Result<(), Error> {
        let mut conn = self.connection.lock().await;
        conn.reset_session(true).await
    }

    /// Close the client connection.
    pub async fn close(&self) -> Result<(), Error> {
        let mut conn = self.connection.lock().await;
        conn.close().await
    }

    /// Check if the client is connected.
    pub async fn is_connected(&self) -> bool {
        let conn = self.connection.lock().await;
        conn.is_connected()
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        let conn = self.connection.lock().await;
        conn.state()
    }

    /// Connection id assigned by the server.
    pub async fn client_id(&self) -> Option<u64> {
        let conn = self.connection.lock().await;
        conn.client_id()
    }

    /// Session that prepared statement ids currently belong to.
    pub async fn session_scope(&self) -> SessionScope {
        let conn = self.connection.lock().await;
        conn.session_scope()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
