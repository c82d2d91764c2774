//! Async client for the MySQL X Protocol.
//!
//! This crate drives a session over a [`Transport`]: capability negotiation,
//! authentication, ad-hoc statements and the prepared statement lifecycle.
//! Message encoding lives in [`xdevapi_proto`].
//!
//! # Quick Start
//!
//! ```ignore
//! use xdevapi_client::{Client, ClientConfig};
//! use xdevapi_client::proto::{CommandDefinition, PreparedStatement};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(ClientConfig::localhost().with_credentials("root", "")).await?;
//!
//!     // Ad-hoc statement
//!     let result = client.execute_sql("SELECT ?", [1i64]).await?;
//!     println!("{} rows", result.first_rows().len());
//!
//!     // Prepared statement
//!     let mut stmt = PreparedStatement::new(CommandDefinition::sql("SELECT ?")).bind(2i64);
//!     client.prepare(&mut stmt).await?;
//!     client.execute_prepared(&stmt).await?;
//!     client.deallocate(&mut stmt).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod result;
pub mod statement;
pub mod transport;

pub use client::Client;
pub use config::{AuthMechanism, ClientConfig};
pub use connection::{Connection, ConnectionState, StatementIdAllocator};
pub use error::Error;
pub use result::SqlResult;
pub use statement::{build_ad_hoc_request, AdHocStatement, BindPhase};
pub use transport::{TcpTransport, Transport};

/// Re-export protocol types.
pub use xdevapi_proto as proto;
