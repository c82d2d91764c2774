//! Message transport.
//!
//! A [`Transport`] moves whole typed messages. [`TcpTransport`] frames them
//! over a plain TCP stream; tests substitute scripted transports.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use xdevapi_proto::framing::{self, Frame};
use xdevapi_proto::{ClientMessage, ServerMessage};

use crate::error::Error;

/// A bidirectional channel of X Protocol messages.
#[async_trait]
pub trait Transport: Send {
    /// Write one message.
    async fn write_message(&mut self, message: &ClientMessage) -> Result<(), Error>;

    /// Read the next server message.
    async fn read_message(&mut self) -> Result<ServerMessage, Error>;

    /// Check if the channel can still carry messages.
    fn is_usable(&self) -> bool;

    /// The last error that made the channel unusable.
    fn last_error(&self) -> Option<String>;

    /// Switch the channel to TLS after the server accepted the `tls` capability.
    async fn start_tls(&mut self) -> Result<(), Error> {
        Err(Error::Connection(
            "this transport cannot establish TLS".to_string(),
        ))
    }

    /// Close the channel.
    async fn shutdown(&mut self) -> Result<(), Error>;
}

/// Plain TCP transport.
pub struct TcpTransport {
    stream: TcpStream,
    read_buf: BytesMut,
    max_message_size: usize,
    last_error: Option<String>,
    usable: bool,
}

impl TcpTransport {
    /// Connect to `address` within `timeout`.
    pub async fn connect(address: &str, timeout: Duration, max_message_size: usize) -> Result<Self, Error> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Connection(format!("failed to connect to {}: {}", address, e)))?;
        stream.set_nodelay(true)?;

        tracing::debug!(address, "tcp transport connected");

        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
            max_message_size,
            last_error: None,
            usable: true,
        })
    }

    fn fail(&mut self, error: Error) -> Error {
        self.usable = false;
        self.last_error = Some(error.to_string());
        error
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write_message(&mut self, message: &ClientMessage) -> Result<(), Error> {
        let mut buf = BytesMut::new();
        Frame::new(message.message_type(), message.to_payload())
            .encode_into(&mut buf, self.max_message_size)?;

        if let Err(e) = self.stream.write_all(&buf).await {
            return Err(self.fail(Error::Io(e)));
        }
        tracing::trace!(message = message.name(), bytes = buf.len(), "sent");
        Ok(())
    }

    async fn read_message(&mut self) -> Result<ServerMessage, Error> {
        loop {
            match framing::decode_frame(&mut self.read_buf, self.max_message_size) {
                Ok(Some(frame)) => {
                    let message = ServerMessage::decode(frame.message_type, &frame.payload)
                        .map_err(|e| self.fail(e.into()))?;
                    tracing::trace!(message = message.name(), bytes = frame.payload.len(), "received");
                    return Ok(message);
                }
                Ok(None) => {}
                Err(e) => return Err(self.fail(e.into())),
            }

            match self.stream.read_buf(&mut self.read_buf).await {
                Ok(0) => {
                    return Err(self.fail(Error::Connection(
                        "connection closed by server".to_string(),
                    )))
                }
                Ok(_) => {}
                Err(e) => return Err(self.fail(Error::Io(e))),
            }
        }
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    async fn shutdown(&mut self) -> Result<(), Error> {
        self.usable = false;
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.stream.peer_addr().ok())
            .field("usable", &self.usable)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use xdevapi_proto::message::client_type;

    #[tokio::test]
    async fn test_frames_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 5];
            socket.read_exact(&mut header).await.unwrap();
            assert_eq!(header, [1, 0, 0, 0, client_type::CON_CAPABILITIES_GET]);

            // StmtExecuteOk split over two writes
            socket.write_all(&[1, 0]).await.unwrap();
            socket.flush().await.unwrap();
            socket.write_all(&[0, 0, 17]).await.unwrap();
        });

        let mut transport = TcpTransport::connect(&address, Duration::from_secs(5), 1024)
            .await
            .unwrap();
        transport.write_message(&ClientMessage::CapabilitiesGet).await.unwrap();
        let reply = transport.read_message().await.unwrap();
        assert_eq!(reply, ServerMessage::StmtExecuteOk);

        server.await.unwrap();

        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(!transport.is_usable());
        assert_eq!(
            transport.last_error().as_deref(),
            Some("connection error: connection closed by server")
        );
    }

    #[tokio::test]
    async fn test_oversized_frame_breaks_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[0x00, 0x10, 0, 0, 13]).await.unwrap();
        });

        let mut transport = TcpTransport::connect(&address, Duration::from_secs(5), 1024)
            .await
            .unwrap();
        let err = transport.read_message().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(!transport.is_usable());

        server.await.unwrap();
    }
}
