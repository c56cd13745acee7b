//! The transport collaborator and its line-oriented TCP implementation.
//!
//! The session core never touches a socket.  It drives a [`Transport`], which
//! owns the wire protocol: [`Transport::handshake`] establishes the connection
//! and [`Transport::round_trip`] sends one message and returns the one reply.
//!
//! [`TcpTransport`] speaks the protocol of the echarlar chat servers: UTF-8
//! text, one message per `\n`-terminated line.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::error::TransportError;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bound on connecting, sending and awaiting a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum length of one line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// The external collaborator that performs the actual network work.
///
/// Implementations are shared between the session and the exchanger, so both
/// operations take `&self`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the underlying connection.
    ///
    /// Called at most once per connection attempt.  A later call after a
    /// failure must start from scratch.
    async fn handshake(&self) -> Result<(), TransportError>;

    /// Sends `text` and returns the server's reply.
    ///
    /// Exactly one request per call; implementations must not retry.
    async fn round_trip(&self, text: &str) -> Result<String, TransportError>;

    /// Tears down the connection.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn handshake(&self) -> Result<(), TransportError> {
        self.as_ref().handshake().await
    }

    async fn round_trip(&self, text: &str) -> Result<String, TransportError> {
        self.as_ref().round_trip(text).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.as_ref().close().await
    }
}

type LineStream = Framed<TcpStream, LinesCodec>;

/// A [`Transport`] over a newline-framed TCP stream.
#[derive(Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    read_greeting: bool,
    max_line_length: usize,
    connection: Mutex<Option<LineStream>>,
}

impl TcpTransport {
    /// Creates a transport for `host:port` with default settings.
    ///
    /// No connection is made until [`Transport::handshake`].
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
            read_greeting: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            connection: Mutex::new(None),
        }
    }

    /// Sets the bound on connecting and on each send and receive.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Consume one greeting line from the server as part of the handshake.
    pub fn with_greeting(mut self, read_greeting: bool) -> Self {
        self.read_greeting = read_greeting;
        self
    }

    /// Sets the maximum accepted reply length.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Returns the `host:port` this transport connects to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn next_line(&self, framed: &mut LineStream) -> Result<String, TransportError> {
        match tokio::time::timeout(self.timeout, framed.next()).await {
            Ok(Some(Ok(line))) => Ok(line),
            Ok(Some(Err(err))) => Err(codec_error(err)),
            Ok(None) => Err(TransportError::closed(format!(
                "{} closed the connection",
                self.address()
            ))),
            Err(_) => Err(TransportError::timeout(
                "waiting for reply",
                Some(self.timeout.as_secs_f64()),
            )),
        }
    }

    async fn exchange_line(
        &self,
        framed: &mut LineStream,
        line: String,
    ) -> Result<String, TransportError> {
        tokio::time::timeout(self.timeout, framed.send(line))
            .await
            .map_err(|_| {
                TransportError::timeout("sending message", Some(self.timeout.as_secs_f64()))
            })?
            .map_err(codec_error)?;
        self.next_line(framed).await
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn handshake(&self) -> Result<(), TransportError> {
        let mut connection = self.connection.lock().await;
        let address = self.address();
        debug!(address = %address, "connecting");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                TransportError::timeout(
                    format!("connecting to {address}"),
                    Some(self.timeout.as_secs_f64()),
                )
            })?
            .map_err(|err| TransportError::io(format!("connecting to {address}: {err}"), err))?;
        stream.set_nodelay(true)?;
        let mut framed = Framed::new(
            stream,
            LinesCodec::new_with_max_length(self.max_line_length),
        );
        if self.read_greeting {
            let greeting = self.next_line(&mut framed).await?;
            debug!(greeting = %greeting, "server greeting");
        }
        *connection = Some(framed);
        Ok(())
    }

    async fn round_trip(&self, text: &str) -> Result<String, TransportError> {
        let mut connection = self.connection.lock().await;
        let Some(framed) = connection.as_mut() else {
            return Err(TransportError::not_connected("no handshake has succeeded"));
        };
        let result = self.exchange_line(framed, single_line(text)).await;
        match &result {
            Err(err) if err.is_disconnect() => {
                warn!(error = %err, "dropping connection");
                *connection = None;
            }
            Err(err) => {
                debug!(error = %err, "discarding frame");
                *connection = connection.take().map(reframe);
            }
            Ok(_) => {}
        }
        result
    }

    async fn close(&self) -> Result<(), TransportError> {
        let framed = self.connection.lock().await.take();
        if let Some(framed) = framed {
            framed.into_inner().shutdown().await?;
        }
        Ok(())
    }
}

/// Flattens `text` to exactly one frame.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// A `Framed` stream yields nothing after a decode error.  Rebuilding it from
/// its parts resumes reading, and the codec skips the rest of the bad line.
fn reframe(framed: LineStream) -> LineStream {
    Framed::from_parts(framed.into_parts())
}

fn codec_error(err: LinesCodecError) -> TransportError {
    match err {
        LinesCodecError::Io(err) => TransportError::io(err.to_string(), err),
        LinesCodecError::MaxLineLengthExceeded => {
            TransportError::codec("line exceeds maximum length", Some(Box::new(err)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Serves one client: optional greeting, then echoes each line back.
    async fn echo_server(listener: TcpListener, greeting: Option<&'static str>) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, LinesCodec::new());
        if let Some(greeting) = greeting {
            framed.send(greeting).await.unwrap();
        }
        while let Some(Ok(line)) = framed.next().await {
            framed.send(format!("echo: {line}")).await.unwrap();
        }
    }

    #[test]
    fn single_line_flattens_newlines() {
        assert_eq!(single_line("a\nb\r\nc"), "a b  c");
        assert_eq!(single_line(""), "");
    }

    #[test]
    fn transport_defaults() {
        let transport = TcpTransport::new(DEFAULT_HOST, DEFAULT_PORT);
        assert_eq!(transport.address(), "127.0.0.1:8080");
        assert_eq!(transport.timeout, DEFAULT_TIMEOUT);
        assert!(!transport.read_greeting);
        assert_eq!(transport.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[tokio::test]
    async fn round_trip_before_handshake() {
        let transport = TcpTransport::new(DEFAULT_HOST, 1);
        let err = transport.round_trip("hello").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn round_trip_echoes_lines() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(echo_server(listener, None));

        let transport = TcpTransport::new(DEFAULT_HOST, port);
        transport.handshake().await.unwrap();
        assert_eq!(transport.round_trip("hello").await.unwrap(), "echo: hello");
        assert_eq!(transport.round_trip("").await.unwrap(), "echo: ");
        assert_eq!(
            transport.round_trip("two\nlines").await.unwrap(),
            "echo: two lines"
        );
        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_reads_greeting() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(echo_server(listener, Some("Enter your username: ")));

        let transport = TcpTransport::new(DEFAULT_HOST, port).with_greeting(true);
        transport.handshake().await.unwrap();
        // The greeting was consumed, so the first reply is correlated.
        assert_eq!(transport.round_trip("kursat").await.unwrap(), "echo: kursat");
        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn peer_hangup_is_closed() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LinesCodec::new());
            let _ = framed.next().await;
        });

        let transport = TcpTransport::new(DEFAULT_HOST, port);
        transport.handshake().await.unwrap();
        let err = transport.round_trip("anyone?").await.unwrap_err();
        assert!(err.is_disconnect(), "{err}");
        server.await.unwrap();

        let err = transport.round_trip("again").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(stream);
        });

        let transport =
            TcpTransport::new(DEFAULT_HOST, port).with_timeout(Duration::from_millis(50));
        transport.handshake().await.unwrap();
        let err = transport.round_trip("hello").await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_reply_is_skipped() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LinesCodec::new());
            let _ = framed.next().await;
            framed.send("x".repeat(64)).await.unwrap();
            let mut received = Vec::new();
            while let Some(Ok(line)) = framed.next().await {
                framed.send(format!("echo: {line}")).await.unwrap();
                received.push(line);
            }
            received
        });

        let transport = TcpTransport::new(DEFAULT_HOST, port).with_max_line_length(16);
        transport.handshake().await.unwrap();
        let err = transport.round_trip("big").await.unwrap_err();
        assert!(matches!(err, TransportError::Codec { .. }), "{err}");
        assert!(!err.is_disconnect());

        // The rest of the long line is skipped and the next reply is correlated.
        assert_eq!(transport.round_trip("second").await.unwrap(), "echo: second");
        assert_eq!(transport.round_trip("third").await.unwrap(), "echo: third");
        transport.close().await.unwrap();
        assert_eq!(server.await.unwrap(), vec!["second", "third"]);
    }

    #[tokio::test]
    async fn refused_connection_is_io_error() {
        let (listener, port) = listener().await;
        drop(listener);

        let transport = TcpTransport::new(DEFAULT_HOST, port);
        let err = transport.handshake().await.unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }), "{err}");
    }
}
