//! Error types for echarlar.
//!
//! Errors are layered the same way the components are: the transport reports
//! [`TransportError`], the session wraps handshake failures in
//! [`ConnectionError`], and the exchanger reports [`ExchangeError`].  The
//! crate-level [`Error`] covers configuration and start-up failures of the
//! chat front-end.  None of them is fatal; every one is recoverable by the
//! caller trying again.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

///////////////////////////////////////////// Transport ////////////////////////////////////////////

/// An error reported by a [`Transport`](crate::Transport).
#[derive(Clone, Debug)]
pub enum TransportError {
    /// I/O error on the underlying connection.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// The operation did not complete in time.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The peer closed the connection.
    Closed {
        /// Human-readable error message.
        message: String,
    },

    /// A frame could not be encoded or decoded.
    Codec {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The transport was used before a successful handshake.
    NotConnected {
        /// Human-readable error message.
        message: String,
    },
}

impl TransportError {
    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        TransportError::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        TransportError::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new closed-connection error.
    pub fn closed(message: impl Into<String>) -> Self {
        TransportError::Closed {
            message: message.into(),
        }
    }

    /// Creates a new codec error.
    pub fn codec(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        TransportError::Codec {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new not-connected error.
    pub fn not_connected(message: impl Into<String>) -> Self {
        TransportError::NotConnected {
            message: message.into(),
        }
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Returns true if the peer closed the connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed { .. })
    }

    /// Returns true if the connection cannot carry another round trip.
    ///
    /// A timed out request may still be answered later, and that late reply
    /// would be read as the answer to the next request, so a timeout leaves the
    /// connection unusable just like an I/O error does.  A codec error discards
    /// only the offending frame and the stream keeps its framing.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Io { .. } => true,
            TransportError::Timeout { .. } => true,
            TransportError::Closed { .. } => true,
            TransportError::NotConnected { .. } => true,
            TransportError::Codec { .. } => false,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            TransportError::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            TransportError::Closed { message } => {
                write!(f, "Connection closed: {message}")
            }
            TransportError::Codec { message, .. } => {
                write!(f, "Codec error: {message}")
            }
            TransportError::NotConnected { message } => {
                write!(f, "Not connected: {message}")
            }
        }
    }
}

impl error::Error for TransportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            TransportError::Io { source, .. } => Some(source.as_ref()),
            TransportError::Codec { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::io(err.to_string(), err)
    }
}

//////////////////////////////////////////// Connection ////////////////////////////////////////////

/// An error establishing or tearing down the session.
#[derive(Clone, Debug)]
pub enum ConnectionError {
    /// The transport handshake failed.  The session is left `Failed`.
    Handshake {
        /// The transport's report.
        source: TransportError,
    },

    /// A handshake is still running, so the session cannot be torn down.
    InProgress,

    /// An exchange is in flight, so the session cannot be reset.
    Busy,
}

impl ConnectionError {
    /// Creates a new handshake error.
    pub fn handshake(source: TransportError) -> Self {
        ConnectionError::Handshake { source }
    }

    /// Returns true if the handshake failed.
    pub fn is_handshake(&self) -> bool {
        matches!(self, ConnectionError::Handshake { .. })
    }

    /// Returns true if the session was busy connecting.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ConnectionError::InProgress)
    }

    /// Returns true if an exchange was awaiting its reply.
    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionError::Busy)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Handshake { source } => {
                write!(f, "not connected: handshake failed: {source}")
            }
            ConnectionError::InProgress => {
                write!(f, "connection attempt in progress")
            }
            ConnectionError::Busy => {
                write!(f, "a message is awaiting its reply")
            }
        }
    }
}

impl error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConnectionError::Handshake { source } => Some(source),
            ConnectionError::InProgress | ConnectionError::Busy => None,
        }
    }
}

///////////////////////////////////////////// Exchange /////////////////////////////////////////////

/// An error sending a message and awaiting its reply.
///
/// A failed exchange never touches the transcript.
#[derive(Clone, Debug)]
pub enum ExchangeError {
    /// No session is established; the transport was not called.
    NotConnected,

    /// Another exchange is in flight.
    Busy,

    /// The round trip failed.  The message that was not delivered is kept so
    /// it can be resubmitted.
    Transport {
        /// The text that was being sent.
        text: String,
        /// The transport's report.
        source: TransportError,
    },
}

impl ExchangeError {
    /// Creates a new transport error carrying the unsent text.
    pub fn transport(text: impl Into<String>, source: TransportError) -> Self {
        ExchangeError::Transport {
            text: text.into(),
            source,
        }
    }

    /// Returns true if no session was established.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, ExchangeError::NotConnected)
    }

    /// Returns true if another exchange was in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, ExchangeError::Busy)
    }

    /// Returns true if the round trip failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExchangeError::Transport { .. })
    }

    /// Returns the text that failed to go out, if the error carries it.
    pub fn unsent_text(&self) -> Option<&str> {
        match self {
            ExchangeError::Transport { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::NotConnected => write!(f, "not connected"),
            ExchangeError::Busy => write!(f, "another message is still in flight"),
            ExchangeError::Transport { source, .. } => {
                write!(f, "message not delivered: {source}")
            }
        }
    }
}

impl error::Error for ExchangeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ExchangeError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

/////////////////////////////////////////////// Crate //////////////////////////////////////////////

/// Errors from configuring and starting the chat client.
#[derive(Clone, Debug)]
pub enum Error {
    /// Invalid configuration.
    Config {
        /// Human-readable error message.
        message: String,
        /// Setting that was rejected.
        param: Option<String>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error parsing a configuration file.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The session could not be established.
    Connection(ConnectionError),
}

impl Error {
    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Config {
            message: message.into(),
            param,
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { message, param } => {
                if let Some(param) = param {
                    write!(f, "Configuration error: {message} (parameter: {param})")
                } else {
                    write!(f, "Configuration error: {message}")
                }
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Connection(err) => {
                write!(f, "Connection error: {err}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source.as_ref()),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Connection(err) => Some(err),
            Error::Config { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

/// A specialized Result type for echarlar configuration and start-up.
pub type Result<T> = std::result::Result<T, Error>;
