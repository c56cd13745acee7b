//! A single-session chat client.
//!
//! [`SessionManager`] owns the one connection to the server and its
//! [`SessionStatus`].  [`MessageExchanger`] sends one message at a time
//! through it and records each completed exchange in a [`Transcript`].  The
//! network work is delegated to a [`Transport`]; [`TcpTransport`] speaks
//! newline-framed text over TCP.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use echarlar::{MessageExchanger, SessionManager, TcpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(SessionManager::new(TcpTransport::new("127.0.0.1", 8080)));
//! session.connect().await?;
//! let exchanger = MessageExchanger::new(Arc::clone(&session));
//! let reply = exchanger.send("hello").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod error;
pub mod exchange;
pub mod exchange_logger;
pub mod observability;
pub mod session;
pub mod transcript;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{ConnectionError, Error, ExchangeError, Result, TransportError};
pub use exchange::MessageExchanger;
pub use exchange_logger::ExchangeLogger;
pub use observability::{register_biometrics, set_up_logging};
pub use session::{SessionManager, SessionStatus};
pub use transcript::{Author, Transcript, TranscriptEntry};
pub use transport::{TcpTransport, Transport};
