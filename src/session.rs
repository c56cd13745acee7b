//! The single logical connection and its lifecycle.
//!
//! [`SessionManager`] owns the one [`Transport`] of the process and the
//! [`SessionStatus`] tag that says whether it may be used.  The tag lives in a
//! `watch` cell, so callers can read it at any time (including while a
//! handshake is suspended) or subscribe to every transition.
//!
//! ```text
//!   Idle ──connect──▶ Connecting ──ok──▶ Connected ──connect──▶ Connected
//!                       ▲   │
//!                       │   └──err──▶ Failed
//!                       └──connect──────┘
//! ```

use std::fmt;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ConnectionError, TransportError};
use crate::observability::{
    SESSION_CONNECT_ATTEMPTS, SESSION_CONNECT_FAILURES, SESSION_DISCONNECTS,
    SESSION_HANDSHAKE_DURATION, SESSION_LOST,
};
use crate::transport::Transport;

/// Status of the single session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// No connection has been attempted, or the session was reset.
    #[default]
    Idle,
    /// A handshake is in progress.
    Connecting,
    /// The handshake succeeded; exchanges may proceed.
    Connected,
    /// The last handshake failed, or the connection was lost.
    Failed,
}

impl SessionStatus {
    /// Returns true if exchanges may proceed.
    pub fn is_connected(self) -> bool {
        matches!(self, SessionStatus::Connected)
    }

    /// Returns the lowercase name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the session status and the transport behind it.
pub struct SessionManager<T: Transport> {
    transport: T,
    status: watch::Sender<SessionStatus>,
}

impl<T: Transport> SessionManager<T> {
    /// Creates an idle session over `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            status: watch::Sender::new(SessionStatus::Idle),
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Returns a receiver that observes every status transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Establishes the session.
    ///
    /// Returns immediately with success when the session is already
    /// `Connected` or `Connecting`.  From `Idle` or `Failed` the status moves
    /// to `Connecting`, the transport handshake runs once, and the status
    /// settles on `Connected` or `Failed`.  There is no automatic retry.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Handshake`] if the transport handshake fails.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let mut previous = SessionStatus::Idle;
        let began = self.status.send_if_modified(|status| {
            previous = *status;
            match *status {
                SessionStatus::Idle | SessionStatus::Failed => {
                    *status = SessionStatus::Connecting;
                    true
                }
                SessionStatus::Connecting | SessionStatus::Connected => false,
            }
        });
        if !began {
            debug!(status = %previous, "connect is a no-op");
            return Ok(());
        }

        SESSION_CONNECT_ATTEMPTS.click();
        info!(from = %previous, "connecting");
        let mut attempt = Attempt::new(&self.status);
        let start = Instant::now();
        let result = self.transport.handshake().await;
        SESSION_HANDSHAKE_DURATION.add(start.elapsed().as_secs_f64());
        match result {
            Ok(()) => {
                attempt.settle(SessionStatus::Connected);
                info!("connected");
                Ok(())
            }
            Err(err) => {
                SESSION_CONNECT_FAILURES.click();
                attempt.settle(SessionStatus::Failed);
                warn!(error = %err, "handshake failed");
                Err(ConnectionError::handshake(err))
            }
        }
    }

    /// Resets the session to `Idle`, closing the transport.
    ///
    /// A no-op when already `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InProgress`] while a handshake is running.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        match self.status() {
            SessionStatus::Idle => return Ok(()),
            SessionStatus::Connecting => return Err(ConnectionError::InProgress),
            SessionStatus::Connected | SessionStatus::Failed => {}
        }
        if let Err(err) = self.transport.close().await {
            debug!(error = %err, "error closing transport");
        }
        self.status.send_if_modified(|status| {
            if *status == SessionStatus::Connecting {
                return false;
            }
            *status = SessionStatus::Idle;
            true
        });
        SESSION_DISCONNECTS.click();
        info!("disconnected");
        Ok(())
    }

    /// Marks a connected session as lost after the transport reported that the
    /// connection can no longer carry a round trip.
    pub(crate) fn mark_lost(&self, cause: &TransportError) {
        let lost = self.status.send_if_modified(|status| {
            if *status != SessionStatus::Connected {
                return false;
            }
            *status = SessionStatus::Failed;
            true
        });
        if lost {
            SESSION_LOST.click();
            warn!(error = %cause, "connection lost");
        }
    }
}

/// A handshake in progress.
///
/// If the connect future is dropped before the handshake settles, the session
/// is left `Failed` instead of stuck in `Connecting`.
struct Attempt<'a> {
    status: &'a watch::Sender<SessionStatus>,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn new(status: &'a watch::Sender<SessionStatus>) -> Self {
        Self {
            status,
            settled: false,
        }
    }

    fn settle(&mut self, outcome: SessionStatus) {
        self.status.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.status.send_if_modified(|status| {
                if *status != SessionStatus::Connecting {
                    return false;
                }
                *status = SessionStatus::Failed;
                true
            });
        }
    }
}
