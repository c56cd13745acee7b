//! Sending messages and recording the replies.
//!
//! [`MessageExchanger`] admits one exchange at a time.  An exchange checks that
//! the session is connected, claims the in-flight marker, performs one round
//! trip, and only then appends the sent line and the reply to the transcript,
//! together.  A rejected or failed exchange leaves the transcript exactly as
//! it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{ConnectionError, ExchangeError, TransportError};
use crate::exchange_logger::ExchangeLogger;
use crate::observability::{
    EXCHANGE_BUSY, EXCHANGE_DURATION, EXCHANGE_ERRORS, EXCHANGE_NOT_CONNECTED, EXCHANGES,
};
use crate::session::SessionManager;
use crate::transcript::Transcript;
use crate::transport::Transport;

/// Serializes messages to the server and accumulates the transcript.
pub struct MessageExchanger<T: Transport> {
    session: Arc<SessionManager<T>>,
    transcript: Mutex<Transcript>,
    in_flight: AtomicBool,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn ExchangeLogger>>,
}

impl<T: Transport> MessageExchanger<T> {
    /// Creates an exchanger with an empty transcript over `session`.
    pub fn new(session: Arc<SessionManager<T>>) -> Self {
        Self {
            session,
            transcript: Mutex::new(Transcript::new()),
            in_flight: AtomicBool::new(false),
            timeout: None,
            logger: None,
        }
    }

    /// Bounds each round trip.  An exchange that runs out of time fails with
    /// [`TransportError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reports every exchange to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ExchangeLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns the session this exchanger sends through.
    pub fn session(&self) -> &Arc<SessionManager<T>> {
        &self.session
    }

    /// Sends `text` and returns the server's reply.
    ///
    /// `text` may be empty.  On success the transcript gains the sent line and
    /// then the reply.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::NotConnected`] if the session is not connected.  The
    ///   transport is not called.
    /// - [`ExchangeError::Busy`] if another exchange is in flight.
    /// - [`ExchangeError::Transport`] if the round trip failed.  The error
    ///   carries `text` so it can be resubmitted.
    pub async fn send(&self, text: &str) -> Result<String, ExchangeError> {
        if !self.session.status().is_connected() {
            EXCHANGE_NOT_CONNECTED.click();
            debug!(status = %self.session.status(), "send rejected: not connected");
            return Err(ExchangeError::NotConnected);
        }
        let Some(_in_flight) = InFlight::claim(&self.in_flight) else {
            EXCHANGE_BUSY.click();
            debug!("send rejected: busy");
            return Err(ExchangeError::Busy);
        };

        EXCHANGES.click();
        let start = Instant::now();
        let result = self.round_trip(text).await;
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());
        match result {
            Ok(reply) => {
                let at = OffsetDateTime::now_utc();
                self.lock_transcript()
                    .push_exchange(text.to_string(), reply.clone(), at);
                debug!(sent = text.len(), received = reply.len(), "exchange complete");
                if let Some(logger) = &self.logger {
                    logger.log_exchange(text, &reply);
                }
                Ok(reply)
            }
            Err(err) => {
                EXCHANGE_ERRORS.click();
                warn!(error = %err, "exchange failed");
                if err.is_disconnect() {
                    self.session.mark_lost(&err);
                }
                if let Some(logger) = &self.logger {
                    logger.log_failure(text, &err);
                }
                Err(ExchangeError::transport(text, err))
            }
        }
    }

    /// Returns a snapshot of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.lock_transcript().clone()
    }

    /// Returns the number of transcript entries.
    pub fn len(&self) -> usize {
        self.lock_transcript().len()
    }

    /// Returns true if the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_transcript().is_empty()
    }

    /// Disconnects the session and clears the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InProgress`] while a handshake is running
    /// and [`ConnectionError::Busy`] while a message awaits its reply; the
    /// transcript is kept in both cases.
    pub async fn reset(&self) -> Result<(), ConnectionError> {
        let Some(_in_flight) = InFlight::claim(&self.in_flight) else {
            debug!("reset rejected: busy");
            return Err(ConnectionError::Busy);
        };
        self.session.disconnect().await?;
        self.lock_transcript().clear();
        Ok(())
    }

    async fn round_trip(&self, text: &str) -> Result<String, TransportError> {
        let transport = self.session.transport();
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, transport.round_trip(text))
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::timeout(
                        "awaiting reply",
                        Some(timeout.as_secs_f64()),
                    ))
                }),
            None => transport.round_trip(text).await,
        }
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Transcript> {
        // Nothing panics while holding the lock.
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of the in-flight marker, released on drop even if the send future
/// is abandoned part way.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
