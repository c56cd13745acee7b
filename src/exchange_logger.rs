//! Hook for capturing exchanges as they complete.
//!
//! This module provides the [`ExchangeLogger`] trait that allows embedders to
//! record every exchange passing through a
//! [`MessageExchanger`](crate::MessageExchanger).

use crate::error::TransportError;

/// A trait for logging message exchanges.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use echarlar::ExchangeLogger;
///
/// #[derive(Default)]
/// struct Recorder {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl ExchangeLogger for Recorder {
///     fn log_exchange(&self, sent: &str, reply: &str) {
///         self.lines.lock().unwrap().push(format!("{sent} -> {reply}"));
///     }
/// }
/// ```
pub trait ExchangeLogger: Send + Sync {
    /// Log a completed exchange.
    ///
    /// Called once per successful send, after both lines have been appended to
    /// the transcript.
    fn log_exchange(&self, sent: &str, reply: &str);

    /// Log a round trip that failed.
    ///
    /// Called once per send that reached the transport and failed there.
    /// Sends rejected before reaching the transport are not logged.
    fn log_failure(&self, text: &str, error: &TransportError) {
        _ = text;
        _ = error;
    }
}
