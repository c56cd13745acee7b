//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::error::TransportError;
use crate::transport::Transport;

/// A [`Transport`] whose outcomes are scripted by the test.
///
/// Handshakes succeed and replies are `re: <text>` unless a failure or a
/// specific reply has been queued.  Gates hold an operation pending until the
/// test releases it.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    handshake_failures: Mutex<VecDeque<TransportError>>,
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    sent: Mutex<Vec<String>>,
    handshake_calls: AtomicUsize,
    round_trip_calls: AtomicUsize,
    close_calls: AtomicUsize,
    handshake_gate: Option<Semaphore>,
    reply_gate: Option<Semaphore>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_handshake_gate(mut self) -> Self {
        self.handshake_gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn with_reply_gate(mut self) -> Self {
        self.reply_gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn fail_next_handshake(&self, err: TransportError) {
        self.handshake_failures.lock().unwrap().push_back(err);
    }

    pub(crate) fn reply_with(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub(crate) fn fail_next_round_trip(&self, err: TransportError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub(crate) fn release_handshake(&self) {
        if let Some(gate) = &self.handshake_gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn release_reply(&self) {
        if let Some(gate) = &self.reply_gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn handshake_calls(&self) -> usize {
        self.handshake_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn round_trip_calls(&self) -> usize {
        self.round_trip_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn handshake(&self) -> Result<(), TransportError> {
        self.handshake_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.handshake_gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.handshake_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn round_trip(&self, text: &str) -> Result<String, TransportError> {
        self.round_trip_calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(text.to_string());
        if let Some(gate) = &self.reply_gate {
            gate.acquire().await.unwrap().forget();
        }
        let scripted = self.replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("re: {text}")))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
