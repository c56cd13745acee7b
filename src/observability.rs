//! Metrics and logging set-up.
//!
//! Counters and moments are recorded with `biometrics`; events go through
//! `tracing`.  Neither is emitted anywhere the caller has not asked for:
//! metrics need [`register_biometrics`] and events need a subscriber such as
//! the one [`set_up_logging`] installs.

use biometrics::{Collector, Counter, Moments};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

pub(crate) static SESSION_CONNECT_ATTEMPTS: Counter =
    Counter::new("echarlar.session.connect_attempts");
pub(crate) static SESSION_CONNECT_FAILURES: Counter =
    Counter::new("echarlar.session.connect_failures");
pub(crate) static SESSION_DISCONNECTS: Counter = Counter::new("echarlar.session.disconnects");
pub(crate) static SESSION_LOST: Counter = Counter::new("echarlar.session.lost");
pub(crate) static SESSION_HANDSHAKE_DURATION: Moments =
    Moments::new("echarlar.session.handshake_duration_seconds");

pub(crate) static EXCHANGES: Counter = Counter::new("echarlar.exchange.requests");
pub(crate) static EXCHANGE_ERRORS: Counter = Counter::new("echarlar.exchange.errors");
pub(crate) static EXCHANGE_NOT_CONNECTED: Counter =
    Counter::new("echarlar.exchange.not_connected");
pub(crate) static EXCHANGE_BUSY: Counter = Counter::new("echarlar.exchange.busy");
pub(crate) static EXCHANGE_DURATION: Moments =
    Moments::new("echarlar.exchange.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&SESSION_CONNECT_ATTEMPTS);
    collector.register_counter(&SESSION_CONNECT_FAILURES);
    collector.register_counter(&SESSION_DISCONNECTS);
    collector.register_counter(&SESSION_LOST);
    collector.register_moments(&SESSION_HANDSHAKE_DURATION);

    collector.register_counter(&EXCHANGES);
    collector.register_counter(&EXCHANGE_ERRORS);
    collector.register_counter(&EXCHANGE_NOT_CONNECTED);
    collector.register_counter(&EXCHANGE_BUSY);
    collector.register_moments(&EXCHANGE_DURATION);
}

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only warnings and errors are shown, so log lines do not
/// interleave with an interactive chat.
pub fn set_up_logging() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
