//! Retry and give-up notifications.
//!
//! A sink is passed to the HTTP helpers explicitly. Every sink shares the same
//! message format: `Retrying {n}/{limit} after {seconds} seconds. Message: {cause}`,
//! with the full error chain attached on every third retry only.

use std::error::Error;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Retries whose number is a multiple of this carry the full error chain.
pub const DETAIL_EVERY: u32 = 3;

/// Receives retry notifications for one or more calls.
pub trait RetryDiagnostics: Send + Sync {
    fn on_retry(&self, error: &(dyn Error + 'static), retry_count: u32, retry_limit: u32, wait: Duration);

    fn on_give_up(&self, _first: &(dyn Error + 'static), _last: &(dyn Error + 'static)) {}
}

/// `Retrying 2/5 after 1 seconds. Message: ...`
pub fn retry_message(error: &dyn Error, retry_count: u32, retry_limit: u32, wait: Duration) -> String {
    format!(
        "Retrying {}/{} after {} seconds. Message: {}",
        retry_count,
        retry_limit,
        wait.as_secs(),
        error
    )
}

/// Whether retry `retry_count` gets the full error chain.
pub fn includes_detail(retry_count: u32) -> bool {
    retry_count % DETAIL_EVERY == 0
}

/// Multi-line rendering of an error and its `source()` chain.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    if source.is_some() {
        out.push_str("\n\nCaused by:");
    }
    let mut index = 0;
    while let Some(cause) = source {
        let _ = write!(out, "\n    {}: {}", index, cause);
        index += 1;
        source = cause.source();
    }
    out
}

/// Logs through `tracing` at WARN (retries) and DEBUG (give-ups).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl RetryDiagnostics for TracingDiagnostics {
    fn on_retry(&self, error: &(dyn Error + 'static), retry_count: u32, retry_limit: u32, wait: Duration) {
        let message = retry_message(error, retry_count, retry_limit, wait);
        if includes_detail(retry_count) {
            tracing::warn!("{}\n{}", message, error_chain(error));
        } else {
            tracing::warn!("{}", message);
        }
    }

    fn on_give_up(&self, first: &(dyn Error + 'static), last: &(dyn Error + 'static)) {
        tracing::debug!("giving up; first failure: {}; last failure: {}", first, last);
    }
}

/// A notification captured by [`RecordingDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    Retry {
        retry_count: u32,
        retry_limit: u32,
        wait: Duration,
        message: String,
        detail: Option<String>,
    },
    GiveUp {
        first: String,
        last: String,
    },
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn retry_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::Retry { .. }))
            .count()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl RetryDiagnostics for RecordingDiagnostics {
    fn on_retry(&self, error: &(dyn Error + 'static), retry_count: u32, retry_limit: u32, wait: Duration) {
        self.push(DiagnosticEvent::Retry {
            retry_count,
            retry_limit,
            wait,
            message: retry_message(error, retry_count, retry_limit, wait),
            detail: includes_detail(retry_count).then(|| error_chain(error)),
        });
    }

    fn on_give_up(&self, first: &(dyn Error + 'static), last: &(dyn Error + 'static)) {
        self.push(DiagnosticEvent::GiveUp {
            first: first.to_string(),
            last: last.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct Outer(#[source] Refused);

    #[test]
    fn message_template() {
        let msg = retry_message(&Refused, 2, 5, Duration::from_millis(2500));
        assert_eq!(msg, "Retrying 2/5 after 2 seconds. Message: connection refused");
    }

    #[test]
    fn sub_second_wait_prints_zero_seconds() {
        let msg = retry_message(&Refused, 1, 3, Duration::from_millis(500));
        assert!(msg.starts_with("Retrying 1/3 after 0 seconds."));
    }

    #[test]
    fn detail_every_third_retry() {
        let detailed: Vec<u32> = (1..=9).filter(|n| includes_detail(*n)).collect();
        assert_eq!(detailed, vec![3, 6, 9]);
    }

    #[test]
    fn error_chain_lists_sources() {
        let chain = error_chain(&Outer(Refused));
        assert_eq!(chain, "request failed\n\nCaused by:\n    0: connection refused");
        assert_eq!(error_chain(&Refused), "connection refused");
    }

    #[test]
    fn recording_sink_attaches_detail_on_third_retry() {
        let sink = RecordingDiagnostics::new();
        for n in 1..=3 {
            sink.on_retry(&Outer(Refused), n, 3, Duration::from_secs(1));
        }
        let details: Vec<bool> = sink
            .events()
            .iter()
            .map(|e| match e {
                DiagnosticEvent::Retry { detail, .. } => detail.is_some(),
                DiagnosticEvent::GiveUp { .. } => false,
            })
            .collect();
        assert_eq!(details, vec![false, false, true]);
        assert_eq!(sink.retry_count(), 3);
    }
}
