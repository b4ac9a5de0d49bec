//! Terminal errors of the retry loop.

use std::error::Error;
use std::fmt;

/// Why the executor stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The failure was classified as not retryable.
    NotRetryable,
    /// `retry_limit` retries were used up.
    Exhausted,
    /// The classifier itself failed; its error is the last cause.
    ClassifierFailed,
    /// `on_retry` asked to stop.
    Aborted,
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiveUpReason::NotRetryable => write!(f, "not retryable"),
            GiveUpReason::Exhausted => write!(f, "retries exhausted"),
            GiveUpReason::ClassifierFailed => write!(f, "classification failed"),
            GiveUpReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// Terminal failure of [`super::RetryExecutor`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// Retrying stopped. `first` is the first failure observed and is the
    /// reported cause; `last` is the final failure when it differs from the first.
    GiveUp {
        first: E,
        last: Option<E>,
        attempts: u32,
        reason: GiveUpReason,
    },
    /// Cancellation arrived during an interruptible backoff wait.
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// First observed cause; `None` for cancellation.
    pub fn first_cause(&self) -> Option<&E> {
        match self {
            RetryError::GiveUp { first, .. } => Some(first),
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Final observed cause (the first one when only one failure happened).
    pub fn last_cause(&self) -> Option<&E> {
        match self {
            RetryError::GiveUp { first, last, .. } => Some(last.as_ref().unwrap_or(first)),
            RetryError::Cancelled { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::GiveUp { attempts, .. } | RetryError::Cancelled { attempts } => *attempts,
        }
    }

    pub fn reason(&self) -> Option<GiveUpReason> {
        match self {
            RetryError::GiveUp { reason, .. } => Some(*reason),
            RetryError::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Unwrap the first cause, dropping the retry context.
    pub fn into_cause(self) -> Option<E> {
        match self {
            RetryError::GiveUp { first, .. } => Some(first),
            RetryError::Cancelled { .. } => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::GiveUp {
                first,
                last,
                attempts,
                reason,
            } => {
                write!(f, "gave up after {} attempt(s) ({}): {}", attempts, reason, first)?;
                if let Some(last) = last {
                    write!(f, "; last failure: {}", last)?;
                }
                Ok(())
            }
            RetryError::Cancelled { attempts } => {
                write!(f, "cancelled while waiting to retry after {} attempt(s)", attempts)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::GiveUp { first, .. } => Some(first),
            RetryError::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Cause(&'static str);

    #[test]
    fn give_up_reports_first_and_last() {
        let err = RetryError::GiveUp {
            first: Cause("connection reset"),
            last: Some(Cause("timed out")),
            attempts: 4,
            reason: GiveUpReason::Exhausted,
        };
        assert_eq!(
            err.to_string(),
            "gave up after 4 attempt(s) (retries exhausted): connection reset; last failure: timed out"
        );
        assert_eq!(err.first_cause().unwrap().0, "connection reset");
        assert_eq!(err.last_cause().unwrap().0, "timed out");
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }

    #[test]
    fn single_failure_last_is_first() {
        let err = RetryError::GiveUp {
            first: Cause("404"),
            last: None,
            attempts: 1,
            reason: GiveUpReason::NotRetryable,
        };
        assert_eq!(err.last_cause().unwrap().0, "404");
        assert_eq!(err.into_cause().unwrap().0, "404");
    }

    #[test]
    fn cancelled_has_no_cause() {
        let err: RetryError<Cause> = RetryError::Cancelled { attempts: 2 };
        assert!(err.is_cancelled());
        assert!(err.first_cause().is_none());
        assert!(err.source().is_none());
        assert_eq!(err.attempts(), 2);
    }
}
