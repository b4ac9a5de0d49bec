//! Retry loop: attempt, classify, wait, retry or give up.

use std::time::Duration;

use crate::config::RetryConfig;

use super::cancel::{CancelToken, WaitMode, WaitOutcome};
use super::error::{GiveUpReason, RetryError};
use super::policy::BackoffPolicy;
use super::retryable::Retryable;

/// Classified outcome of one attempt.
#[derive(Debug)]
pub enum AttemptResult<T, E> {
    Success(T),
    RetryableFailure(E),
    FatalFailure(E),
}

/// The classifier failed while judging `failure`.
struct ClassifierFailure<E> {
    failure: E,
    classify_error: E,
}

/// Per-call bookkeeping. Owned by one `execute` call, never shared.
#[derive(Debug)]
struct RetryState<E> {
    attempts: u32,
    retries: u32,
    current_wait_ms: u64,
    first_failure: Option<E>,
}

impl<E> RetryState<E> {
    fn new(first_wait_ms: u64) -> Self {
        Self {
            attempts: 0,
            retries: 0,
            current_wait_ms: first_wait_ms,
            first_failure: None,
        }
    }

    /// Keep the first failure; later ones only matter as the final cause.
    fn record(&mut self, error: E) {
        if self.first_failure.is_none() {
            self.first_failure = Some(error);
        }
    }

    /// Split into (first, last-if-different) with `last` as the final failure.
    fn finish(self, last: E) -> (E, Option<E>) {
        match self.first_failure {
            Some(first) => (first, Some(last)),
            None => (last, None),
        }
    }
}

/// Drives a [`Retryable`] until success, a non-retryable failure, or the
/// retry budget is spent. Holds no per-call state; one executor can serve
/// concurrent calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    config: RetryConfig,
    backoff: BackoffPolicy,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            backoff: BackoffPolicy::new(&config),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run without observing cancellation.
    pub fn run<R: Retryable>(&self, op: &mut R) -> Result<R::Output, RetryError<R::Error>> {
        self.execute(op, &CancelToken::new(), WaitMode::Uninterruptible)
    }

    /// Run with uninterruptible waits: a cancellation on `token` lets the
    /// current wait finish and stays set for the caller to observe.
    pub fn run_with_token<R: Retryable>(
        &self,
        op: &mut R,
        token: &CancelToken,
    ) -> Result<R::Output, RetryError<R::Error>> {
        self.execute(op, token, WaitMode::Uninterruptible)
    }

    /// Run with interruptible waits: a cancellation on `token` during a wait
    /// returns [`RetryError::Cancelled`] without another attempt.
    pub fn run_interruptible<R: Retryable>(
        &self,
        op: &mut R,
        token: &CancelToken,
    ) -> Result<R::Output, RetryError<R::Error>> {
        self.execute(op, token, WaitMode::Interruptible)
    }

    fn execute<R: Retryable>(
        &self,
        op: &mut R,
        token: &CancelToken,
        mode: WaitMode,
    ) -> Result<R::Output, RetryError<R::Error>> {
        let retry_limit = self.config.retry_limit();
        let mut state = RetryState::new(self.backoff.first_wait_ms());

        loop {
            state.attempts += 1;
            let error = match self.attempt(op, state.attempts) {
                Ok(AttemptResult::Success(value)) => return Ok(value),
                Ok(AttemptResult::RetryableFailure(error)) => error,
                Ok(AttemptResult::FatalFailure(error)) => {
                    return Err(self.give_up(op, state, error, GiveUpReason::NotRetryable));
                }
                Err(ClassifierFailure {
                    failure,
                    classify_error,
                }) => {
                    state.record(failure);
                    return Err(self.give_up(
                        op,
                        state,
                        classify_error,
                        GiveUpReason::ClassifierFailed,
                    ));
                }
            };
            if state.retries >= retry_limit {
                return Err(self.give_up(op, state, error, GiveUpReason::Exhausted));
            }

            state.retries += 1;
            let suggested = op.adjust_retry_wait(
                &error,
                state.retries,
                retry_limit,
                Duration::from_millis(state.current_wait_ms),
            );
            let wait_ms = self
                .backoff
                .clamp(u64::try_from(suggested.as_millis()).unwrap_or(u64::MAX));
            let wait = Duration::from_millis(wait_ms);

            if op
                .on_retry(&error, state.retries, retry_limit, wait)
                .is_break()
            {
                return Err(self.give_up(op, state, error, GiveUpReason::Aborted));
            }

            match token.wait(wait, mode) {
                WaitOutcome::Elapsed => {}
                WaitOutcome::Deferred => {
                    tracing::debug!("cancellation during retry wait deferred until the call returns");
                }
                WaitOutcome::Cancelled => {
                    tracing::debug!("retry wait cancelled after {} attempt(s)", state.attempts);
                    return Err(RetryError::Cancelled {
                        attempts: state.attempts,
                    });
                }
            }

            state.record(error);
            state.current_wait_ms = self.backoff.next_wait_ms(wait_ms);
        }
    }

    /// One attempt plus its classification.
    fn attempt<R: Retryable>(
        &self,
        op: &mut R,
        attempt: u32,
    ) -> Result<AttemptResult<R::Output, R::Error>, ClassifierFailure<R::Error>> {
        let error = match op.call() {
            Ok(value) => return Ok(AttemptResult::Success(value)),
            Err(error) => error,
        };
        match op.is_retryable(&error) {
            Ok(true) => {
                tracing::debug!("attempt {} failed (retryable): {}", attempt, error);
                Ok(AttemptResult::RetryableFailure(error))
            }
            Ok(false) => {
                tracing::debug!("attempt {} failed (not retryable): {}", attempt, error);
                Ok(AttemptResult::FatalFailure(error))
            }
            Err(classify_error) => {
                tracing::debug!(
                    "attempt {} failed ({}) and classifying it failed: {}",
                    attempt,
                    error,
                    classify_error
                );
                Err(ClassifierFailure {
                    failure: error,
                    classify_error,
                })
            }
        }
    }

    fn give_up<R: Retryable>(
        &self,
        op: &mut R,
        state: RetryState<R::Error>,
        last: R::Error,
        reason: GiveUpReason,
    ) -> RetryError<R::Error> {
        let attempts = state.attempts;
        let (first, last) = state.finish(last);
        op.on_give_up(&first, last.as_ref().unwrap_or(&first));
        tracing::debug!("giving up after {} attempt(s) ({}): {}", attempts, reason, first);
        RetryError::GiveUp {
            first,
            last,
            attempts,
            reason,
        }
    }
}
