//! The unit of work driven by the retry loop.

use std::error::Error;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::time::Duration;

/// One retryable operation: a single attempt plus the hooks the executor calls
/// around it. All hooks run on the caller's thread, in attempt order.
pub trait Retryable {
    type Output;
    type Error: Error + 'static;

    /// Perform exactly one attempt.
    fn call(&mut self) -> Result<Self::Output, Self::Error>;

    /// Whether `error` is worth another attempt. Called once per failure.
    ///
    /// An `Err` means classification itself failed: the executor gives up with
    /// that error recorded as the last cause.
    fn is_retryable(&self, error: &Self::Error) -> Result<bool, Self::Error>;

    /// Override the wait before retry `retry_count` (e.g. from a server hint).
    /// The result is capped at the configured maximum and becomes the base for
    /// the next doubling.
    fn adjust_retry_wait(
        &self,
        _error: &Self::Error,
        _retry_count: u32,
        _retry_limit: u32,
        wait: Duration,
    ) -> Duration {
        wait
    }

    /// Called after deciding to retry and before waiting. `Break` stops
    /// retrying and gives up with [`super::GiveUpReason::Aborted`].
    fn on_retry(
        &mut self,
        _error: &Self::Error,
        _retry_count: u32,
        _retry_limit: u32,
        _wait: Duration,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called exactly once before a give-up is returned.
    fn on_give_up(&mut self, _first: &Self::Error, _last: &Self::Error) {}
}

/// [`Retryable`] built from an attempt closure and a classification closure.
pub struct FnRetryable<F, P, E> {
    call: F,
    is_retryable: P,
    _error: PhantomData<fn() -> E>,
}

/// Build a [`Retryable`] from closures; hooks keep their defaults.
pub fn from_fn<T, E, F, P>(call: F, is_retryable: P) -> FnRetryable<F, P, E>
where
    E: Error + 'static,
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    FnRetryable {
        call,
        is_retryable,
        _error: PhantomData,
    }
}

impl<T, E, F, P> Retryable for FnRetryable<F, P, E>
where
    E: Error + 'static,
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    type Output = T;
    type Error = E;

    fn call(&mut self) -> Result<T, E> {
        (self.call)()
    }

    fn is_retryable(&self, error: &E) -> Result<bool, E> {
        Ok((self.is_retryable)(error))
    }
}
