//! The HTTP side of a retryable operation.
//!
//! [`HttpRetryable`] is the one adapter shape: an [`Exchange`] produces a
//! complete response per attempt, non-2xx responses become [`BadStatus`]
//! failures, and the reader turns a 2xx response into the result. The two
//! exchange shapes differ only in how the response arrives.

use std::ops::ControlFlow;
use std::time::Duration;

use crate::retry::{error_chain, RetryDiagnostics, Retryable};

use super::classify::to_retry;
use super::error::{BadStatus, HttpError};
use super::message::HttpResponse;
use super::reader::ResponseReader;
use super::requester::{ListenerRequester, ResponseListener, SingleRequester};

/// Produces one complete response per call and classifies its failures.
pub trait Exchange {
    fn exchange(&self) -> Result<HttpResponse, HttpError>;

    fn to_retry(&self, error: &HttpError) -> bool;
}

/// Request/response exchange: the requester returns the response directly.
pub struct Blocking<'a, C: ?Sized, Q> {
    client: &'a C,
    requester: &'a Q,
}

impl<'a, C: ?Sized, Q: SingleRequester<C>> Blocking<'a, C, Q> {
    pub fn new(client: &'a C, requester: &'a Q) -> Self {
        Self { client, requester }
    }
}

impl<C: ?Sized, Q: SingleRequester<C>> Exchange for Blocking<'_, C, Q> {
    fn exchange(&self) -> Result<HttpResponse, HttpError> {
        Ok(self.requester.request_once(self.client)?)
    }

    fn to_retry(&self, error: &HttpError) -> bool {
        to_retry(self.requester, error)
    }
}

/// Listener exchange: the response is awaited for at most `response_timeout`.
pub struct Listening<'a, C: ?Sized, Q> {
    client: &'a C,
    requester: &'a Q,
    response_timeout: Duration,
}

impl<'a, C: ?Sized, Q: ListenerRequester<C>> Listening<'a, C, Q> {
    pub fn new(client: &'a C, requester: &'a Q, response_timeout: Duration) -> Self {
        Self {
            client,
            requester,
            response_timeout,
        }
    }
}

impl<C: ?Sized, Q: ListenerRequester<C>> Exchange for Listening<'_, C, Q> {
    fn exchange(&self) -> Result<HttpResponse, HttpError> {
        let (listener, pending) = ResponseListener::pair();
        self.requester.request_once(self.client, listener);
        pending.wait(self.response_timeout)
    }

    fn to_retry(&self, error: &HttpError) -> bool {
        to_retry(self.requester, error)
    }
}

/// Adapts an [`Exchange`] and a [`ResponseReader`] to [`Retryable`].
pub struct HttpRetryable<'a, X, R> {
    exchange: X,
    reader: &'a R,
    diagnostics: &'a dyn RetryDiagnostics,
}

impl<'a, X: Exchange, R: ResponseReader> HttpRetryable<'a, X, R> {
    pub fn new(exchange: X, reader: &'a R, diagnostics: &'a dyn RetryDiagnostics) -> Self {
        Self {
            exchange,
            reader,
            diagnostics,
        }
    }
}

impl<X: Exchange, R: ResponseReader> Retryable for HttpRetryable<'_, X, R> {
    type Output = R::Output;
    type Error = HttpError;

    fn call(&mut self) -> Result<R::Output, HttpError> {
        let response = self.exchange.exchange()?;
        if !response.is_success() {
            return Err(bad_status(self.reader, response));
        }
        Ok(self.reader.read(response)?)
    }

    fn is_retryable(&self, error: &HttpError) -> Result<bool, HttpError> {
        Ok(self.exchange.to_retry(error))
    }

    /// Honour a `Retry-After` longer than the computed backoff.
    fn adjust_retry_wait(&self, error: &HttpError, _: u32, _: u32, wait: Duration) -> Duration {
        match error {
            HttpError::BadStatus(bad) => bad
                .response()
                .retry_after()
                .map_or(wait, |hint| hint.max(wait)),
            _ => wait,
        }
    }

    fn on_retry(
        &mut self,
        error: &HttpError,
        retry_count: u32,
        retry_limit: u32,
        wait: Duration,
    ) -> ControlFlow<()> {
        self.diagnostics
            .on_retry(error, retry_count, retry_limit, wait);
        ControlFlow::Continue(())
    }

    fn on_give_up(&mut self, first: &HttpError, last: &HttpError) {
        self.diagnostics.on_give_up(first, last);
    }
}

/// Build the failure for a non-2xx response. The body goes into the message;
/// if it cannot be read, the reason does instead.
fn bad_status<R: ResponseReader>(reader: &R, response: HttpResponse) -> HttpError {
    let detail = match reader.read_as_string(&response) {
        Ok(body) => body,
        Err(e) => format!("Response body not available by: {}", error_chain(&e)),
    };
    let message = format!(
        "Response not 2xx: {} {} {}",
        response.status, response.reason, detail
    );
    HttpError::BadStatus(Box::new(BadStatus::new(response, message)))
}
