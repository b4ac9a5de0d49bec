//! `RetryHelper`: a retry config, one HTTP client and a diagnostics sink.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{ClientError, ClientFactory, ClientHandle, ManagedClient};
use crate::config::RetryConfig;
use crate::http::{
    Blocking, HttpError, HttpRetryable, ListenerRequester, Listening, ResponseReader,
    SingleRequester,
};
use crate::retry::{CancelToken, RetryDiagnostics, RetryError, RetryExecutor, TracingDiagnostics};

/// Issues HTTP requests with retry over one client.
///
/// An engine-owned client (see [`RetryHelper::new`]) is stopped and destroyed
/// by [`close`](RetryHelper::close) or on drop; a ready-made client is left to
/// its owner. Waits between attempts are interruptible through
/// [`cancel_token`](RetryHelper::cancel_token).
pub struct RetryHelper<C: ManagedClient> {
    executor: RetryExecutor,
    client: ClientHandle<C>,
    diagnostics: Arc<dyn RetryDiagnostics>,
    cancel: CancelToken,
}

impl<C: ManagedClient> RetryHelper<C> {
    /// Create and start a client through `factory` and own it.
    pub fn new<F>(config: RetryConfig, factory: &F) -> Result<Self, ClientError>
    where
        F: ClientFactory<Client = C> + ?Sized,
    {
        Ok(Self::with_handle(config, ClientHandle::create_owned(factory)?))
    }

    /// Use a client the caller already started. It is never closed here.
    pub fn with_ready_made_client(config: RetryConfig, client: Arc<C>) -> Self {
        Self::with_handle(config, ClientHandle::wrap_external(client))
    }

    fn with_handle(config: RetryConfig, client: ClientHandle<C>) -> Self {
        Self {
            executor: RetryExecutor::new(config),
            client,
            diagnostics: Arc::new(TracingDiagnostics),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn RetryDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &RetryConfig {
        self.executor.config()
    }

    pub fn client(&self) -> &C {
        self.client.client()
    }

    /// Retry a request/response exchange until `reader` yields a result.
    pub fn request_with_retry<R, Q>(
        &self,
        reader: &R,
        requester: &Q,
    ) -> Result<R::Output, RetryError<HttpError>>
    where
        R: ResponseReader,
        Q: SingleRequester<C>,
    {
        let exchange = Blocking::new(self.client.client(), requester);
        let mut op = HttpRetryable::new(exchange, reader, self.diagnostics.as_ref());
        self.executor.run_interruptible(&mut op, &self.cancel)
    }

    /// Retry a listener exchange; each attempt waits at most `response_timeout`
    /// for its response.
    pub fn request_with_listener<R, Q>(
        &self,
        reader: &R,
        requester: &Q,
        response_timeout: Duration,
    ) -> Result<R::Output, RetryError<HttpError>>
    where
        R: ResponseReader,
        Q: ListenerRequester<C>,
    {
        let exchange = Listening::new(self.client.client(), requester, response_timeout);
        let mut op = HttpRetryable::new(exchange, reader, self.diagnostics.as_ref());
        self.executor.run_interruptible(&mut op, &self.cancel)
    }

    /// Tear down an engine-owned client, reporting a failed stop.
    pub fn close(mut self) -> Result<(), ClientError> {
        self.client.teardown()
    }
}
