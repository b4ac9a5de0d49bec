//! Single-attempt strategies supplied by callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::client::{EasyClient, MultiClient};

use super::classify::{RetryClassifier, StandardClassifier};
use super::error::{HttpError, TransportError};
use super::message::HttpResponse;
use super::HttpRequest;

/// Issues one request and returns the complete response.
pub trait SingleRequester<C: ?Sized>: RetryClassifier {
    fn request_once(&self, client: &C) -> Result<HttpResponse, TransportError>;
}

/// Starts one request whose response is delivered to `listener`.
///
/// Implementations must hand `listener` to the transport (or complete it
/// themselves on failure); dropping it reports [`TransportError::Closed`].
pub trait ListenerRequester<C: ?Sized>: RetryClassifier {
    fn request_once(&self, client: &C, listener: ResponseListener);
}

type Delivery = Result<HttpResponse, TransportError>;

/// Write half of a one-shot response slot.
#[derive(Debug)]
pub struct ResponseListener {
    tx: mpsc::SyncSender<Delivery>,
    abandoned: Arc<AtomicBool>,
}

impl ResponseListener {
    /// A listener and the handle that waits on it.
    pub fn pair() -> (ResponseListener, PendingResponse) {
        let (tx, rx) = mpsc::sync_channel(1);
        let abandoned = Arc::new(AtomicBool::new(false));
        (
            ResponseListener {
                tx,
                abandoned: Arc::clone(&abandoned),
            },
            PendingResponse { rx, abandoned },
        )
    }

    /// True once the waiting side has given up (timed out or dropped).
    /// Transports should abort the transfer and release its connection.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Deliver the outcome. A late delivery after the waiter timed out is dropped.
    pub fn complete(self, outcome: Delivery) {
        let _ = self.tx.try_send(outcome);
    }
}

/// Read half of a one-shot response slot.
///
/// Dropping it, including after [`wait`](PendingResponse::wait) returns,
/// marks the listener abandoned.
#[derive(Debug)]
pub struct PendingResponse {
    rx: mpsc::Receiver<Delivery>,
    abandoned: Arc<AtomicBool>,
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }
}

impl PendingResponse {
    /// Wait up to `timeout` for the listener to be completed.
    pub fn wait(self, timeout: Duration) -> Result<HttpResponse, HttpError> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Ok(outcome?),
            Err(RecvTimeoutError::Timeout) => Err(HttpError::ResponseTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed.into()),
        }
    }
}

/// A fixed request plus a classifier; works with both built-in clients.
#[derive(Debug, Clone)]
pub struct RequestSpec<K = StandardClassifier> {
    request: HttpRequest,
    classifier: K,
}

impl RequestSpec<StandardClassifier> {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            classifier: StandardClassifier,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpRequest::get(url))
    }
}

impl<K> RequestSpec<K> {
    pub fn with_classifier<K2: RetryClassifier>(self, classifier: K2) -> RequestSpec<K2> {
        RequestSpec {
            request: self.request,
            classifier,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

impl<K: RetryClassifier> RetryClassifier for RequestSpec<K> {
    fn is_status_retryable(&self, response: &HttpResponse) -> bool {
        self.classifier.is_status_retryable(response)
    }

    fn is_error_retryable(&self, error: &HttpError) -> bool {
        self.classifier.is_error_retryable(error)
    }
}

impl<K: RetryClassifier> SingleRequester<EasyClient> for RequestSpec<K> {
    fn request_once(&self, client: &EasyClient) -> Result<HttpResponse, TransportError> {
        client.execute(&self.request)
    }
}

impl<K: RetryClassifier> ListenerRequester<MultiClient> for RequestSpec<K> {
    fn request_once(&self, client: &MultiClient, listener: ResponseListener) {
        client.submit(self.request.clone(), listener);
    }
}
