//! HTTP requests with retry.
//!
//! The pieces a caller supplies per call are a [`ResponseReader`] (what to
//! make of a 2xx body) and a requester (how to issue one attempt and which
//! failures to retry). [`HttpRetryable`] joins them into a
//! [`Retryable`](crate::retry::Retryable) the executor can drive.

mod adapter;
mod classify;
mod error;
mod message;
mod reader;
mod requester;

pub use adapter::{Blocking, Exchange, HttpRetryable, Listening};
pub use classify::{
    is_transient_curl_error, is_transient_status, to_retry, RetryClassifier, StandardClassifier,
};
pub use error::{BadStatus, DecodeError, HttpError, TransportError};
pub use message::{HttpRequest, HttpResponse, Method};
pub(crate) use message::{parse_header_line, parse_status_line};
pub use reader::{decode_text, BytesReader, JsonReader, ResponseReader, StreamReader, StringReader};
pub use requester::{
    ListenerRequester, PendingResponse, RequestSpec, ResponseListener, SingleRequester,
};
