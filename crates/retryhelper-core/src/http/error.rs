//! Failures of a single HTTP attempt.

use std::fmt;
use std::time::Duration;

use super::message::HttpResponse;

/// The client could not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("curl multi: {0}")]
    Multi(#[from] curl::MultiError),
    /// The client was stopped before or during the request.
    #[error("HTTP client is stopped")]
    Stopped,
    /// The listener was dropped without a response being delivered.
    #[error("response listener closed without a response")]
    Closed,
}

/// The response body could not be turned into the requested type.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported charset {0:?}")]
    UnsupportedCharset(String),
    #[error("response body is not valid {charset} (invalid byte at offset {offset})")]
    InvalidText { charset: &'static str, offset: usize },
    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A non-2xx response. The message embeds the body, or why it could not be read.
#[derive(Debug)]
pub struct BadStatus {
    response: HttpResponse,
    message: String,
}

impl BadStatus {
    pub fn new(response: HttpResponse, message: String) -> Self {
        Self { response, message }
    }

    pub fn status(&self) -> u32 {
        self.response.status
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

impl fmt::Display for BadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BadStatus {}

/// Error of one HTTP attempt, as seen by the retry loop.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// No complete response reached the listener in time.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),
    #[error(transparent)]
    BadStatus(Box<BadStatus>),
    /// Never retried.
    #[error("failed to decode response: {0}")]
    Decode(#[from] DecodeError),
}

impl HttpError {
    pub fn status(&self) -> Option<u32> {
        match self {
            HttpError::BadStatus(b) => Some(b.status()),
            _ => None,
        }
    }
}
