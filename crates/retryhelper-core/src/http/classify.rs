//! Two-tier retry classification: non-2xx statuses and everything else.

use super::error::{HttpError, TransportError};
use super::message::HttpResponse;

/// Decides which failed attempts are worth retrying.
///
/// Bad statuses go to [`is_status_retryable`](RetryClassifier::is_status_retryable);
/// every other failure goes to [`is_error_retryable`](RetryClassifier::is_error_retryable),
/// which retries nothing unless overridden. Decoding failures are never retried.
pub trait RetryClassifier {
    fn is_status_retryable(&self, response: &HttpResponse) -> bool;

    fn is_error_retryable(&self, _error: &HttpError) -> bool {
        false
    }
}

impl<T: RetryClassifier + ?Sized> RetryClassifier for &T {
    fn is_status_retryable(&self, response: &HttpResponse) -> bool {
        (**self).is_status_retryable(response)
    }

    fn is_error_retryable(&self, error: &HttpError) -> bool {
        (**self).is_error_retryable(error)
    }
}

/// Route `error` to the matching predicate of `classifier`.
pub fn to_retry<K: RetryClassifier + ?Sized>(classifier: &K, error: &HttpError) -> bool {
    match error {
        HttpError::BadStatus(bad) => classifier.is_status_retryable(bad.response()),
        HttpError::Decode(_) => false,
        other => classifier.is_error_retryable(other),
    }
}

/// Retries throttling (408, 429), 5xx, timeouts and connection-level failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl RetryClassifier for StandardClassifier {
    fn is_status_retryable(&self, response: &HttpResponse) -> bool {
        is_transient_status(response.status)
    }

    fn is_error_retryable(&self, error: &HttpError) -> bool {
        match error {
            HttpError::ResponseTimeout(_) => true,
            HttpError::Transport(TransportError::Curl(e)) => is_transient_curl_error(e),
            _ => false,
        }
    }
}

/// 408, 429 and 5xx.
pub fn is_transient_status(code: u32) -> bool {
    matches!(code, 408 | 429 | 500..=599)
}

/// Timeouts and connection-level curl failures.
pub fn is_transient_curl_error(e: &curl::Error) -> bool {
    e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::{BadStatus, DecodeError};
    use std::time::Duration;

    fn bad_status(code: u32) -> HttpError {
        HttpError::BadStatus(Box::new(BadStatus::new(
            HttpResponse::new(code),
            format!("Response not 2xx: {}", code),
        )))
    }

    struct OnlyStatus(u32);

    impl RetryClassifier for OnlyStatus {
        fn is_status_retryable(&self, response: &HttpResponse) -> bool {
            response.status == self.0
        }
    }

    #[test]
    fn transient_statuses() {
        for code in [408, 429, 500, 502, 503, 599] {
            assert!(is_transient_status(code), "{}", code);
        }
        for code in [400, 401, 403, 404, 413] {
            assert!(!is_transient_status(code), "{}", code);
        }
    }

    #[test]
    fn status_failures_use_status_predicate() {
        let k = OnlyStatus(404);
        assert!(to_retry(&k, &bad_status(404)));
        assert!(!to_retry(&k, &bad_status(503)));
    }

    #[test]
    fn other_failures_default_to_not_retryable() {
        let k = OnlyStatus(404);
        assert!(!to_retry(&k, &HttpError::ResponseTimeout(Duration::from_secs(1))));
        assert!(!to_retry(&k, &HttpError::Transport(TransportError::Closed)));
    }

    #[test]
    fn decode_failures_never_retried() {
        let err = HttpError::Decode(DecodeError::UnsupportedCharset("x".into()));
        assert!(!to_retry(&StandardClassifier, &err));
    }

    #[test]
    fn standard_classifier() {
        assert!(to_retry(&StandardClassifier, &bad_status(503)));
        assert!(!to_retry(&StandardClassifier, &bad_status(404)));
        assert!(to_retry(&StandardClassifier, &HttpError::ResponseTimeout(Duration::from_millis(5))));
        assert!(!to_retry(&StandardClassifier, &HttpError::Transport(TransportError::Stopped)));
        let timeout = curl::Error::new(28); // CURLE_OPERATION_TIMEDOUT
        assert!(to_retry(&StandardClassifier, &HttpError::Transport(TransportError::Curl(timeout))));
        let bad_url = curl::Error::new(3); // CURLE_URL_MALFORMAT
        assert!(!to_retry(&StandardClassifier, &HttpError::Transport(TransportError::Curl(bad_url))));
    }
}
