//! Retry with exponential backoff.
//!
//! [`RetryExecutor`] drives any [`Retryable`]: it attempts, asks the operation
//! to classify each failure, waits (optionally interruptibly) and gives up
//! once the failure is not retryable or the retry budget is spent. The first
//! observed failure is the one reported on give-up.

mod cancel;
mod diagnostics;
mod error;
mod policy;
mod retryable;
mod run;

pub use cancel::{CancelToken, WaitMode, WaitOutcome};
pub use diagnostics::{
    error_chain, includes_detail, retry_message, DiagnosticEvent, RecordingDiagnostics,
    RetryDiagnostics, TracingDiagnostics, DETAIL_EVERY,
};
pub use error::{GiveUpReason, RetryError};
pub use policy::BackoffPolicy;
pub use retryable::{from_fn, FnRetryable, Retryable};
pub use run::{AttemptResult, RetryExecutor};
