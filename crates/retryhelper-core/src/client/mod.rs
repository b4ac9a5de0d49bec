//! HTTP clients and their lifecycle.
//!
//! A client is either created and started by the helper (engine-owned, torn
//! down exactly once) or handed in ready-made by the caller (never stopped or
//! destroyed here). [`ClientHandle`] carries that distinction.

mod collect;
mod easy;
mod handle;
mod multi;

pub use collect::{configure, Collector};
pub use easy::{EasyClient, EasyClientFactory};
pub use handle::ClientHandle;
pub use multi::{MultiClient, MultiClientFactory};

use std::error::Error;

/// A client whose lifecycle can be managed by the helper.
pub trait ManagedClient: Send + Sync {
    /// Whether `stop` still has work to do.
    fn is_started(&self) -> bool {
        true
    }

    /// Orderly shutdown. Failures are reported, but `destroy` still runs.
    fn stop(&mut self) -> anyhow::Result<()>;

    /// Release every resource. Must not fail.
    fn destroy(&mut self);
}

/// Creates and starts a client for engine-owned use.
pub trait ClientFactory {
    type Client;

    fn create_and_start(&self) -> anyhow::Result<Self::Client>;
}

impl<C, F> ClientFactory for F
where
    F: Fn() -> anyhow::Result<C>,
{
    type Client = C;

    fn create_and_start(&self) -> anyhow::Result<C> {
        self()
    }
}

/// Client lifecycle failure.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The factory could not create or start the client. Never retried.
    #[error("failed to create and start HTTP client")]
    Create(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// The client failed to stop; it was still destroyed.
    #[error("failed to stop HTTP client")]
    Stop(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl ClientError {
    pub(crate) fn create(e: anyhow::Error) -> Self {
        ClientError::Create(e.into())
    }

    pub(crate) fn stop(e: anyhow::Error) -> Self {
        ClientError::Stop(e.into())
    }
}
