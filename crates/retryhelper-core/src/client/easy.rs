//! Synchronous client on curl easy handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use curl::easy::Easy2;

use crate::config::ClientConfig;
use crate::http::{HttpRequest, HttpResponse, TransportError};

use super::collect::{configure, Collector};
use super::{ClientFactory, ManagedClient};

/// Idle handles kept for connection reuse.
const POOL_LIMIT: usize = 8;

/// Executes one request per call on the calling thread.
pub struct EasyClient {
    config: ClientConfig,
    pool: Mutex<Vec<Easy2<Collector>>>,
    started: AtomicBool,
}

impl EasyClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(Vec::new()),
            started: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform `request` and buffer the whole response, whatever its status.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(TransportError::Stopped);
        }
        let mut easy = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Easy2::new(Collector::default()));
        easy.reset();
        easy.get_mut().clear();
        configure(&mut easy, request, &self.config)?;
        easy.perform()?;
        let code = easy.response_code()?;
        let response = easy.get_mut().take_response(code);
        tracing::debug!("{} {} -> {}", request.method, request.url, code);

        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < POOL_LIMIT && self.started.load(Ordering::Acquire) {
            pool.push(easy);
        }
        Ok(response)
    }
}

impl ManagedClient for EasyClient {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.started.store(false, Ordering::Release);
        Ok(())
    }

    fn destroy(&mut self) {
        self.pool
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Builds an [`EasyClient`] from a validated [`ClientConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EasyClientFactory(pub ClientConfig);

impl ClientFactory for EasyClientFactory {
    type Client = EasyClient;

    fn create_and_start(&self) -> anyhow::Result<EasyClient> {
        self.0.validate()?;
        Ok(EasyClient::new(self.0))
    }
}
