//! Listener-based client: a worker thread drives a curl multi handle.
//!
//! Requests are queued with [`MultiClient::submit`]; each completion (or
//! failure) is delivered to the request's [`ResponseListener`]. Stopping the
//! client ends the loop and completes every pending listener with
//! [`TransportError::Closed`]. A transfer whose waiter has given up is
//! removed from the multi handle before any newer transfer is driven, which
//! closes its connection.

use anyhow::Context;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use curl::easy::Easy2;
use curl::multi::{Easy2Handle, Multi};

use crate::config::ClientConfig;
use crate::http::{HttpRequest, HttpResponse, ResponseListener, TransportError};

use super::collect::{configure, Collector};
use super::{ClientFactory, ManagedClient};

/// Upper bound on one `Multi::wait`; new submissions are picked up between waits.
const WAIT_SLICE: Duration = Duration::from_millis(100);

enum Command {
    Submit(HttpRequest, ResponseListener),
    Shutdown,
}

type Active = (Easy2Handle<Collector>, ResponseListener);

pub struct MultiClient {
    config: ClientConfig,
    tx: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MultiClient {
    /// Validate `config` and start the event loop thread.
    pub fn start(config: ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("retryhelper-multi".to_string())
            .spawn(move || run_loop(rx, config))
            .context("spawning curl multi thread")?;
        Ok(Self {
            config,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Queue `request`. On a stopped client the listener is completed with
    /// [`TransportError::Stopped`] right away.
    pub fn submit(&self, request: HttpRequest, listener: ResponseListener) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            listener.complete(Err(TransportError::Stopped));
            return;
        };
        if let Err(mpsc::SendError(Command::Submit(_, listener))) =
            tx.send(Command::Submit(request, listener))
        {
            listener.complete(Err(TransportError::Stopped));
        }
    }
}

impl ManagedClient for MultiClient {
    fn is_started(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.tx.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(Command::Shutdown);
        }
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                anyhow::bail!("curl multi thread panicked");
            }
        }
        Ok(())
    }

    fn destroy(&mut self) {
        // Dropping the sender ends a still-running loop on its next poll.
        self.tx.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        self.worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Builds a started [`MultiClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiClientFactory(pub ClientConfig);

impl ClientFactory for MultiClientFactory {
    type Client = MultiClient;

    fn create_and_start(&self) -> anyhow::Result<MultiClient> {
        MultiClient::start(self.0)
    }
}

fn add_request(
    multi: &Multi,
    request: &HttpRequest,
    config: &ClientConfig,
) -> Result<Easy2Handle<Collector>, TransportError> {
    let mut easy = Easy2::new(Collector::default());
    configure(&mut easy, request, config)?;
    Ok(multi.add2(easy)?)
}

fn finish(
    multi: &Multi,
    handle: Easy2Handle<Collector>,
    result: Result<(), curl::Error>,
) -> Result<HttpResponse, TransportError> {
    let mut easy = multi.remove2(handle)?;
    result?;
    let code = easy.response_code()?;
    Ok(easy.get_mut().take_response(code))
}

/// Accept queued commands. Blocks only while nothing is in flight.
/// Returns false once the loop should shut down.
fn accept(
    rx: &Receiver<Command>,
    multi: &Multi,
    config: &ClientConfig,
    active: &mut Vec<Active>,
) -> bool {
    loop {
        let command = if active.is_empty() {
            match rx.recv() {
                Ok(c) => c,
                Err(_) => return false,
            }
        } else {
            match rx.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        };
        match command {
            Command::Submit(request, listener) => match add_request(multi, &request, config) {
                Ok(handle) => active.push((handle, listener)),
                Err(e) => listener.complete(Err(e)),
            },
            Command::Shutdown => return false,
        }
    }
}

/// Remove transfers nobody waits for anymore.
fn prune_abandoned(multi: &Multi, active: &mut Vec<Active>) {
    let mut i = 0;
    while i < active.len() {
        if !active[i].1.is_abandoned() {
            i += 1;
            continue;
        }
        let (handle, _) = active.remove(i);
        match multi.remove2(handle) {
            Ok(easy) => drop(easy),
            Err(e) => tracing::warn!("curl multi remove: {}", e),
        }
        tracing::debug!("dropped abandoned transfer");
    }
}

fn fail_all(multi: &Multi, active: &mut Vec<Active>, error: impl Fn() -> TransportError) {
    for (handle, listener) in active.drain(..) {
        let _ = multi.remove2(handle);
        listener.complete(Err(error()));
    }
}

fn run_loop(rx: Receiver<Command>, config: ClientConfig) {
    let multi = Multi::new();
    let mut active: Vec<Active> = Vec::new();

    while accept(&rx, &multi, &config, &mut active) {
        prune_abandoned(&multi, &mut active);
        if active.is_empty() {
            continue;
        }
        if let Err(e) = multi.perform() {
            tracing::warn!("curl multi perform: {}", e);
            fail_all(&multi, &mut active, || TransportError::Multi(e.clone()));
            continue;
        }

        let mut completed: Vec<(usize, Result<(), curl::Error>)> = Vec::new();
        multi.messages(|msg| {
            for (i, (handle, _)) in active.iter().enumerate() {
                if let Some(result) = msg.result_for2(handle) {
                    completed.push((i, result));
                    break;
                }
            }
        });
        completed.sort_by(|a, b| b.0.cmp(&a.0));
        for (i, result) in completed {
            let (handle, listener) = active.remove(i);
            listener.complete(finish(&multi, handle, result));
        }

        if !active.is_empty() {
            if let Err(e) = multi.wait(&mut [], WAIT_SLICE) {
                tracing::warn!("curl multi wait: {}", e);
                fail_all(&multi, &mut active, || TransportError::Multi(e.clone()));
            }
        }
    }

    fail_all(&multi, &mut active, || TransportError::Closed);
    while let Ok(command) = rx.try_recv() {
        if let Command::Submit(_, listener) = command {
            listener.complete(Err(TransportError::Closed));
        }
    }
    tracing::debug!("curl multi loop stopped");
}
