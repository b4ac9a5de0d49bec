//! Ownership-tagged client with exactly-once teardown.

use std::sync::Arc;

use super::{ClientError, ClientFactory, ManagedClient};

enum Ownership<C> {
    /// Created by the helper; stopped and destroyed on teardown.
    Engine { client: C, torn_down: bool },
    /// Supplied by the caller; never closed here.
    Caller(Arc<C>),
}

/// The client a helper talks to, plus who is responsible for closing it.
pub struct ClientHandle<C: ManagedClient> {
    ownership: Ownership<C>,
}

/// Destroys the client when dropped, so release happens even if stop fails.
struct DestroyGuard<'a, C: ManagedClient>(&'a mut C);

impl<C: ManagedClient> Drop for DestroyGuard<'_, C> {
    fn drop(&mut self) {
        self.0.destroy();
    }
}

impl<C: ManagedClient> ClientHandle<C> {
    /// Create and start a client through `factory`. Failure is not retried.
    pub fn create_owned<F>(factory: &F) -> Result<Self, ClientError>
    where
        F: ClientFactory<Client = C> + ?Sized,
    {
        let client = factory.create_and_start().map_err(ClientError::create)?;
        tracing::debug!("created engine-owned HTTP client");
        Ok(Self {
            ownership: Ownership::Engine {
                client,
                torn_down: false,
            },
        })
    }

    pub fn wrap_external(client: Arc<C>) -> Self {
        Self {
            ownership: Ownership::Caller(client),
        }
    }

    pub fn is_engine_owned(&self) -> bool {
        matches!(self.ownership, Ownership::Engine { .. })
    }

    pub fn client(&self) -> &C {
        match &self.ownership {
            Ownership::Engine { client, .. } => client,
            Ownership::Caller(client) => client,
        }
    }

    /// Stop (if started) then destroy an engine-owned client. Destroy runs even
    /// when stop fails; the stop failure is returned. Later calls are no-ops,
    /// as is any call on a caller-owned client.
    pub fn teardown(&mut self) -> Result<(), ClientError> {
        let Ownership::Engine { client, torn_down } = &mut self.ownership else {
            return Ok(());
        };
        if *torn_down {
            return Ok(());
        }
        *torn_down = true;
        let mut guard = DestroyGuard(client);
        if guard.0.is_started() {
            guard.0.stop().map_err(ClientError::stop)?;
        }
        tracing::debug!("engine-owned HTTP client torn down");
        Ok(())
    }
}

impl<C: ManagedClient> Drop for ClientHandle<C> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::warn!("HTTP client teardown: {:#}", anyhow::Error::from(e));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    pub(crate) struct Counts {
        pub(crate) stops: AtomicUsize,
        pub(crate) destroys: AtomicUsize,
    }

    /// Client that counts lifecycle calls.
    pub(crate) struct CountingClient {
        pub(crate) counts: Arc<Counts>,
        pub(crate) fail_stop: bool,
    }

    impl CountingClient {
        pub(crate) fn new(counts: &Arc<Counts>) -> Self {
            Self {
                counts: Arc::clone(counts),
                fail_stop: false,
            }
        }
    }

    impl ManagedClient for CountingClient {
        fn stop(&mut self) -> anyhow::Result<()> {
            self.counts.stops.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop {
                anyhow::bail!("socket already closed");
            }
            Ok(())
        }

        fn destroy(&mut self) {
            self.counts.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counts(c: &Counts) -> (usize, usize) {
        (c.stops.load(Ordering::SeqCst), c.destroys.load(Ordering::SeqCst))
    }

    #[test]
    fn engine_owned_torn_down_once() {
        let c = Arc::new(Counts::default());
        let factory = || -> anyhow::Result<CountingClient> { Ok(CountingClient::new(&c)) };
        let mut handle = ClientHandle::create_owned(&factory).unwrap();
        assert!(handle.is_engine_owned());
        handle.teardown().unwrap();
        handle.teardown().unwrap();
        drop(handle);
        assert_eq!(counts(&c), (1, 1));
    }

    #[test]
    fn drop_tears_down_engine_owned() {
        let c = Arc::new(Counts::default());
        let factory = || -> anyhow::Result<CountingClient> { Ok(CountingClient::new(&c)) };
        drop(ClientHandle::create_owned(&factory).unwrap());
        assert_eq!(counts(&c), (1, 1));
    }

    #[test]
    fn stop_failure_still_destroys() {
        let c = Arc::new(Counts::default());
        let factory = || -> anyhow::Result<CountingClient> {
            let mut client = CountingClient::new(&c);
            client.fail_stop = true;
            Ok(client)
        };
        let mut handle = ClientHandle::create_owned(&factory).unwrap();
        let err = handle.teardown().unwrap_err();
        assert!(matches!(err, ClientError::Stop(_)));
        assert_eq!(err.to_string(), "failed to stop HTTP client");
        assert_eq!(counts(&c), (1, 1));
        drop(handle);
        assert_eq!(counts(&c), (1, 1));
    }

    #[test]
    fn caller_owned_never_closed() {
        let c = Arc::new(Counts::default());
        let client = Arc::new(CountingClient::new(&c));
        let mut handle = ClientHandle::wrap_external(Arc::clone(&client));
        assert!(!handle.is_engine_owned());
        handle.teardown().unwrap();
        drop(handle);
        assert_eq!(counts(&c), (0, 0));
        assert_eq!(Arc::strong_count(&client), 1);
    }

    #[test]
    fn factory_failure_is_create_error() {
        let factory = || -> anyhow::Result<CountingClient> { anyhow::bail!("no proxy configured") };
        let err = ClientHandle::create_owned(&factory).err().unwrap();
        assert!(matches!(err, ClientError::Create(_)));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "no proxy configured");
    }
}
