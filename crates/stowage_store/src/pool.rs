//! Bounded connection pool with scoped leases.
//!
//! Every storage operation takes a [`Lease`] for its duration. The lease
//! dereferences to the connection and hands it back to the pool when it is
//! dropped, whether the operation succeeded, failed or unwound.

use crate::error::{StoreError, StoreResult};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::trace;

/// Opens physical connections for a [`Pool`].
///
/// Dialing, credentials and other connection management live behind this
/// trait.
pub trait ConnectionSource: Send + Sync {
    /// The connection type handed out.
    type Connection: Send;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached.
    fn connect(&self) -> StoreResult<Self::Connection>;
}

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of open connections.
    pub max_size: usize,
    /// How long [`Pool::get`] waits for a connection. `None` waits forever.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of open connections (at least one).
    #[must_use]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.max_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the acquire timeout.
    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Open connections waiting in the pool.
    pub idle: usize,
    /// Connections currently leased.
    pub leased: usize,
}

struct PoolState<C> {
    idle: Vec<C>,
    leased: usize,
}

/// A bounded pool of connections from a [`ConnectionSource`].
pub struct Pool<S: ConnectionSource> {
    source: S,
    config: PoolConfig,
    state: Mutex<PoolState<S::Connection>>,
    available: Condvar,
}

impl<S: ConnectionSource> Pool<S> {
    /// Creates an empty pool. Connections are opened on demand. A
    /// `max_size` of zero is raised to one.
    pub fn new(source: S, config: PoolConfig) -> Self {
        let max_size = config.max_size;
        Self {
            source,
            config: config.max_size(max_size),
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                leased: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the connection source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Leases a connection, opening one if the pool is below its bound
    /// and waiting for a returned one otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PoolTimeout`] if the acquire timeout elapses,
    /// or the source's error if opening a connection fails.
    pub fn get(&self) -> StoreResult<Lease<'_, S>> {
        let started = Instant::now();
        let deadline = self.config.acquire_timeout.map(|t| started + t);
        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                state.leased += 1;
                return Ok(self.lease(conn));
            }
            if state.leased < self.config.max_size {
                state.leased += 1;
                drop(state);
                trace!(limit = self.config.max_size, "opening pooled connection");
                return match self.source.connect() {
                    Ok(conn) => Ok(self.lease(conn)),
                    Err(e) => {
                        self.state.lock().leased -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }
            match deadline {
                None => self.available.wait(&mut state),
                Some(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out() {
                        return Err(StoreError::PoolTimeout {
                            waited: started.elapsed(),
                        });
                    }
                }
            }
        }
    }

    /// Returns current occupancy.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            leased: state.leased,
        }
    }

    fn lease(&self, conn: S::Connection) -> Lease<'_, S> {
        Lease {
            pool: self,
            conn: Some(conn),
        }
    }

    fn release(&self, conn: S::Connection) {
        let mut state = self.state.lock();
        state.leased = state.leased.saturating_sub(1);
        state.idle.push(conn);
        drop(state);
        self.available.notify_one();
    }
}

impl<S: ConnectionSource + std::fmt::Debug> std::fmt::Debug for Pool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A leased connection, returned to its pool on drop.
pub struct Lease<'p, S: ConnectionSource> {
    pool: &'p Pool<S>,
    conn: Option<S::Connection>,
}

impl<S: ConnectionSource> Deref for Lease<'_, S> {
    type Target = S::Connection;

    fn deref(&self) -> &Self::Target {
        // Only taken in `drop`.
        self.conn.as_ref().expect("lease holds a connection until dropped")
    }
}

impl<S: ConnectionSource> DerefMut for Lease<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("lease holds a connection until dropped")
    }
}

impl<S: ConnectionSource> Drop for Lease<'_, S> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counter {
        opened: AtomicUsize,
        fail: bool,
    }

    impl ConnectionSource for Counter {
        type Connection = usize;

        fn connect(&self) -> StoreResult<usize> {
            if self.fail {
                return Err(StoreError::backend("unreachable"));
            }
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 8);
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn builder_pattern() {
        let config = PoolConfig::new().max_size(0).acquire_timeout(None);
        assert_eq!(config.max_size, 1);
        assert_eq!(config.acquire_timeout, None);
    }

    #[test]
    fn deserialized_zero_size_is_clamped() {
        let config: PoolConfig = serde_json::from_str(r#"{"max_size": 0}"#).unwrap();
        assert_eq!(config.max_size, 0);
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(30)));

        let pool = Pool::new(
            Counter::default(),
            config.acquire_timeout(Some(Duration::from_millis(20))),
        );
        assert_eq!(pool.config().max_size, 1);
        let lease = pool.get().unwrap();
        assert_eq!(*lease, 0);
    }

    #[test]
    fn lease_returns_connection_on_drop() {
        let pool = Pool::new(Counter::default(), PoolConfig::new().max_size(2));
        {
            let a = pool.get().unwrap();
            assert_eq!(*a, 0);
            assert_eq!(pool.stats(), PoolStats { idle: 0, leased: 1 });
        }
        assert_eq!(pool.stats(), PoolStats { idle: 1, leased: 0 });
        let again = pool.get().unwrap();
        assert_eq!(*again, 0);
        assert_eq!(pool.source().opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let pool = Pool::new(
            Counter::default(),
            PoolConfig::new()
                .max_size(1)
                .acquire_timeout(Some(Duration::from_millis(20))),
        );
        let _held = pool.get().unwrap();
        let err = pool.get().err().unwrap();
        assert!(matches!(err, StoreError::PoolTimeout { .. }));
    }

    #[test]
    fn failed_connect_frees_the_slot() {
        let pool = Pool::new(
            Counter {
                opened: AtomicUsize::new(0),
                fail: true,
            },
            PoolConfig::new().max_size(1),
        );
        assert!(pool.get().is_err());
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn waiter_wakes_when_lease_drops() {
        let pool = Arc::new(Pool::new(
            Counter::default(),
            PoolConfig::new().max_size(1).acquire_timeout(None),
        ));
        let held = pool.get().unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || *pool.get().unwrap())
        };
        std::thread::sleep(Duration::from_millis(20));
        drop(held);
        assert_eq!(waiter.join().unwrap(), 0);
    }

    #[test]
    fn panic_while_leased_returns_connection() {
        let pool = Pool::new(Counter::default(), PoolConfig::new().max_size(1));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = pool.get().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(pool.stats(), PoolStats { idle: 1, leased: 0 });
    }
}
