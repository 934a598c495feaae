//! # Connection Pool Manager
//!
//! Owns the single connection pool used by the process. The pool is created
//! lazily on first use, checked on every acquisition, and replaced when it is
//! found dead or invalidated after a transient failure.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     PoolManager slot (async mutex)                      │
//! │                                                                         │
//! │   acquire()                                                            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   slot = Some(lease)? ──yes──► is_alive()? ──yes──► return lease       │
//! │      │ no                           │ no                                │
//! │      │                              ▼                                   │
//! │      │                    take + close (errors logged)                  │
//! │      ▼                              │                                   │
//! │   connector.connect() ◄─────────────┘                                   │
//! │      │ ok                          │ err                                │
//! │      ▼                             ▼                                    │
//! │   slot = Some(gen + 1)        slot stays None, ConnectionError          │
//! │                                                                         │
//! │   invalidate(gen): closes only if the slot still holds `gen`           │
//! │   shutdown():      closes whatever is held, idempotent                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mutex is held across the liveness check and the reconnect, so two
//! callers can never both create a pool. Generations stop a request that
//! failed on an old pool from tearing down the pool another request just
//! built.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::DbResult;
use crate::params::ExecRequest;
use crate::record::Record;

// =============================================================================
// Backend Seams
// =============================================================================

/// Creates connection pools.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a new pool. Fails if the first connection can't be established.
    async fn connect(&self) -> DbResult<Arc<dyn PoolHandle>>;

    /// Human-readable target for logs (never includes credentials).
    fn target(&self) -> String;
}

/// A live connection pool.
#[async_trait]
pub trait PoolHandle: Send + Sync {
    /// Cheap local liveness check. No I/O.
    fn is_alive(&self) -> bool;

    /// Round trip to the server (`SELECT 1`).
    async fn ping(&self) -> DbResult<()>;

    /// Runs one request on a pooled connection and returns the first
    /// non-empty result set.
    async fn run(&self, request: &ExecRequest) -> DbResult<Vec<Record>>;

    /// Opens a transaction pinned to one pooled connection.
    async fn begin(&self) -> DbResult<Box<dyn Transaction>>;

    /// Stops handing out connections.
    async fn close(&self) -> DbResult<()>;
}

/// A transaction bound to one connection.
///
/// Dropping it without `commit` or `rollback` discards the connection
/// instead of returning it to the pool.
#[async_trait]
pub trait Transaction: Send {
    async fn run(&mut self, request: &ExecRequest) -> DbResult<Vec<Record>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

// =============================================================================
// Pool Lease
// =============================================================================

/// A pool handle tagged with the generation it was created in.
#[derive(Clone)]
pub struct PoolLease {
    generation: u64,
    handle: Arc<dyn PoolHandle>,
}

impl PoolLease {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&self) -> &Arc<dyn PoolHandle> {
        &self.handle
    }
}

impl fmt::Debug for PoolLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolLease")
            .field("generation", &self.generation)
            .field("alive", &self.handle.is_alive())
            .finish()
    }
}

// =============================================================================
// Pool Manager
// =============================================================================

#[derive(Default)]
struct Slot {
    current: Option<PoolLease>,
    generations: u64,
}

/// Process-wide owner of the connection pool.
pub struct PoolManager {
    connector: Arc<dyn Connector>,
    slot: Mutex<Slot>,
}

impl PoolManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        PoolManager {
            connector,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Returns the current pool, creating or replacing it as needed.
    ///
    /// ## Errors
    /// `DbError::Connection` when the connector fails. The slot is left
    /// empty so the next call starts from scratch.
    pub async fn acquire(&self) -> DbResult<PoolLease> {
        let mut slot = self.slot.lock().await;

        if let Some(lease) = &slot.current {
            if lease.handle.is_alive() {
                return Ok(lease.clone());
            }
            warn!(
                generation = lease.generation,
                "Connection pool failed liveness check, replacing"
            );
        }

        if let Some(stale) = slot.current.take() {
            close_quietly(&stale).await;
        }

        let target = self.connector.target();
        match self.connector.connect().await {
            Ok(handle) => {
                slot.generations += 1;
                let lease = PoolLease {
                    generation: slot.generations,
                    handle,
                };
                slot.current = Some(lease.clone());
                info!(db = %target, generation = lease.generation, "Connected to database");
                Ok(lease)
            }
            Err(err) => {
                error!(db = %target, error = %err, "Database connection failed");
                Err(err.into_connection())
            }
        }
    }

    /// Closes the pool if it is still the one from `generation`.
    ///
    /// A stale generation is ignored: a newer pool already replaced it.
    pub async fn invalidate(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        let current = slot.current.as_ref().map(PoolLease::generation);
        if current != Some(generation) {
            debug!(generation, ?current, "Ignoring stale pool invalidation");
            return;
        }
        if let Some(lease) = slot.current.take() {
            warn!(generation, "Invalidating connection pool");
            close_quietly(&lease).await;
        }
    }

    /// Closes the current pool, if any. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        match slot.current.take() {
            Some(lease) => {
                info!(generation = lease.generation, "Closing database connection pool");
                close_quietly(&lease).await;
            }
            None => debug!("No connection pool to close"),
        }
    }

    /// Acquires a pool and runs a round trip.
    pub async fn health_check(&self) -> bool {
        let lease = match self.acquire().await {
            Ok(lease) => lease,
            Err(_) => return false,
        };
        match lease.handle.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Database health check failed");
                false
            }
        }
    }

    /// Whether a pool is currently held. No I/O.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.current.is_some()
    }

    /// Generation of the current pool, if any.
    pub async fn current_generation(&self) -> Option<u64> {
        self.slot.lock().await.current.as_ref().map(PoolLease::generation)
    }
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("target", &self.connector.target())
            .finish_non_exhaustive()
    }
}

async fn close_quietly(lease: &PoolLease) {
    if let Err(err) = lease.handle.close().await {
        warn!(generation = lease.generation, error = %err, "Error closing connection pool (ignored)");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
