//! # Resilient Executor
//!
//! Runs bound statements through the pool manager, retrying transient
//! failures on a fresh pool.
//!
//! ## Retry Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt = 0                                                            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  acquire lease ──► run request ──ok──► return rows                      │
//! │     │                  │                                                │
//! │     └──── err ─────────┤                                                │
//! │                        ▼                                                │
//! │          attempt < max_retries && transient?                           │
//! │              │ no                         │ yes                         │
//! │              ▼                            ▼                             │
//! │     return error as-is         invalidate(lease generation)            │
//! │                                sleep base_delay × (attempt + 1)        │
//! │                                attempt += 1, loop                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With the defaults (2 retries, 1000 ms base) a call makes at most three
//! round trips and waits 1 s then 2 s between them. There are no
//! exactly-once guarantees: a statement that failed after the server applied
//! it may be applied again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::error::DbResult;
use crate::params::{ExecRequest, Params, Statement};
use crate::pool::{PoolHandle, PoolManager, Transaction};
use crate::record::{decode_all, decode_first, Record};

// =============================================================================
// Retry Policy
// =============================================================================

/// How many times and how patiently to retry transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    /// Default: 2
    pub max_retries: u32,

    /// Wait before the first retry; the k-th retry waits `k × base_delay`.
    /// Default: 1000 ms
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
        }
    }

    /// Fresh backoff schedule for one logical call.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.base_delay)
    }
}

/// Linear backoff: `base`, `2 × base`, `3 × base`, ...
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    retries: u32,
}

impl LinearBackoff {
    pub fn new(base: Duration) -> Self {
        LinearBackoff { base, retries: 0 }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.retries = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.retries = self.retries.saturating_add(1);
        Some(self.base.saturating_mul(self.retries))
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Statement runner with bounded retry on transient failures.
#[derive(Debug, Clone)]
pub struct ResilientExecutor {
    pool: Arc<PoolManager>,
    policy: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(pool: Arc<PoolManager>, policy: RetryPolicy) -> Self {
        ResilientExecutor { pool, policy }
    }

    pub fn pool(&self) -> &Arc<PoolManager> {
        &self.pool
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs a request with the configured retry budget.
    pub async fn run(&self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        self.run_with_retries(request, self.policy.max_retries).await
    }

    /// Runs a request with an explicit retry budget.
    ///
    /// At most `max_retries + 1` round trips are made. The returned error is
    /// the one from the last attempt.
    pub async fn run_with_retries(
        &self,
        request: &ExecRequest,
        max_retries: u32,
    ) -> DbResult<Vec<Record>> {
        debug!(statement = request.text(), "Executing");
        self.with_retries(request.text(), max_retries, |handle| async move {
            handle.run(request).await
        })
        .await
    }

    /// Binds and runs a statement, returning raw records.
    pub async fn execute(&self, statement: &Statement, params: Params) -> DbResult<Vec<Record>> {
        let request = statement.bind(params)?;
        self.run(&request).await
    }

    /// Binds, runs and decodes every row.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        statement: &Statement,
        params: Params,
    ) -> DbResult<Vec<T>> {
        decode_all(self.execute(statement, params).await?)
    }

    /// Binds, runs and decodes the first row, if any.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        statement: &Statement,
        params: Params,
    ) -> DbResult<Option<T>> {
        decode_first(self.execute(statement, params).await?)
    }

    /// Opens a transaction on one pooled connection.
    ///
    /// Acquiring the pool and issuing `BEGIN` follow the retry policy.
    /// Statements inside the transaction are never retried.
    pub async fn begin(&self) -> DbResult<TxContext> {
        let inner = self
            .with_retries("BEGIN TRANSACTION", self.policy.max_retries, |handle| async move {
                handle.begin().await
            })
            .await?;
        debug!("Transaction started");
        Ok(TxContext { inner })
    }

    async fn with_retries<T, F, Fut>(&self, label: &str, max_retries: u32, mut op: F) -> DbResult<T>
    where
        F: FnMut(Arc<dyn PoolHandle>) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            let (generation, result) = match self.pool.acquire().await {
                Ok(lease) => (Some(lease.generation()), op(lease.handle().clone()).await),
                Err(err) => (None, Err(err)),
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 0 {
                        info!(statement = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= max_retries {
                error!(
                    statement = label,
                    attempts = attempt + 1,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(err);
            }

            if let Some(generation) = generation {
                self.pool.invalidate(generation).await;
            }
            let delay = backoff.next_backoff().unwrap_or(self.policy.base_delay);
            warn!(
                statement = label,
                attempt = attempt + 1,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient database error, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// =============================================================================
// Transaction Context
// =============================================================================

/// An open transaction. End it with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback); dropping it discards the connection.
pub struct TxContext {
    inner: Box<dyn Transaction>,
}

impl TxContext {
    /// Runs a request inside the transaction (no retries).
    pub async fn run(&mut self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        debug!(statement = request.text(), "Executing in transaction");
        self.inner.run(request).await
    }

    pub async fn execute(&mut self, statement: &Statement, params: Params) -> DbResult<Vec<Record>> {
        let request = statement.bind(params)?;
        self.run(&request).await
    }

    pub async fn fetch_optional<T: DeserializeOwned>(
        &mut self,
        statement: &Statement,
        params: Params,
    ) -> DbResult<Option<T>> {
        decode_first(self.execute(statement, params).await?)
    }

    pub async fn commit(self) -> DbResult<()> {
        self.inner.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.inner.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for TxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
