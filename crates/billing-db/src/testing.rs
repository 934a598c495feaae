//! # Scripted Backend
//!
//! In-memory [`Connector`] for tests. Requests are answered by matching a
//! substring of the statement text; failures can be scheduled per statement
//! or per connect, and every interaction is counted.
//!
//! ```rust
//! use billing_db::error::ErrorKind;
//! use billing_db::testing::{record, ScriptedConnector};
//! use serde_json::json;
//!
//! let script = ScriptedConnector::new();
//! script.respond("FROM Customers", vec![record(json!({"CustomerId": 1}))]);
//! script.fail("usp_CreateInvoiceHeader", ErrorKind::Timeout, 1);
//! ```
//!
//! Enabled with the `testing` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{DbError, DbResult, ErrorKind, SqlFailure};
use crate::params::ExecRequest;
use crate::pool::{Connector, PoolHandle, Transaction};
use crate::record::Record;

/// Builds a [`Record`] from a JSON object literal.
///
/// ## Panics
/// If `value` is not an object.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("record() expects a JSON object, got {other}"),
    }
}

struct FailurePlan {
    needle: String,
    kind: ErrorKind,
    remaining: usize,
}

#[derive(Default)]
struct Script {
    responses: Mutex<Vec<(String, Vec<Record>)>>,
    failures: Mutex<Vec<FailurePlan>>,
    connect_failures: Mutex<Vec<(ErrorKind, usize)>>,
    executed: Mutex<Vec<ExecRequest>>,
    committed: Mutex<Vec<ExecRequest>>,
    fail_close: AtomicBool,
    epoch: AtomicU64,
    connects: AtomicUsize,
    closes: AtomicUsize,
    attempts: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Script {
    fn answer(&self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().push(request.clone());

        let text = request.text();
        {
            let mut failures = self.failures.lock();
            if let Some(plan) = failures
                .iter_mut()
                .find(|p| p.remaining > 0 && text.contains(&p.needle))
            {
                plan.remaining -= 1;
                return Err(DbError::from_failure(SqlFailure::new(
                    plan.kind,
                    format!("scripted {} failure", plan.kind),
                )));
            }
        }

        let responses = self.responses.lock();
        Ok(responses
            .iter()
            .rev()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

/// Scripted connector. Clones share the same script and counters.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Script>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        ScriptedConnector::default()
    }

    /// Answers requests whose text contains `needle` with `rows`. Later
    /// registrations win.
    pub fn respond(&self, needle: &str, rows: Vec<Record>) -> &Self {
        self.script
            .responses
            .lock()
            .push((needle.to_string(), rows));
        self
    }

    /// Fails the next `times` requests whose text contains `needle`.
    pub fn fail(&self, needle: &str, kind: ErrorKind, times: usize) -> &Self {
        self.script.failures.lock().push(FailurePlan {
            needle: needle.to_string(),
            kind,
            remaining: times,
        });
        self
    }

    /// Fails the next `times` pool creations.
    pub fn fail_connect(&self, kind: ErrorKind, times: usize) -> &Self {
        self.script.connect_failures.lock().push((kind, times));
        self
    }

    /// Makes pool `close` return an error.
    pub fn fail_close(&self, fail: bool) -> &Self {
        self.script.fail_close.store(fail, Ordering::SeqCst);
        self
    }

    /// Makes every existing pool fail its liveness check.
    pub fn kill_pools(&self) {
        self.script.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }

    /// Requests run, including failed ones.
    pub fn attempts(&self) -> usize {
        self.script.attempts.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.script.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.script.rollbacks.load(Ordering::SeqCst)
    }

    /// Every request run so far, in order.
    pub fn executed(&self) -> Vec<ExecRequest> {
        self.script.executed.lock().clone()
    }

    /// Requests from committed transactions, in commit order.
    pub fn committed(&self) -> Vec<ExecRequest> {
        self.script.committed.lock().clone()
    }

    /// Number of executed requests per statement text.
    pub fn executed_counts(&self) -> HashMap<&'static str, usize> {
        let mut counts = HashMap::new();
        for request in self.script.executed.lock().iter() {
            *counts.entry(request.text()).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> DbResult<Arc<dyn PoolHandle>> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);

        {
            let mut plans = self.script.connect_failures.lock();
            if let Some(plan) = plans.iter_mut().find(|(_, remaining)| *remaining > 0) {
                plan.1 -= 1;
                return Err(DbError::from_failure(
                    SqlFailure::new(plan.0, format!("scripted {} on connect", plan.0)),
                ));
            }
        }

        Ok(Arc::new(ScriptedPool {
            script: self.script.clone(),
            epoch: self.script.epoch.load(Ordering::SeqCst),
            closed: AtomicBool::new(false),
        }))
    }

    fn target(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedPool {
    script: Arc<Script>,
    epoch: u64,
    closed: AtomicBool,
}

#[async_trait]
impl PoolHandle for ScriptedPool {
    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.epoch == self.script.epoch.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    async fn run(&self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        self.script.answer(request)
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        Ok(Box::new(ScriptedTransaction {
            script: self.script.clone(),
            pending: Vec::new(),
        }))
    }

    async fn close(&self) -> DbResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close.load(Ordering::SeqCst) {
            return Err(DbError::from_failure(SqlFailure::new(
                ErrorKind::ConnectionReset,
                "scripted close failure",
            )));
        }
        Ok(())
    }
}

struct ScriptedTransaction {
    script: Arc<Script>,
    pending: Vec<ExecRequest>,
}

#[async_trait]
impl Transaction for ScriptedTransaction {
    async fn run(&mut self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        let rows = self.script.answer(request)?;
        self.pending.push(request.clone());
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let this = *self;
        this.script.commits.fetch_add(1, Ordering::SeqCst);
        this.script.committed.lock().extend(this.pending);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.script.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
