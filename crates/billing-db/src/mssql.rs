//! # SQL Server Backend
//!
//! Production [`Connector`] built on tiberius (TDS) connections pooled by
//! bb8.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQL Server Connection Pool                         │
//! │                                                                         │
//! │  PoolManager.acquire()                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MssqlConnector.connect() ← check login, then build the bb8 pool       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │        bb8::Pool<TdsManager>            │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run():   checkout ─► Query(@P1..@Pn) ─► first non-empty result set    │
//! │  begin(): owned checkout ─► SET XACT_ABORT ON; BEGIN TRANSACTION       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A connection whose request timed out, failed at the transport level, or
//! whose transaction was never ended is flagged dirty; bb8 then discards it
//! instead of returning it to the pool. A transport failure, whether seen by
//! a request or by a background connect, marks the whole pool dead so the
//! pool manager replaces it on the next acquisition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult, ErrorKind, SqlFailure};
use crate::params::{ExecRequest, SqlType, SqlValue};
use crate::pool::{Connector, PoolHandle, Transaction};
use crate::record::Record;

type TdsClient = Client<Compat<TcpStream>>;

// =============================================================================
// Connection Manager (bb8)
// =============================================================================

/// A pooled TDS connection.
pub struct TdsConnection {
    client: TdsClient,
    /// Set while the connection may carry an open transaction or a
    /// half-read response.
    dirty: bool,
}

/// bb8 manager opening TDS connections.
#[derive(Debug, Clone)]
pub struct TdsManager {
    config: Config,
    connect_timeout: Duration,
}

impl TdsManager {
    pub fn new(config: &DbConfig) -> Self {
        TdsManager {
            config: tds_config(config),
            connect_timeout: config.connect_timeout,
        }
    }

    async fn open(&self) -> DbResult<TdsConnection> {
        let tcp = TcpStream::connect(self.config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        let client = match Client::connect(self.config.clone(), tcp.compat_write()).await {
            Ok(client) => client,
            // Azure SQL gateways redirect to the node that owns the database.
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!(%host, port, "Following server redirect");
                let mut config = self.config.clone();
                config.host(&host);
                config.port(port);
                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                Client::connect(config, tcp.compat_write()).await?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(TdsConnection {
            client,
            dirty: false,
        })
    }
}

#[async_trait]
impl bb8::ManageConnection for TdsManager {
    type Connection = TdsConnection;
    type Error = DbError;

    async fn connect(&self) -> Result<TdsConnection, DbError> {
        tokio::time::timeout(self.connect_timeout, self.open())
            .await
            .map_err(|_| DbError::timeout("timed out connecting to SQL Server"))?
    }

    async fn is_valid(&self, conn: &mut TdsConnection) -> Result<(), DbError> {
        conn.client.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, conn: &mut TdsConnection) -> bool {
        conn.dirty
    }
}

/// Receives the connection errors bb8 keeps out of `get()`. A failed
/// background connect only surfaces to callers as a checkout timeout, so a
/// transport failure here marks the pool dead.
#[derive(Debug, Clone)]
struct HealthSink {
    broken: Arc<AtomicBool>,
}

impl bb8::ErrorSink<DbError> for HealthSink {
    fn sink(&self, error: DbError) {
        warn!(error = %error, "Background connection error");
        if is_transport_failure(&error) {
            self.broken.store(true, Ordering::Release);
        }
    }

    fn boxed_clone(&self) -> Box<dyn bb8::ErrorSink<DbError>> {
        Box::new(self.clone())
    }
}

/// Reset or refused at the socket level. Timeouts are left out: a slow
/// query or a saturated pool says nothing about the server.
fn is_transport_failure(err: &DbError) -> bool {
    matches!(
        err.kind(),
        Some(ErrorKind::ConnectionReset | ErrorKind::ConnectionFailed)
    )
}

fn tds_config(cfg: &DbConfig) -> Config {
    let mut config = Config::new();
    config.host(&cfg.server);
    config.port(cfg.port);
    config.database(&cfg.database);
    config.application_name("billing-api");
    config.authentication(AuthMethod::sql_server(&cfg.user, &cfg.password));
    config.encryption(if cfg.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if cfg.trust_server_certificate {
        config.trust_cert();
    }
    config
}

// =============================================================================
// Connector
// =============================================================================

/// Creates bb8-backed SQL Server pools.
#[derive(Debug, Clone)]
pub struct MssqlConnector {
    config: DbConfig,
}

impl MssqlConnector {
    pub fn new(config: DbConfig) -> Self {
        MssqlConnector { config }
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(&self) -> DbResult<Arc<dyn PoolHandle>> {
        let manager = TdsManager::new(&self.config);

        // Log in once first so bad credentials or an unreachable
        // host surface as their own error rather than a checkout timeout.
        let login = bb8::ManageConnection::connect(&manager).await?;
        drop(login);

        let broken = Arc::new(AtomicBool::new(false));
        let pool = bb8::Pool::builder()
            .max_size(self.config.max_connections)
            .min_idle(Some(self.config.min_connections))
            .connection_timeout(self.config.connect_timeout)
            .idle_timeout(Some(self.config.idle_timeout))
            .error_sink(Box::new(HealthSink {
                broken: broken.clone(),
            }))
            .build(manager)
            .await?;

        info!(
            db = %self.config.target(),
            max_connections = self.config.max_connections,
            "SQL Server pool created"
        );

        Ok(Arc::new(MssqlPool {
            pool,
            request_timeout: self.config.request_timeout,
            closed: AtomicBool::new(false),
            broken,
        }))
    }

    fn target(&self) -> String {
        self.config.target()
    }
}

// =============================================================================
// Pool Handle
// =============================================================================

struct MssqlPool {
    pool: bb8::Pool<TdsManager>,
    request_timeout: Duration,
    closed: AtomicBool,
    /// Set by [`HealthSink`] or by a request that lost its connection.
    /// Never cleared: the pool manager replaces a dead handle.
    broken: Arc<AtomicBool>,
}

impl MssqlPool {
    /// Passes `result` through, marking the pool dead on a transport failure.
    fn observe<T>(&self, result: DbResult<T>) -> DbResult<T> {
        if let Err(err) = &result {
            if is_transport_failure(err) && !self.broken.swap(true, Ordering::AcqRel) {
                warn!(error = %err, "SQL Server pool marked dead");
            }
        }
        result
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::Connection(SqlFailure::new(
                ErrorKind::ConnectionReset,
                "connection pool is closed",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PoolHandle for MssqlPool {
    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.broken.load(Ordering::Acquire)
    }

    async fn ping(&self) -> DbResult<()> {
        self.ensure_open()?;
        let mut conn = self.pool.get().await?;
        let client = &mut conn.client;
        let result = tokio::time::timeout(self.request_timeout, async move {
            client.simple_query("SELECT 1").await?.into_row().await?;
            Ok::<_, DbError>(())
        })
        .await;
        match result {
            Ok(outcome) => self.observe(outcome),
            Err(_) => {
                conn.dirty = true;
                Err(DbError::timeout("ping exceeded the request timeout"))
            }
        }
    }

    async fn run(&self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        self.ensure_open()?;
        let mut conn = self.pool.get().await?;
        self.observe(run_on(&mut conn, request, self.request_timeout).await)
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        self.ensure_open()?;
        let mut conn = self.pool.get_owned().await?;
        conn.dirty = true;
        let started = tokio::time::timeout(
            self.request_timeout,
            batch(&mut conn.client, "SET XACT_ABORT ON; BEGIN TRANSACTION;"),
        )
        .await
        .map_err(|_| DbError::timeout("BEGIN TRANSACTION exceeded the request timeout"))?;
        self.observe(started)?;
        Ok(Box::new(MssqlTransaction {
            conn,
            request_timeout: self.request_timeout,
        }))
    }

    async fn close(&self) -> DbResult<()> {
        // Connections already checked out finish their request; the pool and
        // its idle connections drop with the last handle reference.
        self.closed.store(true, Ordering::Release);
        let state = self.pool.state();
        debug!(
            connections = state.connections,
            idle = state.idle_connections,
            "SQL Server pool closed"
        );
        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

struct MssqlTransaction {
    conn: bb8::PooledConnection<'static, TdsManager>,
    request_timeout: Duration,
}

#[async_trait]
impl Transaction for MssqlTransaction {
    async fn run(&mut self, request: &ExecRequest) -> DbResult<Vec<Record>> {
        run_on(&mut self.conn, request, self.request_timeout).await
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let mut this = *self;
        tokio::time::timeout(this.request_timeout, batch(&mut this.conn.client, "COMMIT TRANSACTION;"))
            .await??;
        this.conn.dirty = false;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let mut this = *self;
        tokio::time::timeout(
            this.request_timeout,
            batch(&mut this.conn.client, "IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION;"),
        )
        .await??;
        this.conn.dirty = false;
        Ok(())
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Runs a request on a checked-out connection, flagging it dirty when the
/// conversation may have been left mid-response.
async fn run_on(
    conn: &mut TdsConnection,
    request: &ExecRequest,
    request_timeout: Duration,
) -> DbResult<Vec<Record>> {
    let result = tokio::time::timeout(request_timeout, execute(&mut conn.client, request)).await;
    match result {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(err)) => {
            if err.is_transient() {
                conn.dirty = true;
            }
            Err(err)
        }
        Err(_) => {
            conn.dirty = true;
            Err(DbError::timeout(format!(
                "{} exceeded {} ms",
                request.text(),
                request_timeout.as_millis()
            )))
        }
    }
}

async fn execute(client: &mut TdsClient, request: &ExecRequest) -> DbResult<Vec<Record>> {
    let mut query = Query::new(request.render());
    for param in request.params() {
        bind(&mut query, param.ty, &param.value);
    }

    let result_sets = query.query(client).await?.into_results().await?;
    result_sets
        .into_iter()
        .find(|rows| !rows.is_empty())
        .unwrap_or_default()
        .into_iter()
        .map(row_to_record)
        .collect()
}

async fn batch(client: &mut TdsClient, sql: &str) -> DbResult<()> {
    client.simple_query(sql).await?.into_results().await?;
    Ok(())
}

fn bind(query: &mut Query<'_>, ty: SqlType, value: &SqlValue) {
    match value {
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Bit(v) => query.bind(*v),
        SqlValue::NVarChar(v) => query.bind(v.clone()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Null => match ty {
            SqlType::Int => query.bind(None::<i32>),
            SqlType::BigInt => query.bind(None::<i64>),
            SqlType::Float => query.bind(None::<f64>),
            SqlType::Bit => query.bind(None::<bool>),
            SqlType::NVarChar => query.bind(None::<String>),
            SqlType::Date => query.bind(None::<NaiveDate>),
            SqlType::DateTime => query.bind(None::<NaiveDateTime>),
        },
    }
}

// =============================================================================
// Row Conversion
// =============================================================================

fn row_to_record(row: Row) -> DbResult<Record> {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut record = Record::new();
    for (name, data) in names.into_iter().zip(row) {
        record.insert(name, column_to_json(data)?);
    }
    Ok(record)
}

fn column_to_json(data: ColumnData<'static>) -> DbResult<Value> {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(|f| float(f64::from(f))),
        ColumnData::F64(v) => v.map(float),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Numeric(v) => v.map(|n| float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))),
        ColumnData::Binary(v) => v.map(|b| Value::Array(b.iter().map(|x| Value::from(*x)).collect())),
        ColumnData::Xml(v) => v.map(|x| Value::String(x.into_owned().into_string())),
        temporal => temporal_to_json(&temporal)?,
    };
    Ok(value.unwrap_or(Value::Null))
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn temporal_to_json(data: &ColumnData<'static>) -> DbResult<Option<Value>> {
    if let Ok(value) = NaiveDateTime::from_sql(data) {
        return Ok(value.map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())));
    }
    if let Ok(value) = NaiveDate::from_sql(data) {
        return Ok(value.map(|v| Value::String(v.format("%Y-%m-%d").to_string())));
    }
    if let Ok(value) = NaiveTime::from_sql(data) {
        return Ok(value.map(|v| Value::String(v.format("%H:%M:%S%.f").to_string())));
    }
    if let Ok(value) = DateTime::<FixedOffset>::from_sql(data) {
        return Ok(value.map(|v| Value::String(v.to_rfc3339())));
    }
    Err(DbError::conversion(format!("unsupported column type: {data:?}")))
}

// =============================================================================
// Unit Tests
// =============================================================================
