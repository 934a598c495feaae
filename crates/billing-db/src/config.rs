//! # Database Configuration
//!
//! Connection settings for SQL Server, built in code or loaded from the
//! environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `DB_SERVER` | `localhost` |
//! | `DB_PORT` | `1433` |
//! | `DB_USER` / `DB_PASSWORD` / `DB_NAME` | required |
//! | `DB_ENCRYPT` | `true` |
//! | `DB_TRUST_SERVER_CERTIFICATE` | `true` |
//! | `DB_POOL_MAX` / `DB_POOL_MIN` | `10` / `0` |
//! | `DB_CONNECT_TIMEOUT_MS` | `30000` |
//! | `DB_REQUEST_TIMEOUT_MS` | `30000` |
//! | `DB_IDLE_TIMEOUT_MS` | `30000` |
//! | `DB_MAX_RETRIES` | `2` |
//! | `DB_RETRY_BASE_DELAY_MS` | `1000` |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DbError, DbResult};
use crate::executor::RetryPolicy;

/// Database configuration.
///
/// ## Example
/// ```rust
/// use billing_db::DbConfig;
///
/// let config = DbConfig::new("db.internal", "RentalBilling")
///     .credentials("billing_app", "secret")
///     .max_connections(20);
/// assert_eq!(config.port, 1433);
/// ```
#[derive(Clone)]
pub struct DbConfig {
    /// Host name or address of the SQL Server.
    pub server: String,

    /// TCP port.
    /// Default: 1433
    pub port: u16,

    /// Database name.
    pub database: String,

    /// SQL login.
    pub user: String,

    /// SQL login password. Never logged.
    pub password: String,

    /// Require TLS for the whole session.
    /// Default: true
    pub encrypt: bool,

    /// Accept self-signed server certificates.
    /// Default: true
    pub trust_server_certificate: bool,

    /// Maximum number of pooled connections.
    /// Default: 10
    pub max_connections: u32,

    /// Idle connections kept open.
    /// Default: 0
    pub min_connections: u32,

    /// Deadline for establishing a connection (and for pool checkout).
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Deadline for a single request.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Idle time before a pooled connection is closed.
    /// Default: 30 seconds
    pub idle_timeout: Duration,

    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl DbConfig {
    /// Creates a configuration with defaults for everything but the target.
    pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
        DbConfig {
            server: server.into(),
            port: 1433,
            database: database.into(),
            user: String::new(),
            password: String::new(),
            encrypt: true,
            trust_server_certificate: true,
            max_connections: 10,
            min_connections: 0,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the SQL login.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of idle connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// `server:port/database`, for logs.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.server, self.port, self.database)
    }

    /// Loads the configuration from `DB_*` environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through `lookup` (environment in production,
    /// a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| DbError::Configuration(format!("{key} must be set")))
        };

        let config = DbConfig::new(
            get("DB_SERVER").unwrap_or_else(|| "localhost".to_string()),
            required("DB_NAME")?,
        )
        .port(parse(&get, "DB_PORT", 1433)?)
        .credentials(required("DB_USER")?, required("DB_PASSWORD")?)
        .encrypt(parse_bool(&get, "DB_ENCRYPT", true)?)
        .trust_server_certificate(parse_bool(&get, "DB_TRUST_SERVER_CERTIFICATE", true)?)
        .max_connections(parse(&get, "DB_POOL_MAX", 10)?)
        .min_connections(parse(&get, "DB_POOL_MIN", 0)?)
        .connect_timeout(Duration::from_millis(parse(&get, "DB_CONNECT_TIMEOUT_MS", 30_000)?))
        .request_timeout(Duration::from_millis(parse(&get, "DB_REQUEST_TIMEOUT_MS", 30_000)?))
        .idle_timeout(Duration::from_millis(parse(&get, "DB_IDLE_TIMEOUT_MS", 30_000)?))
        .retry(RetryPolicy::new(
            parse(&get, "DB_MAX_RETRIES", 2)?,
            Duration::from_millis(parse(&get, "DB_RETRY_BASE_DELAY_MS", 1000)?),
        ));

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> DbResult<()> {
        if self.max_connections == 0 {
            return Err(DbError::Configuration(
                "DB_POOL_MAX must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DbError::Configuration(format!(
                "DB_POOL_MIN ({}) exceeds DB_POOL_MAX ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> DbResult<T> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| DbError::Configuration(format!("invalid value for {key}: {raw}"))),
        None => Ok(default),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> DbResult<bool> {
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(v) => Err(DbError::Configuration(format!("invalid value for {key}: {v}"))),
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
