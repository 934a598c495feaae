//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  tiberius::error::Error / std::io::Error / bb8::RunError               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlFailure { kind, code, message }  ← classified ONCE, here           │
//! │       │                                                                 │
//! │       ├── transient kind ──► DbError::Connection  (executor retries)   │
//! │       └── otherwise      ──► DbError::Execution   (surfaced at once)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in billing-api) ← JSON envelope for the frontend            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Server Error Codes
//! ```text
//!   233, 10053, 10054                      → ConnectionReset
//!   10060                                  → Timeout
//!   4060, 40197, 40501, 40613, 49918-49920 → ConnectionFailed
//!   18456                                  → Authentication
//!   2601, 2627, 547, 515                   → ConstraintViolation
//!   1205                                   → Deadlock
//!   102, 156, 207, 208, 2812               → Syntax
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Category of a driver-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection dropped mid-conversation.
    ConnectionReset,
    /// Connect, checkout or request deadline expired.
    Timeout,
    /// The server could not be reached or refused the session.
    ConnectionFailed,
    /// Login rejected.
    Authentication,
    /// Unique, foreign key, check or NOT NULL violation.
    ConstraintViolation,
    /// Chosen as deadlock victim.
    Deadlock,
    /// Invalid SQL or missing object.
    Syntax,
    /// A value could not be converted to or from SQL.
    Conversion,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Whether a retry on a fresh pool may succeed.
    ///
    /// Deadlocks are not retried here; the statement may have had side
    /// effects the caller has to reason about.
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionReset | ErrorKind::Timeout | ErrorKind::ConnectionFailed
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionReset => "connection_reset",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::Authentication => "authentication",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Deadlock => "deadlock",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a SQL Server error number to its kind.
pub fn classify_server_code(code: u32) -> ErrorKind {
    match code {
        233 | 10053 | 10054 => ErrorKind::ConnectionReset,
        10060 => ErrorKind::Timeout,
        4060 | 40197 | 40501 | 40613 | 49918..=49920 => ErrorKind::ConnectionFailed,
        18456 => ErrorKind::Authentication,
        2601 | 2627 | 547 | 515 => ErrorKind::ConstraintViolation,
        1205 => ErrorKind::Deadlock,
        102 | 156 | 207 | 208 | 2812 => ErrorKind::Syntax,
        _ => ErrorKind::Other,
    }
}

/// Maps an I/O error kind to its kind.
///
/// Socket errors that are not clearly a reset or a timeout count as a failed
/// connection.
pub fn classify_io_kind(kind: io::ErrorKind) -> ErrorKind {
    match kind {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotConnected => ErrorKind::ConnectionReset,
        io::ErrorKind::TimedOut => ErrorKind::Timeout,
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => ErrorKind::Other,
        _ => ErrorKind::ConnectionFailed,
    }
}

// =============================================================================
// SQL Failure
// =============================================================================

/// A classified driver failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFailure {
    pub kind: ErrorKind,
    /// SQL Server error number, when the server produced the error.
    pub code: Option<u32>,
    pub message: String,
}

impl SqlFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        SqlFailure {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for SqlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code}, {})", self.message, self.kind),
            None => write!(f, "{} ({})", self.message, self.kind),
        }
    }
}

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Lookup by id, barcode or username returned no row
    /// - An UPDATE matched no row
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The database could not be reached, or the session dropped.
    ///
    /// Retried by the executor while the kind is transient; surfaced once
    /// the retry budget is spent.
    #[error("Connection failed: {0}")]
    Connection(SqlFailure),

    /// The server rejected the statement.
    #[error("Query failed: {0}")]
    Execution(SqlFailure),

    /// A statement was bound with parameters that don't match its schema.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Connection settings are missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Wraps a failure as `Connection` when transient, `Execution` otherwise.
    pub fn from_failure(failure: SqlFailure) -> Self {
        if failure.kind.is_transient() {
            DbError::Connection(failure)
        } else {
            DbError::Execution(failure)
        }
    }

    /// Timeout failure with the given context.
    pub fn timeout(message: impl Into<String>) -> Self {
        DbError::Connection(SqlFailure::new(ErrorKind::Timeout, message))
    }

    /// Row decoding failure.
    pub fn conversion(message: impl Into<String>) -> Self {
        DbError::Execution(SqlFailure::new(ErrorKind::Conversion, message))
    }

    /// Re-labels a driver failure raised while opening a pool as a
    /// connection error, keeping its kind (so bad credentials stay
    /// non-transient).
    pub fn into_connection(self) -> Self {
        match self {
            DbError::Execution(failure) => DbError::Connection(failure),
            other => other,
        }
    }

    /// Whether the executor may retry this error on a fresh pool.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Connection(f) if f.kind.is_transient())
    }

    /// The classified driver failure, if any.
    pub fn failure(&self) -> Option<&SqlFailure> {
        match self {
            DbError::Connection(f) | DbError::Execution(f) => Some(f),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.failure().map(|f| f.kind)
    }

    /// SQL Server error number, when the server produced the error.
    pub fn code(&self) -> Option<u32> {
        self.failure().and_then(|f| f.code)
    }
}

/// Convert tiberius errors to DbError.
///
/// ## Error Mapping
/// ```text
/// Error::Io { kind, .. }   → classify_io_kind(kind)
/// Error::Server(token)     → classify_server_code(token.code())
/// Error::Tls / Routing     → ConnectionFailed
/// Error::Conversion / Utf* → Conversion
/// Other                    → Other
/// ```
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        use tiberius::error::Error as Tds;

        let failure = match err {
            Tds::Io { kind, message } => SqlFailure::new(classify_io_kind(kind), message),
            Tds::Server(token) => {
                SqlFailure::new(classify_server_code(token.code()), token.message())
                    .with_code(token.code())
            }
            Tds::Tls(message) => SqlFailure::new(ErrorKind::ConnectionFailed, message),
            Tds::Routing { host, port } => SqlFailure::new(
                ErrorKind::ConnectionFailed,
                format!("server requested routing to {host}:{port}"),
            ),
            err @ (Tds::Conversion(_) | Tds::Encoding(_) | Tds::Utf8 | Tds::Utf16) => {
                SqlFailure::new(ErrorKind::Conversion, err.to_string())
            }
            other => SqlFailure::new(ErrorKind::Other, other.to_string()),
        };
        DbError::from_failure(failure)
    }
}

impl From<io::Error> for DbError {
    fn from(err: io::Error) -> Self {
        DbError::from_failure(SqlFailure::new(classify_io_kind(err.kind()), err.to_string()))
    }
}

impl From<bb8::RunError<DbError>> for DbError {
    fn from(err: bb8::RunError<DbError>) -> Self {
        match err {
            bb8::RunError::User(err) => err,
            bb8::RunError::TimedOut => DbError::timeout("timed out waiting for a pooled connection"),
        }
    }
}

impl From<tokio::time::error::Elapsed> for DbError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        DbError::timeout("request timed out")
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_codes() {
        assert_eq!(classify_server_code(10054), ErrorKind::ConnectionReset);
        assert_eq!(classify_server_code(10060), ErrorKind::Timeout);
        assert_eq!(classify_server_code(40613), ErrorKind::ConnectionFailed);
        assert_eq!(classify_server_code(49919), ErrorKind::ConnectionFailed);
        assert_eq!(classify_server_code(18456), ErrorKind::Authentication);
        assert_eq!(classify_server_code(2627), ErrorKind::ConstraintViolation);
        assert_eq!(classify_server_code(1205), ErrorKind::Deadlock);
        assert_eq!(classify_server_code(208), ErrorKind::Syntax);
        assert_eq!(classify_server_code(50000), ErrorKind::Other);
    }

    #[test]
    fn test_io_kinds() {
        assert_eq!(
            classify_io_kind(io::ErrorKind::ConnectionReset),
            ErrorKind::ConnectionReset
        );
        assert_eq!(classify_io_kind(io::ErrorKind::BrokenPipe), ErrorKind::ConnectionReset);
        assert_eq!(classify_io_kind(io::ErrorKind::TimedOut), ErrorKind::Timeout);
        assert_eq!(
            classify_io_kind(io::ErrorKind::ConnectionRefused),
            ErrorKind::ConnectionFailed
        );
    }

    #[test]
    fn test_transient_wraps_as_connection() {
        let err = DbError::from_failure(SqlFailure::new(ErrorKind::Timeout, "slow"));
        assert!(matches!(err, DbError::Connection(_)));
        assert!(err.is_transient());

        let err = DbError::from_failure(
            SqlFailure::new(ErrorKind::ConstraintViolation, "dup key").with_code(2627),
        );
        assert!(matches!(err, DbError::Execution(_)));
        assert!(!err.is_transient());
        assert_eq!(err.code(), Some(2627));
    }

    #[test]
    fn test_into_connection_keeps_kind() {
        let err = DbError::from_failure(
            SqlFailure::new(ErrorKind::Authentication, "Login failed").with_code(18456),
        )
        .into_connection();
        assert!(matches!(err, DbError::Connection(_)));
        assert!(!err.is_transient());
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: DbError = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset").into();
        assert!(err.is_transient());
        assert_eq!(err.kind(), Some(ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_bb8_timeout_is_transient() {
        let err: DbError = bb8::RunError::<DbError>::TimedOut.into();
        assert_eq!(err.kind(), Some(ErrorKind::Timeout));
        assert!(err.is_transient());
    }

    #[test]
    fn test_display() {
        let err = DbError::Execution(
            SqlFailure::new(ErrorKind::Syntax, "Invalid object name 'Foo'.").with_code(208),
        );
        assert_eq!(
            err.to_string(),
            "Query failed: Invalid object name 'Foo'. (code 208, syntax)"
        );
        assert_eq!(
            DbError::not_found("Customer", 7).to_string(),
            "Customer not found: 7"
        );
    }
}
