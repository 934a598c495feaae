//! # Typed Parameters
//!
//! Every statement declares its parameters up front. Callers supply values by
//! name and binding checks them against the declaration before anything is
//! sent to the server.
//!
//! ## Binding Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Statement (static)                Params (per call)                    │
//! │  ─────────────────────             ─────────────────                    │
//! │  kind: Query                       ("CustomerId", 42)                   │
//! │  text: "... @CustomerId"                                                │
//! │  params: [CustomerId INT]                                               │
//! │            │                             │                              │
//! │            └──────────► bind() ◄─────────┘                              │
//! │                           │  unknown / missing / mistyped / duplicate   │
//! │                           │  ──► DbError::InvalidParameters             │
//! │                           ▼                                              │
//! │                     ExecRequest (immutable)                             │
//! │                           │ render()                                     │
//! │                           ▼                                              │
//! │   SET NOCOUNT ON;                                                       │
//! │   DECLARE @CustomerId INT = @P1;                                        │
//! │   SELECT ... WHERE CustomerId = @CustomerId                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Values travel as positional `@P1..@Pn` RPC parameters in declaration
//! order; SQL text only ever refers to the declared names.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{DbError, DbResult};

// =============================================================================
// SQL Types & Values
// =============================================================================

/// SQL type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Int,
    BigInt,
    Float,
    Bit,
    NVarChar,
    Date,
    DateTime,
}

impl SqlType {
    /// T-SQL type used in the generated `DECLARE`.
    pub const fn declaration(self) -> &'static str {
        match self {
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Bit => "BIT",
            SqlType::NVarChar => "NVARCHAR(MAX)",
            SqlType::Date => "DATE",
            SqlType::DateTime => "DATETIME2",
        }
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i32),
    BigInt(i64),
    Float(f64),
    Bit(bool),
    NVarChar(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Type of a non-null value.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(_) => Some(SqlType::Int),
            SqlValue::BigInt(_) => Some(SqlType::BigInt),
            SqlValue::Float(_) => Some(SqlType::Float),
            SqlValue::Bit(_) => Some(SqlType::Bit),
            SqlValue::NVarChar(_) => Some(SqlType::NVarChar),
            SqlValue::Date(_) => Some(SqlType::Date),
            SqlValue::DateTime(_) => Some(SqlType::DateTime),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts the value to the declared type. Only lossless widenings are
    /// accepted.
    fn coerce(self, ty: SqlType) -> Option<SqlValue> {
        match (self, ty) {
            (SqlValue::Null, _) => Some(SqlValue::Null),
            (SqlValue::Int(v), SqlType::BigInt) => Some(SqlValue::BigInt(v.into())),
            (SqlValue::Int(v), SqlType::Float) => Some(SqlValue::Float(v.into())),
            (SqlValue::Date(d), SqlType::DateTime) => d.and_hms_opt(0, 0, 0).map(SqlValue::DateTime),
            (value, ty) if value.sql_type() == Some(ty) => Some(value),
            _ => None,
        }
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bit(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::NVarChar(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::NVarChar(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::NVarChar(v.clone())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

// =============================================================================
// Params (per call)
// =============================================================================

/// Named values for one call, in insertion order.
///
/// ## Example
/// ```rust
/// use billing_db::params::Params;
///
/// let params = Params::new()
///     .set("Username", "jd")
///     .set("BranchName", None::<String>);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, SqlValue)>,
}

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    /// Adds a named value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Statement (static schema)
// =============================================================================

/// A declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: SqlType,
    pub nullable: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, ty: SqlType) -> Self {
        ParamSpec {
            name,
            ty,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, ty: SqlType) -> Self {
        ParamSpec {
            name,
            ty,
            nullable: true,
        }
    }
}

/// Whether a statement is ad-hoc SQL or a stored procedure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    StoredProcedure,
}

/// A fixed SQL operation and its parameter schema.
///
/// ## Example
/// ```rust
/// use billing_db::params::{ParamSpec, Params, SqlType, Statement};
///
/// const BY_ID: Statement = Statement::query(
///     "SELECT CustomerName FROM Customers WHERE CustomerId = @CustomerId",
///     &[ParamSpec::required("CustomerId", SqlType::Int)],
/// );
///
/// assert!(BY_ID.bind(Params::new().set("CustomerId", 7)).is_ok());
/// assert!(BY_ID.bind(Params::new()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub text: &'static str,
    pub params: &'static [ParamSpec],
}

impl Statement {
    /// An ad-hoc query referring to parameters as `@Name`.
    pub const fn query(text: &'static str, params: &'static [ParamSpec]) -> Self {
        Statement {
            kind: StatementKind::Query,
            text,
            params,
        }
    }

    /// A stored procedure called with named arguments.
    pub const fn procedure(name: &'static str, params: &'static [ParamSpec]) -> Self {
        Statement {
            kind: StatementKind::StoredProcedure,
            text: name,
            params,
        }
    }

    /// Checks `params` against the schema and produces an execution request.
    ///
    /// ## Rules
    /// - Names not in the schema are rejected
    /// - A name given twice is rejected
    /// - Missing nullable parameters are bound as NULL
    /// - Missing or NULL non-nullable parameters are rejected
    /// - Values must match the declared type (INT widens to BIGINT/FLOAT)
    pub fn bind(&self, params: Params) -> DbResult<ExecRequest> {
        if self.kind == StatementKind::StoredProcedure && !is_procedure_name(self.text) {
            return Err(invalid(format!("invalid procedure name '{}'", self.text)));
        }

        let mut supplied: Vec<Option<SqlValue>> = vec![None; self.params.len()];
        for (name, value) in params.entries {
            let index = self
                .params
                .iter()
                .position(|spec| spec.name == name)
                .ok_or_else(|| invalid(format!("unknown parameter @{name}")))?;
            if supplied[index].is_some() {
                return Err(invalid(format!("parameter @{name} given more than once")));
            }
            supplied[index] = Some(value);
        }

        let mut bound = Vec::with_capacity(self.params.len());
        for (spec, value) in self.params.iter().zip(supplied) {
            if !is_param_name(spec.name) {
                return Err(invalid(format!("invalid parameter name @{}", spec.name)));
            }
            let value = value.unwrap_or(SqlValue::Null);
            if value.is_null() && !spec.nullable {
                return Err(invalid(format!("missing required parameter @{}", spec.name)));
            }
            let found = value.sql_type();
            let value = value.coerce(spec.ty).ok_or_else(|| {
                invalid(format!(
                    "parameter @{} expects {:?}, got {:?}",
                    spec.name,
                    spec.ty,
                    found.unwrap_or(spec.ty)
                ))
            })?;
            bound.push(BoundParam {
                name: spec.name,
                ty: spec.ty,
                value,
            });
        }

        Ok(ExecRequest {
            kind: self.kind,
            text: self.text,
            params: bound,
        })
    }
}

fn invalid(message: String) -> DbError {
    DbError::InvalidParameters(message)
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let reserved = name.len() > 1
        && name.starts_with(['P', 'p'])
        && name[1..].chars().all(|c| c.is_ascii_digit());
    starts_ok && rest_ok && !reserved
}

fn is_procedure_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            !part.is_empty()
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

// =============================================================================
// Exec Request
// =============================================================================

/// A parameter after binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: &'static str,
    pub ty: SqlType,
    pub value: SqlValue,
}

/// A validated, immutable execution request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecRequest {
    kind: StatementKind,
    text: &'static str,
    params: Vec<BoundParam>,
}

impl ExecRequest {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Query text or procedure name.
    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn params(&self) -> &[BoundParam] {
        &self.params
    }

    /// Bound value of a parameter.
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// SQL batch sent to the server. Values are bound as `@P1..@Pn` in
    /// parameter order.
    pub fn render(&self) -> String {
        let mut sql = String::from("SET NOCOUNT ON;\n");
        match self.kind {
            StatementKind::Query => {
                if !self.params.is_empty() {
                    let declared: Vec<String> = self
                        .params
                        .iter()
                        .enumerate()
                        .map(|(i, p)| format!("@{} {} = @P{}", p.name, p.ty.declaration(), i + 1))
                        .collect();
                    sql.push_str("DECLARE ");
                    sql.push_str(&declared.join(", "));
                    sql.push_str(";\n");
                }
                sql.push_str(self.text.trim());
            }
            StatementKind::StoredProcedure => {
                sql.push_str("EXEC ");
                sql.push_str(self.text);
                let args: Vec<String> = self
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("@{} = @P{}", p.name, i + 1))
                    .collect();
                if !args.is_empty() {
                    sql.push(' ');
                    sql.push_str(&args.join(", "));
                }
                sql.push(';');
            }
        }
        sql
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
