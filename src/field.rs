//! Field descriptors and the values stored in model columns.
use chrono::Utc;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;
use std::fmt;

use crate::core::{OrmError, Result};

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Mirrors the "empty" test the defaulting logic relies on: null, false,
    /// zero and the empty string all count as unset.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Real(r) => *r == 0.0,
            Value::Text(s) => s.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(*b as i64)),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<SqlValue> for Value {
    type Error = OrmError;

    fn try_from(raw: SqlValue) -> Result<Self> {
        Ok(match raw {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(i),
            SqlValue::Real(r) => Value::Real(r),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => {
                return Err(OrmError::UnsupportedContent(format!("{} byte blob", b.len())))
            }
        })
    }
}

/// The family a field belongs to. Decides the default SQL type, the default
/// value and how stored values are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Text,
    Float,
}

impl FieldKind {
    pub fn default_ddl(self) -> &'static str {
        match self {
            FieldKind::String => "varchar(255)",
            FieldKind::Integer => "bigint",
            FieldKind::Boolean => "boolean",
            FieldKind::Text => "text",
            FieldKind::Float => "real",
        }
    }

    fn default_value(self) -> Option<FieldDefault> {
        match self {
            FieldKind::Integer => Some(FieldDefault::Fixed(Value::Integer(0))),
            FieldKind::Boolean => Some(FieldDefault::Fixed(Value::Bool(false))),
            FieldKind::String | FieldKind::Text | FieldKind::Float => None,
        }
    }

    /// Converts a value read from SQLite into the field's value shape.
    pub fn materialize(self, raw: SqlValue) -> Result<Value> {
        Ok(match (self, raw) {
            (_, SqlValue::Null) => Value::Null,
            (FieldKind::Boolean, SqlValue::Integer(i)) => Value::Bool(i != 0),
            (FieldKind::Float, SqlValue::Integer(i)) => Value::Real(i as f64),
            (_, SqlValue::Integer(i)) => Value::Integer(i),
            (_, SqlValue::Real(r)) => Value::Real(r),
            (_, SqlValue::Text(s)) => Value::Text(s),
            (kind, SqlValue::Blob(b)) => {
                return Err(OrmError::UnsupportedContent(format!(
                    "{} byte blob in {:?} column",
                    b.len(),
                    kind
                )))
            }
        })
    }
}

/// A field default: either a fixed value or a producer run on every use.
#[derive(Clone)]
pub enum FieldDefault {
    Fixed(Value),
    Producer(fn() -> Value),
}

impl FieldDefault {
    pub fn resolve(&self) -> Value {
        match self {
            FieldDefault::Fixed(value) => value.clone(),
            FieldDefault::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Fixed(value) => write!(f, "Fixed({:?})", value),
            FieldDefault::Producer(_) => write!(f, "Producer"),
        }
    }
}

/// Column declaration: SQL type, primary-key flag and default.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    ddl: String,
    primary_key: bool,
    default: Option<FieldDefault>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Field {
            kind,
            ddl: kind.default_ddl().to_string(),
            primary_key: false,
            default: kind.default_value(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    /// Overrides the SQL column type, e.g. `varchar(50)`.
    pub fn ddl(mut self, ddl: &str) -> Self {
        self.ddl = ddl.to_string();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Fixed(value.into()));
        self
    }

    pub fn default_with(mut self, producer: fn() -> Value) -> Self {
        self.default = Some(FieldDefault::Producer(producer));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn sql_type(&self) -> &str {
        &self.ddl
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:?}Field: {}>", self.kind, self.ddl)
    }
}

/// Time-ordered 50 character id: 15-digit milliseconds, a uuid4 hex and `000`.
pub fn next_id() -> Value {
    Value::Text(format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    ))
}

/// Current time as fractional seconds since the epoch.
pub fn unix_timestamp() -> Value {
    Value::Real(Utc::now().timestamp_micros() as f64 / 1_000_000.0)
}
