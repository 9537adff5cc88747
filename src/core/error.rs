/// Error Module
///
/// This module defines the error types for the ORM. Schema definition
/// errors, pool preconditions, caller mistakes and driver failures all
/// travel through a single enum so every operation can return `Result<T>`.
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for the ORM.
///
/// This enum covers all error scenarios that can occur:
/// - Schema definition (primary key rules, duplicate fields)
/// - Pool lifecycle (not initialized, closed, exhausted)
/// - Query construction (limits, placeholders, unknown fields)
/// - Driver, configuration and I/O failures
#[derive(Error, Debug)]
pub enum OrmError {
    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse errors
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// More than one field of a model is marked as primary key
    #[error("Duplicate primary key for model `{model}`: `{first}` and `{second}`")]
    DuplicatePrimaryKey {
        model: String,
        first: String,
        second: String,
    },

    /// No field of a model is marked as primary key
    #[error("Primary key not found for model `{model}`")]
    MissingPrimaryKey { model: String },

    /// The same field name was declared twice
    #[error("Field `{field}` declared twice on model `{model}`")]
    DuplicateField { model: String, field: String },

    /// A model was declared without a name
    #[error("Model name must not be empty")]
    EmptyModelName,

    /// A model with the same name is already registered
    #[error("Model `{0}` is already registered")]
    DuplicateModel(String),

    /// A query was attempted before the process-wide pool was created
    #[error("Connection pool has not been initialized")]
    PoolNotInitialized,

    /// The pool was closed and hands out no more connections
    #[error("Connection pool is closed")]
    PoolClosed,

    /// No connection became available within the configured acquire timeout
    #[error("Timed out after {0:?} waiting for a pooled connection")]
    AcquireTimeout(Duration),

    /// Malformed pagination argument
    #[error("Invalid limit value: {0}")]
    InvalidLimit(String),

    /// Field name not declared on the model
    #[error("Model `{model}` has no field `{field}`")]
    UnknownField { model: String, field: String },

    /// Statement placeholders do not line up with the supplied arguments
    #[error("Statement has {expected} placeholders but {supplied} arguments were supplied")]
    PlaceholderMismatch { expected: usize, supplied: usize },

    /// A column value the row mapper cannot materialize
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// A write touched an unexpected number of rows (strict mode only)
    #[error("Failed to {operation} `{model}` record: affected rows: {affected}")]
    StaleWrite {
        model: String,
        operation: &'static str,
        affected: usize,
    },
}

/// Type alias for Result to use OrmError as the error type.
pub type Result<T> = std::result::Result<T, OrmError>;
