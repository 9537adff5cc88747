/// Core Module
///
/// This module contains the shared infrastructure the models sit on: the
/// connection pool, the query executor and the error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{OrmError, Result};
