/// Database Module
///
/// This module provides the database layer the models are built on,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Connection Pool** (`pool.rs`): bounded pool of connections, RAII checkout
///   guards and the process-wide pool slot
/// - **Query Execution** (`query.rs`): the `select` and `execute` primitives,
///   placeholder translation and row mapping
///
/// ## Error Handling
///
/// All database operations use the standardized `OrmError` type for consistent error propagation.
pub mod pool;
pub mod query;

pub use pool::*;
pub use query::*;
