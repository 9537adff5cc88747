// Core infrastructure modules
pub mod config;
pub mod core;

// Model layer
pub mod field;
pub mod model;
pub mod models;
pub mod page;
pub mod schema;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{close_pool, create_pool, execute, global_pool, select, Pool};
pub use crate::core::{OrmError, Result};
pub use crate::field::{Field, FieldKind, Value};
pub use crate::model::{FindAll, Instance, Limit, Model};
pub use crate::page::Page;
pub use crate::schema::{Registry, Schema, SchemaBuilder};
