//! Model handles and instances.
//!
//! A [`Model`] wraps a registered [`Schema`] and carries the table-level
//! operations (`find`, `find_all`, `find_number`). An [`Instance`] is one
//! record bound to that schema and carries the row-level ones (`save`,
//! `update`, `remove`).
use crate::core::db::{execute, select, Pool, Row};
use crate::core::{OrmError, Result};
use crate::field::Value;
use crate::schema::{quote_ident, Schema};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pagination for `find_all`: a row count, or an offset and a row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u32),
    Range { offset: u32, count: u32 },
}

impl Limit {
    /// Parses `"5"` or `"10,5"` (offset, count).
    pub fn parse(text: &str) -> Result<Limit> {
        let parts = text
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map_err(|_| OrmError::InvalidLimit(text.to_string()))
            })
            .collect::<Result<Vec<i64>>>()?;
        Limit::try_from(parts.as_slice())
    }

    fn clause(&self) -> &'static str {
        match self {
            Limit::Count(_) => "LIMIT ?",
            Limit::Range { .. } => "LIMIT ?, ?",
        }
    }

    fn args(&self) -> Vec<Value> {
        match *self {
            Limit::Count(count) => vec![Value::Integer(count.into())],
            Limit::Range { offset, count } => {
                vec![Value::Integer(offset.into()), Value::Integer(count.into())]
            }
        }
    }
}

impl TryFrom<&[i64]> for Limit {
    type Error = OrmError;

    fn try_from(values: &[i64]) -> Result<Limit> {
        let invalid = || OrmError::InvalidLimit(format!("{:?}", values));
        let to_u32 = |v: i64| u32::try_from(v).map_err(|_| invalid());
        match *values {
            [count] => Ok(Limit::Count(to_u32(count)?)),
            [offset, count] => Ok(Limit::Range {
                offset: to_u32(offset)?,
                count: to_u32(count)?,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Options for [`Model::find_all`].
///
/// `where_clause` and `order_by` are caller-trusted SQL fragments; only the
/// values in `args` are bound as parameters.
#[derive(Debug, Clone, Default)]
pub struct FindAll {
    pub where_clause: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        FindAll::default()
    }

    pub fn filter(mut self, where_clause: &str, args: Vec<Value>) -> Self {
        self.where_clause = Some(where_clause.to_string());
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds the statement and argument list on top of a select template.
    fn to_sql(&self, select_sql: &str) -> (String, Vec<Value>) {
        let mut sql = vec![select_sql.to_string()];
        let mut args = self.args.clone();
        if let Some(where_clause) = &self.where_clause {
            sql.push(format!("WHERE {}", where_clause));
        }
        if let Some(order_by) = &self.order_by {
            sql.push(format!("ORDER BY {}", order_by));
        }
        if let Some(limit) = &self.limit {
            sql.push(limit.clause().to_string());
            args.extend(limit.args());
        }
        (sql.join(" "), args)
    }
}

/// Handle to one model type. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<Schema>,
}

impl Model {
    pub fn new(schema: Arc<Schema>) -> Self {
        Model { schema }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// An instance with every field absent.
    pub fn instance(&self) -> Instance {
        Instance {
            schema: Arc::clone(&self.schema),
            values: vec![None; self.schema.field_names().len()],
        }
    }

    /// An instance with the given fields set.
    ///
    /// # Errors
    ///
    /// `UnknownField` if a name is not declared on the model.
    pub fn instance_with<I, K, V>(&self, values: I) -> Result<Instance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut instance = self.instance();
        for (name, value) in values {
            instance.set(name.as_ref(), value)?;
        }
        Ok(instance)
    }

    /// Looks up one record by primary key.
    pub fn find(&self, pool: &Pool, primary_key: impl Into<Value>) -> Result<Option<Instance>> {
        let sql = format!(
            "{} WHERE {}=?",
            self.schema.select_sql(),
            quote_ident(self.schema.primary_key())
        );
        let rows = select(pool, &sql, &[primary_key.into()], Some(1))?;
        rows.into_iter().next().map(|row| self.materialize(row)).transpose()
    }

    /// Returns every record matching the options, in `order_by` order.
    pub fn find_all(&self, pool: &Pool, query: &FindAll) -> Result<Vec<Instance>> {
        let (sql, args) = query.to_sql(self.schema.select_sql());
        select(pool, &sql, &args, None)?
            .into_iter()
            .map(|row| self.materialize(row))
            .collect()
    }

    /// Evaluates an aggregate such as `count(id)` over the table.
    ///
    /// Returns `None` only when the statement yields no row.
    pub fn find_number(
        &self,
        pool: &Pool,
        select_field: &str,
        where_clause: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let mut sql = format!(
            "SELECT {} AS count FROM {}",
            select_field,
            quote_ident(self.schema.table_name())
        );
        if let Some(where_clause) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        let rows = select(pool, &sql, args, Some(1))?;
        match rows.into_iter().next() {
            Some(row) => {
                let raw = row.get("count").cloned().unwrap_or(rusqlite::types::Value::Null);
                Ok(Some(Value::try_from(raw)?))
            }
            None => Ok(None),
        }
    }

    /// Number of rows in the table.
    pub fn count(&self, pool: &Pool) -> Result<i64> {
        let count = self.find_number(pool, "count(*)", None, &[])?;
        Ok(count.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    fn materialize(&self, row: Row) -> Result<Instance> {
        let mut instance = self.instance();
        for (name, raw) in row.into_columns() {
            let Some(position) = self.schema.position(&name) else {
                continue;
            };
            let kind = self.schema.field(&name).map(|f| f.kind());
            let value = match kind {
                Some(kind) => kind.materialize(raw)?,
                None => Value::try_from(raw)?,
            };
            instance.values[position] = Some(value);
        }
        Ok(instance)
    }
}

/// One record of a model.
///
/// Values are kept in the schema's field order. A field is either absent
/// (never set) or holds a value, which may be `Value::Null`.
#[derive(Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    values: Vec<Option<Value>>,
}

impl Instance {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The field's current value; `None` if absent or not declared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .position(name)
            .and_then(|position| self.values[position].as_ref())
    }

    /// Sets a field.
    ///
    /// # Errors
    ///
    /// `UnknownField` if the model does not declare `name`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let position = self.position(name)?;
        self.values[position] = Some(value.into());
        Ok(())
    }

    /// Marks a field absent again.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let position = self.position(name)?;
        self.values[position] = None;
        Ok(())
    }

    /// Current value, or the field's default when the value is absent or
    /// falsy. Without a default the current value (or null) is returned.
    pub fn get_or_default(&self, name: &str) -> Result<Value> {
        let position = self.position(name)?;
        let current = self.values[position].clone().unwrap_or(Value::Null);
        if !current.is_falsy() {
            return Ok(current);
        }
        match self.schema.field(name).and_then(|field| field.default()) {
            Some(default) => {
                let value = default.resolve();
                debug!("use default value for {}: {}", name, value);
                Ok(value)
            }
            None => Ok(current),
        }
    }

    /// Inserts the record, filling absent or falsy fields from their
    /// defaults. Resolved values are kept on the instance once the insert
    /// succeeds.
    pub fn save(&mut self, pool: &Pool) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let names: Vec<&str> = schema
            .columns()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(schema.primary_key()))
            .collect();
        let args = names
            .iter()
            .map(|name| self.get_or_default(name))
            .collect::<Result<Vec<Value>>>()?;

        let affected = execute(pool, schema.insert_sql(), &args, true)?;
        for (name, value) in names.into_iter().zip(args) {
            self.set(name, value)?;
        }
        self.check_affected(pool, "insert", affected)
    }

    /// Writes the record's fields back, keyed on the primary key.
    ///
    /// No defaults are applied. When only some fields are present (the
    /// instance was not loaded with `find`), only those are written; with
    /// none present the key is written onto itself so the row count is
    /// still checked.
    pub fn update(&self, pool: &Pool) -> Result<()> {
        let schema = &self.schema;
        let pk = self.value(schema.primary_key());
        let present: Vec<&String> = schema
            .columns()
            .iter()
            .filter(|name| self.get(name).is_some())
            .collect();

        let affected = if present.len() == schema.columns().len() && !present.is_empty() {
            let mut args: Vec<Value> = present.iter().map(|name| self.value(name)).collect();
            args.push(pk);
            execute(pool, schema.update_sql(), &args, true)?
        } else {
            let assignments: Vec<String> = if present.is_empty() {
                vec![format!("{}=?", quote_ident(schema.primary_key()))]
            } else {
                present
                    .iter()
                    .map(|name| format!("{}=?", quote_ident(name)))
                    .collect()
            };
            let sql = format!(
                "UPDATE {} SET {} WHERE {}=?",
                quote_ident(schema.table_name()),
                assignments.join(", "),
                quote_ident(schema.primary_key())
            );
            let mut args: Vec<Value> = if present.is_empty() {
                vec![pk.clone()]
            } else {
                present.iter().map(|name| self.value(name)).collect()
            };
            args.push(pk);
            execute(pool, &sql, &args, true)?
        };
        self.check_affected(pool, "update", affected)
    }

    /// Deletes the backing row.
    pub fn remove(&self, pool: &Pool) -> Result<()> {
        let pk = self.value(self.schema.primary_key());
        let affected = execute(pool, self.schema.delete_sql(), &[pk], true)?;
        self.check_affected(pool, "remove", affected)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.schema
            .position(name)
            .ok_or_else(|| OrmError::UnknownField {
                model: self.schema.model_name().to_string(),
                field: name.to_string(),
            })
    }

    fn value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    fn check_affected(&self, pool: &Pool, operation: &'static str, affected: usize) -> Result<()> {
        if affected == 1 {
            return Ok(());
        }
        if pool.config().strict_writes {
            return Err(OrmError::StaleWrite {
                model: self.schema.model_name().to_string(),
                operation,
                affected,
            });
        }
        warn!(
            "failed to {} {} record: affected rows: {}",
            operation,
            self.schema.model_name(),
            affected
        );
        Ok(())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.schema.field_names().iter().zip(&self.values) {
            if let Some(value) = value {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// Serializes present fields as a JSON-style map.
impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let present = self.values.iter().filter(|v| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(present))?;
        for (name, value) in self.schema.field_names().iter().zip(&self.values) {
            if let Some(value) = value {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}
