/// Schema Module
///
/// Turns a model's declared fields into an immutable `Schema`: table name,
/// primary key, ordered non-key columns and the four statement templates
/// every CRUD operation is built from. Templates use `?` placeholders; the
/// query executor rewrites them to SQLite's numbered form.
use crate::core::db::{execute, Pool};
use crate::core::{OrmError, Result};
use crate::field::Field;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Quotes an identifier so reserved words can be used as table or column names.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Immutable per-model metadata, shared by every instance of the model.
#[derive(Debug)]
pub struct Schema {
    model_name: String,
    table_name: String,
    primary_key: String,
    /// Non-key columns in declaration order
    columns: Vec<String>,
    /// Primary key first, then `columns`: the select projection order
    field_names: Vec<String>,
    fields: HashMap<String, Field>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl Schema {
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Position of a field within `field_names`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|f| f == name)
    }

    /// `SELECT <pk>, <columns...> FROM <table>`
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// `INSERT INTO <table> (<columns...>, <pk>) VALUES (?, ...)`
    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// `UPDATE <table> SET <col>=?, ... WHERE <pk>=?`
    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    /// `DELETE FROM <table> WHERE <pk>=?`
    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// `CREATE TABLE IF NOT EXISTS` statement built from each field's SQL type.
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .field_names
            .iter()
            .map(|name| {
                let field = &self.fields[name];
                if field.is_primary_key() {
                    format!(
                        "{} {} NOT NULL PRIMARY KEY",
                        quote_ident(name),
                        field.sql_type()
                    )
                } else {
                    format!("{} {}", quote_ident(name), field.sql_type())
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.table_name),
            definitions.join(", ")
        )
    }
}

/// Collects field declarations for one model and derives its `Schema`.
#[derive(Debug)]
pub struct SchemaBuilder {
    model_name: String,
    table_name: Option<String>,
    fields: Vec<(String, Field)>,
}

impl SchemaBuilder {
    pub fn new(model_name: &str) -> Self {
        SchemaBuilder {
            model_name: model_name.to_string(),
            table_name: None,
            fields: Vec::new(),
        }
    }

    /// Overrides the table name, which otherwise is the model name.
    pub fn table(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }

    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.fields.push((name.to_string(), field));
        self
    }

    /// Validates the declarations and precomputes the statement templates.
    ///
    /// # Errors
    ///
    /// `DuplicatePrimaryKey` or `MissingPrimaryKey` unless exactly one field
    /// is a primary key, `DuplicateField` for a repeated name and
    /// `EmptyModelName` for an unnamed model.
    pub fn build(self) -> Result<Arc<Schema>> {
        if self.model_name.trim().is_empty() {
            return Err(OrmError::EmptyModelName);
        }
        let table_name = self.table_name.unwrap_or_else(|| self.model_name.clone());

        let mut fields = HashMap::with_capacity(self.fields.len());
        let mut columns = Vec::new();
        let mut primary_key: Option<String> = None;

        for (name, field) in self.fields {
            if fields.contains_key(&name) {
                return Err(OrmError::DuplicateField {
                    model: self.model_name,
                    field: name,
                });
            }
            if field.is_primary_key() {
                if let Some(first) = primary_key {
                    return Err(OrmError::DuplicatePrimaryKey {
                        model: self.model_name,
                        first,
                        second: name,
                    });
                }
                primary_key = Some(name.clone());
            } else {
                columns.push(name.clone());
            }
            fields.insert(name, field);
        }

        let primary_key = primary_key.ok_or_else(|| OrmError::MissingPrimaryKey {
            model: self.model_name.clone(),
        })?;

        let table = quote_ident(&table_name);
        let pk = quote_ident(&primary_key);
        let escaped: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();

        let mut projection = vec![pk.clone()];
        projection.extend(escaped.iter().cloned());
        let select_sql = format!("SELECT {} FROM {}", projection.join(", "), table);

        let mut insert_columns = escaped.clone();
        insert_columns.push(pk.clone());
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert_columns.join(", "),
            vec!["?"; insert_columns.len()].join(", ")
        );

        // A model with only a primary key has nothing to SET; rewriting the
        // key onto itself keeps the template valid.
        let assignments = if escaped.is_empty() {
            format!("{}=?", pk)
        } else {
            escaped
                .iter()
                .map(|c| format!("{}=?", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let update_sql = format!("UPDATE {} SET {} WHERE {}=?", table, assignments, pk);
        let delete_sql = format!("DELETE FROM {} WHERE {}=?", table, pk);

        let mut field_names = vec![primary_key.clone()];
        field_names.extend(columns.iter().cloned());

        info!(
            "found model: {} (table: {}, primary key: {}, {} columns)",
            self.model_name,
            table_name,
            primary_key,
            columns.len()
        );

        Ok(Arc::new(Schema {
            model_name: self.model_name,
            table_name,
            primary_key,
            columns,
            field_names,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        }))
    }
}

/// Schemas registered once at program start, looked up by model name.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: Vec<Arc<Schema>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a schema. Each model name may be registered only once.
    pub fn register(&mut self, schema: Arc<Schema>) -> Result<Arc<Schema>> {
        if self.get(schema.model_name()).is_some() {
            return Err(OrmError::DuplicateModel(schema.model_name().to_string()));
        }
        self.schemas.push(Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, model_name: &str) -> Option<Arc<Schema>> {
        self.schemas
            .iter()
            .find(|s| s.model_name() == model_name)
            .cloned()
    }

    pub fn schemas(&self) -> &[Arc<Schema>] {
        &self.schemas
    }

    /// Creates the backing table of every registered schema.
    pub fn create_tables(&self, pool: &Pool) -> Result<()> {
        for schema in &self.schemas {
            execute(pool, &schema.create_table_sql(), &[], true)?;
        }
        Ok(())
    }
}
