/// Query Execution Module
///
/// This module provides the two primitives every model operation goes
/// through: `select` for reads and `execute` for writes. Both borrow a
/// connection from the pool for exactly one statement and hand it back on
/// every exit path.

use crate::core::db::pool::Pool;
use crate::core::{OrmError, Result};
use crate::field::Value;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::{info, warn};

/// One result row: column names paired with their values, in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Returns the value of the named column, if present.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_columns(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

/// Rewrites backend-neutral `?` placeholders to SQLite's numbered `?N` form.
///
/// Question marks inside quoted literals or identifiers, and inside `--` or
/// `/* */` comments, are left alone. Returns the rewritten statement and the
/// number of placeholders found.
pub fn translate_placeholders(sql: &str) -> (String, usize) {
    #[derive(Clone, Copy)]
    enum Span {
        Code,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut count = 0;
    let mut span = Span::Code;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        out.push(ch);
        match span {
            Span::Quoted(q) => {
                // A doubled quote closes and immediately reopens, so the
                // toggle handles escaping as well.
                if ch == q {
                    span = Span::Code;
                }
            }
            Span::LineComment => {
                if ch == '\n' {
                    span = Span::Code;
                }
            }
            Span::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push('/');
                    span = Span::Code;
                }
            }
            Span::Code => match ch {
                '\'' | '"' | '`' => span = Span::Quoted(ch),
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push('-');
                    span = Span::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push('*');
                    span = Span::BlockComment;
                }
                '?' => {
                    count += 1;
                    out.push_str(&count.to_string());
                }
                _ => {}
            },
        }
    }
    (out, count)
}

fn log(sql: &str, args: &[Value]) {
    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    info!("SQL: {}, [{}]", sql, rendered.join(", "));
}

fn prepare_sql(sql: &str, args: &[Value]) -> Result<String> {
    let (translated, expected) = translate_placeholders(sql);
    if expected != args.len() {
        return Err(OrmError::PlaceholderMismatch {
            expected,
            supplied: args.len(),
        });
    }
    Ok(translated)
}

/// Runs a read statement and returns its rows.
///
/// # Arguments
///
/// * `sql` - Statement with `?` placeholders
/// * `args` - One argument per placeholder, in order
/// * `size` - Fetch at most this many rows; `None` or `Some(0)` fetches all
///
/// # Errors
///
/// `PlaceholderMismatch` when `args` does not match the statement, otherwise
/// whatever the pool or the driver reports.
pub fn select(pool: &Pool, sql: &str, args: &[Value], size: Option<usize>) -> Result<Vec<Row>> {
    log(sql, args);
    let translated = prepare_sql(sql, args)?;

    let conn = pool.acquire()?;
    let mut stmt = conn.prepare(&translated)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let size = size.filter(|&limit| limit > 0);
    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let mut result = Vec::new();
    while size.map_or(true, |limit| result.len() < limit) {
        let Some(row) = rows.next()? else {
            break;
        };
        let mut columns = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            columns.push((name.clone(), row.get::<_, SqlValue>(i)?));
        }
        result.push(Row { columns });
    }

    info!("rows returned: {}", result.len());
    Ok(result)
}

/// Runs a write statement and returns the number of affected rows.
///
/// With `autocommit` false (or a pool configured without autocommit) the
/// statement runs inside an explicit transaction that is rolled back before
/// any error is returned.
pub fn execute(pool: &Pool, sql: &str, args: &[Value], autocommit: bool) -> Result<usize> {
    log(sql, args);
    let translated = prepare_sql(sql, args)?;

    let mut conn = pool.acquire()?;
    if autocommit && pool.config().autocommit {
        return Ok(conn.execute(&translated, params_from_iter(args.iter()))?);
    }

    let tx = conn.transaction()?;
    match tx.execute(&translated, params_from_iter(args.iter())) {
        Ok(affected) => {
            tx.commit()?;
            Ok(affected)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback() {
                warn!("rollback failed: {}", rollback);
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::PoolFixture;

    #[test]
    fn test_translate_placeholders() {
        let (sql, count) = translate_placeholders("SELECT * FROM t WHERE a=? AND b=?");
        assert_eq!(sql, "SELECT * FROM t WHERE a=?1 AND b=?2");
        assert_eq!(count, 2);

        let (sql, count) = translate_placeholders("SELECT '?', \"we?rd\" FROM t WHERE c=?");
        assert_eq!(sql, "SELECT '?', \"we?rd\" FROM t WHERE c=?1");
        assert_eq!(count, 1);

        let (sql, count) = translate_placeholders("SELECT 'it''s?' WHERE x=?");
        assert_eq!(sql, "SELECT 'it''s?' WHERE x=?1");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_placeholders_in_comments_ignored() {
        let (sql, count) = translate_placeholders("SELECT * FROM t WHERE x=? -- why?\nAND y=?");
        assert_eq!(sql, "SELECT * FROM t WHERE x=?1 -- why?\nAND y=?2");
        assert_eq!(count, 2);

        let (sql, count) = translate_placeholders("SELECT /* a? b */ x FROM t WHERE y=?");
        assert_eq!(sql, "SELECT /* a? b */ x FROM t WHERE y=?1");
        assert_eq!(count, 1);

        // A lone dash or slash is still an operator
        let (sql, count) = translate_placeholders("SELECT a-?, b/? FROM t");
        assert_eq!(sql, "SELECT a-?1, b/?2 FROM t");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_commented_placeholder_needs_no_argument() {
        let fixture = PoolFixture::new().unwrap();
        let pool = &fixture.pool;
        execute(pool, "CREATE TABLE t (x INTEGER)", &[], true).unwrap();
        execute(pool, "INSERT INTO t VALUES (1)", &[], true).unwrap();

        let rows = select(pool, "SELECT x FROM t WHERE x=? -- why?\n", &[Value::from(1)], None).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_select_and_execute() {
        let fixture = PoolFixture::new().unwrap();
        let pool = &fixture.pool;
        execute(pool, "CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER)", &[], true).unwrap();

        for i in 0..3 {
            let affected = execute(
                pool,
                "INSERT INTO t (id, n) VALUES (?, ?)",
                &[Value::from(format!("r{}", i)), Value::from(i)],
                true,
            )
            .unwrap();
            assert_eq!(affected, 1);
        }

        let rows = select(pool, "SELECT id, n FROM t ORDER BY id", &[], None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Text("r0".to_string())));
        assert_eq!(rows[2].get("n"), Some(&SqlValue::Integer(2)));
        assert_eq!(rows[0].column_names().collect::<Vec<_>>(), vec!["id", "n"]);

        let limited = select(pool, "SELECT id FROM t", &[], Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
        let unlimited = select(pool, "SELECT id FROM t", &[], Some(0)).unwrap();
        assert_eq!(unlimited.len(), 3);

        let affected = execute(pool, "UPDATE t SET n = n + 10", &[], false).unwrap();
        assert_eq!(affected, 3);

        // Connections were all handed back
        assert_eq!(pool.status().idle, pool.status().size);
    }

    #[test]
    fn test_placeholder_mismatch() {
        let fixture = PoolFixture::new().unwrap();
        let result = select(&fixture.pool, "SELECT ?", &[], None);
        assert!(matches!(
            result,
            Err(OrmError::PlaceholderMismatch {
                expected: 1,
                supplied: 0
            })
        ));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let fixture = PoolFixture::new().unwrap();
        let pool = &fixture.pool;
        execute(
            pool,
            "CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER CHECK (n < 5))",
            &[],
            true,
        )
        .unwrap();
        execute(pool, "INSERT INTO t VALUES ('a', 1), ('b', 4)", &[], true).unwrap();

        // 'b' violates the check after 'a' was already updated
        let result = execute(pool, "UPDATE t SET n = n + 2", &[], false);
        assert!(matches!(result, Err(OrmError::Database(_))));

        let rows = select(pool, "SELECT n FROM t WHERE id = ?", &[Value::from("a")], None).unwrap();
        assert_eq!(rows[0].get("n"), Some(&SqlValue::Integer(1)));
        assert_eq!(pool.status().idle, pool.status().size);
    }

    #[test]
    fn test_driver_error_releases_connection() {
        let fixture = PoolFixture::new().unwrap();
        let pool = &fixture.pool;
        assert!(select(pool, "SELECT * FROM missing", &[], None).is_err());
        assert!(execute(pool, "DELETE FROM missing", &[], true).is_err());
        assert_eq!(pool.status().idle, pool.status().size);
    }
}
