//! Storage engine
//!
//! Wraps the embedded SQLite database behind a single connection and an
//! exclusive guard. The guard is authoritative: SQLite itself is opened in a
//! concurrency-tolerant mode, but every public operation serializes through
//! the mutex for the full prepare-bind-step cycle.
//!
//! Rows cross this boundary as untyped `string -> value` maps; the schema
//! descriptors in [`crate::schema`] drive both column iteration and read-side
//! decoding. Storage failures are logged and collapse to neutral returns
//! (`0`, `false`, empty row or list) so call sites don't branch on every
//! operation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::error;

use crate::error::Result;
use crate::schema::{FieldKind, TableDef, TABLES};

mod bills;

/// An untyped row at the ORM boundary.
pub type Row = serde_json::Map<String, Value>;

/// Process-wide database handle.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if missing) the database at `path` and create any
    /// missing tables from the schema registry.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        for table in TABLES {
            conn.execute_batch(&table.create_sql())?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a row, returning the new id or `0` on failure.
    ///
    /// The primary key is never bound; missing fields bind NULL.
    pub fn insert(&self, table: &TableDef, row: &Row) -> i64 {
        let conn = self.lock();
        match insert_row(&conn, table, row) {
            Ok(id) => id,
            Err(e) => {
                error!(table = table.name, "insert failed: {e}");
                0
            }
        }
    }

    /// Update every non-primary-key column of the row identified by `id`.
    pub fn update(&self, table: &TableDef, row: &Row, id: i64) -> bool {
        let assignments: Vec<String> = table
            .data_fields()
            .map(|f| format!("\"{}\" = ?", f.name))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ?",
            table.name,
            assignments.join(", ")
        );
        let mut values: Vec<SqlValue> = table
            .data_fields()
            .map(|f| bind_value(row.get(f.name).unwrap_or(&Value::Null)))
            .collect();
        values.push(SqlValue::Integer(id));

        let conn = self.lock();
        match conn.execute(&sql, params_from_iter(values)) {
            Ok(changed) => changed > 0,
            Err(e) => {
                error!(table = table.name, id, "update failed: {e}");
                false
            }
        }
    }

    /// Delete the row identified by `id`.
    pub fn remove(&self, table: &TableDef, id: i64) -> bool {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = ?", table.name);
        let conn = self.lock();
        match conn.execute(&sql, [id]) {
            Ok(changed) => changed > 0,
            Err(e) => {
                error!(table = table.name, id, "remove failed: {e}");
                false
            }
        }
    }

    /// Fetch a single row by id; empty map when absent.
    pub fn select_by_id(&self, table: &TableDef, id: i64) -> Row {
        let rows = self.select_where(table, "\"id\" = ?", &[Value::from(id)]);
        rows.into_iter().next().unwrap_or_default()
    }

    /// Fetch every row matching `condition` (a SQL fragment with `?`
    /// placeholders bound from `params`). An empty condition selects all.
    pub fn select_where(&self, table: &TableDef, condition: &str, params: &[Value]) -> Vec<Row> {
        let mut sql = format!("SELECT {} FROM \"{}\"", column_list(table), table.name);
        if !condition.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        self.query_rows(table, &sql, params)
    }

    /// Fetch one page of rows. Pages are 1-based; `size <= 0` means no limit;
    /// an empty `order_by` defaults to descending primary key.
    pub fn page(
        &self,
        table: &TableDef,
        page: i64,
        size: i64,
        condition: &str,
        params: &[Value],
        order_by: &str,
    ) -> Vec<Row> {
        let mut sql = format!("SELECT {} FROM \"{}\"", column_list(table), table.name);
        if !condition.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        let pk = table.primary_key().map(|f| f.name).unwrap_or("id");
        if order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY \"{pk}\" DESC"));
        } else {
            sql.push_str(&format!(" ORDER BY {order_by}"));
        }

        let mut params: Vec<Value> = params.to_vec();
        if size > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::from(size));
            params.push(Value::from((page.max(1) - 1) * size));
        }
        self.query_rows(table, &sql, &params)
    }

    /// Run an arbitrary statement. When `readonly` the result rows are
    /// decoded by their actual column types and returned; otherwise the
    /// statement is stepped once and an empty list is returned, with any
    /// failure logged.
    pub fn execute_sql(&self, sql: &str, params: &[Value], readonly: bool) -> Vec<Row> {
        let values: Vec<SqlValue> = params.iter().map(bind_value).collect();
        let conn = self.lock();

        if !readonly {
            if let Err(e) = conn.execute(sql, params_from_iter(values)) {
                error!("statement failed: {e} ({sql})");
            }
            return Vec::new();
        }

        let run = || -> rusqlite::Result<Vec<Row>> {
            let mut stmt = conn.prepare(sql)?;
            let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
            let mut rows = stmt.query(params_from_iter(values))?;
            let mut out = Vec::new();
            while let Some(r) = rows.next()? {
                let mut row = Row::new();
                for (i, name) in names.iter().enumerate() {
                    row.insert(name.clone(), decode_dynamic(r.get_ref(i)?));
                }
                out.push(row);
            }
            Ok(out)
        };
        match run() {
            Ok(rows) => rows,
            Err(e) => {
                error!("query failed: {e} ({sql})");
                Vec::new()
            }
        }
    }

    fn query_rows(&self, table: &TableDef, sql: &str, params: &[Value]) -> Vec<Row> {
        let values: Vec<SqlValue> = params.iter().map(bind_value).collect();
        let conn = self.lock();
        let run = || -> rusqlite::Result<Vec<Row>> {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params_from_iter(values))?;
            let mut out = Vec::new();
            while let Some(r) = rows.next()? {
                let mut row = Row::new();
                for (i, field) in table.fields.iter().enumerate() {
                    row.insert(field.name.to_string(), decode_declared(r, i, field.kind));
                }
                out.push(row);
            }
            Ok(out)
        };
        match run() {
            Ok(rows) => rows,
            Err(e) => {
                error!(table = table.name, "query failed: {e} ({sql})");
                Vec::new()
            }
        }
    }
}

/// Insert on an already-held connection (also used inside transactions).
fn insert_row(conn: &Connection, table: &TableDef, row: &Row) -> rusqlite::Result<i64> {
    let columns: Vec<String> = table
        .data_fields()
        .map(|f| format!("\"{}\"", f.name))
        .collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        placeholders.join(", ")
    );
    let values: Vec<SqlValue> = table
        .data_fields()
        .map(|f| bind_value(row.get(f.name).unwrap_or(&Value::Null)))
        .collect();
    conn.execute(&sql, params_from_iter(values))?;
    Ok(conn.last_insert_rowid())
}

fn column_list(table: &TableDef) -> String {
    table
        .fields
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coerce a JSON value to a SQLite bind value: integer, real, text or null.
/// Booleans bind as 0/1; arrays and objects bind as their JSON text.
fn bind_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Null
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Decode a column by its declared field kind.
fn decode_declared(row: &rusqlite::Row<'_>, idx: usize, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Integer | FieldKind::Long => row
            .get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        FieldKind::Real => row
            .get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        FieldKind::Text => row
            .get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

/// Decode a column by its actual storage class (for ad-hoc statements).
fn decode_dynamic(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests;
