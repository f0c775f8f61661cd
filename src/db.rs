mod schema;


use std::path::Path;

use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, ffi, params_from_iter};
use serde_json::{Number, Value};

use crate::source::{DataSource, Filter, Row, SourceError, Table};
use schema::INITIAL_SCHEMA;

/// Database wrapper providing connection management and schema initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Uses IF NOT EXISTS for idempotent execution.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl DataSource for Database {
    fn query_rows(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, SourceError> {
        let columns = table.columns();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table.name());
        let mut params: Vec<SqlValue> = Vec::new();

        match filter {
            Filter::All => {}
            Filter::Eq { column, value } => {
                ensure_column(table, column)?;
                // IS keeps NULL comparisons consistent with Filter::matches
                sql.push_str(&format!(" WHERE {column} IS ?1"));
                params.push(to_sql(value));
            }
            Filter::In { column, values } => {
                ensure_column(table, column)?;
                if values.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders: Vec<String> =
                    (1..=values.len()).map(|i| format!("?{i}")).collect();
                sql.push_str(&format!(" WHERE {column} IN ({})", placeholders.join(", ")));
                params.extend(values.iter().map(to_sql));
            }
        }
        sql.push_str(" ORDER BY rowid");

        let fetch_err = |e: rusqlite::Error| SourceError::Fetch {
            table,
            source: e.into(),
        };

        let mut stmt = self.conn.prepare(&sql).map_err(fetch_err)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let mut record = Row::new();
                for (i, column) in columns.iter().enumerate() {
                    let value: SqlValue = row.get(i)?;
                    record.insert((*column).to_string(), from_sql(value));
                }
                Ok(record)
            })
            .map_err(fetch_err)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(fetch_err)?);
        }
        Ok(result)
    }

    fn insert_row(&self, table: Table, record: Row) -> Result<(), SourceError> {
        if record.is_empty() {
            return Err(SourceError::Write {
                table,
                source: "record has no columns".into(),
            });
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (column, value) in &record {
            ensure_column(table, column)?;
            columns.push(column.as_str());
            params.push(to_sql(value));
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders.join(", ")
        );

        match self.conn.execute(&sql, params_from_iter(params)) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && (err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                Err(SourceError::Duplicate { table })
            }
            Err(e) => Err(SourceError::Write {
                table,
                source: e.into(),
            }),
        }
    }
}

fn ensure_column(table: Table, column: &str) -> Result<(), SourceError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(SourceError::UnknownColumn {
            table,
            column: column.to_string(),
        })
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(bytes) => Value::from(bytes),
    }
}
