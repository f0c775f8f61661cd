//! Generic data-access seam between the recommendation engine and the store.
//!
//! The engine only ever issues single-table reads with an equality or in-set
//! filter, plus single-row inserts. Joins across users, connections, projects
//! and tags are done in memory by the caller.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error carried as the `source` of a [`SourceError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single record: column name to JSON value.
pub type Row = Map<String, Value>;

/// Tables of the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Connections,
    Projects,
    HaveTags,
    Tags,
}

impl Table {
    /// SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Connections => "connections",
            Table::Projects => "projects",
            Table::HaveTags => "have_tags",
            Table::Tags => "tags",
        }
    }

    /// Columns readable and writable through a [`DataSource`].
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Users => &["auth_id", "username", "created_at"],
            Table::Connections => &["user_id", "friend_id"],
            Table::Projects => &["id", "user_id", "title", "created_at"],
            Table::HaveTags => &["project_id", "tag_id"],
            Table::Tags => &["id", "name"],
        }
    }

    /// Returns true if `column` belongs to this table.
    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row filter. Only equality and in-set membership are supported.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every row of the table.
    All,
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values...)`; an empty set matches nothing.
    In { column: String, values: Vec<Value> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn one_of<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The column this filter constrains, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Filter::All => None,
            Filter::Eq { column, .. } | Filter::In { column, .. } => Some(column),
        }
    }

    /// Evaluates the filter against an in-memory row.
    ///
    /// A missing column is treated as `null`.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
            Filter::In { column, values } => {
                let cell = row.get(column).unwrap_or(&Value::Null);
                values.iter().any(|v| v == cell)
            }
        }
    }
}

/// Errors raised by a [`DataSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// A read from the store failed.
    #[error("failed to fetch rows from {table}")]
    Fetch {
        table: Table,
        #[source]
        source: BoxError,
    },

    /// An insert into the store failed.
    #[error("failed to insert row into {table}")]
    Write {
        table: Table,
        #[source]
        source: BoxError,
    },

    /// The insert was rejected by a uniqueness constraint.
    #[error("row already exists in {table}")]
    Duplicate { table: Table },

    /// A filter or record referenced a column the table does not have.
    #[error("unknown column `{column}` on {table}")]
    UnknownColumn { table: Table, column: String },

    /// A row value did not have the expected shape.
    #[error("malformed value in {table}.{column}")]
    Malformed { table: Table, column: String },
}

/// Query/insert collaborator backing the recommendation engine.
pub trait DataSource {
    /// Returns every row of `table` that matches `filter`, in store order.
    fn query_rows(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, SourceError>;

    /// Inserts a single record into `table`.
    fn insert_row(&self, table: Table, record: Row) -> Result<(), SourceError>;
}

impl<S: DataSource + ?Sized> DataSource for &S {
    fn query_rows(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, SourceError> {
        (**self).query_rows(table, filter)
    }

    fn insert_row(&self, table: Table, record: Row) -> Result<(), SourceError> {
        (**self).insert_row(table, record)
    }
}

/// Reads a text column. `null` and a missing column yield `None`.
pub fn row_text(row: &Row, table: Table, column: &str) -> Result<Option<String>, SourceError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SourceError::Malformed {
            table,
            column: column.to_string(),
        }),
    }
}

/// Reads a required integer column.
pub fn row_i64(row: &Row, table: Table, column: &str) -> Result<i64, SourceError> {
    row.get(column)
        .and_then(Value::as_i64)
        .ok_or_else(|| SourceError::Malformed {
            table,
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_filter_matches_exact_value() {
        let filter = Filter::eq("user_id", "u1");

        assert!(filter.matches(&row(json!({"user_id": "u1", "friend_id": "u2"}))));
        assert!(!filter.matches(&row(json!({"user_id": "u2", "friend_id": "u1"}))));
    }

    #[test]
    fn in_filter_matches_any_member() {
        let filter = Filter::one_of("project_id", [1, 3]);

        assert!(filter.matches(&row(json!({"project_id": 3, "tag_id": 9}))));
        assert!(!filter.matches(&row(json!({"project_id": 2, "tag_id": 9}))));
    }

    #[test]
    fn empty_in_filter_matches_nothing() {
        let filter = Filter::one_of::<i64>("project_id", []);

        assert!(!filter.matches(&row(json!({"project_id": 1}))));
    }

    #[test]
    fn missing_column_is_treated_as_null() {
        let null_id = Filter::eq("auth_id", Value::Null);
        assert!(null_id.matches(&row(json!({"username": "x"}))));
        assert!(Filter::All.matches(&Row::new()));
    }

    #[test]
    fn tables_expose_their_columns() {
        assert_eq!(Table::HaveTags.name(), "have_tags");
        assert!(Table::Connections.has_column("friend_id"));
        assert!(!Table::Connections.has_column("tag_id"));
    }

    #[test]
    fn row_readers_reject_wrong_shapes() {
        let r = row(json!({"auth_id": 5, "id": "x", "username": null}));

        assert!(matches!(
            row_text(&r, Table::Users, "auth_id"),
            Err(SourceError::Malformed { .. })
        ));
        assert!(row_i64(&r, Table::Projects, "id").is_err());
        assert_eq!(row_text(&r, Table::Users, "username").unwrap(), None);
    }
}
