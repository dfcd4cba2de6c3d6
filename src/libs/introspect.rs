//! Schema introspection over a [`Connection`].
//!
//! SQL text comes from one lookup keyed by (operation, dialect). A pair
//! without an entry yields [`DataError::Unsupported`] before anything is
//! sent to the database.
//!
//! Templates containing `{table}` get the validated, quoted table name
//! spliced in (MySQL `SHOW`/`DESCRIBE` statements take no parameters);
//! every other template binds the table name as its only parameter.

use crate::libs::connection::Connection;
use crate::libs::dialect::Dialect;
use crate::libs::error::{DataError, Result};
use crate::libs::ident::validate_identifier;
use crate::libs::table::{Row, value_text};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListTables,
    TableInfo,
    TableIndexes,
    TableDdl,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::ListTables,
        Operation::TableInfo,
        Operation::TableIndexes,
        Operation::TableDdl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListTables => "list_tables",
            Operation::TableInfo => "table_info",
            Operation::TableIndexes => "table_indexes",
            Operation::TableDdl => "table_ddl",
        }
    }
}

/// SQL template for `op` on `dialect`, if the dialect supports it.
pub fn template(op: Operation, dialect: Dialect) -> Option<&'static str> {
    use Dialect::*;
    use Operation::*;

    match (op, dialect) {
        (ListTables, MySql) => Some("SHOW FULL TABLES"),
        (ListTables, SqlServer) => Some("SELECT DISTINCT TABLE_NAME FROM information_schema.tables"),
        (ListTables, Postgres) => Some(
            "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = current_schema()",
        ),
        (ListTables, Sqlite) => Some(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'",
        ),

        (TableInfo, MySql) => Some("DESCRIBE {table}"),
        (TableInfo, SqlServer) => Some(
            "SELECT * FROM information_schema.columns WHERE TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        ),
        (TableInfo, Postgres) => Some(
            "SELECT column_name::text AS column_name, data_type::text AS data_type, is_nullable::text AS is_nullable, column_default::text AS column_default FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position",
        ),
        (TableInfo, Sqlite) => Some("SELECT * FROM pragma_table_info(?)"),

        (TableIndexes, MySql) => Some("SHOW INDEX FROM {table}"),
        (TableIndexes, SqlServer) => Some(
            "SELECT * FROM sys.indexes WHERE object_id = (SELECT object_id FROM sys.objects WHERE name = ?)",
        ),
        (TableIndexes, Postgres) => Some(
            "SELECT indexname::text AS indexname, indexdef FROM pg_indexes WHERE tablename = ?",
        ),
        (TableIndexes, Sqlite) => Some("SELECT * FROM pragma_index_list(?)"),

        (TableDdl, MySql) => Some("SHOW CREATE TABLE {table}"),
        (TableDdl, Sqlite) => Some("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?"),
        // SQL Server and PostgreSQL only expose DDL through stored procedures
        // or client tools.
        (TableDdl, SqlServer | Postgres) => None,
    }
}

/// Clause appended to the table listing to hide views.
pub fn base_table_filter(dialect: Dialect) -> Option<&'static str> {
    match dialect {
        Dialect::MySql => Some(" WHERE Table_Type = 'BASE TABLE'"),
        Dialect::SqlServer => Some(" WHERE TABLE_TYPE = 'BASE TABLE'"),
        Dialect::Postgres => Some(" AND table_type = 'BASE TABLE'"),
        Dialect::Sqlite => Some(" AND type = 'table'"),
    }
}

/// Resolve `op` into executable SQL plus parameters, without running it.
pub fn render(op: Operation, dialect: Dialect, table: Option<&str>) -> Result<(String, Vec<Value>)> {
    let sql = template(op, dialect).ok_or(DataError::Unsupported {
        operation: op.name(),
        dialect,
    })?;

    let Some(table) = table else {
        return Ok((sql.to_string(), Vec::new()));
    };
    let table = validate_identifier(table)?;

    if sql.contains("{table}") {
        Ok((sql.replace("{table}", &dialect.quote_ident(table)), Vec::new()))
    } else {
        Ok((sql.to_string(), vec![Value::from(table)]))
    }
}

/// Borrowed view of a connection that answers schema questions.
pub struct Introspector<'c> {
    conn: &'c mut Connection,
}

impl<'c> Introspector<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    async fn run(&mut self, op: Operation, table: Option<&str>) -> Result<Vec<Row>> {
        let (sql, params) = render(op, self.conn.dialect(), table)?;
        tracing::debug!(operation = op.name(), dialect = %self.conn.dialect(), "introspect");
        self.conn.select(&sql, &params).await
    }

    pub async fn list_tables(&mut self, include_views: bool) -> Result<Vec<String>> {
        let dialect = self.conn.dialect();
        let (mut sql, _) = render(Operation::ListTables, dialect, None)?;
        if !include_views {
            if let Some(filter) = base_table_filter(dialect) {
                sql.push_str(filter);
            }
        }
        let rows = self.conn.select(&sql, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.iter().next().map(|(_, v)| value_text(v)))
            .collect())
    }

    /// One descriptor row per column.
    pub async fn table_info(&mut self, table: &str) -> Result<Vec<Row>> {
        self.run(Operation::TableInfo, Some(table)).await
    }

    pub async fn table_indexes(&mut self, table: &str) -> Result<Vec<Row>> {
        self.run(Operation::TableIndexes, Some(table)).await
    }

    /// `CREATE TABLE` statement for `table`.
    pub async fn table_ddl(&mut self, table: &str) -> Result<String> {
        let rows = self.run(Operation::TableDdl, Some(table)).await?;
        rows.first()
            .and_then(|row| row.iter().last().map(|(_, v)| value_text(v)))
            .ok_or_else(|| DataError::NotFound(format!("table '{}'", table)))
    }
}
