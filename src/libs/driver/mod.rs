//! Backend drivers behind [`Connection`](crate::Connection).
//!
//! MySQL, PostgreSQL and SQLite go through sqlx's `Any` driver; SQL Server
//! goes through tiberius. Both receive SQL whose placeholders are already in
//! the dialect's syntax.

mod any;
mod mssql;

pub use any::AnyBackend;
pub use mssql::MssqlBackend;

use crate::libs::config::ConnectionSettings;
use crate::libs::dialect::Dialect;
use crate::libs::error::Result;
use crate::libs::table::Row;
use async_trait::async_trait;
use serde_json::Value;

/// A live handle to exactly one backend database.
#[async_trait]
pub trait Backend: Send {
    /// Prepare, bind positionally, execute and fetch every row.
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Prepare, bind positionally and execute; returns the affected-row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run `sql` as-is without preparing it (DDL, transaction control).
    async fn execute_direct(&mut self, sql: &str) -> Result<u64>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Open the backend matching `settings.dialect`.
pub async fn connect(settings: &ConnectionSettings) -> Result<Box<dyn Backend>> {
    let dsn = settings.connection_string();
    match settings.dialect {
        Dialect::SqlServer => Ok(Box::new(MssqlBackend::connect(&dsn).await?)),
        Dialect::MySql | Dialect::Postgres | Dialect::Sqlite => {
            Ok(Box::new(AnyBackend::connect(&dsn).await?))
        }
    }
}
