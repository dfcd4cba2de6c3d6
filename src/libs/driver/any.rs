use super::Backend;
use crate::libs::error::{DataError, Result};
use crate::libs::table::Row;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Column, Connection as _, Executor, Row as _};

/// sqlx `Any` connection (MySQL, PostgreSQL, SQLite).
pub struct AnyBackend {
    conn: AnyConnection,
}

impl AnyBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(url)
            .await
            .map_err(|e| DataError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for v in params {
        query = match v {
            Value::String(s) => query.bind(s.clone()),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => query.bind(i),
                (None, Some(f)) => query.bind(f),
                _ => query.bind(n.to_string()),
            },
            Value::Bool(b) => query.bind(*b),
            Value::Null => query.bind(None::<String>),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Decode every column through the integer → float → bool → string chain.
fn decode_row(r: &AnyRow) -> Row {
    let mut row = Row::new();
    for col in r.columns() {
        let col_name = col.name();
        let value = match r.try_get::<Option<i64>, _>(col_name) {
            Ok(Some(v)) => Value::from(v),
            Ok(None) => Value::Null,
            Err(_) => match r.try_get::<Option<f64>, _>(col_name) {
                Ok(Some(v)) => Value::from(v),
                Ok(None) => Value::Null,
                Err(_) => match r.try_get::<Option<bool>, _>(col_name) {
                    Ok(Some(v)) => Value::from(v),
                    Ok(None) => Value::Null,
                    Err(_) => match r.try_get::<Option<String>, _>(col_name) {
                        Ok(Some(v)) => Value::from(v),
                        Ok(None) => Value::Null,
                        Err(_) => Value::Null,
                    },
                },
            },
        };
        row.insert(col_name, value);
    }
    row
}

#[async_trait]
impl Backend for AnyBackend {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let query = bind_values(sqlx::query(sql), params);
        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let query = bind_values(sqlx::query(sql), params);
        let result = query
            .execute(&mut self.conn)
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(result.rows_affected())
    }

    async fn execute_direct(&mut self, sql: &str) -> Result<u64> {
        let result = (&mut self.conn)
            .execute(sql)
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(result.rows_affected())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DataError::Connection(e.to_string()))
    }
}
