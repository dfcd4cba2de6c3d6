use super::Backend;
use crate::libs::error::{DataError, Result};
use crate::libs::table::Row;
use async_trait::async_trait;
use serde_json::{Number, Value};
use tiberius::{Client, ColumnData, Config, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// tiberius client for SQL Server, opened from an ADO connection string.
pub struct MssqlBackend {
    client: Client<Compat<TcpStream>>,
}

impl MssqlBackend {
    pub async fn connect(ado: &str) -> Result<Self> {
        let config =
            Config::from_ado_string(ado).map_err(|e| DataError::Connection(e.to_string()))?;
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| DataError::Connection(format!("TCP connect failed: {}", e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| DataError::Connection(e.to_string()))?;
        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| DataError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

fn build_query<'a>(sql: &'a str, params: &[Value]) -> Query<'a> {
    let mut query = Query::new(sql);
    for v in params {
        match v {
            Value::String(s) => query.bind(s.clone()),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => query.bind(i),
                (None, Some(f)) => query.bind(f),
                _ => query.bind(n.to_string()),
            },
            Value::Bool(b) => query.bind(*b),
            Value::Null => query.bind(None::<String>),
            other => query.bind(other.to_string()),
        }
    }
    query
}

fn column_value(data: ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v
            .and_then(|f| Number::from_f64(f as f64))
            .map(Value::Number),
        ColumnData::F64(v) => v.and_then(Number::from_f64).map(Value::Number),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Numeric(v) => v.map(|n| Value::String(n.to_string())),
        _ => None,
    };
    value.unwrap_or(Value::Null)
}

fn decode_row(r: tiberius::Row) -> Row {
    let names: Vec<String> = r.columns().iter().map(|c| c.name().to_string()).collect();
    let mut row = Row::new();
    for (name, data) in names.into_iter().zip(r) {
        row.insert(name, column_value(data));
    }
    row
}

#[async_trait]
impl Backend for MssqlBackend {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let stream = build_query(sql, params)
            .query(&mut self.client)
            .await
            .map_err(|e| DataError::query(e, sql))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(rows.into_iter().map(decode_row).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let result = build_query(sql, params)
            .execute(&mut self.client)
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(result.total())
    }

    async fn execute_direct(&mut self, sql: &str) -> Result<u64> {
        // simple_query keeps BEGIN/COMMIT out of sp_executesql, which would
        // otherwise trip the transaction-count check.
        self.client
            .simple_query(sql)
            .await
            .map_err(|e| DataError::query(e, sql))?
            .into_results()
            .await
            .map_err(|e| DataError::query(e, sql))?;
        Ok(0)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| DataError::Connection(e.to_string()))
    }
}
