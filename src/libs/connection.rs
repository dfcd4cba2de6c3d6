use crate::libs::config::ConnectionSettings;
use crate::libs::dialect::Dialect;
use crate::libs::driver::{self, Backend};
use crate::libs::error::{DataError, Result};
use crate::libs::introspect::Introspector;
use crate::libs::memo::RequestCache;
use crate::libs::table::Row;
use serde_json::Value;

/// One request-scoped connection to a single backend database.
///
/// Callers always write `?` placeholders; they are rewritten for the
/// dialect before the statement reaches the driver. Only values are bound.
/// Table and column names must be validated before they are put into the
/// SQL text.
pub struct Connection {
    dialect: Dialect,
    backend: Box<dyn Backend>,
    in_transaction: bool,
}

impl Connection {
    pub async fn open(settings: &ConnectionSettings) -> Result<Self> {
        tracing::info!(
            dialect = %settings.dialect,
            dsn = %settings.redacted(),
            "Opening database connection"
        );
        let backend = driver::connect(settings).await?;
        Ok(Self::with_backend(settings.dialect, backend))
    }

    /// Open a connection or terminate the process with the driver message.
    pub async fn open_or_exit(settings: &ConnectionSettings) -> Self {
        match Self::open(settings).await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::error!(error = %err, dsn = %settings.redacted(), "database connection failed");
                eprintln!("{}", err);
                std::process::exit(1);
            }
        }
    }

    /// Wrap an already-open backend.
    pub fn with_backend(dialect: Dialect, backend: Box<dyn Backend>) -> Self {
        Self {
            dialect,
            backend,
            in_transaction: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    // -------- Statements --------

    /// Prepare, bind positionally and execute. Returns the affected-row count.
    pub async fn execute(&mut self, query: &str, params: &[Value]) -> Result<u64> {
        let sql = self.dialect.normalize_placeholders(query);
        tracing::debug!(sql = %sql, params = params.len(), "execute");
        self.backend.execute(&sql, params).await
    }

    /// Run `query` without preparing it. Used for DDL and transaction
    /// control, where identifiers cannot be bound.
    pub async fn execute_direct(&mut self, query: &str) -> Result<u64> {
        tracing::debug!(sql = %query, "execute direct");
        self.backend.execute_direct(query).await
    }

    pub async fn select(&mut self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        let sql = self.dialect.normalize_placeholders(query);
        tracing::debug!(sql = %sql, params = params.len(), "select");
        let rows = self.backend.fetch(&sql, params).await?;
        tracing::trace!(rows = rows.len(), "select fetched");
        Ok(rows)
    }

    /// `select`, memoized in the caller's per-request cache.
    pub async fn select_cached(
        &mut self,
        cache: &mut RequestCache,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        if let Some(rows) = cache.get(query, params) {
            tracing::trace!(sql = %query, "select served from request cache");
            return Ok(rows.to_vec());
        }
        let rows = self.select(query, params).await?;
        cache.insert(query, params, rows.clone());
        Ok(rows)
    }

    pub async fn update(&mut self, query: &str, params: &[Value]) -> Result<u64> {
        let affected = self.execute(query, params).await?;
        tracing::debug!(rows_affected = affected, "update");
        Ok(affected)
    }

    // -------- Transactions --------

    pub async fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DataError::validation("a transaction is already open"));
        }
        self.execute_direct(self.dialect.begin_sql()).await?;
        self.in_transaction = true;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DataError::validation("no open transaction to commit"));
        }
        self.execute_direct(self.dialect.commit_sql()).await?;
        self.in_transaction = false;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DataError::validation("no open transaction to roll back"));
        }
        // The backend state is unknown after a failed rollback; either way
        // this handle no longer tracks an open transaction.
        self.in_transaction = false;
        self.execute_direct(self.dialect.rollback_sql()).await?;
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    // -------- Schema --------

    pub fn introspect(&mut self) -> Introspector<'_> {
        Introspector::new(self)
    }

    pub async fn close(self) -> Result<()> {
        if self.in_transaction {
            tracing::warn!("closing connection with an open transaction");
        }
        self.backend.close().await
    }
}
