use crate::libs::connection::Connection;
use crate::libs::dialect::Dialect;
use crate::libs::error::{DataError, Result};
use crate::libs::ident::{validate_identifier, validate_qualified};
use crate::libs::schema::ColumnSet;
use crate::libs::table::Row;
use serde::de::DeserializeOwned;
use serde_json::Value;

const OPERATORS: [&str; 8] = ["=", "<>", "!=", "<", "<=", ">", ">=", "LIKE"];

/// Fluent SELECT builder emitting `?` placeholders.
///
/// Every table and column name goes through identifier validation; the
/// first bad one is kept and reported by [`SelectBuilder::build`].
pub struct SelectBuilder {
    table: String,
    selects: Vec<String>,
    wheres: Vec<String>,
    joins: Vec<String>,
    groups: Vec<String>,
    order_clause: Vec<String>,
    params: Vec<Value>,
    error: Option<String>,
}

impl SelectBuilder {
    pub fn new(table: &str) -> Self {
        let mut builder = Self {
            table: table.to_string(),
            selects: vec!["*".to_string()],
            wheres: vec![],
            joins: vec![],
            groups: vec![],
            order_clause: vec![],
            params: Vec::new(),
            error: None,
        };
        builder.check(validate_identifier(table));
        builder
    }

    fn check<T>(&mut self, result: Result<T>) {
        if let Err(err) = result {
            let message = match err {
                DataError::Validation(message) => message,
                other => other.to_string(),
            };
            self.error.get_or_insert(message);
        }
    }

    /// Select list taken verbatim. Entries usually come from
    /// [`ColumnSet::list_columns`], whose names are already validated.
    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.selects = columns;
        self
    }

    /// Select every column of `columns`, qualified by its owning table.
    /// Date columns are read back as text in `dialect`'s syntax.
    pub fn columns(self, columns: &ColumnSet, dialect: Dialect) -> Self {
        self.select(columns.select_list(dialect))
    }

    pub fn r#where(mut self, column: &str, op: &str, value: impl Into<Value>) -> Self {
        self.check(validate_qualified(column));
        let op = op.trim().to_uppercase();
        if !OPERATORS.contains(&op.as_str()) {
            self.check::<()>(Err(DataError::validation(format!("unsupported operator '{}'", op))));
        }
        self.wheres.push(format!("{} {} ?", column, op));
        self.params.push(value.into());
        self
    }

    /// `column LIKE %pattern%`.
    pub fn like(self, column: &str, pattern: &str) -> Self {
        let pattern = format!("%{}%", pattern);
        self.r#where(column, "LIKE", pattern)
    }

    pub fn join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join("JOIN", table, left, right)
    }

    pub fn left_join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join("LEFT JOIN", table, left, right)
    }

    fn push_join(mut self, kind: &str, table: &str, left: &str, right: &str) -> Self {
        self.check(validate_identifier(table));
        self.check(validate_qualified(left));
        self.check(validate_qualified(right));
        self.joins.push(format!("{} {} ON {} = {}", kind, table, left, right));
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        for column in columns {
            self.check(validate_qualified(column));
            self.groups.push(column.to_string());
        }
        self
    }

    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.check(validate_qualified(column));
        let direction = direction.trim().to_uppercase();
        if direction != "ASC" && direction != "DESC" {
            self.check::<()>(Err(DataError::validation(format!(
                "invalid sort direction '{}'",
                direction
            ))));
        }
        self.order_clause.push(format!("{} {}", column, direction));
        self
    }

    /// SQL text and positional parameters.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        if let Some(message) = &self.error {
            return Err(DataError::validation(message.clone()));
        }

        let mut sql = format!("SELECT {} FROM {}", self.selects.join(", "), self.table);
        if !self.joins.is_empty() {
            sql += &format!(" {}", self.joins.join(" "));
        }
        if !self.wheres.is_empty() {
            sql += &format!(" WHERE {}", self.wheres.join(" AND "));
        }
        if !self.groups.is_empty() {
            sql += &format!(" GROUP BY {}", self.groups.join(", "));
        }
        if !self.order_clause.is_empty() {
            sql += &format!(" ORDER BY {}", self.order_clause.join(", "));
        }
        Ok((sql, self.params.clone()))
    }

    pub async fn fetch_all(&self, conn: &mut Connection) -> Result<Vec<Row>> {
        let (sql, params) = self.build()?;
        conn.select(&sql, &params).await
    }

    /// Fetch and deserialize each row into `T`.
    pub async fn fetch_as<T>(&self, conn: &mut Connection) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let (sql, _) = self.build()?;
        self.fetch_all(conn)
            .await?
            .into_iter()
            .map(|row| {
                serde_json::from_value::<T>(Value::Object(row.into_map()))
                    .map_err(|e| DataError::query(e, sql.as_str()))
            })
            .collect()
    }
}
