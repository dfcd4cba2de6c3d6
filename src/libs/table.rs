use crate::libs::error::{DataError, Result};
use crate::libs::schema::{Column, ColumnSet};
use serde_json::{Map, Value};

/// One fetched record: field values keyed by column name, in SELECT order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Field rendered as text (`""` when absent or null).
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(value_text).unwrap_or_default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for Row {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Text form of a value as it appears in forms, comparisons and CSV.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A column set plus the rows fetched for it during one request.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: ColumnSet,
    rows: Vec<Row>,
    primary: Option<String>,
}

impl Table {
    pub fn define(columns: ColumnSet) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            primary: None,
        }
    }

    /// Designate the identifier column: hidden in forms, used as the
    /// `WHERE` column for updates.
    pub fn with_primary_column(mut self, name: &str) -> Result<Self> {
        if !self.columns.contains(name) {
            return Err(DataError::UnknownColumn(name.to_string()));
        }
        self.primary = Some(name.to_string());
        Ok(self)
    }

    /// Load fetched rows, replacing existing ones when `overwrite` is set.
    ///
    /// A failed fetch leaves the table untouched and hands the error back.
    pub fn load(&mut self, fetched: Result<Vec<Row>>, overwrite: bool) -> Result<usize> {
        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "table load skipped after failed fetch");
                return Err(err);
            }
        };
        if overwrite {
            self.rows.clear();
        }
        let count = rows.len();
        self.rows.extend(rows);
        Ok(count)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn primary_column(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn list_columns(&self, qualified: bool) -> Vec<String> {
        self.columns.list_columns(qualified)
    }
}
