//! CSV serialization of fetched rows.

use crate::libs::table::{Row, Table, value_text};
use indexmap::IndexSet;
use serde_json::Value;

/// Placeholders some backends store instead of NULL dates.
pub const ZERO_DATES: [&str; 3] = ["0000-00-00", "0000-00-00 00:00:00", "0000-00-00 00:00:00.000"];

/// Null, empty text or a zero-date placeholder.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || ZERO_DATES.contains(&s.as_str()),
        _ => false,
    }
}

/// Union of row keys in first-appearance order, minus columns blank in
/// every row.
pub fn retained_columns(rows: &[Row]) -> Vec<String> {
    let keys: IndexSet<&str> = rows.iter().flat_map(|row| row.keys()).collect();
    keys.into_iter()
        .filter(|key| rows.iter().any(|row| row.get(key).is_some_and(|v| !is_blank(v))))
        .map(str::to_string)
        .collect()
}

/// Header line plus one line per row. Empty input gives empty output.
pub fn to_csv(rows: &[Row]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let columns = retained_columns(rows);
    let dropped = rows.iter().flat_map(|r| r.keys()).collect::<IndexSet<_>>().len() - columns.len();
    if dropped > 0 {
        tracing::debug!(dropped, "csv export dropped empty columns");
    }

    let mut output = columns.iter().map(|c| quote_field(c)).collect::<Vec<_>>().join(",");
    output.push('\n');

    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| row.get(col).map(|v| quote_field(&value_text(v))).unwrap_or_default())
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }
    output
}

fn quote_field(s: &str) -> String {
    if s.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

impl Table {
    pub fn to_csv(&self) -> String {
        to_csv(self.rows())
    }
}
