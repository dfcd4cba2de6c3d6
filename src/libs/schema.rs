// schema.rs
use crate::libs::dialect::Dialect;
use crate::libs::error::{DataError, Result};
use crate::libs::ident::validate_identifier;
use indexmap::IndexMap;
use serde_json::Value;
use std::str::FromStr;

/// Semantic type of a column, which drives form rendering and value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Email,
    Int,
    Json,
    Phone,
    String,
    Date,
}

impl FromStr for ColumnKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Ok(ColumnKind::Bool),
            "email" => Ok(ColumnKind::Email),
            "int" | "integer" => Ok(ColumnKind::Int),
            "json" => Ok(ColumnKind::Json),
            "phone" => Ok(ColumnKind::Phone),
            "string" => Ok(ColumnKind::String),
            "date" => Ok(ColumnKind::Date),
            other => Err(DataError::validation(format!("unknown column type '{}'", other))),
        }
    }
}

impl ColumnKind {
    /// Whether two rendered values mean the same thing for this kind.
    ///
    /// Bool and int columns compare their parsed forms when both sides
    /// parse (`true`, `1` and `TRUE` are equal); anything else compares
    /// as text.
    pub fn same_value(&self, a: &str, b: &str) -> bool {
        match self {
            ColumnKind::Bool => match (coerce_bool(a), coerce_bool(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            ColumnKind::Int => match (coerce_int(a), coerce_int(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            _ => a == b,
        }
    }

    /// Value to bind when writing `value` into a column of this kind.
    ///
    /// Text holding a bool or integer is bound as that type and blank text
    /// as NULL. Other kinds, and text that does not parse, bind unchanged.
    pub fn bind_value(&self, value: &Value) -> Value {
        let Value::String(text) = value else {
            return value.clone();
        };
        let parsed = match self {
            ColumnKind::Bool if text.trim().is_empty() => Some(Value::Null),
            ColumnKind::Int if text.trim().is_empty() => Some(Value::Null),
            ColumnKind::Bool => coerce_bool(text).map(Value::Bool),
            ColumnKind::Int => coerce_int(text).map(Value::from),
            _ => None,
        };
        parsed.unwrap_or_else(|| value.clone())
    }
}

pub(crate) fn coerce_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

pub(crate) fn coerce_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

/// Form control requested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Number,
    Select,
}

/// Option list for a selection control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    /// (label, value) pairs in display order
    pub possible: Vec<(String, String)>,
    /// Explicitly selected values; overrides matching against the row value
    pub selected: Option<Vec<String>>,
    pub multiple: bool,
    pub allow_new: bool,
}

impl SelectOptions {
    pub fn new<L, V>(possible: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        Self {
            possible: possible
                .into_iter()
                .map(|(label, value)| (label.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn selected<V: Into<String>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.selected = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn allow_new(mut self) -> Self {
        self.allow_new = true;
        self
    }
}

/// Optional rendering hints attached to a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderHints {
    pub label_styles: Vec<(String, String)>,
    pub input_styles: Vec<(String, String)>,
    pub input: Option<InputKind>,
    pub options: Option<SelectOptions>,
}

/// One named field of a table view. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    table: String,
    hints: RenderHints,
    special: Option<String>,
}

impl Column {
    /// Column `name` of type `kind`, owned by physical table `table`.
    pub fn new(name: &str, kind: ColumnKind, table: &str) -> Result<Self> {
        Ok(Self {
            name: validate_identifier(name)?.to_string(),
            kind,
            table: validate_identifier(table)?.to_string(),
            hints: RenderHints::default(),
            special: None,
        })
    }

    pub fn with_input(mut self, input: InputKind) -> Self {
        self.hints.input = Some(input);
        self
    }

    /// Attach an option list; the column renders as a selection control.
    pub fn with_options(mut self, options: SelectOptions) -> Self {
        self.hints.input = Some(InputKind::Select);
        self.hints.options = Some(options);
        self
    }

    pub fn with_label_style(mut self, property: &str, value: &str) -> Self {
        self.hints.label_styles.push((property.to_string(), value.to_string()));
        self
    }

    pub fn with_input_style(mut self, property: &str, value: &str) -> Self {
        self.hints.input_styles.push((property.to_string(), value.to_string()));
        self
    }

    /// Computed column: `expression` is selected `AS` the column name and
    /// the column becomes read-only.
    pub fn with_special(mut self, expression: &str) -> Self {
        self.special = Some(expression.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn hints(&self) -> &RenderHints {
        &self.hints
    }

    pub fn special(&self) -> Option<&str> {
        self.special.as_deref()
    }

    /// SELECT-list entry for this column.
    pub fn select_expr(&self) -> String {
        match &self.special {
            Some(expr) => format!("{} AS {}", expr, self.name),
            None => format!("{}.{}", self.table, self.name),
        }
    }

    /// SELECT-list entry for `dialect`. Date columns come back as text so
    /// every driver can decode them, zero dates included.
    pub fn select_expr_for(&self, dialect: Dialect) -> String {
        match (&self.special, self.kind) {
            (None, ColumnKind::Date) => {
                let qualified = format!("{}.{}", self.table, self.name);
                format!("{} AS {}", dialect.text_cast(&qualified), self.name)
            }
            _ => self.select_expr(),
        }
    }
}

/// Insertion-ordered, name-unique set of columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet {
    columns: IndexMap<String, Column>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `columns`, rejecting duplicate names.
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        let mut set = Self::new();
        for column in columns {
            set.insert(column)?;
        }
        Ok(set)
    }

    /// Register a column. A name that is already present is an error and the
    /// earlier definition is kept.
    pub fn insert(&mut self, column: Column) -> Result<()> {
        if self.columns.contains_key(column.name()) {
            tracing::warn!(column = column.name(), "duplicate column definition rejected");
            return Err(DataError::DuplicateColumn(column.name().to_string()));
        }
        self.columns.insert(column.name().to_string(), column);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names, or qualified SELECT-list entries when `qualified`.
    pub fn list_columns(&self, qualified: bool) -> Vec<String> {
        self.iter()
            .map(|c| {
                if qualified {
                    c.select_expr()
                } else {
                    c.name().to_string()
                }
            })
            .collect()
    }

    /// Qualified SELECT-list entries for `dialect`.
    pub fn select_list(&self, dialect: Dialect) -> Vec<String> {
        self.iter().map(|c| c.select_expr_for(dialect)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, table: &str) -> Column {
        Column::new(name, ColumnKind::String, table).unwrap()
    }

    #[test]
    fn keeps_insertion_order() {
        let set = ColumnSet::from_columns([
            col("Unique_LoaderID", "Rave_People"),
            col("FirstName", "People_Lists"),
            col("Last_Name", "People_Lists"),
        ])
        .unwrap();
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            ["Unique_LoaderID", "FirstName", "Last_Name"]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut set = ColumnSet::new();
        set.insert(col("email_1", "People_Lists")).unwrap();
        let err = set.insert(col("email_1", "Rave_People")).unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn(name) if name == "email_1"));
        assert_eq!(set.get("email_1").unwrap().table(), "People_Lists");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn lookup_of_missing_column_is_none() {
        let set = ColumnSet::from_columns([col("FirstName", "People_Lists")]).unwrap();
        assert!(set.get("nickname").is_none());
        assert!(!set.contains("nickname"));
    }

    #[test]
    fn qualified_listing_uses_table_or_special() {
        let set = ColumnSet::from_columns([
            col("FirstName", "People_Lists"),
            col("ListIDs", "People_Lists").with_special("GROUP_CONCAT(People_Lists.ListID)"),
        ])
        .unwrap();
        assert_eq!(set.list_columns(false), ["FirstName", "ListIDs"]);
        assert_eq!(
            set.list_columns(true),
            ["People_Lists.FirstName", "GROUP_CONCAT(People_Lists.ListID) AS ListIDs"]
        );
    }

    #[test]
    fn invalid_names_fail_construction() {
        assert!(Column::new("first name", ColumnKind::String, "People_Lists").is_err());
        assert!(Column::new("FirstName", ColumnKind::String, "People_Lists;--").is_err());
    }

    #[test]
    fn options_imply_select_input() {
        let column = col("suspended", "People_Lists")
            .with_options(SelectOptions::new([("No", "FALSE"), ("Yes", "TRUE")]));
        assert_eq!(column.hints().input, Some(InputKind::Select));
        assert_eq!(column.hints().options.as_ref().unwrap().possible.len(), 2);
    }

    #[test]
    fn date_columns_are_cast_to_text() {
        let set = ColumnSet::from_columns([
            col("FirstName", "People_Lists"),
            Column::new("updated", ColumnKind::Date, "Rave_People").unwrap(),
        ])
        .unwrap();
        assert_eq!(
            set.select_list(Dialect::MySql),
            ["People_Lists.FirstName", "CAST(Rave_People.updated AS CHAR) AS updated"]
        );
        assert_eq!(
            set.select_list(Dialect::Postgres)[1],
            "CAST(Rave_People.updated AS TEXT) AS updated"
        );
        assert_eq!(
            set.select_list(Dialect::SqlServer)[1],
            "CONVERT(NVARCHAR(40), Rave_People.updated, 121) AS updated"
        );
    }

    #[test]
    fn bool_and_int_values_compare_by_meaning() {
        assert!(ColumnKind::Bool.same_value("1", "TRUE"));
        assert!(ColumnKind::Bool.same_value("off", "FALSE"));
        assert!(!ColumnKind::Bool.same_value("1", "FALSE"));
        assert!(ColumnKind::Int.same_value("4.0", "4"));
        assert!(!ColumnKind::Int.same_value("4", "5"));
        assert!(!ColumnKind::Bool.same_value("maybe", "perhaps"));
        assert!(!ColumnKind::String.same_value("ON", "on"));
    }

    #[test]
    fn bind_values_follow_column_kind() {
        assert_eq!(ColumnKind::Bool.bind_value(&Value::from("TRUE")), Value::Bool(true));
        assert_eq!(ColumnKind::Int.bind_value(&Value::from("4")), Value::from(4));
        assert_eq!(ColumnKind::Int.bind_value(&Value::from("")), Value::Null);
        assert_eq!(ColumnKind::String.bind_value(&Value::from("TRUE")), Value::from("TRUE"));
        assert_eq!(ColumnKind::Bool.bind_value(&Value::from("UNSET")), Value::from("UNSET"));
    }

    #[test]
    fn parses_kinds() {
        assert_eq!("bool".parse::<ColumnKind>().unwrap(), ColumnKind::Bool);
        assert_eq!("INT".parse::<ColumnKind>().unwrap(), ColumnKind::Int);
        assert_eq!("phone".parse::<ColumnKind>().unwrap(), ColumnKind::Phone);
        assert!("blob".parse::<ColumnKind>().is_err());
    }
}
