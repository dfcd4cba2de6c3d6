//! HTML form fragment for editing the first row of a [`Table`].

use crate::libs::error::{DataError, Result};
use crate::libs::schema::{Column, ColumnKind, InputKind, SelectOptions};
use crate::libs::table::{Table, value_text};
use serde_json::Value;

/// Label and input control for every column of the first row, in row order.
///
/// The primary column is skipped. Output is a pure function of the table,
/// so unchanged input always renders the same bytes.
pub fn render_inputs(table: &Table) -> Result<String> {
    let Some(row) = table.first_row() else {
        return Ok(String::new());
    };

    let mut html = String::new();
    for (name, value) in row.iter() {
        if table.primary_column() == Some(name) {
            continue;
        }
        let column = table
            .column(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))?;
        render_label(&mut html, column);
        match input_kind(column) {
            InputKind::Select => render_select(&mut html, column, value),
            InputKind::Number => render_input(&mut html, column, "number", value),
            InputKind::Text => render_input(&mut html, column, "text", value),
        }
    }
    Ok(html)
}

fn input_kind(column: &Column) -> InputKind {
    let hints = column.hints();
    if let Some(kind) = hints.input {
        return kind;
    }
    if hints.options.is_some() {
        return InputKind::Select;
    }
    match column.kind() {
        ColumnKind::Bool => InputKind::Select,
        ColumnKind::Int | ColumnKind::Phone => InputKind::Number,
        _ => InputKind::Text,
    }
}

/// `mobile_phone_1` -> `Mobile Phone 1`
pub fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn style_attr(styles: &[(String, String)]) -> String {
    if styles.is_empty() {
        return String::new();
    }
    let body = styles
        .iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ");
    format!(" style=\"{}\"", escape_html(&body))
}

fn render_label(html: &mut String, column: &Column) {
    html.push_str(&format!(
        "<label for=\"{}\"{}>{}</label>\n",
        column.name(),
        style_attr(&column.hints().label_styles),
        escape_html(&humanize(column.name()))
    ));
}

fn render_input(html: &mut String, column: &Column, kind: &str, value: &Value) {
    html.push_str(&format!(
        "<input type=\"{}\" id=\"{}\" name=\"{}\" value=\"{}\"{}>\n",
        kind,
        column.name(),
        column.name(),
        escape_html(&value_text(value)),
        style_attr(&column.hints().input_styles)
    ));
}

fn default_bool_options() -> SelectOptions {
    SelectOptions::new([("No", "FALSE"), ("Yes", "TRUE")])
}

fn render_select(html: &mut String, column: &Column, value: &Value) {
    let current = value_text(value);
    let options = match (&column.hints().options, column.kind()) {
        (Some(options), _) => options.clone(),
        (None, ColumnKind::Bool) => default_bool_options(),
        // Nothing to choose from: offer the stored value only.
        (None, _) => SelectOptions::new([(current.clone(), current.clone())]),
    };

    let mut open = format!("<select id=\"{}\"", column.name());
    if options.multiple {
        open.push_str(&format!(" name=\"{}[]\" multiple", column.name()));
    } else {
        open.push_str(&format!(" name=\"{}\"", column.name()));
    }
    if options.allow_new {
        open.push_str(" class=\"select2\" data-tags=\"true\"");
    }
    open.push_str(&style_attr(&column.hints().input_styles));
    html.push_str(&open);
    html.push_str(">\n");

    for (label, option) in &options.possible {
        let selected = if is_selected(column.kind(), &options, option, &current) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            "\t<option value=\"{}\"{}>{}</option>\n",
            escape_html(option),
            selected,
            escape_html(label)
        ));
    }
    html.push_str("</select>\n");
}

fn is_selected(kind: ColumnKind, options: &SelectOptions, option: &str, current: &str) -> bool {
    if let Some(selected) = &options.selected {
        return selected.iter().any(|s| s == option);
    }
    kind.same_value(option, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::schema::ColumnSet;
    use crate::libs::table::Row;
    use serde_json::json;

    fn table(columns: Vec<Column>, row: Row) -> Table {
        let mut table = Table::define(ColumnSet::from_columns(columns).unwrap())
            .with_primary_column("Unique_LoaderID")
            .unwrap();
        table.load(Ok(vec![row]), true).unwrap();
        table
    }

    fn col(name: &str, kind: ColumnKind) -> Column {
        Column::new(name, kind, "People_Lists").unwrap()
    }

    #[test]
    fn humanizes_labels() {
        assert_eq!(humanize("mobile_phone_1"), "Mobile Phone 1");
        assert_eq!(humanize("Last_Name"), "Last Name");
        assert_eq!(humanize("on_campus"), "On Campus");
    }

    #[test]
    fn renders_text_and_number_inputs_skipping_primary() {
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("FirstName", ColumnKind::String),
                col("mobile_phone_1", ColumnKind::Phone).with_input_style("width", "10em"),
            ],
            [
                ("Unique_LoaderID", json!("jd@como.gov")),
                ("FirstName", json!("O'Neil <Jr>")),
                ("mobile_phone_1", json!("5735550100")),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(
            render_inputs(&t).unwrap(),
            "<label for=\"FirstName\">FirstName</label>\n\
             <input type=\"text\" id=\"FirstName\" name=\"FirstName\" value=\"O&#39;Neil &lt;Jr&gt;\">\n\
             <label for=\"mobile_phone_1\">Mobile Phone 1</label>\n\
             <input type=\"number\" id=\"mobile_phone_1\" name=\"mobile_phone_1\" value=\"5735550100\" style=\"width: 10em\">\n"
        );
    }

    #[test]
    fn bool_column_gets_default_options_and_coerced_selection() {
        let t = table(
            vec![col("Unique_LoaderID", ColumnKind::Email), col("suspended", ColumnKind::Bool)],
            [("Unique_LoaderID", json!("jd@como.gov")), ("suspended", json!(1))]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            render_inputs(&t).unwrap(),
            "<label for=\"suspended\">Suspended</label>\n\
             <select id=\"suspended\" name=\"suspended\">\n\
             \t<option value=\"FALSE\">No</option>\n\
             \t<option value=\"TRUE\" selected>Yes</option>\n\
             </select>\n"
        );
    }

    #[test]
    fn int_options_compare_numerically() {
        let roles = SelectOptions::new([("Dispatcher", "3"), ("Officer", "4")]);
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("role", ColumnKind::Int).with_options(roles),
            ],
            [("Unique_LoaderID", json!("jd@como.gov")), ("role", json!(4.0))]
                .into_iter()
                .collect(),
        );
        let html = render_inputs(&t).unwrap();
        assert!(html.contains("<option value=\"4\" selected>Officer</option>"));
        assert!(html.contains("<option value=\"3\">Dispatcher</option>"));
    }

    #[test]
    fn explicit_selection_multiple_and_allow_new() {
        let lists = SelectOptions::new([("Alerts", "1"), ("Drills", "2"), ("Weather", "3")])
            .selected(["1", "3"])
            .multiple()
            .allow_new();
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("lists", ColumnKind::String).with_options(lists),
            ],
            [("Unique_LoaderID", json!("jd@como.gov")), ("lists", json!("2"))]
                .into_iter()
                .collect(),
        );
        let html = render_inputs(&t).unwrap();
        assert!(html.contains(
            "<select id=\"lists\" name=\"lists[]\" multiple class=\"select2\" data-tags=\"true\">"
        ));
        assert!(html.contains("<option value=\"1\" selected>Alerts</option>"));
        assert!(html.contains("<option value=\"2\">Drills</option>"));
        assert!(html.contains("<option value=\"3\" selected>Weather</option>"));
    }

    #[test]
    fn string_options_compare_literally() {
        let campus = SelectOptions::new([("UNSET", ""), ("Off", "OFF"), ("On", "ON")]);
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("on_campus", ColumnKind::String).with_options(campus),
            ],
            [("Unique_LoaderID", json!("jd@como.gov")), ("on_campus", json!("on"))]
                .into_iter()
                .collect(),
        );
        let html = render_inputs(&t).unwrap();
        assert!(!html.contains("selected"));
    }

    #[test]
    fn select_without_options_offers_stored_value() {
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("class", ColumnKind::String)
                    .with_input(InputKind::Select)
                    .with_input_style("width", "8em"),
            ],
            [("Unique_LoaderID", json!("jd@como.gov")), ("class", json!("Staff"))]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            render_inputs(&t).unwrap(),
            "<label for=\"class\">Class</label>\n\
             <select id=\"class\" name=\"class\" style=\"width: 8em\">\n\
             \t<option value=\"Staff\" selected>Staff</option>\n\
             </select>\n"
        );
    }

    #[test]
    fn unknown_row_key_fails() {
        let t = table(
            vec![col("Unique_LoaderID", ColumnKind::Email)],
            [("Unique_LoaderID", json!("jd@como.gov")), ("nickname", json!("J"))]
                .into_iter()
                .collect(),
        );
        assert!(matches!(render_inputs(&t), Err(DataError::UnknownColumn(name)) if name == "nickname"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let t = table(
            vec![
                col("Unique_LoaderID", ColumnKind::Email),
                col("Last_Name", ColumnKind::String).with_label_style("font-weight", "bold"),
                col("suspended", ColumnKind::Bool),
            ],
            [
                ("Unique_LoaderID", json!("jd@como.gov")),
                ("Last_Name", json!("Doe")),
                ("suspended", json!(null)),
            ]
            .into_iter()
            .collect(),
        );
        let first = render_inputs(&t).unwrap();
        assert_eq!(first, render_inputs(&t).unwrap());
        assert!(first.starts_with("<label for=\"Last_Name\" style=\"font-weight: bold\">Last Name</label>\n"));
    }

    #[test]
    fn empty_table_renders_nothing() {
        let t = Table::define(ColumnSet::new());
        assert_eq!(render_inputs(&t).unwrap(), "");
    }
}
