//! Per-table UPDATE planning and execution for one edited record.

use crate::libs::connection::Connection;
use crate::libs::error::{DataError, Result};
use crate::libs::ident::is_email;
use crate::libs::table::{Row, Table, value_text};
use indexmap::IndexMap;
use serde_json::Value;

/// One `UPDATE` touching a single owning table.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub sql: String,
    pub params: Vec<Value>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub statements: Vec<UpdateStatement>,
    pub rows_affected: u64,
}

/// Build the statements that move the stored record to `changes`.
///
/// Fields whose value matches the loaded row are dropped, comparing bool
/// and int columns by meaning rather than spelling. The rest are grouped
/// by owning table in first-appearance order and bound as their column
/// kind's type.
pub fn plan(table: &Table, identifier: &str, changes: &Row) -> Result<Vec<UpdateStatement>> {
    if !is_email(identifier) {
        return Err(DataError::validation(format!(
            "identifier '{}' is not an email address",
            identifier
        )));
    }
    let primary = table
        .primary_column()
        .ok_or_else(|| DataError::validation("table has no primary column"))?;

    let current = table
        .rows()
        .iter()
        .find(|row| row.text(primary) == identifier)
        .or_else(|| table.first_row());

    let mut groups: IndexMap<&str, Vec<(&str, Value)>> = IndexMap::new();
    for (name, value) in changes.iter() {
        let column = table
            .column(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))?;

        if let Some(row) = current {
            if row.contains(name) && column.kind().same_value(&row.text(name), &value_text(value)) {
                continue;
            }
        }
        if name == primary {
            return Err(DataError::validation(format!(
                "identifier column '{}' cannot be changed",
                name
            )));
        }
        if column.special().is_some() {
            return Err(DataError::validation(format!(
                "computed column '{}' cannot be updated",
                name
            )));
        }
        groups
            .entry(column.table())
            .or_default()
            .push((name, column.kind().bind_value(value)));
    }

    if groups.is_empty() {
        return Err(DataError::NothingToUpdate(identifier.to_string()));
    }

    Ok(groups
        .into_iter()
        .map(|(owner, fields)| {
            let assignments = fields
                .iter()
                .map(|(name, _)| format!("{} = ?", name))
                .collect::<Vec<_>>()
                .join(", ");
            let mut params: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
            params.push(Value::from(identifier));
            UpdateStatement {
                table: owner.to_string(),
                sql: format!("UPDATE {} SET {} WHERE {} = ?", owner, assignments, primary),
                params,
                columns: fields.iter().map(|(name, _)| name.to_string()).collect(),
            }
        })
        .collect())
}

/// Plan and run the updates inside one transaction.
///
/// An already-open transaction on `conn` is joined; otherwise one is opened
/// here and rolled back if any statement fails or matches no row.
pub async fn apply(
    conn: &mut Connection,
    table: &Table,
    identifier: &str,
    changes: &Row,
) -> Result<UpdateOutcome> {
    let statements = plan(table, identifier, changes)?;
    tracing::info!(
        identifier = %identifier,
        tables = ?statements.iter().map(|s| s.table.as_str()).collect::<Vec<_>>(),
        statements = statements.len(),
        "applying update plan"
    );

    let owns_transaction = !conn.in_transaction();
    if owns_transaction {
        conn.begin().await?;
    }

    match run(conn, &statements).await {
        Ok(rows_affected) => {
            if owns_transaction {
                conn.commit().await?;
            }
            Ok(UpdateOutcome {
                statements,
                rows_affected,
            })
        }
        Err(err) => {
            tracing::warn!(identifier = %identifier, error = %err, "update failed, rolling back");
            if owns_transaction {
                if let Err(rollback_err) = conn.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
            }
            Err(err)
        }
    }
}

async fn run(conn: &mut Connection, statements: &[UpdateStatement]) -> Result<u64> {
    let mut total = 0;
    for statement in statements {
        let affected = conn.update(&statement.sql, &statement.params).await?;
        if affected == 0 {
            let identifier = statement.params.last().map(value_text).unwrap_or_default();
            return Err(DataError::NotFound(format!(
                "no {} row for '{}'",
                statement.table, identifier
            )));
        }
        total += affected;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::connection::testing::{Recorder, recording};
    use crate::libs::dialect::Dialect;
    use crate::libs::schema::{Column, ColumnKind, ColumnSet};
    use serde_json::json;

    fn person_table() -> Table {
        let columns = ColumnSet::from_columns([
            Column::new("Unique_LoaderID", ColumnKind::Email, "People_Lists").unwrap(),
            Column::new("status", ColumnKind::String, "People_Lists").unwrap(),
            Column::new("FirstName", ColumnKind::String, "People_Lists").unwrap(),
            Column::new("Rave_Handle", ColumnKind::String, "Rave_People").unwrap(),
            Column::new("suspended", ColumnKind::Bool, "People_Lists").unwrap(),
            Column::new("role", ColumnKind::Int, "People_Lists").unwrap(),
            Column::new("ListIDs", ColumnKind::String, "People_Lists")
                .unwrap()
                .with_special("GROUP_CONCAT(People_Lists.ListID)"),
        ])
        .unwrap();
        let mut table = Table::define(columns).with_primary_column("Unique_LoaderID").unwrap();
        let row: Row = [
            ("Unique_LoaderID", json!("jd@como.gov")),
            ("status", json!("active")),
            ("FirstName", json!("Jane")),
            ("Rave_Handle", Value::Null),
            ("suspended", json!(true)),
            ("role", json!(4)),
            ("ListIDs", json!("1,2")),
        ]
        .into_iter()
        .collect();
        table.load(Ok(vec![row]), true).unwrap();
        table
    }

    fn changes(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn groups_by_owning_table() {
        let table = person_table();
        let plan = plan(
            &table,
            "jd@como.gov",
            &changes(&[("FirstName", json!("Janet")), ("Rave_Handle", json!("jdoe"))]),
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].sql, "UPDATE People_Lists SET FirstName = ? WHERE Unique_LoaderID = ?");
        assert_eq!(plan[0].params, vec![json!("Janet"), json!("jd@como.gov")]);
        assert_eq!(plan[1].sql, "UPDATE Rave_People SET Rave_Handle = ? WHERE Unique_LoaderID = ?");
        assert_eq!(plan[1].columns, ["Rave_Handle"]);
    }

    #[test]
    fn unchanged_values_fail() {
        let table = person_table();
        let err = plan(&table, "jd@como.gov", &changes(&[("status", json!("active"))])).unwrap_err();
        assert!(matches!(err, DataError::NothingToUpdate(_)));
    }

    #[test]
    fn null_matches_empty_string() {
        let table = person_table();
        let err = plan(&table, "jd@como.gov", &changes(&[("Rave_Handle", json!(""))])).unwrap_err();
        assert!(matches!(err, DataError::NothingToUpdate(_)));
    }

    #[test]
    fn bool_and_int_spellings_of_stored_value_are_unchanged() {
        let table = person_table();
        let err = plan(
            &table,
            "jd@como.gov",
            &changes(&[("suspended", json!("TRUE")), ("role", json!("4.0"))]),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::NothingToUpdate(_)));
    }

    #[test]
    fn typed_columns_bind_parsed_values() {
        let table = person_table();
        let plan = plan(
            &table,
            "jd@como.gov",
            &changes(&[("suspended", json!("no")), ("role", json!("3"))]),
        )
        .unwrap();
        assert_eq!(plan[0].params, vec![json!(false), json!(3), json!("jd@como.gov")]);
    }

    #[test]
    fn unknown_column_fails_whole_update() {
        let table = person_table();
        let err = plan(
            &table,
            "jd@como.gov",
            &changes(&[("FirstName", json!("Janet")), ("nickname", json!("J"))]),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::UnknownColumn(name) if name == "nickname"));
    }

    #[test]
    fn computed_and_identifier_columns_are_read_only() {
        let table = person_table();
        assert!(matches!(
            plan(&table, "jd@como.gov", &changes(&[("ListIDs", json!("3"))])),
            Err(DataError::Validation(_))
        ));
        assert!(matches!(
            plan(&table, "jd@como.gov", &changes(&[("Unique_LoaderID", json!("x@como.gov"))])),
            Err(DataError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn invalid_identifier_issues_no_sql() {
        let table = person_table();
        let (mut conn, log) = recording(Dialect::MySql);
        let err = apply(&mut conn, &table, "not-an-email", &changes(&[("status", json!("x"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        assert!(log.statements().is_empty());
    }

    #[tokio::test]
    async fn apply_wraps_statements_in_one_transaction() {
        let table = person_table();
        let (mut conn, log) = recording(Dialect::Postgres);
        let outcome = apply(
            &mut conn,
            &table,
            "jd@como.gov",
            &changes(&[("FirstName", json!("Janet")), ("Rave_Handle", json!("jdoe"))]),
        )
        .await
        .unwrap();
        assert_eq!(outcome.rows_affected, 2);
        assert_eq!(
            log.statements(),
            [
                "BEGIN",
                "UPDATE People_Lists SET FirstName = $1 WHERE Unique_LoaderID = $2",
                "UPDATE Rave_People SET Rave_Handle = $1 WHERE Unique_LoaderID = $2",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn failure_rolls_back() {
        let table = person_table();
        let recorder = Recorder {
            fail_on: Some("Rave_People".into()),
            ..Recorder::default()
        };
        let mut conn = Connection::with_backend(Dialect::SqlServer, Box::new(recorder.clone()));
        let err = apply(
            &mut conn,
            &table,
            "jd@como.gov",
            &changes(&[("FirstName", json!("Janet")), ("Rave_Handle", json!("jdoe"))]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DataError::Query { .. }));
        assert!(!conn.in_transaction());
        assert_eq!(recorder.statements().last().unwrap(), "ROLLBACK TRANSACTION");
    }

    #[tokio::test]
    async fn statement_matching_no_row_rolls_back() {
        let table = person_table();
        let recorder = Recorder {
            no_match: Some("Rave_People".into()),
            ..Recorder::default()
        };
        let mut conn = Connection::with_backend(Dialect::MySql, Box::new(recorder.clone()));
        let err = apply(
            &mut conn,
            &table,
            "jd@como.gov",
            &changes(&[("FirstName", json!("Janet")), ("Rave_Handle", json!("jdoe"))]),
        )
        .await
        .unwrap_err();
        assert!(matches!(&err, DataError::NotFound(msg) if msg.contains("Rave_People")));
        assert!(!conn.in_transaction());
        assert_eq!(recorder.statements().last().unwrap(), "ROLLBACK");
    }

    #[tokio::test]
    async fn joins_callers_transaction() {
        let table = person_table();
        let (mut conn, log) = recording(Dialect::Sqlite);
        conn.begin().await.unwrap();
        apply(&mut conn, &table, "jd@como.gov", &changes(&[("status", json!("retired"))]))
            .await
            .unwrap();
        assert!(conn.in_transaction());
        assert_eq!(
            log.statements(),
            ["BEGIN", "UPDATE People_Lists SET status = ? WHERE Unique_LoaderID = ?"]
        );
    }
}
