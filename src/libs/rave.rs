//! RAVE alert roster: fixed schema description and the queries the
//! roster pages run.

use crate::libs::connection::Connection;
use crate::libs::dialect::Dialect;
use crate::libs::error::Result;
use crate::libs::memo::RequestCache;
use crate::libs::query_builder::SelectBuilder;
use crate::libs::schema::{Column, ColumnKind, ColumnSet, SelectOptions};
use crate::libs::table::{Row, Table, value_text};
use crate::libs::update::{self, UpdateOutcome};
use serde_json::Value;

pub const PEOPLE_LISTS: &str = "People_Lists";
pub const RAVE_PEOPLE: &str = "Rave_People";
pub const ROLES: &str = "Roles";
/// Person identifier (an email address) shared by every roster table.
pub const LOADER_ID: &str = "Unique_LoaderID";

const ROLES_QUERY: &str = "SELECT ID, Role FROM Roles WHERE Department = ? ORDER BY Role";

fn people(name: &str, kind: ColumnKind) -> Result<Column> {
    Column::new(name, kind, PEOPLE_LISTS)
}

/// Columns of the department listing.
pub fn roster_columns() -> Result<ColumnSet> {
    ColumnSet::from_columns([
        Column::new(LOADER_ID, ColumnKind::Email, RAVE_PEOPLE)?,
        people("Rave_Handle", ColumnKind::String)?,
        people("FirstName", ColumnKind::String)?,
        people("Last_Name", ColumnKind::String)?,
        people("email_1", ColumnKind::String)?,
        people("mobile_phone_1", ColumnKind::Phone)?,
        Column::new("Role", ColumnKind::String, ROLES)?,
    ])
}

/// Columns of the single-person edit form. `roles` are (label, id) pairs
/// for the role selector.
pub fn person_columns(roles: &[(String, String)]) -> Result<ColumnSet> {
    let voice = || SelectOptions::new([("UNSET", ""), ("No", "FALSE"), ("Yes", "TRUE")]);

    ColumnSet::from_columns([
        Column::new(LOADER_ID, ColumnKind::Email, RAVE_PEOPLE)?,
        people("Rave_Handle", ColumnKind::String)?,
        people("FirstName", ColumnKind::String)?,
        people("Last_Name", ColumnKind::String)?,
        people("role", ColumnKind::Int)?.with_options(SelectOptions::new(roles.iter().cloned())),
        people("suspended", ColumnKind::Bool)?
            .with_options(SelectOptions::new([("No", "FALSE"), ("Yes", "TRUE")])),
        people("email_1", ColumnKind::String)?,
        people("email_2", ColumnKind::String)?,
        people("mobile_phone_1", ColumnKind::Phone)?,
        people("mobile_carrier_1", ColumnKind::String)?,
        people("mobile_1_voice_preference", ColumnKind::Bool)?.with_options(voice()),
        people("mobile_phone_2", ColumnKind::Phone)?,
        people("mobile_carrier_2", ColumnKind::String)?,
        people("mobile_2_voice_preference", ColumnKind::Bool)?.with_options(voice()),
        people("mobile_phone_3", ColumnKind::Phone)?,
        people("mobile_carrier_3", ColumnKind::String)?,
        people("mobile_3_voice_preference", ColumnKind::Bool)?.with_options(voice()),
        people("landline_phone_1", ColumnKind::Phone)?,
        people("landline_phone_1_ext", ColumnKind::Int)?,
        people("landline_phone_2", ColumnKind::Phone)?,
        people("landline_phone_2_ext", ColumnKind::Int)?,
        people("landline_phone_3", ColumnKind::Phone)?,
        people("landline_phone_3_ext", ColumnKind::Int)?,
        people("building", ColumnKind::String)?,
        people("class", ColumnKind::String)?,
        people("on_campus", ColumnKind::String)?
            .with_options(SelectOptions::new([("UNSET", ""), ("Off", "OFF"), ("On", "ON")])),
    ])
}

/// Contact columns sent to the smartloader batch job.
pub fn smartloader_columns() -> Result<ColumnSet> {
    let names = [
        "Unique_LoaderID",
        "Rave_Handle",
        "FirstName",
        "Last_Name",
        "email_1",
        "email_2",
        "mobile_phone_1",
        "mobile_carrier_1",
        "mobile_1_voice_preference",
        "mobile_phone_2",
        "mobile_carrier_2",
        "mobile_2_voice_preference",
        "mobile_phone_3",
        "mobile_carrier_3",
        "mobile_3_voice_preference",
        "landline_phone_1",
        "landline_phone_1_ext",
        "landline_phone_2",
        "landline_phone_2_ext",
        "landline_phone_3",
        "landline_phone_3_ext",
        "building",
        "class",
        "on_campus",
    ];
    let columns = names
        .iter()
        .map(|name| people(name, ColumnKind::String))
        .collect::<Result<Vec<_>>>()?;
    ColumnSet::from_columns(columns)
}

fn people_with_accounts(columns: &ColumnSet, dialect: Dialect) -> SelectBuilder {
    SelectBuilder::new(PEOPLE_LISTS)
        .columns(columns, dialect)
        .left_join(RAVE_PEOPLE, "People_Lists.Unique_LoaderID", "Rave_People.Unique_LoaderID")
}

/// Everyone whose role belongs to `department`, by last then first name.
pub async fn department_roster(conn: &mut Connection, department: &str) -> Result<Table> {
    let columns = roster_columns()?;
    let (sql, params) = people_with_accounts(&columns, conn.dialect())
        .left_join(ROLES, "People_Lists.role", "Roles.ID")
        .r#where("Roles.Department", "=", department)
        .order_by("People_Lists.Last_Name", "ASC")
        .order_by("People_Lists.FirstName", "ASC")
        .build()?;

    let mut table = Table::define(columns).with_primary_column(LOADER_ID)?;
    let loaded = table.load(conn.select(&sql, &params).await, true)?;
    tracing::debug!(department = %department, rows = loaded, "roster loaded");
    Ok(table)
}

/// Roles offered by `department` as (label, id) pairs, once per request.
pub async fn available_roles(
    conn: &mut Connection,
    cache: &mut RequestCache,
    department: &str,
) -> Result<Vec<(String, String)>> {
    let rows = conn
        .select_cached(cache, ROLES_QUERY, &[Value::from(department)])
        .await?;
    Ok(rows.iter().map(|row| (row.text("Role"), row.text("ID"))).collect())
}

/// One person's edit-form table. The row list is empty when `id` is unknown.
pub async fn person(
    conn: &mut Connection,
    cache: &mut RequestCache,
    department: &str,
    id: &str,
) -> Result<Table> {
    let roles = available_roles(conn, cache, department).await?;
    let columns = person_columns(&roles)?;
    let (sql, params) = people_with_accounts(&columns, conn.dialect())
        .r#where("People_Lists.Unique_LoaderID", "=", normalize_id(id))
        .build()?;

    let mut table = Table::define(columns).with_primary_column(LOADER_ID)?;
    table.load(conn.select(&sql, &params).await, true)?;
    Ok(table)
}

/// Persist edits from the person form. `id` is matched the same way
/// [`person`] matches it.
pub async fn update_person(
    conn: &mut Connection,
    table: &Table,
    id: &str,
    changes: &Row,
) -> Result<UpdateOutcome> {
    update::apply(conn, table, &normalize_id(id), changes).await
}

/// Identifiers are stored lowercased.
fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Smartloader CSV for every person on any list.
pub async fn smartloader_export(conn: &mut Connection) -> Result<String> {
    let columns = smartloader_columns()?;
    let (sql, params) = SelectBuilder::new(PEOPLE_LISTS)
        .columns(&columns, conn.dialect())
        .order_by("People_Lists.Unique_LoaderID", "ASC")
        .build()?;
    let mut table = Table::define(columns);
    let count = table.load(conn.select(&sql, &params).await, true)?;
    tracing::info!(rows = count, "smartloader export");
    Ok(table.to_csv())
}

/// Display name used in page headings.
pub fn display_name(row: &Row) -> String {
    let first = row.get("FirstName").map(value_text).unwrap_or_default();
    let last = row.get("Last_Name").map(value_text).unwrap_or_default();
    format!("{} {}", first, last).trim().to_string()
}
