//! SQL dialect strategy table.
//!
//! Every place where the backends disagree (connection string format,
//! placeholder syntax, identifier quoting, transaction statements) is
//! answered here by a single `match` on [`Dialect`]. Callers never compare
//! dialect strings themselves.

use crate::libs::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which relational backend and SQL variant a connection speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    MySql,
    SqlServer,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::MySql,
        Dialect::SqlServer,
        Dialect::Postgres,
        Dialect::Sqlite,
    ];

    /// Canonical tag, as written in configuration files.
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::SqlServer => "sqlsrv",
            Dialect::Postgres => "pgsql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Embedded dialects take a filesystem path instead of a host.
    pub fn is_embedded(&self) -> bool {
        matches!(self, Dialect::Sqlite)
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::MySql => Some(3306),
            Dialect::SqlServer => Some(1433),
            Dialect::Postgres => Some(5432),
            Dialect::Sqlite => None,
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::SqlServer => format!("@P{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }

    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    pub fn begin_sql(&self) -> &'static str {
        match self {
            Dialect::MySql => "START TRANSACTION",
            Dialect::SqlServer => "BEGIN TRANSACTION",
            Dialect::Postgres | Dialect::Sqlite => "BEGIN",
        }
    }

    pub fn commit_sql(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "COMMIT TRANSACTION",
            _ => "COMMIT",
        }
    }

    pub fn rollback_sql(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "ROLLBACK TRANSACTION",
            _ => "ROLLBACK",
        }
    }

    /// `expr` converted to text. SQL Server keeps the ODBC canonical
    /// `yyyy-mm-dd hh:mi:ss.mmm` layout for dates.
    pub fn text_cast(&self, expr: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({} AS CHAR)", expr),
            Dialect::SqlServer => format!("CONVERT(NVARCHAR(40), {}, 121)", expr),
            Dialect::Postgres | Dialect::Sqlite => format!("CAST({} AS TEXT)", expr),
        }
    }

    /// Rewrite `?` placeholders into this dialect's syntax.
    ///
    /// Question marks inside quoted literals or quoted identifiers are left
    /// alone. Dialects that already use `?` get the text back unchanged.
    pub fn normalize_placeholders(&self, sql: &str) -> String {
        if matches!(self, Dialect::MySql | Dialect::Sqlite) {
            return sql.to_string();
        }

        let mut out = String::with_capacity(sql.len() + 16);
        let mut index = 0;
        let mut closing: Option<char> = None;

        for ch in sql.chars() {
            if let Some(close) = closing {
                out.push(ch);
                if ch == close {
                    closing = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' | '`' => {
                    closing = Some(ch);
                    out.push(ch);
                }
                '[' => {
                    closing = Some(']');
                    out.push(ch);
                }
                '?' => {
                    index += 1;
                    out.push_str(&self.placeholder(index));
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Dialect {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlsrv" | "mssql" => Ok(Dialect::SqlServer),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(DataError::Config(format!("unknown database type '{}'", other))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(dialect: Dialect) -> Self {
        dialect.tag().to_string()
    }
}
