//! Connection settings and configuration loading.

use crate::libs::dialect::Dialect;
use crate::libs::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to open one backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(rename = "type")]
    pub dialect: Dialect,
    /// Server host, or a filesystem path for embedded dialects
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub trust_certificate: Option<bool>,
}

impl ConnectionSettings {
    pub fn new(dialect: Dialect, host: impl Into<String>) -> Self {
        Self {
            dialect,
            host: host.into(),
            port: None,
            database: None,
            user: None,
            password: None,
            charset: None,
            trust_certificate: None,
        }
    }

    /// Embedded database at `path` (`:memory:` for a private in-memory one).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Dialect::Sqlite, path)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn trust_certificate(mut self, trust: bool) -> Self {
        self.trust_certificate = Some(trust);
        self
    }

    fn effective_port(&self) -> u16 {
        self.port.or(self.dialect.default_port()).unwrap_or_default()
    }

    /// Build the dialect-specific connection string.
    pub fn connection_string(&self) -> String {
        self.render(false)
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        let user = self.user.as_deref().unwrap_or_default();
        let database = self.database.as_deref().unwrap_or_default();
        let password = match self.password.as_deref().unwrap_or_default() {
            "" => "",
            _ if redact => "***",
            p => p,
        };

        match self.dialect {
            Dialect::MySql => format!(
                "mysql://{}@{}:{}/{}?charset={}",
                url_credentials(user, password, redact),
                self.host,
                self.effective_port(),
                database,
                self.charset.as_deref().unwrap_or("utf8mb4")
            ),
            Dialect::Postgres => format!(
                "postgres://{}@{}:{}/{}",
                url_credentials(user, password, redact),
                self.host,
                self.effective_port(),
                database
            ),
            Dialect::SqlServer => {
                let mut dsn = format!(
                    "Server=tcp:{},{};Database={};User Id={};Password={}",
                    self.host,
                    self.effective_port(),
                    ado_value(database),
                    ado_value(user),
                    ado_value(password)
                );
                if let Some(trust) = self.trust_certificate {
                    dsn.push_str(&format!(";TrustServerCertificate={}", trust));
                }
                dsn
            }
            Dialect::Sqlite => {
                if self.host == ":memory:" {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite://{}?mode=rwc", self.host)
                }
            }
        }
    }
}

fn url_credentials(user: &str, password: &str, redact: bool) -> String {
    if password.is_empty() {
        urlencoding::encode(user).into_owned()
    } else if redact {
        format!("{}:{}", urlencoding::encode(user), password)
    } else {
        format!("{}:{}", urlencoding::encode(user), urlencoding::encode(password))
    }
}

/// Brace-escape runs of characters the ADO.NET connection-string lexer
/// reads as syntax. A closing brace is literal outside an escape, so it
/// stays bare.
fn ado_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut escaping = false;
    for c in value.chars() {
        let special = matches!(c, ';' | '=' | '{' | '\'' | '"' | ' ' | '\n');
        if special != escaping {
            out.push(if special { '{' } else { '}' });
            escaping = special;
        }
        out.push(c);
    }
    if escaping {
        out.push('}');
    }
    out
}

/// Logging section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: ConnectionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and apply environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override file values from `RAVE_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        use std::env;

        if let Ok(tag) = env::var("RAVE_DB_TYPE") {
            self.database.dialect = tag.parse()?;
        }
        if let Ok(host) = env::var("RAVE_DB_HOST") {
            self.database.host = host;
        }
        if let Ok(port_str) = env::var("RAVE_DB_PORT") {
            let port = port_str
                .parse()
                .map_err(|_| DataError::Config(format!("Invalid RAVE_DB_PORT value: {}", port_str)))?;
            self.database.port = Some(port);
        }
        if let Ok(database) = env::var("RAVE_DB_DATABASE") {
            self.database.database = Some(database);
        }
        if let Ok(user) = env::var("RAVE_DB_USER") {
            self.database.user = Some(user);
        }
        if let Ok(password) = env::var("RAVE_DB_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Ok(level) = env::var("RAVE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        if db.host.trim().is_empty() {
            return Err(DataError::Config("database.host is required".into()));
        }
        if !db.dialect.is_embedded() {
            if db.database.as_deref().unwrap_or_default().is_empty() {
                return Err(DataError::Config("database.database is required".into()));
            }
            if db.user.as_deref().unwrap_or_default().is_empty() {
                return Err(DataError::Config("database.user is required".into()));
            }
        }
        if db.port == Some(0) {
            return Err(DataError::Config("database.port cannot be 0".into()));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(DataError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }
}
