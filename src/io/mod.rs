//! # Database connections
//!
//! The [`Connection`] trait is the only thing expressions need from a database:
//! an identity, and the execution of a compiled statement into [`Row`]s.
//! [`ConnectionSettings`] carries the configuration of a connection.
//!
//! Backends:
//! - SQLite using the ["sqlite"] feature.
//!

#[cfg(feature = "sqlite")]
pub mod sqlite;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{env, error, fmt, num, result, str::FromStr};

use crate::{condition::Condition, data_type::Value};

// Error management
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Database(String),
    Configuration(String),
    Other(String),
}

impl Error {
    pub fn database(desc: impl fmt::Display) -> Error {
        Error::Database(format!("Database error {}", desc))
    }
    pub fn configuration(desc: impl fmt::Display) -> Error {
        Error::Configuration(format!("Configuration error {}", desc))
    }
    pub fn other(desc: impl fmt::Display) -> Error {
        Error::Other(format!("{}", desc))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(desc) => writeln!(f, "Database: {}", desc),
            Error::Configuration(desc) => writeln!(f, "Configuration: {}", desc),
            Error::Other(desc) => writeln!(f, "{}", desc),
        }
    }
}

impl error::Error for Error {}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Self {
        Error::configuration(err)
    }
}
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::configuration(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// A row of a result, its values in column order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(Vec<(String, Value)>);

impl Row {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Row(values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The row restricted to `names`, in that order
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Row {
        Row(names
            .iter()
            .filter_map(|name| {
                self.get(name.as_ref())
                    .map(|value| (name.as_ref().to_string(), value.clone()))
            })
            .collect())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            self.0
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .join(", ")
        )
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect())
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = <Vec<(String, Value)> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A row restricts to the elements with equal values
impl From<Row> for Condition {
    fn from(row: Row) -> Self {
        Condition::Equality(row.0)
    }
}

impl From<&Row> for Condition {
    fn from(row: &Row) -> Self {
        Condition::Equality(row.0.clone())
    }
}

/// A connection to a database
pub trait Connection: fmt::Debug + Send + Sync {
    /// The name of the connection, for logging
    fn name(&self) -> &str;
    /// Run a query and return all its rows
    fn query(&self, sql: &str) -> Result<Vec<Row>>;
}

/// Supported database backends
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl DatabaseType {
    /// The default port of the backend
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseType::MySql => 3306,
            DatabaseType::Postgres => 5432,
            DatabaseType::Sqlite => 0,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::MySql => write!(f, "MySQL"),
            DatabaseType::Postgres => write!(f, "Postgres"),
            DatabaseType::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(DatabaseType::MySql),
            "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            "sqlite" => Ok(DatabaseType::Sqlite),
            other => Err(Error::configuration(format!(
                "unknown database type `{}`",
                other
            ))),
        }
    }
}

const HOST: &str = "localhost";
const USER: &str = "root";

/// Connection settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub database_type: DatabaseType,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database_name: Option<String>,
    pub use_tls: Option<bool>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            database_type: DatabaseType::MySql,
            host: HOST.to_string(),
            port: DatabaseType::MySql.default_port(),
            user: USER.to_string(),
            password: String::new(),
            database_name: None,
            use_tls: None,
        }
    }
}

impl ConnectionSettings {
    /// Read settings from a JSON document, missing keys take their default value
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from the `DJ_*` environment variables
    pub fn from_env() -> Result<Self> {
        ConnectionSettings::from_vars(|name| env::var(name).ok())
    }

    /// Read settings from a variable lookup
    pub fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Result<Self> {
        let mut settings = ConnectionSettings::default();
        if let Some(database_type) = var("DJ_DATABASE_TYPE") {
            settings.database_type = database_type.parse()?;
            settings.port = settings.database_type.default_port();
        }
        if let Some(host) = var("DJ_HOST") {
            // a port may be given with the host
            match host.split_once(':') {
                Some((host, port)) => {
                    settings.host = host.to_string();
                    settings.port = port.parse()?;
                }
                None => settings.host = host,
            }
        }
        if let Some(port) = var("DJ_PORT") {
            settings.port = port.parse()?;
        }
        if let Some(user) = var("DJ_USER") {
            settings.user = user;
        }
        if let Some(password) = var("DJ_PASS") {
            settings.password = password;
        }
        if let Some(database_name) = var("DJ_DATABASE") {
            settings.database_name = Some(database_name);
        }
        if let Some(use_tls) = var("DJ_USE_TLS") {
            settings.use_tls = match use_tls.trim().to_lowercase().as_str() {
                "" | "none" => None,
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                other => {
                    return Err(Error::configuration(format!(
                        "invalid DJ_USE_TLS value `{}`",
                        other
                    )))
                }
            };
        }
        Ok(settings)
    }

    /// Merge a partial JSON object into the settings, unknown keys are ignored
    pub fn update(&mut self, values: &serde_json::Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)?;
        if let (Some(current), Some(values)) = (current.as_object_mut(), values.as_object()) {
            for (key, value) in values {
                if let Some(entry) = current.get_mut(key) {
                    *entry = value.clone();
                }
            }
        } else {
            return Err(Error::configuration("settings must be a JSON object"));
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

impl fmt::Display for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}@{}:{}/{}",
            self.database_type,
            self.user,
            self.host,
            self.port,
            self.database_name.as_deref().unwrap_or_default()
        )
    }
}
