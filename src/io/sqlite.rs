use super::{Connection, Error, Result, Row};
use crate::{
    builder::Ready,
    data_type::{DataType, Value},
    expression::Table,
    heading::{Attribute, Heading},
};
use log::debug;
use rusqlite::{
    self,
    types::{FromSql, FromSqlResult, ValueRef},
};
use std::sync::{Arc, Mutex};

const DB: &str = "qrel-test";
/// The schema name of the main SQLite database
pub const MAIN: &str = "main";

/// Converts sqlite errors to io errors
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::database(err)
    }
}

/// An SQLite database
#[derive(Debug)]
pub struct Database {
    name: String,
    connection: Mutex<rusqlite::Connection>,
}

impl Database {
    /// An empty in-memory database
    pub fn open_in_memory<S: Into<String>>(name: S) -> Result<Self> {
        Ok(Database {
            name: name.into(),
            connection: Mutex::new(rusqlite::Connection::open_in_memory()?),
        })
    }

    /// Run statements without results, such as table creations and insertions
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!("{}: {}", self.name, sql);
        Ok(self.lock()?.execute_batch(sql)?)
    }

    /// Read the heading of a table from the database
    pub fn heading(&self, table: &str) -> Result<Heading> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!("PRAGMA table_info(`{}`)", table))?;
        let attributes = statement
            .query_map([], |row| {
                let name: String = row.get("name")?;
                let declared: String = row.get("type")?;
                let not_null: bool = row.get("notnull")?;
                let primary_key: i64 = row.get("pk")?;
                Ok(Attribute::new(
                    name,
                    declared.parse().unwrap_or(DataType::Unknown),
                )
                .with_in_key(primary_key > 0)
                .with_nullable(!not_null && primary_key == 0))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if attributes.is_empty() {
            return Err(Error::database(format!("table `{}` does not exist", table)));
        }
        Heading::try_new(attributes).map_err(Error::other)
    }

    /// A table of the database as an expression leaf
    pub fn table(self: &Arc<Self>, name: &str) -> Result<Table> {
        let connection: Arc<dyn Connection> = self.clone();
        Table::builder()
            .database(MAIN)
            .name(name)
            .connection(connection)
            .heading(self.heading(name)?)
            .try_build()
            .map_err(Error::other)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.connection
            .lock()
            .map_err(|err| Error::database(err.to_string()))
    }
}

impl Connection for Database {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(sql)?;
        let names: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let rows = statement
            .query_map([], |row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(index, name)| Ok((name.clone(), row.get::<_, Value>(index)?)))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(Row::new)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Read sql results as value
impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::integer(i),
            ValueRef::Real(f) => Value::float(f),
            ValueRef::Text(s) => Value::text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => Value::bytes(b.to_vec()),
        })
    }
}

const TEST_TABLES: &str = "
CREATE TABLE person (
    id INTEGER PRIMARY KEY,
    name VARCHAR(64) NOT NULL,
    age TINYINT UNSIGNED
);
CREATE TABLE pet (
    pet_id INTEGER PRIMARY KEY,
    id INTEGER NOT NULL,
    species VARCHAR(32) NOT NULL
);
INSERT INTO person VALUES (1, 'Ann', 34), (2, 'Bob', 28), (3, 'Cid', 41), (4, 'Dee', 12);
INSERT INTO pet VALUES (1, 1, 'cat'), (2, 1, 'dog'), (3, 2, 'cat'), (4, 3, 'fish'), (5, 3, 'cat');
";

/// An in-memory database with the tables `person(id, name, age)` and `pet(pet_id, id, species)`
pub fn test_database() -> Result<Arc<Database>> {
    let database = Database::open_in_memory(DB)?;
    database.execute_batch(TEST_TABLES)?;
    Ok(Arc::new(database))
}
