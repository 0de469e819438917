use std::{fmt, sync::Arc};

use super::{display_sql, Error, Expression, Properties, Result, Variant};
use crate::{builder::Ready, heading::Heading, io::Connection, namer::Aliases};

/// A base table of a database
#[derive(Clone, Debug)]
pub struct Table {
    /// The database (schema) the table belongs to
    database: String,
    /// The name of the table
    name: String,
    properties: Properties,
    connection: Option<Arc<dyn Connection>>,
}

impl Table {
    pub fn new<D: Into<String>, N: Into<String>>(
        database: D,
        name: N,
        heading: Heading,
        connection: Option<Arc<dyn Connection>>,
    ) -> Self {
        Table {
            database: database.into(),
            name: name.into(),
            properties: Properties::new(heading),
            connection,
        }
    }

    pub fn builder() -> TableBuilder<WithoutHeading> {
        TableBuilder::new()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quoted full name of the table
    pub fn path(&self) -> String {
        if self.database.is_empty() {
            format!("`{}`", self.name)
        } else {
            format!("`{}`.`{}`", self.database, self.name)
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.database == other.database
            && self.name == other.name
            && self.properties == other.properties
            && super::same_connection(self.connection.as_ref(), other.connection.as_ref())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_sql(&self.clone().into(), f)
    }
}

impl Variant for Table {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn inputs(&self) -> Vec<&Expression> {
        vec![]
    }

    fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    fn from_clause(&self, _aliases: &Aliases) -> Result<String> {
        Ok(self.path())
    }
}

// A Table builder
#[derive(Debug, Default)]
pub struct WithoutHeading;
#[derive(Debug)]
pub struct WithHeading(Heading);

/// A table builder
#[derive(Debug, Default)]
pub struct TableBuilder<RequireHeading> {
    database: Option<String>,
    name: Option<String>,
    heading: RequireHeading,
    connection: Option<Arc<dyn Connection>>,
}

impl TableBuilder<WithoutHeading> {
    pub fn new() -> Self {
        TableBuilder::default()
    }
}

impl<RequireHeading> TableBuilder<RequireHeading> {
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn heading<H: Into<Heading>>(self, heading: H) -> TableBuilder<WithHeading> {
        TableBuilder {
            database: self.database,
            name: self.name,
            heading: WithHeading(heading.into()),
            connection: self.connection,
        }
    }
}

impl Ready<Table> for TableBuilder<WithHeading> {
    type Error = Error;

    fn try_build(self) -> Result<Table> {
        let name = self
            .name
            .ok_or_else(|| Error::Other("A table requires a name".to_string()))?;
        if self.heading.0.primary_key().is_empty() {
            return Err(Error::Other(format!("Table `{}` has no primary key", name)));
        }
        Ok(Table::new(
            self.database.unwrap_or_default(),
            name,
            self.heading.0,
            self.connection,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::With, data_type::DataType};

    #[test]
    fn test_build() {
        let table: Table = Table::builder()
            .database("lab")
            .name("session")
            .heading(
                Heading::builder()
                    .key("session_id", DataType::Int)
                    .with(("session_date", DataType::Date))
                    .build(),
            )
            .build();
        println!("table = {}", table);
        assert_eq!(table.path(), "`lab`.`session`");
        assert_eq!(table.primary_key(), vec!["session_id"]);
        assert!(table.connection().is_none());
        let sql = Expression::from(table).make_sql().unwrap();
        assert_eq!(sql, "SELECT `session_id`,`session_date` FROM `lab`.`session`");
    }

    #[test]
    fn test_build_requires_key() {
        let built: Result<Table> = Table::builder()
            .name("log")
            .heading(Heading::builder().with(("message", DataType::VarCharN)).build())
            .try_build();
        assert!(built.is_err());
    }
}
