//! Iteration over the elements of an expression
//!
//! The primary keys are fetched once, then each element is fetched by its key.
//! Elements deleted in between are skipped.

use log::warn;
use std::collections::VecDeque;

use super::{Error, Result};
use crate::{
    expression::{Expression, Variant},
    io::Row,
};

#[derive(Clone, Debug)]
pub struct KeyIter {
    expression: Expression,
    keys: Option<VecDeque<Row>>,
}

impl KeyIter {
    /// An iterator to be initialized with [`KeyIter::init`]
    pub fn new(expression: Expression) -> Self {
        KeyIter {
            expression,
            keys: None,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Fetch the keys to iterate over
    pub fn init(&mut self) -> Result<()> {
        self.keys = Some(self.expression.fetch_keys()?.into());
        Ok(())
    }

    /// The number of keys left
    pub fn remaining(&self) -> Option<usize> {
        self.keys.as_ref().map(VecDeque::len)
    }

    /// The next element, `None` once the keys are exhausted
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let keys = self.keys.as_mut().ok_or_else(Error::iterator_not_initialized)?;
        let only_key = self.expression.heading().secondary_attributes().is_empty();
        while let Some(key) = keys.pop_front() {
            if only_key {
                return Ok(Some(key));
            }
            let mut rows = self.expression.restrict(&key)?.fetch_all()?;
            match rows.len() {
                0 => warn!("Skipping {}: no longer in the result", key),
                1 => return Ok(rows.pop()),
                count => {
                    return Err(Error::invalid_fetch(format!(
                        "{} rows share the key {}",
                        count, key
                    )))
                }
            }
        }
        Ok(None)
    }
}

impl Iterator for KeyIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{Ready, With},
        data_type::{DataType, Value},
        heading::Heading,
        io::{tests::RecordingConnection, Connection},
    };
    use std::sync::Arc;

    fn connected(connection: &Arc<RecordingConnection>, with_name: bool) -> Expression {
        let connection: Arc<dyn Connection> = connection.clone();
        let builder = Heading::builder().key("id", DataType::Int);
        let heading = if with_name {
            builder.with(("name", DataType::VarCharN)).build()
        } else {
            builder.build()
        };
        Expression::table()
            .database("main")
            .name("person")
            .connection(connection)
            .heading(heading)
            .build()
            .into()
    }

    #[test]
    fn test_not_initialized() {
        let connection = Arc::new(RecordingConnection::default());
        let mut iter = KeyIter::new(connected(&connection, true));
        assert!(matches!(iter.next_row(), Err(Error::IteratorNotInitialized(_))));
        assert!(connection.queries().is_empty());
    }

    #[test]
    fn test_only_keys() {
        let connection = Arc::new(RecordingConnection::default());
        let person = connected(&connection, false);
        connection.answer(vec![
            [("id", 1)].into_iter().collect(),
            [("id", 2)].into_iter().collect(),
        ]);
        let rows: Vec<Row> = person.iter().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            connection.queries(),
            vec!["SELECT `id` FROM `main`.`person` ORDER BY `id`"]
        );
    }

    #[test]
    fn test_skip_vanished() {
        let connection = Arc::new(RecordingConnection::default());
        let person = connected(&connection, true);
        connection.answer(vec![
            [("id", 1)].into_iter().collect(),
            [("id", 2)].into_iter().collect(),
        ]);
        // The first element vanished
        connection.answer(vec![]);
        connection.answer(vec![[("id", Value::from(2)), ("name", Value::from("Bob"))]
            .into_iter()
            .collect()]);
        let mut iter = person.iter().unwrap();
        assert_eq!(iter.remaining(), Some(2));
        let row = iter.next().unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("Bob")));
        assert!(iter.next().is_none());
        let queries = connection.queries();
        println!("{}", queries.join("\n"));
        assert_eq!(
            queries[1],
            "SELECT `id`,`name` FROM `main`.`person` WHERE ((`id`=1))"
        );
    }
}
